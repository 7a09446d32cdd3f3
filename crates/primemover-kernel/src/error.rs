//! The kernel's error taxonomy (spec §7).

use crate::clock::LogicalTime;
use crate::entity::Ordinal;
use std::fmt;
use thiserror::Error;

/// Top-level kernel error. Every fallible kernel-facing operation returns
/// `Result<T, KernelError>`.
#[derive(Debug, Error)]
pub enum KernelError {
    /// A `post_at` (or `set_time`) was attempted with a time that precedes
    /// `current_time`.
    #[error("invalid time {requested}: scheduler is already at {current}")]
    InvalidTime {
        requested: LogicalTime,
        current: LogicalTime,
    },

    /// `dispatch` was called with an ordinal outside the entity's registered
    /// set.
    #[error("ordinal {0} is not a valid dispatch target for this entity")]
    InvalidOrdinal(Ordinal),

    /// A facade call (`current_time`, `sleep`, ...) was made with no
    /// scheduler installed as the thread-local controller.
    #[error("no scheduler is installed as the current controller")]
    NoController,

    /// A facade method was reached at runtime without having been rewritten
    /// by `#[entity]`/`#[proxy_call]` at the call site. This is always a bug
    /// in the transformed crate, never a user error — see spec §9.
    #[error("reached an untransformed call site: {0}")]
    NotTransformed(&'static str),

    /// An entity method raised while executing inside a dispatch.
    #[error("entity {entity} raised during ordinal {ordinal} at t={time}: {cause}")]
    EntityException {
        entity: String,
        ordinal: Ordinal,
        time: LogicalTime,
        /// Oldest-first path of posting events that led here. Empty unless
        /// causality tracking was enabled for the run.
        causal_trace: Vec<String>,
        #[source]
        cause: EntityCause,
    },

    /// A resumption record was popped whose continuation no longer exists.
    /// Indicates kernel corruption; always fatal.
    #[error("continuation {0} referenced by a resumption record is gone")]
    ContinuationLost(u64),
}

/// The boxed cause carried by [`KernelError::EntityException`]. Wraps
/// either a propagated `Box<dyn Error>` from the entity body or a captured
/// panic payload (so a panicking entity method still surfaces as a regular
/// simulation-ending or poster-delivered error, never an unwind across the
/// scheduler).
#[derive(Debug)]
pub enum EntityCause {
    Error(Box<dyn std::error::Error + Send + Sync + 'static>),
    Panic(String),
}

impl fmt::Display for EntityCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityCause::Error(e) => write!(f, "{e}"),
            EntityCause::Panic(msg) => write!(f, "panicked: {msg}"),
        }
    }
}

impl std::error::Error for EntityCause {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EntityCause::Error(e) => Some(e.as_ref()),
            EntityCause::Panic(_) => None,
        }
    }
}

/// A borrowed, display-friendly view over a halted run's
/// `EntityException` (spec §7, "User-visible failure"). Built on demand via
/// [`KernelError::diagnostic`] rather than carried separately, since it
/// would otherwise duplicate the error's own fields.
#[derive(Debug)]
pub struct Diagnostic<'a> {
    pub current_time: LogicalTime,
    pub failing_signature: String,
    pub cause: &'a EntityCause,
    /// Populated only when causality tracking was enabled for the run.
    pub causal_trace: &'a [String],
}

impl fmt::Display for Diagnostic<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "simulation halted at t={}", self.current_time)?;
        writeln!(f, "  while executing: {}", self.failing_signature)?;
        writeln!(f, "  cause: {}", self.cause)?;
        if !self.causal_trace.is_empty() {
            writeln!(f, "  causal trace:")?;
            for (i, step) in self.causal_trace.iter().enumerate() {
                writeln!(f, "    {i}: {step}")?;
            }
        }
        Ok(())
    }
}

impl KernelError {
    /// Build a printable diagnostic if this error is an `EntityException`;
    /// every other variant indicates a kernel-level misuse rather than a
    /// simulated failure, so there is nothing to report.
    pub fn diagnostic(&self) -> Option<Diagnostic<'_>> {
        match self {
            KernelError::EntityException {
                entity,
                ordinal,
                time,
                causal_trace,
                cause,
            } => Some(Diagnostic {
                current_time: *time,
                failing_signature: format!("{entity}#{ordinal}"),
                cause,
                causal_trace,
            }),
            _ => None,
        }
    }
}
