//! C3 — the Entity Proxy Contract (spec §4.3).
//!
//! Every transformed entity implements [`EntityProxy`]. The scheduler never
//! inspects argument or return types; it only ever calls `dispatch` with an
//! ordinal and a boxed argument tuple and gets back a boxed return value,
//! treating both opaquely (spec: "scheduler treats it opaquely").

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::EntityCause;

/// A stable integer identifier for an entity method (spec §4.3 ordinal
/// assignment rules; the actual assignment algorithm lives in
/// [`crate::ordinal`] and is shared with `primemover-macros` so a hand
/// written proxy and a macro-generated one agree).
pub type Ordinal = u32;

/// Boxed, heterogeneous argument tuple. `#[entity]`-generated dispatch
/// bodies downcast this to the method's real parameter tuple type.
pub type Args = Box<dyn Any + Send>;

/// Boxed return value, same erasure discipline as [`Args`].
pub type Value = Box<dyn Any + Send>;

/// Result of a single `dispatch` call.
pub type DispatchResult = Result<Value, EntityCause>;

/// The per-entity ABI every transformed class implements (spec §4.3).
///
/// `dispatch` must be total over [`EntityProxy::valid_ordinals`]; calling it
/// with any other ordinal is a scheduler-level bug, not a dispatch failure,
/// and the scheduler enforces that before ever calling in (see
/// [`crate::error::KernelError::InvalidOrdinal`]).
pub trait EntityProxy: Send + Sync {
    /// Execute the body of the original method identified by `ordinal`.
    fn dispatch(&self, ordinal: Ordinal, args: Args) -> DispatchResult;

    /// Human-readable method signature, used by logger and trace dumps.
    fn signature_for(&self, ordinal: Ordinal) -> Option<String>;

    /// The full set of ordinals this entity answers to. Stable across
    /// recompiles as long as the entity's event-method set only grows or
    /// shrinks at the edges (spec §4.3 "Stability property").
    fn valid_ordinals(&self) -> &[Ordinal];

    /// A short name used in diagnostics and reporter snapshots.
    fn entity_name(&self) -> &str;
}

impl fmt::Debug for dyn EntityProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityProxy({})", self.entity_name())
    }
}

/// A strong reference to a transformed entity, as carried by an
/// [`crate::event::EventRecord`] (spec §3: "entity — strong reference to
/// the target proxy").
pub type EntityHandle = Arc<dyn EntityProxy>;

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl EntityProxy for Echo {
        fn dispatch(&self, ordinal: Ordinal, args: Args) -> DispatchResult {
            match ordinal {
                1 => {
                    let n = *args.downcast::<i64>().unwrap_or_default();
                    Ok(Box::new(n * 2))
                }
                other => Err(EntityCause::Error(
                    format!("no such ordinal: {other}").into(),
                )),
            }
        }

        fn signature_for(&self, ordinal: Ordinal) -> Option<String> {
            match ordinal {
                1 => Some("double(i64) -> i64".to_string()),
                _ => None,
            }
        }

        fn valid_ordinals(&self) -> &[Ordinal] {
            &[1]
        }

        fn entity_name(&self) -> &str {
            "Echo"
        }
    }

    #[test]
    fn dispatch_roundtrips_boxed_any() {
        let e = Echo;
        let out = e.dispatch(1, Box::new(21_i64)).unwrap();
        assert_eq!(*out.downcast::<i64>().unwrap(), 42);
    }

    #[test]
    fn invalid_ordinal_is_not_listed() {
        let e = Echo;
        assert!(e.signature_for(2).is_none());
        assert!(!e.valid_ordinals().contains(&2));
    }
}
