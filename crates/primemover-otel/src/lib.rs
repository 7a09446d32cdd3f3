//! Ambient observability for Prime Mover: structured logging through
//! `tracing`, and the JSON renderer for [`primemover_kernel::reporter::Reporter`]
//! snapshots (spec §6).
//!
//! The statistics-collection/reporting subsystem itself is out of scope;
//! this crate only carries the thin interface a reporting subsystem would
//! consume, plus an [`EventLogger`] that turns scheduler dispatch into
//! structured `tracing` spans.

mod logger;
mod reporter;
mod subscriber;

pub use logger::EventLogger;
pub use reporter::{render_json, snapshot_json};
pub use subscriber::init_tracing;
