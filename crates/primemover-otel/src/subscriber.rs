use tracing_subscriber::{fmt, EnvFilter};

/// Installs a process-global `tracing` subscriber: `EnvFilter` driven by
/// `RUST_LOG` (default `info`), JSON-formatted output. Meant for binaries
/// only — library crates in this workspace never call this, they just emit
/// through the `tracing` facade.
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing() -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().json().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
}
