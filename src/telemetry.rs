use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "WARBAND_LOG";
const DEFAULT_FILTER: &str = "warn";

/// Install the global subscriber: stderr output, filter from `WARBAND_LOG` (default `warn`).
/// Calling it again is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
