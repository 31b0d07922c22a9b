//! Tracing subscriber setup.

use drivebox_core::config::LoggingConfig;
use tracing_subscriber::{fmt, EnvFilter};

/// Initializes the global tracing subscriber from the logging config.
///
/// The `RUST_LOG` environment variable takes precedence over the
/// configured level. Safe to call more than once; later calls are
/// no-ops, which keeps test binaries from panicking when several tests
/// set up logging.
pub fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format.as_str() {
        "json" => {
            let _ = fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .try_init();
        }
        _ => {
            let _ = fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .try_init();
        }
    }
}
