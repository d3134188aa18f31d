use std::sync::Once;

use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};
use walltimer_config::{LoggingConfig, get_config};

static INIT: Once = Once::new();

/// Initialise tracing subscriber once per process.
///
/// `RUST_LOG` wins over the configured filter. Later calls are no-ops, and an
/// already installed global subscriber is left in place. A config file the
/// global configuration had to ignore is reported once here.
pub fn init_logging(config: &LoggingConfig) {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.filter))
            .unwrap_or_else(|_| EnvFilter::new("walltimer=info"));

        let _ = fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_ansi(config.ansi)
            .compact()
            .try_init();

        if let Some(err) = get_config().load_error() {
            warn!("ignoring config file: {err}");
        }
    });
}
