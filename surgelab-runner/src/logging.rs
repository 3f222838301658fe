//! Process-wide tracing subscriber.

use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Install the fmt subscriber once. `RUST_LOG` wins over `default_level`.
pub fn init_logger(service_name: &'static str, default_level: &str) {
    LOGGER_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level));

        // A subscriber may already be installed by an embedding process.
        let _ = fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_names(true)
            .with_writer(std::io::stderr)
            .try_init();

        tracing::info!(service = service_name, "logger initialized");
    });
}
