//! Tracing subscriber wiring for the service binary and embedders.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber: env-filtered, JSON-formatted.
///
/// `RUST_LOG` overrides the default filter. Calling this more than once is
/// a no-op; the first subscriber wins.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("valet_service=debug,info"));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json())
        .try_init();
}
