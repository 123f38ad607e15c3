use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const DEFAULT_LOG_LEVEL: &str = "info,secret_santa_exchange=debug,secret_santa_config=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_LEVEL.into())
}

/// Installs the global subscriber for binaries, logging to stderr.
///
/// `RUST_LOG` takes precedence over the built in directives.
pub fn setup_telemetry() {
    let stderr_log = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(stderr_log.with_filter(env_filter()))
        .init();
    tracing::debug!("telemetry initialized");
}

/// Like [`setup_telemetry`] but captures output per test and tolerates being called repeatedly.
pub fn setup_test_telemetry() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_test_writer()
                .with_filter(env_filter()),
        )
        .try_init();
}
