use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, EnvFilter};

/// Default filter when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "info,sqlx=warn,tower_http=info";

/// Installs the global `tracing` subscriber.
///
/// Output goes through a non-blocking stdout writer; the returned guard must be held
/// for the lifetime of the process or buffered lines are lost on exit. Calling this
/// more than once is harmless: later calls keep the first subscriber.
pub fn init_tracing() -> WorkerGuard {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let result = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(writer)
        .try_init();

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed.");
    }

    guard
}
