use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing with console output on stderr and, when `log_dir` is given, a daily
/// rolling file (`quorum.log.<date>`) in logfmt or JSON.
///
/// Verbosity comes from `RUST_LOG` (default `info`). Keep the returned guard
/// alive for the life of the process or buffered file lines are lost.
/// Calling this twice is harmless; the second call leaves the first subscriber in place.
pub fn init_logging(log_dir: Option<&str>, json_format: bool) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Console layer; stdout is reserved for command output
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let (non_blocking_file, guard) = tracing_appender::non_blocking(rolling::daily(dir, "quorum.log"));
            let layer = if json_format {
                fmt::layer()
                    .json()
                    .with_writer(non_blocking_file)
                    .with_current_span(false)
                    .with_span_list(false)
                    .with_level(true)
                    .boxed()
            } else {
                fmt::layer()
                    .with_writer(non_blocking_file)
                    .with_target(false)
                    .with_level(true)
                    .with_ansi(false)
                    .boxed()
            };
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    guard
}
