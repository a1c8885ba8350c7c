use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Default filter when `RUST_LOG` is unset. Kept at `warn` so log lines do
/// not tear the progress display.
const DEFAULT_FILTER: &str = "migwatch=warn,warn";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable compact output.
    Human,
    /// Structured JSON, one object per line (paired with `--json`).
    Json,
}

impl LogFormat {
    pub fn for_json_output(json: bool) -> Self {
        if json { Self::Json } else { Self::Human }
    }
}

/// Initialize the global tracing subscriber. Logs go to stderr; stdout is
/// reserved for the progress display and command output.
///
/// Call once at program startup. Respects `RUST_LOG`.
pub fn init(format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    match format {
        LogFormat::Human => {
            let layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact();
            tracing_subscriber::registry()
                .with(env_filter)
                .with(layer)
                .init();
        }
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(layer)
                .init();
        }
    }
}
