//! Telemetry initialization.
//!
//! Controlled by `CASEFLOW_LOG`:
//! - unset → no-op (tracing disabled, zero overhead)
//! - `"stderr"` → JSON spans/events to stderr
//! - `"pretty"` → human-readable events to stderr
//!
//! Filtering follows `RUST_LOG` (default `info`).

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Environment variable that selects the telemetry sink.
pub const LOG_ENV: &str = "CASEFLOW_LOG";

/// Held by `main()` until exit.
#[derive(Debug)]
pub struct TelemetryGuard {
    /// Which sink was installed, for diagnostics.
    pub sink: Sink,
}

/// The installed telemetry sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sink {
    Disabled,
    Json,
    Pretty,
}

impl Sink {
    /// Interpret a `CASEFLOW_LOG` value. Unknown values disable telemetry.
    #[must_use]
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("stderr" | "json") => Self::Json,
            Some("pretty") => Self::Pretty,
            _ => Self::Disabled,
        }
    }
}

/// Initialize telemetry based on `CASEFLOW_LOG`.
#[must_use]
pub fn init() -> TelemetryGuard {
    let value = std::env::var(LOG_ENV).ok();
    let sink = Sink::from_env_value(value.as_deref());
    match sink {
        Sink::Disabled => {
            if let Some(other) = value.as_deref().filter(|v| !v.is_empty()) {
                eprintln!("warning: {LOG_ENV}={other} not recognized; use stderr or pretty");
            }
        }
        Sink::Json => init_json(),
        Sink::Pretty => init_pretty(),
    }
    TelemetryGuard { sink }
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// JSON spans/events to stderr via tracing-subscriber's JSON formatter.
fn init_json() {
    let _ = tracing_subscriber::registry()
        .with(filter())
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE),
        )
        .try_init();
}

fn init_pretty() {
    let _ = tracing_subscriber::registry()
        .with(filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}
