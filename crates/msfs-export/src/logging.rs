//! Logging setup for the exporter
//!
//! Library code logs through `tracing`; binaries call [`init_default`] or
//! [`init_with_config`] once at startup. `RUST_LOG` overrides the default
//! filter.

use std::sync::atomic::{AtomicBool, Ordering};

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "warn,msfs=info";

static TRACING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Install the default subscriber
///
/// Later calls are ignored.
pub fn init_default() {
    init_with_config(TracingConfig::default());
}

/// Install a subscriber built from `config`
///
/// Returns `false` if a subscriber was already installed.
pub fn init_with_config(config: TracingConfig) -> bool {
    if TRACING_INITIALIZED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
        .is_err()
    {
        return false;
    }

    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_level));

    let fmt_layer = fmt::layer()
        .with_target(config.show_target)
        .with_file(config.show_file)
        .with_line_number(config.show_line_number)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .try_init()
        .is_ok()
}

/// Subscriber options
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Filter directive, e.g. `"info"` or `"warn,msfs_export=debug"`
    pub default_level: String,
    pub show_target: bool,
    pub show_file: bool,
    pub show_line_number: bool,
}

impl TracingConfig {
    /// Config for a CLI verbosity count (`-v`, `-vv`, ...)
    pub fn for_verbosity(verbose: u8) -> Self {
        let default_level = match verbose {
            0 => DEFAULT_FILTER.to_string(),
            1 => "info".to_string(),
            2 => "debug".to_string(),
            _ => "trace".to_string(),
        };
        Self {
            default_level,
            show_target: verbose >= 2,
            ..Self::default()
        }
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: DEFAULT_FILTER.to_string(),
            show_target: false,
            show_file: false,
            show_line_number: false,
        }
    }
}

/// Run `f` inside an `info` span named after the stage, logging its duration
pub fn timed<T, F>(stage: &str, f: F) -> T
where
    F: FnOnce() -> T,
{
    let span = tracing::info_span!("stage", name = %stage);
    let _guard = span.enter();

    let start = std::time::Instant::now();
    let result = f();
    tracing::debug!(duration_ms = %start.elapsed().as_millis(), "Stage complete");

    result
}
