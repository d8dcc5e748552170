//! Logging initialization.
//!
//! `tracing` with a stderr subscriber: pretty for humans, JSON for log
//! shippers. `RUST_LOG` always wins over the configured level.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default directives when `RUST_LOG` is unset. ONNX Runtime is chatty at
/// info level, so it is held at warn unless asked for explicitly.
fn default_directives(level: &str) -> String {
    format!("{level},ort=warn")
}

/// Initialize the global subscriber.
///
/// Log output goes to stderr; stdout is reserved for `tell` output.
pub fn init(level: &str, json_format: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Initialize logging from the `[logging]` section, with CLI overrides.
pub fn init_from_config(
    config: &taleweaver_core::Config,
    verbose_override: bool,
    json_logs_override: bool,
) {
    let level = if verbose_override {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let json_format = json_logs_override || config.logging.format == "json";
    init(level, json_format);
}
