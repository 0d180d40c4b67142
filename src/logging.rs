//! Logging setup for the command-line tool.
//!
//! Diagnostics go to stderr through `tracing`; stdout is reserved for the
//! status lines the tool prints. `YOLO_STUB_LOG` takes precedence over the
//! filter passed on the command line.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV_VAR: &str = "YOLO_STUB_LOG";

/// Filter used when neither `--log` nor `YOLO_STUB_LOG` is given. Quiet
/// enough that a normal run prints only its status lines.
pub const DEFAULT_FILTER: &str = "warn";

pub fn env_filter(default_directive: &str) -> EnvFilter {
    match std::env::var(LOG_ENV_VAR) {
        Ok(directive) if !directive.trim().is_empty() => EnvFilter::new(directive),
        _ => EnvFilter::new(default_directive),
    }
}

/// Install the global subscriber. Calling it twice is harmless; the second
/// call leaves the first subscriber in place.
pub fn init(default_directive: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_directive))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
