//! tracing-subscriber setup for the CLI.
//!
//! `RUST_LOG` wins when set; otherwise the configured `log_level` is used.
//! Both accept full `EnvFilter` directives (`escalas_client=debug,reqwest=warn`).

use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Install the global subscriber, writing to stderr. Call once, after config
/// is resolved.
pub fn init(level: &str) -> Result<(), AppError> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(level, rust_log.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))
}

/// Resolve the filter from an optional `RUST_LOG` value and the configured
/// level. An empty `RUST_LOG` counts as unset.
pub fn build_filter(level: &str, rust_log: Option<&str>) -> Result<EnvFilter, AppError> {
    if let Some(directives) = rust_log.map(str::trim).filter(|d| !d.is_empty()) {
        return EnvFilter::try_new(directives)
            .map_err(|e| AppError::Logger(format!("invalid RUST_LOG '{directives}': {e}")));
    }

    let level = level.trim();
    if level.is_empty() {
        return Err(AppError::Logger("log_level must not be empty".into()));
    }
    EnvFilter::try_new(level).map_err(|e| AppError::Logger(format!("invalid log_level '{level}': {e}")))
}
