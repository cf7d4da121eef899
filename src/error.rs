//! Process-level error types.
//!
//! Failures of individual API calls are [`crate::api::ApiError`]; this enum
//! covers everything around them (config, logging, session storage, CLI).

use thiserror::Error;

use crate::session::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("session error: {0}")]
    Session(#[from] StoreError),

    #[error("request failed: {0}")]
    Request(String),

    #[error("usage: {0}")]
    Usage(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
