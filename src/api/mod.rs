//! HTTP pipeline for the Sistema de Escalas backend.
//!
//! Every request goes through [`auth::AuthInjector`] before it is sent and
//! every failure goes through [`normalize::ErrorNormalizer`] before it is
//! returned. Both stages are composed when an [`ApiClient`] is built; there
//! is no shared global client.

pub mod auth;
pub mod client;
pub mod endpoints;
pub mod normalize;
pub mod notice;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

pub use client::ApiClient;
pub use notice::{CallSite, NoticePolicy, Notices};

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// No response: connection refused, timeout, DNS, invalid request.
    Transport,
    /// Non-2xx response.
    Status,
    /// Session storage could not be read while preparing the request.
    Storage,
    /// 2xx response whose body did not match the expected type.
    Decode,
}

/// The response half of a [`ApiErrorKind::Status`] failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    pub status: StatusCode,
    /// Parsed JSON body; a non-JSON body is kept as a string value.
    /// `None` when the body was empty.
    pub body: Option<Value>,
}

/// Failure of a single API call. `Display` is the current message, which the
/// normaliser may have rewritten.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
    pub response: Option<ErrorResponse>,
}

impl ApiError {
    pub fn transport(err: &reqwest::Error) -> Self {
        Self { kind: ApiErrorKind::Transport, message: err.to_string(), response: None }
    }

    pub fn transport_msg(message: impl Into<String>) -> Self {
        Self { kind: ApiErrorKind::Transport, message: message.into(), response: None }
    }

    /// Non-2xx failure carrying the HTTP library's default message.
    pub fn status(status: StatusCode, body: Option<Value>) -> Self {
        Self {
            kind: ApiErrorKind::Status,
            message: format!("Request failed with status code {}", status.as_u16()),
            response: Some(ErrorResponse { status, body }),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self { kind: ApiErrorKind::Storage, message: message.into(), response: None }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self { kind: ApiErrorKind::Decode, message: message.into(), response: None }
    }

    pub fn status_code(&self) -> Option<StatusCode> {
        self.response.as_ref().map(|r| r.status)
    }

    /// The body's `detail` field, in whatever shape it currently has.
    pub fn detail(&self) -> Option<&Value> {
        self.response.as_ref()?.body.as_ref()?.get("detail")
    }

    /// `detail` when it is a non-empty string, i.e. after normalisation.
    pub fn detail_str(&self) -> Option<&str> {
        self.detail()?.as_str().filter(|s| !s.is_empty())
    }
}
