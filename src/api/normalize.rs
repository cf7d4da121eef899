//! Collapse a failed response's `detail` payload into one display string.
//!
//! The backend (FastAPI) answers failures with `{"detail": ...}` where
//! `detail` is a string for `HTTPException`s, a list of
//! `{type, loc, msg, input}` objects for validation errors, or occasionally
//! an arbitrary object. Callers never branch on that shape: after
//! [`ErrorNormalizer::apply`] both `ApiError::message` and the body's
//! `detail` hold the same string.
//!
//! Normalisation is best-effort. When it cannot complete, the error passes
//! through untouched and the reason is logged at debug level.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace};

use super::ApiError;

const JOIN: &str = "; ";

/// Largest magnitude below which every whole `f64` is an exact integer.
const MAX_SAFE_WHOLE: f64 = 9_007_199_254_740_992.0;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("detail[{0}] is null")]
    NullElement(usize),
    #[error("cannot serialise detail: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Response-side pipeline stage. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorNormalizer;

impl ErrorNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalise `error` in place and hand it back. Never fails; the outcome
    /// of the request is always preserved.
    pub fn apply(&self, mut error: ApiError) -> ApiError {
        match self.normalized_message(&error) {
            Ok(Some(message)) if !message.is_empty() => {
                trace!(kind = ?error.kind, %message, "normalised error detail");
                rewrite(&mut error, message);
            }
            Ok(_) => {}
            Err(e) => debug!(kind = ?error.kind, error = %e, "error normalisation skipped"),
        }
        error
    }

    /// Normalised string for `error`, or `None` if there is no usable `detail`.
    pub fn normalized_message(&self, error: &ApiError) -> Result<Option<String>, NormalizeError> {
        match error.detail() {
            Some(detail) => normalize_detail(detail),
            None => Ok(None),
        }
    }
}

/// Reduce a `detail` value to a string.
///
/// - string: verbatim
/// - array: each element's `msg`, else its JSON text, joined with `"; "`
/// - object: its `msg`, else its JSON text
/// - anything else: `None`
pub fn normalize_detail(detail: &Value) -> Result<Option<String>, NormalizeError> {
    match detail {
        Value::String(s) => Ok(Some(s.clone())),
        Value::Array(items) => {
            let mut parts = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                if item.is_null() {
                    return Err(NormalizeError::NullElement(i));
                }
                parts.push(msg_or_json(item)?);
            }
            Ok(Some(parts.join(JOIN)))
        }
        Value::Object(_) => msg_or_json(detail).map(Some),
        Value::Null | Value::Bool(_) | Value::Number(_) => Ok(None),
    }
}

fn msg_or_json(value: &Value) -> Result<String, NormalizeError> {
    match value.get("msg").map(truthy_text).transpose()?.flatten() {
        Some(msg) => Ok(msg),
        None => stringify(value),
    }
}

/// Compact JSON text with the backend's key order kept and whole-valued
/// floats printed without a fraction (`5.0` becomes `5`).
fn stringify(value: &Value) -> Result<String, NormalizeError> {
    Ok(serde_json::to_string(&whole_floats_as_ints(value))?)
}

fn whole_floats_as_ints(value: &Value) -> Value {
    match value {
        Value::Number(n) if n.is_f64() => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < MAX_SAFE_WHOLE => Value::from(f as i64),
            _ => value.clone(),
        },
        Value::Array(items) => Value::Array(items.iter().map(whole_floats_as_ints).collect()),
        Value::Object(map) => Value::Object(map.iter().map(|(k, v)| (k.clone(), whole_floats_as_ints(v))).collect()),
        _ => value.clone(),
    }
}

/// Text of a `msg` field, or `None` when it is empty, zero, false or null.
fn truthy_text(msg: &Value) -> Result<Option<String>, NormalizeError> {
    Ok(match msg {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(stringify(msg)?),
        Value::Bool(true) => Some("true".to_string()),
        Value::Array(_) | Value::Object(_) => Some(stringify(msg)?),
        _ => None,
    })
}

fn rewrite(error: &mut ApiError, message: String) {
    if let Some(Value::Object(body)) = error.response.as_mut().and_then(|r| r.body.as_mut()) {
        body.insert("detail".to_string(), Value::String(message.clone()));
    }
    error.message = message;
}
