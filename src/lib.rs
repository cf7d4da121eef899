//! Sistema de Escalas API client.
//!
//! [`api::ApiClient`] wraps `reqwest` with two pipeline stages composed at
//! construction: bearer-token injection from the persisted [`session`], and
//! normalisation of the backend's error payloads into one display string.

pub mod api;
pub mod config;
pub mod error;
pub mod logger;
pub mod session;

pub use api::{ApiClient, ApiError, ApiErrorKind, Notices};
pub use error::AppError;
pub use session::{Session, SessionStore, UserSummary};
