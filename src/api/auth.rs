//! Request-side pipeline stage: attach `Authorization: Bearer <token>`.
//!
//! The token is read from the session store on every request, so a login or
//! logout takes effect on the next call without rebuilding the client.
//! With no token the request goes out as-is and the backend decides.

use reqwest::{
    Request,
    header::{AUTHORIZATION, HeaderValue},
};
use tracing::trace;

use super::ApiError;
use crate::session::SessionStore;

#[derive(Debug, Clone)]
pub struct AuthInjector {
    session: SessionStore,
}

impl AuthInjector {
    pub fn new(session: SessionStore) -> Self {
        Self { session }
    }

    /// Returns the request with the header set, or a `Storage` error when the
    /// token cannot be read. Tokens are not refreshed or validated here.
    pub fn apply(&self, mut request: Request) -> Result<Request, ApiError> {
        let token = self.session.token().map_err(|e| ApiError::storage(e.to_string()))?;

        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| ApiError::storage(format!("stored token is not a valid header value: {e}")))?;
            value.set_sensitive(true);
            request.headers_mut().insert(AUTHORIZATION, value);
            trace!(url = %request.url(), "bearer token attached");
        }

        Ok(request)
    }
}
