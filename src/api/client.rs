//! Session-aware HTTP client for `<backend_url>/api`.
//!
//! Constructed once, then cheaply cloned (`reqwest::Client` is an `Arc`
//! internally). Each call runs: build → [`AuthInjector`] → send → status
//! check → [`ErrorNormalizer`] on any failure.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, warn};

use super::{ApiError, auth::AuthInjector, normalize::ErrorNormalizer};
use crate::{config::Config, session::SessionStore};

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    api_base: String,
    session: SessionStore,
    injector: AuthInjector,
    normalizer: ErrorNormalizer,
}

impl ApiClient {
    /// `api_base` is the full prefix every path is joined to, e.g.
    /// `http://localhost:8001/api`.
    pub fn new(api_base: impl Into<String>, timeout: Duration, session: SessionStore) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::transport_msg(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            injector: AuthInjector::new(session.clone()),
            normalizer: ErrorNormalizer::new(),
            session,
        })
    }

    pub fn from_config(config: &Config, session: SessionStore) -> Result<Self, ApiError> {
        Self::new(config.api_base(), config.timeout(), session)
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }

    /// Start a request against `path`; finish it with [`Self::send`] or
    /// [`Self::send_json`].
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, self.url(path))
    }

    // ── typed helpers ────────────────────────────────────────────────────────

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_json(self.request(Method::GET, path)).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        self.send_json(self.request(Method::POST, path).json(body)).await
    }

    /// POST with no body; parameters travel in `query`.
    pub async fn post_empty<Q: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, query: &Q) -> Result<T, ApiError> {
        self.send_json(self.request(Method::POST, path).query(query)).await
    }

    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        self.send_json(self.request(Method::PUT, path).json(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(self.request(Method::DELETE, path)).await.map(|_| ())
    }

    // ── pipeline ─────────────────────────────────────────────────────────────

    /// Run the pipeline and decode a 2xx body as `T`.
    pub async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send(builder).await?;
        let url = response.url().clone();
        response.json::<T>().await.map_err(|e| {
            warn!(url = %url, error = %e, "response body did not match expected type");
            self.normalizer.apply(ApiError::decode(format!("failed to parse response body: {e}")))
        })
    }

    /// Run the pipeline and return the raw 2xx response. Every failure has
    /// been through the normaliser.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        self.dispatch(builder).await.map_err(|e| self.normalizer.apply(e))
    }

    async fn dispatch(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let request = builder.build().map_err(|e| ApiError::transport(&e))?;
        let request = self.injector.apply(request)?;

        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%method, url = %url, "sending request");

        let response = self.http.execute(request).await.map_err(|e| {
            warn!(%method, url = %url, error = %e, "request failed (transport)");
            ApiError::transport(&e)
        })?;

        let status = response.status();
        if status.is_success() {
            debug!(%method, url = %url, %status, "request succeeded");
            return Ok(response);
        }

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                debug!(%method, url = %url, %status, error = %e, "could not read error body");
                String::new()
            }
        };
        warn!(%method, url = %url, %status, "request returned HTTP error");
        Err(ApiError::status(status, parse_body(&text)))
    }
}

/// JSON when possible, raw text otherwise, `None` when empty.
fn parse_body(text: &str) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }
    Some(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())))
}
