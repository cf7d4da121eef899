//! Persisted session: bearer token plus the logged-in user's summary.
//!
//! Layout in the backing [`KvStore`]:
//! ```text
//! token   raw access token
//! user    JSON-serialised UserSummary
//! ```
//!
//! Tokens are never checked for expiry here; the backend decides validity.

pub mod store;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

pub use store::{FileStore, KvStore, MemoryStore, StoreError};

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

/// The `user` object returned by `POST /api/auth/login`.
///
/// Fields the client does not model are kept in `extra` so a stored user
/// round-trips without loss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nome_usuario: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nome_completo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telefone: Option<String>,
    /// Role, e.g. `pastor_distrital`, `lider_igreja`, `membro`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funcao: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_distrito: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_igreja: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eh_pregador: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eh_cantor: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pontuacao_pregacao: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pontuacao_canto: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: UserSummary,
}

/// Session view over a shared key-value store. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SessionStore {
    kv: Arc<dyn KvStore>,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Process-local session, nothing touches disk.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Current token. An empty stored value counts as absent.
    pub fn token(&self) -> Result<Option<String>, StoreError> {
        Ok(self.kv.get(TOKEN_KEY)?.filter(|t| !t.is_empty()))
    }

    pub fn is_authenticated(&self) -> Result<bool, StoreError> {
        Ok(self.token()?.is_some())
    }

    pub fn user(&self) -> Result<Option<UserSummary>, StoreError> {
        let Some(raw) = self.kv.get(USER_KEY)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StoreError::InvalidValue { key: USER_KEY.into(), reason: e.to_string() })
    }

    /// `Some` only when both token and user are stored.
    pub fn load(&self) -> Result<Option<Session>, StoreError> {
        let Some(token) = self.token()? else {
            return Ok(None);
        };
        Ok(self.user()?.map(|user| Session { token, user }))
    }

    pub fn save(&self, session: &Session) -> Result<(), StoreError> {
        self.kv.set(TOKEN_KEY, &session.token)?;
        self.set_user(&session.user)?;
        debug!(user_id = %session.user.id, "session saved");
        Ok(())
    }

    pub fn set_user(&self, user: &UserSummary) -> Result<(), StoreError> {
        let raw = serde_json::to_string(user)
            .map_err(|e| StoreError::InvalidValue { key: USER_KEY.into(), reason: e.to_string() })?;
        self.kv.set(USER_KEY, &raw)
    }

    /// Wipe the whole backing store, as a logout does.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.kv.clear()?;
        debug!("session cleared");
        Ok(())
    }
}
