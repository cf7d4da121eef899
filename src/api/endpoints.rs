//! Backend operations with client-side effects.
//!
//! Login, profile refresh and profile update write the session; logout
//! wipes it. The schedule and evaluation calls are thin wrappers around
//! server-side logic the client never reimplements.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::info;

use super::{ApiClient, ApiError};
use crate::session::{Session, UserSummary};

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    pub user: UserSummary,
}

/// `POST /schedules/generate-auto` result. `escalas` holds the ids of the
/// schedules created; it is empty when no preacher was available.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedSchedules {
    pub message: String,
    #[serde(default)]
    pub escalas: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleSummary {
    pub id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of the public evaluation form (`POST /evaluations`).
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationRequest {
    pub id_item_escala: String,
    pub id_igreja: String,
    /// `pregador` or `cantor`.
    pub tipo_membro: String,
    pub id_usuario_avaliado: String,
    /// 1..=5
    pub nota: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comentario: Option<String>,
}

impl ApiClient {
    /// Authenticate and persist the returned token and user.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, ApiError> {
        let body = json!({ "nome_usuario": username, "senha": password });
        let resp: LoginResponse = self.post("auth/login", &body).await?;

        let session = Session { token: resp.access_token, user: resp.user };
        self.session()
            .save(&session)
            .map_err(|e| ApiError::storage(e.to_string()))?;
        info!(user_id = %session.user.id, "logged in");
        Ok(session)
    }

    /// Forget the local session. The backend keeps no session state.
    pub fn logout(&self) -> Result<(), ApiError> {
        self.session().clear().map_err(|e| ApiError::storage(e.to_string()))?;
        info!("logged out");
        Ok(())
    }

    /// Fetch the current user and refresh the stored copy.
    pub async fn me(&self) -> Result<UserSummary, ApiError> {
        let user: UserSummary = self.get("auth/me").await?;
        self.session()
            .set_user(&user)
            .map_err(|e| ApiError::storage(e.to_string()))?;
        Ok(user)
    }

    /// Apply `changes` to the current user (`PUT /auth/me`), then reload the
    /// profile so the stored user matches the backend.
    pub async fn update_profile<B: Serialize + ?Sized>(&self, changes: &B) -> Result<UserSummary, ApiError> {
        let _: Value = self.put("auth/me", changes).await?;
        let user = self.me().await?;
        info!(user_id = %user.id, "profile updated");
        Ok(user)
    }

    /// Ask the backend to build every church's schedule for a district/month.
    pub async fn generate_schedule(&self, mes: u32, ano: i32, id_distrito: &str) -> Result<GeneratedSchedules, ApiError> {
        let query = [
            ("mes", mes.to_string()),
            ("ano", ano.to_string()),
            ("id_distrito", id_distrito.to_string()),
        ];
        self.post_empty("schedules/generate-auto", &query).await
    }

    /// Create an empty schedule for one church, to be filled by hand.
    pub async fn create_manual_schedule(&self, mes: u32, ano: i32, id_igreja: &str) -> Result<ScheduleSummary, ApiError> {
        let body = json!({
            "mes": mes,
            "ano": ano,
            "id_igreja": id_igreja,
            "modo_geracao": "manual",
        });
        self.post("schedules/manual", &body).await
    }

    /// Works without a session; the evaluation form is public.
    pub async fn submit_evaluation(&self, evaluation: &EvaluationRequest) -> Result<Value, ApiError> {
        self.post("evaluations", evaluation).await
    }
}
