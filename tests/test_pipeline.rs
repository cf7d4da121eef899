//! End-to-end pipeline tests against an in-process axum backend that mimics
//! the FastAPI error shapes.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    routing::{delete, get, post},
};
use escalas_client::{
    ApiClient, ApiErrorKind, Notices,
    api::endpoints::EvaluationRequest,
    session::{FileStore, KvStore, MemoryStore, SessionStore, StoreError, TOKEN_KEY},
};
use serde_json::{Value, json};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};

const TOKEN: &str = "tok-123";

type Profile = Arc<Mutex<Value>>;

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()).map(str::to_string)
}

fn pastor(nome: &str) -> Value {
    json!({ "id": "u1", "nome_usuario": "pastor", "nome_completo": nome, "funcao": "pastor_distrital", "id_distrito": "d1" })
}

async fn echo_auth(headers: HeaderMap) -> Json<Value> {
    Json(json!({ "authorization": bearer(&headers) }))
}

async fn login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["nome_usuario"] == "pastor" && body["senha"] == "certa" {
        let resp = json!({ "access_token": TOKEN, "token_type": "bearer", "user": pastor("Pastor João") });
        (StatusCode::OK, Json(resp))
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({ "detail": "Invalid credentials" })))
    }
}

fn authorised(headers: &HeaderMap) -> bool {
    bearer(headers).as_deref() == Some("Bearer tok-123")
}

fn invalid_token() -> (StatusCode, Json<Value>) {
    (StatusCode::UNAUTHORIZED, Json(json!({ "detail": "Invalid token" })))
}

async fn me(State(profile): State<Profile>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if !authorised(&headers) {
        return invalid_token();
    }
    let current = profile.lock().unwrap().clone();
    (StatusCode::OK, Json(current))
}

async fn update_me(State(profile): State<Profile>, headers: HeaderMap, Json(changes): Json<Value>) -> (StatusCode, Json<Value>) {
    if !authorised(&headers) {
        return invalid_token();
    }
    let Some(changes) = changes.as_object() else {
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "detail": [{ "msg": "Input should be an object" }] })));
    };
    let mut current = profile.lock().unwrap();
    if let Some(fields) = current.as_object_mut() {
        for (k, v) in changes {
            fields.insert(k.clone(), v.clone());
        }
    }
    (StatusCode::OK, Json(json!({ "message": "Profile updated" })))
}

async fn generate(Query(q): Query<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
    if q.contains_key("id_distrito") {
        let resp = json!({ "message": "2 escalas geradas", "escalas": ["e1", "e2"] });
        return (StatusCode::OK, Json(resp));
    }
    let detail = json!([{ "type": "missing", "loc": ["query", "id_distrito"], "msg": "Field required", "input": null }]);
    (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "detail": detail })))
}

async fn manual(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["modo_geracao"] != "manual" {
        return (StatusCode::BAD_REQUEST, Json(json!({ "detail": "modo_geracao must be manual" })));
    }
    (StatusCode::CONFLICT, Json(json!({ "detail": "Schedule already exists for this month/year" })))
}

async fn evaluations(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    (StatusCode::CREATED, Json(json!({ "id": "av1", "nota": body["nota"] })))
}

fn app() -> Router {
    let profile: Profile = Arc::new(Mutex::new(pastor("Pastor João Silva")));
    Router::new()
        .route("/api/echo-auth", get(echo_auth))
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me).put(update_me))
        .route("/api/schedules/generate-auto", post(generate))
        .route("/api/schedules/manual", post(manual))
        .route("/api/evaluations", post(evaluations))
        .route("/api/churches/c1", delete(|| async { Json(json!({ "ok": true })) }))
        .route(
            "/api/mixed-detail",
            get(|| async { (StatusCode::BAD_REQUEST, Json(json!({ "detail": [{ "msg": "a" }, "raw"] }))) }),
        )
        .route(
            "/api/object-detail",
            get(|| async { (StatusCode::BAD_REQUEST, Json(json!({ "detail": { "foo": "bar" } }))) }),
        )
        .route(
            "/api/null-element",
            get(|| async { (StatusCode::BAD_REQUEST, Json(json!({ "detail": [{ "msg": "a" }, null] }))) }),
        )
        .route(
            "/api/ordered-detail",
            get(|| async {
                let detail = json!({ "type": "conflict", "loc": ["body"], "code": 7, "nota": 5.0 });
                (StatusCode::CONFLICT, Json(json!({ "detail": detail })))
            }),
        )
        .route("/api/no-detail", get(|| async { (StatusCode::NOT_FOUND, Json(json!({ "error": "nope" }))) }))
        .route("/api/plain-error", get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error") }))
        .route("/api/not-json", get(|| async { "hello" }))
        .with_state(profile)
}

async fn spawn_backend() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app()).await.unwrap();
    });
    format!("http://{addr}/api")
}

fn client(base: &str, session: SessionStore) -> ApiClient {
    ApiClient::new(base, Duration::from_secs(5), session).unwrap()
}

fn logged_in() -> SessionStore {
    let kv = MemoryStore::new();
    kv.set(TOKEN_KEY, TOKEN).unwrap();
    SessionStore::new(Arc::new(kv))
}

// ── injector ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn bearer_header_sent_when_token_stored() {
    let base = spawn_backend().await;
    let body: Value = client(&base, logged_in()).get("echo-auth").await.unwrap();
    assert_eq!(body["authorization"], "Bearer tok-123");
}

#[tokio::test]
async fn no_header_without_token() {
    let base = spawn_backend().await;
    let body: Value = client(&base, SessionStore::in_memory()).get("echo-auth").await.unwrap();
    assert_eq!(body["authorization"], Value::Null);
}

#[derive(Debug)]
struct BrokenStore;

impl KvStore for BrokenStore {
    fn get(&self, _: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable("storage disabled".into()))
    }
    fn set(&self, _: &str, _: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("storage disabled".into()))
    }
    fn remove(&self, _: &str) -> Result<(), StoreError> {
        Ok(())
    }
    fn clear(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[tokio::test]
async fn storage_failure_rejects_before_sending() {
    // Nothing listens here: a sent request would surface as Transport.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let c = client(&format!("http://{addr}/api"), SessionStore::new(Arc::new(BrokenStore)));
    let err = c.get::<Value>("echo-auth").await.unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::Storage);
    assert!(err.message.contains("storage disabled"));
}

// ── normaliser ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn validation_array_normalised() {
    let base = spawn_backend().await;
    let query = [("mes", "3"), ("ano", "2025")];
    let err = client(&base, logged_in())
        .post_empty::<_, Value>("schedules/generate-auto", &query)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::Status);
    assert_eq!(err.message, "Field required");
    assert_eq!(err.detail(), Some(&json!("Field required")));
    assert_eq!(err.status_code(), Some(StatusCode::UNPROCESSABLE_ENTITY));
}

#[tokio::test]
async fn mixed_array_uses_json_fallback() {
    let base = spawn_backend().await;
    let err = client(&base, logged_in()).get::<Value>("mixed-detail").await.unwrap_err();
    assert_eq!(err.message, "a; \"raw\"");
}

#[tokio::test]
async fn object_without_msg_serialised() {
    let base = spawn_backend().await;
    let err = client(&base, logged_in()).get::<Value>("object-detail").await.unwrap_err();
    assert_eq!(err.message, r#"{"foo":"bar"}"#);
}

#[tokio::test]
async fn null_element_passes_through_unchanged() {
    let base = spawn_backend().await;
    let err = client(&base, logged_in()).get::<Value>("null-element").await.unwrap_err();
    assert_eq!(err.message, "Request failed with status code 400");
    assert_eq!(err.detail(), Some(&json!([{ "msg": "a" }, null])));
}

#[tokio::test]
async fn object_detail_keeps_backend_key_order() {
    let base = spawn_backend().await;
    let err = client(&base, logged_in()).get::<Value>("ordered-detail").await.unwrap_err();
    assert_eq!(err.message, r#"{"type":"conflict","loc":["body"],"code":7,"nota":5}"#);
}

#[tokio::test]
async fn truncated_error_body_keeps_default_message() {
    // Promises more body than it sends, so reading the body fails.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 2048];
        let _ = sock.read(&mut buf).await;
        let head = "HTTP/1.1 502 Bad Gateway\r\ncontent-type: application/json\r\ncontent-length: 100\r\n\r\n";
        sock.write_all(head.as_bytes()).await.unwrap();
        sock.write_all(br#"{"detail":"#).await.unwrap();
        sock.shutdown().await.unwrap();
    });

    let err = client(&format!("http://{addr}/api"), logged_in()).get::<Value>("echo-auth").await.unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::Status);
    assert_eq!(err.message, "Request failed with status code 502");
    assert_eq!(err.response.unwrap().body, None);
}

#[tokio::test]
async fn missing_detail_keeps_default_message() {
    let base = spawn_backend().await;
    let err = client(&base, logged_in()).get::<Value>("no-detail").await.unwrap_err();
    assert_eq!(err.message, "Request failed with status code 404");
}

#[tokio::test]
async fn text_body_kept_as_string() {
    let base = spawn_backend().await;
    let err = client(&base, logged_in()).get::<Value>("plain-error").await.unwrap_err();
    assert_eq!(err.message, "Request failed with status code 500");
    assert_eq!(err.response.unwrap().body, Some(json!("Internal Server Error")));
}

#[tokio::test]
async fn transport_failure_keeps_library_message() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{addr}/api"), logged_in()).get::<Value>("echo-auth").await.unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::Transport);
    assert!(!err.message.is_empty());
    assert!(err.response.is_none());
}

#[tokio::test]
async fn undecodable_success_body_is_decode_error() {
    let base = spawn_backend().await;
    let err = client(&base, logged_in()).get::<Value>("not-json").await.unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::Decode);
}

#[tokio::test]
async fn concurrent_failures_normalised_independently() {
    let base = spawn_backend().await;
    let c = client(&base, logged_in());
    let (a, b, d) = tokio::join!(
        c.get::<Value>("mixed-detail"),
        c.get::<Value>("object-detail"),
        c.get::<Value>("no-detail"),
    );
    assert_eq!(a.unwrap_err().message, "a; \"raw\"");
    assert_eq!(b.unwrap_err().message, r#"{"foo":"bar"}"#);
    assert_eq!(d.unwrap_err().message, "Request failed with status code 404");
}

// ── session lifecycle ────────────────────────────────────────────────────────

#[tokio::test]
async fn login_persists_session_and_authorises_next_call() {
    let base = spawn_backend().await;
    let tmp = tempfile::TempDir::new().unwrap();
    let session = SessionStore::new(Arc::new(FileStore::new(tmp.path())));
    let c = client(&base, session.clone());

    let s = c.login("pastor", "certa").await.unwrap();
    assert_eq!(s.token, TOKEN);
    assert_eq!(session.token().unwrap().as_deref(), Some(TOKEN));
    assert_eq!(session.user().unwrap().unwrap().id_distrito.as_deref(), Some("d1"));

    let user = c.me().await.unwrap();
    assert_eq!(user.nome_completo.as_deref(), Some("Pastor João Silva"));
    assert_eq!(session.user().unwrap().unwrap().nome_completo.as_deref(), Some("Pastor João Silva"));

    c.logout().unwrap();
    assert!(!session.is_authenticated().unwrap());
    let err = c.me().await.unwrap_err();
    assert_eq!(err.message, "Invalid token");
}

#[tokio::test]
async fn update_profile_refreshes_stored_user() {
    let base = spawn_backend().await;
    let session = SessionStore::in_memory();
    let c = client(&base, session.clone());
    c.login("pastor", "certa").await.unwrap();
    assert_eq!(session.user().unwrap().unwrap().telefone, None);

    let changes = json!({ "nome_completo": "Pastor João Atualizado", "telefone": "11 98888-7777" });
    let user = c.update_profile(&changes).await.unwrap();
    assert_eq!(user.nome_completo.as_deref(), Some("Pastor João Atualizado"));

    let stored = session.user().unwrap().unwrap();
    assert_eq!(stored.nome_completo.as_deref(), Some("Pastor João Atualizado"));
    assert_eq!(stored.telefone.as_deref(), Some("11 98888-7777"));
}

#[tokio::test]
async fn update_profile_failure_leaves_stored_user() {
    let base = spawn_backend().await;
    let session = logged_in();
    session.set_user(&serde_json::from_value(pastor("Pastor João")).unwrap()).unwrap();
    let c = client(&base, session.clone());

    let err = c.update_profile(&json!(["not", "an", "object"])).await.unwrap_err();
    assert_eq!(err.message, "Input should be an object");
    assert_eq!(Notices::builtin().notice("profile_update", &err), "Erro ao atualizar perfil");
    assert_eq!(session.user().unwrap().unwrap().nome_completo.as_deref(), Some("Pastor João"));
}

#[tokio::test]
async fn failed_login_notice_and_no_session() {
    let base = spawn_backend().await;
    let c = client(&base, SessionStore::in_memory());
    let err = c.login("pastor", "errada").await.unwrap_err();
    assert_eq!(Notices::builtin().notice("login", &err), "Invalid credentials");
    assert_eq!(c.session().load().unwrap(), None);
}

#[tokio::test]
async fn generate_schedule_returns_ids() {
    let base = spawn_backend().await;
    let g = client(&base, logged_in()).generate_schedule(3, 2025, "d1").await.unwrap();
    assert_eq!(g.escalas, vec!["e1", "e2"]);
}

#[tokio::test]
async fn manual_schedule_conflict_notice() {
    let base = spawn_backend().await;
    let err = client(&base, logged_in()).create_manual_schedule(3, 2025, "c1").await.unwrap_err();
    assert_eq!(
        Notices::builtin().notice("schedule_manual", &err),
        "Schedule already exists for this month/year"
    );
}

#[tokio::test]
async fn anonymous_evaluation_and_delete() {
    let base = spawn_backend().await;
    let c = client(&base, SessionStore::in_memory());
    let created = c
        .submit_evaluation(&EvaluationRequest {
            id_item_escala: "i1".into(),
            id_igreja: "c1".into(),
            tipo_membro: "pregador".into(),
            id_usuario_avaliado: "u1".into(),
            nota: 4,
            comentario: Some("Boa pregação".into()),
        })
        .await
        .unwrap();
    assert_eq!(created["nota"], 4);

    client(&base, logged_in()).delete("churches/c1").await.unwrap();
}
