//! In-process backend emulating the platform endpoints used by the CLI

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path as UrlPath, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use lifecycle_cli::http::client::{ClientOptions, HttpClient};
use lifecycle_cli::http::retry::{is_transient, RetryPolicy};
use lifecycle_cli::utils::CooldownOptions;
use secrecy::SecretString;
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub const DEPLOYMENT_PREFIX: &str = "/lifecycle/api/v1/deployment";
pub const BACKEND_PREFIX: &str = "/lifecycle/api/v1/backend";

/// Behavior switches and recorded calls
#[derive(Default)]
pub struct BackendState {
    /// Presigning fails for keys ending with this suffix
    pub failing_presign_suffix: Option<String>,
    /// Body served on the status stream
    pub sse_body: String,
    /// Status returned when creating the developer studio record
    pub studio_status: Option<StatusCode>,
    pub application_in_progress: bool,
    /// Base URL handed out in presigned URLs
    pub upload_base: String,
    /// Registry documents keyed by `dir/name`
    pub schemas: BTreeMap<String, Value>,

    pub presigned_keys: Vec<String>,
    pub uploads: BTreeMap<String, Vec<u8>>,
    pub upload_headers: Vec<(String, String)>,
    pub triggered: Vec<(String, Value)>,
    pub iam_created: Vec<Value>,
    pub iam_deleted: Vec<String>,
    pub studio_requests: Vec<Value>,
    pub cancelled: Vec<String>,
    pub credential_headers: Vec<String>,
}

pub type Shared = Arc<Mutex<BackendState>>;

pub struct MockBackend {
    pub addr: SocketAddr,
    pub state: Shared,
}

impl MockBackend {
    pub async fn start(mut state: BackendState) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        state.upload_base = format!("http://{}/upload", addr);
        let state: Shared = Arc::new(Mutex::new(state));
        let app = router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { addr, state }
    }

    pub fn host(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn deployment_url(&self) -> String {
        format!("{}{}", self.host(), DEPLOYMENT_PREFIX)
    }

    pub fn iam_client(&self) -> HttpClient {
        client(&self.host())
    }

    pub fn deployment_client(&self) -> HttpClient {
        client(&self.deployment_url())
    }

    pub fn backend_client(&self) -> HttpClient {
        client(&format!("{}{}", self.host(), BACKEND_PREFIX))
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, BackendState> {
        self.state.lock().unwrap()
    }
}

pub fn client(base_url: &str) -> HttpClient {
    HttpClient::new(
        base_url,
        &SecretString::from("test-secret".to_string()),
        &ClientOptions {
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(1),
        },
    )
    .unwrap()
}

/// Retry policy without noticeable delays
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        cooldown: CooldownOptions {
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            multiplier: 2.0,
        },
        retryable: is_transient,
    }
}

/// Address nothing listens on
pub async fn dead_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// SSE body with one `data:` event per frame
pub fn sse_body(frames: &[Value]) -> String {
    frames
        .iter()
        .map(|frame| format!("event: status\ndata: {}\n\n", frame))
        .collect()
}

/// Write a file, creating parent folders
pub fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

/// Project with a registered manifest and the given services
pub fn project(root: &Path, services: &[&str]) {
    let mut manifest = String::from(
        "application:\n  application_uid: app-123\n  display_name: Demo App\n  description: Demo\n  lead_developer_email: dev@example.com\n  app_version: 1.0.0\n  github_url: https://github.com/org/demo\ncore_services:\n",
    );
    for service in services {
        manifest.push_str(&format!("  {}: lifecycle/{}\n", service, service));
    }
    write(root, "lifecycle/lifecycle_config.yaml", &manifest);
}

fn router(state: Shared) -> Router {
    let deployment = Router::new()
        .route("/s3/generate_presigned_url", post(presign))
        .route("/status/deployment/stream/{id}", get(status_stream))
        .route("/status/application/{app}/inProgress", get(in_progress))
        .route("/deployments/validate/{app}", post(validate_application))
        .route("/msk/deploy", post(trigger_deploy))
        .route("/dry-run", post(trigger_dry_run))
        .route("/cancel/", post(cancel))
        .route("/applications", post(create_studio));

    Router::new()
        .nest(DEPLOYMENT_PREFIX, deployment)
        .route(
            &format!("{}/schemas/schema/{{name}}", BACKEND_PREFIX),
            get(schema),
        )
        .route("/upload/{*key}", put(upload))
        .route("/cxp-iam/api/v1/applications", post(create_iam))
        .route(
            "/cxp-iam/api/v1/applications/{id}",
            get(get_iam).delete(delete_iam),
        )
        .route("/cxp-iam/api/v1/users/me", get(current_user))
        .with_state(state)
}

async fn presign(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let key = body["key"].as_str().unwrap_or_default().to_string();
    let mut state = state.lock().unwrap();
    state.presigned_keys.push(key.clone());
    if let Some(suffix) = &state.failing_presign_suffix {
        if key.ends_with(suffix.as_str()) {
            return (StatusCode::INTERNAL_SERVER_ERROR, "presign unavailable").into_response();
        }
    }
    Json(json!({ "url": format!("{}/{}", state.upload_base, key) })).into_response()
}

async fn schema(
    State(state): State<Shared>,
    UrlPath(name): UrlPath<String>,
    Query(query): Query<BTreeMap<String, String>>,
) -> Response {
    let key = match query.get("path") {
        Some(dir) => format!("{}/{}", dir, name),
        None => name,
    };
    match state.lock().unwrap().schemas.get(&key) {
        Some(document) => Json(document.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn upload(
    State(state): State<Shared>,
    UrlPath(key): UrlPath<String>,
    headers: axum::http::HeaderMap,
    body: Bytes,
) -> StatusCode {
    let mut state = state.lock().unwrap();
    if let Some(value) = headers.get("x-amz-server-side-encryption") {
        state.upload_headers.push((
            key.clone(),
            value.to_str().unwrap_or_default().to_string(),
        ));
    }
    if headers.contains_key("x-servicecredentials") {
        state.credential_headers.push(key.clone());
    }
    state.uploads.insert(key, body.to_vec());
    StatusCode::OK
}

async fn status_stream(State(state): State<Shared>, UrlPath(id): UrlPath<String>) -> Response {
    if id == "missing" {
        return (StatusCode::NOT_FOUND, "Deployment not found").into_response();
    }
    let body = state.lock().unwrap().sse_body.clone();
    ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
}

async fn in_progress(State(state): State<Shared>) -> Json<Value> {
    Json(json!(state.lock().unwrap().application_in_progress))
}

async fn validate_application(UrlPath(app): UrlPath<String>) -> Json<Value> {
    Json(json!({
        "applicationId": app,
        "description": "Demo",
        "leadDeveloper": "dev@example.com",
        "gitRepository": "https://github.com/org/demo"
    }))
}

async fn trigger_deploy(State(state): State<Shared>, Json(body): Json<Value>) -> &'static str {
    state
        .lock()
        .unwrap()
        .triggered
        .push(("deploy".to_string(), body));
    "Deployment started"
}

async fn trigger_dry_run(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    state
        .lock()
        .unwrap()
        .triggered
        .push(("dry-run".to_string(), body));
    Json(json!({ "status": "accepted" }))
}

async fn cancel(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let id = body["deployment_id"].as_str().unwrap_or_default().to_string();
    if id == "missing" {
        return (StatusCode::NOT_FOUND, "Deployment not found").into_response();
    }
    state.lock().unwrap().cancelled.push(id);
    "Deployment cancelled".into_response()
}

async fn create_studio(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    state.studio_requests.push(body);
    match state.studio_status {
        Some(status) if !status.is_success() => (status, "studio error").into_response(),
        _ => (StatusCode::CREATED, Json(json!({ "created": true }))).into_response(),
    }
}

async fn create_iam(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    state.lock().unwrap().iam_created.push(body.clone());
    Json(json!({
        "id": "iam-app-1",
        "clientId": "client",
        "secret": "s3cret",
        "name": body["name"],
        "displayName": body["displayName"],
        "contact": body["contact"],
    }))
}

async fn get_iam(UrlPath(id): UrlPath<String>) -> Response {
    if id == "unknown" {
        return StatusCode::NOT_FOUND.into_response();
    }
    Json(json!({ "id": id, "clientId": "client", "displayName": "Demo App" })).into_response()
}

async fn delete_iam(State(state): State<Shared>, UrlPath(id): UrlPath<String>) -> StatusCode {
    state.lock().unwrap().iam_deleted.push(id);
    StatusCode::NO_CONTENT
}

async fn current_user() -> Json<Value> {
    Json(json!({ "accountId": "acct-1", "email": "dev@example.com" }))
}
