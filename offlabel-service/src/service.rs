use axum::{
    Router,
    extract::{Path, Request, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode},
    middleware::{Next, from_fn},
    response::{Json, Response},
    routing::{get, post},
};
use offlabel_view::{
    AnalysisBackend, AnalysisError, AnalyzeRequest, InMemorySessionStorage, ResultView,
    SessionStorage, SubmissionRunner, ViewError, ViewModel, assemble_result, assemble_view,
};
use serde_json::{Value, json};
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, debug, error, info, warn};
use uuid::Uuid;

use crate::{
    client::HttpAnalysisBackend,
    config::ServiceConfig,
    models::{AnalyzeResponse, SessionCreated, SessionDeleted},
};

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;
type ApiError = (StatusCode, Json<Value>);

const CORRELATION_HEADER: &str = "x-correlation-id";

fn analysis_error(e: &AnalysisError) -> ApiError {
    let status =
        StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({ "error": e.user_message() })))
}

fn view_error(e: &ViewError) -> ApiError {
    match e {
        ViewError::SessionNotFound(id) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "Session not found",
                "session_id": id
            })),
        ),
        ViewError::SubmissionInProgress(id) => (
            StatusCode::CONFLICT,
            Json(json!({
                "error": "Submission in progress",
                "session_id": id
            })),
        ),
    }
}

/// Unreadable request bodies are reported like any other internal failure.
fn unreadable_body(rejection: &JsonRejection) -> ApiError {
    warn!("Rejected request body: {}", rejection.body_text());
    analysis_error(&AnalysisError::Transport(rejection.body_text()))
}

#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn AnalysisBackend>,
    pub session_storage: Arc<dyn SessionStorage>,
    pub runner: SubmissionRunner,
    pub backend_url: String,
}

impl AppState {
    pub fn new(backend: Arc<dyn AnalysisBackend>, backend_url: impl Into<String>) -> Self {
        let session_storage: Arc<dyn SessionStorage> = Arc::new(InMemorySessionStorage::new());
        let runner = SubmissionRunner::new(session_storage.clone(), backend.clone());

        Self {
            backend,
            session_storage,
            runner,
            backend_url: backend_url.into(),
        }
    }
}

pub async fn create_app(config: &ServiceConfig) -> anyhow::Result<Router> {
    let backend = HttpAnalysisBackend::new(&config.backend_url, config.backend_timeout)?;
    info!(endpoint = %backend.endpoint(), "Using analysis backend");

    let app_state = AppState::new(Arc::new(backend), config.backend_url.clone());
    spawn_session_sweeper(app_state.session_storage.clone(), config.session_ttl);

    Ok(build_router(app_state))
}

fn sweep_interval(ttl: Duration) -> Duration {
    (ttl / 4).clamp(Duration::from_secs(1), Duration::from_secs(300))
}

/// Periodically drops view sessions idle for longer than `ttl`.
pub fn spawn_session_sweeper(
    storage: Arc<dyn SessionStorage>,
    ttl: Duration,
) -> JoinHandle<()> {
    let max_idle = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
    let mut ticker = tokio::time::interval(sweep_interval(ttl));

    tokio::spawn(async move {
        loop {
            ticker.tick().await;
            match storage.evict_idle(max_idle).await {
                Ok(0) => {}
                Ok(evicted) => debug!(evicted, "Evicted idle view sessions"),
                Err(e) => error!("Session sweep failed: {}", e),
            }
        }
    })
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/api/analyze", post(analyze))
        .route("/api/view", post(analyze_view))
        .route("/sessions", post(create_session))
        .route(
            "/sessions/{session_id}",
            get(get_session).delete(delete_session),
        )
        .route("/sessions/{session_id}/submit", post(submit_session))
        .route("/sessions/{session_id}/reset", post(reset_session))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(correlation_id_middleware))
        .with_state(app_state)
}

/// Runs every request inside a span carrying a fresh correlation id, echoed back in the
/// response headers.
async fn correlation_id_middleware(mut request: Request, next: Next) -> Response {
    let correlation_id = Uuid::new_v4().to_string();
    let header = HeaderValue::from_str(&correlation_id).ok();

    if let Some(value) = &header {
        request.headers_mut().insert(CORRELATION_HEADER, value.clone());
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    let mut response = next.run(request).instrument(span).await;

    if let Some(value) = header {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }
    response
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Off-label Drug Use Analysis Service",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Proxy and result views for staged off-label drug use analysis",
        "endpoints": {
            "POST /api/analyze": "Analyse a drug and disease pair",
            "POST /api/view": "Analyse and return the assembled result view",
            "POST /sessions": "Create a view session",
            "GET /sessions/{session_id}": "Get the current view of a session",
            "POST /sessions/{session_id}/submit": "Submit the form of a session",
            "POST /sessions/{session_id}/reset": "Reset a session to idle",
            "DELETE /sessions/{session_id}": "Drop a session",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "backend_url": state.backend_url
    }))
}

async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> ApiResult<AnalyzeResponse> {
    let Json(request) = payload.map_err(|rejection| unreadable_body(&rejection))?;
    info!(
        drug = ?request.drug_name,
        disease = ?request.disease_name,
        "Received analysis request"
    );

    let reply = offlabel_view::analyze(state.backend.as_ref(), &request)
        .await
        .map_err(|e| {
            error!(status = e.status_code(), error = %e, "Analysis request failed");
            analysis_error(&e)
        })?;

    Ok(Json(AnalyzeResponse {
        success: true,
        data: reply.data,
        timestamp: reply
            .timestamp
            .unwrap_or_else(|| chrono::Utc::now().to_rfc3339()),
    }))
}

async fn analyze_view(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> ApiResult<ResultView> {
    let Json(request) = payload.map_err(|rejection| unreadable_body(&rejection))?;
    info!(
        drug = ?request.drug_name,
        disease = ?request.disease_name,
        "Received view request"
    );

    let reply = offlabel_view::analyze(state.backend.as_ref(), &request)
        .await
        .map_err(|e| analysis_error(&e))?;

    Ok(Json(assemble_result(&reply.data)))
}

async fn create_session(State(state): State<AppState>) -> ApiResult<SessionCreated> {
    let session = state.session_storage.create().await.map_err(|e| {
        error!("Failed to create session: {}", e);
        view_error(&e)
    })?;
    info!(session_id = %session.id, "View session created");

    Ok(Json(SessionCreated {
        session_id: session.id.clone(),
        view: assemble_view(&session),
    }))
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<ViewModel> {
    match state.session_storage.get(&session_id).await {
        Ok(Some(session)) => Ok(Json(assemble_view(&session))),
        Ok(None) => Err(view_error(&ViewError::SessionNotFound(session_id))),
        Err(e) => Err(view_error(&e)),
    }
}

async fn submit_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> ApiResult<ViewModel> {
    let Json(request) = payload.map_err(|rejection| unreadable_body(&rejection))?;

    let session = state
        .runner
        .submit(&session_id, request)
        .await
        .map_err(|e| view_error(&e))?;

    Ok(Json(assemble_view(&session)))
}

async fn reset_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<ViewModel> {
    let session = state.runner.reset(&session_id).await.map_err(|e| {
        warn!(session_id = %session_id, "Reset rejected: {}", e);
        view_error(&e)
    })?;

    Ok(Json(assemble_view(&session)))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionDeleted> {
    let exists = state
        .session_storage
        .get(&session_id)
        .await
        .map_err(|e| view_error(&e))?
        .is_some();
    if !exists {
        return Err(view_error(&ViewError::SessionNotFound(session_id)));
    }

    state
        .session_storage
        .delete(&session_id)
        .await
        .map_err(|e| view_error(&e))?;
    info!(session_id = %session_id, "View session deleted");

    Ok(Json(SessionDeleted {
        session_id,
        deleted: true,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Method, Request},
    };
    use http_body_util::BodyExt;
    use offlabel_view::{AnalysisRequest, AnalysisResult, BackendReply, FormFields};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    const RESULT: &str = r#"{
        "entity_recognition": {
            "drug": {"name": "阿司匹林", "categories": [], "indications": []},
            "disease": {"name": "心力衰竭", "confidence_score": 0.9}
        },
        "final_result": {
            "final_judgment": {
                "category": "谨慎超适应症使用",
                "confidence": 0.6,
                "explanation": "证据有限",
                "recommendation": "密切监测"
            },
            "summary": {
                "indication_match": {"confidence": 0.4, "result": "部分匹配", "notes": ""},
                "similarity_score": 0.6,
                "evidence_strength": 0.5,
                "benefit_risk_ratio": 0.55
            }
        }
    }"#;

    /// Mock backend keyed on the drug name.
    struct ScriptedBackend {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AnalysisBackend for ScriptedBackend {
        async fn analyze(&self, request: &AnalysisRequest) -> Result<BackendReply, AnalysisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match request.prescription.drug_name.as_str() {
                "unavailable" => Err(AnalysisError::Backend {
                    status: 503,
                    message: "知识库不可用".to_string(),
                }),
                "offline" => Err(AnalysisError::Transport("connection refused".to_string())),
                _ => {
                    let data: AnalysisResult = serde_json::from_str(RESULT).unwrap();
                    Ok(BackendReply {
                        data,
                        timestamp: Some("2025-03-01T10:00:00".to_string()),
                    })
                }
            }
        }
    }

    fn test_state() -> (AppState, Arc<ScriptedBackend>) {
        let backend = Arc::new(ScriptedBackend {
            calls: AtomicUsize::new(0),
        });
        (AppState::new(backend.clone(), "http://backend.test"), backend)
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(body) => {
                builder = builder.header("content-type", "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn health_reports_backend_url() {
        let (state, _) = test_state();
        let app = build_router(state);

        let (status, body) = send(&app, Method::GET, "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["backend_url"], "http://backend.test");
    }

    #[tokio::test]
    async fn responses_carry_correlation_id() {
        let (state, _) = test_state();
        let app = build_router(state);

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(response.headers().contains_key(CORRELATION_HEADER));
    }

    #[tokio::test]
    async fn empty_drug_name_is_rejected_without_backend_call() {
        let (state, backend) = test_state();
        let app = build_router(state);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/analyze",
            Some(json!({ "drug_name": "", "disease_name": "x" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "药品名称和疾病名称不能为空");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_fields_are_a_validation_failure() {
        let (state, _) = test_state();
        let app = build_router(state);

        let (status, _) = send(&app, Method::POST, "/api/analyze", Some(json!({}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn successful_analysis_is_enveloped() {
        let (state, backend) = test_state();
        let app = build_router(state);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/analyze",
            Some(json!({ "drug_name": "阿司匹林", "disease_name": "心力衰竭" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["timestamp"], "2025-03-01T10:00:00");
        assert_eq!(body["data"]["entity_recognition"]["drug"]["name"], "阿司匹林");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn backend_status_is_passed_through() {
        let (state, _) = test_state();
        let app = build_router(state);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/analyze",
            Some(json!({ "drug_name": "unavailable", "disease_name": "心力衰竭" })),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "知识库不可用");
    }

    #[tokio::test]
    async fn transport_failure_is_internal_error() {
        let (state, _) = test_state();
        let app = build_router(state);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/analyze",
            Some(json!({ "drug_name": "offline", "disease_name": "心力衰竭" })),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "服务器内部错误");
    }

    #[tokio::test]
    async fn malformed_json_is_internal_error() {
        let (state, _) = test_state();
        let app = build_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/analyze")
                    .header("content-type", "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn view_endpoint_returns_ordered_stages() {
        let (state, _) = test_state();
        let app = build_router(state);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/view",
            Some(json!({ "drug_name": "阿司匹林", "disease_name": "心力衰竭" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let stages = body["stages"].as_array().unwrap();
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0]["stage"], "entity_recognition");
        assert_eq!(stages[1]["stage"], "final_result");
        assert!(body.get("session").is_none());
    }

    #[tokio::test]
    async fn session_lifecycle() {
        let (state, _) = test_state();
        let app = build_router(state);

        let (status, created) = send(&app, Method::POST, "/sessions", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["view"]["state"], "idle");
        assert_eq!(created["view"]["show_footer"], true);
        let id = created["session_id"].as_str().unwrap().to_string();

        let (status, view) = send(
            &app,
            Method::POST,
            &format!("/sessions/{}/submit", id),
            Some(json!({
                "drug_name": "阿司匹林",
                "disease_name": "心力衰竭",
                "description": "NYHA II级"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["state"], "success");
        assert_eq!(view["show_footer"], false);
        assert_eq!(view["form"]["description"], "NYHA II级");
        assert_eq!(view["stages"].as_array().unwrap().len(), 2);

        let (_, fetched) = send(&app, Method::GET, &format!("/sessions/{}", id), None).await;
        assert_eq!(fetched, view);

        let (status, reset) =
            send(&app, Method::POST, &format!("/sessions/{}/reset", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reset["state"], "idle");
        assert!(reset["stages"].as_array().unwrap().is_empty());

        let (status, _) = send(&app, Method::DELETE, &format!("/sessions/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, Method::GET, &format!("/sessions/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn failed_submission_shows_error_view() {
        let (state, _) = test_state();
        let app = build_router(state);
        let (_, created) = send(&app, Method::POST, "/sessions", None).await;
        let id = created["session_id"].as_str().unwrap();

        let (status, view) = send(
            &app,
            Method::POST,
            &format!("/sessions/{}/submit", id),
            Some(json!({ "drug_name": "offline", "disease_name": "心力衰竭" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["state"], "error");
        assert_eq!(view["error"], "服务器内部错误");
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let (state, _) = test_state();
        let app = build_router(state);

        let (status, body) = send(
            &app,
            Method::POST,
            "/sessions/missing/submit",
            Some(json!({ "drug_name": "a", "disease_name": "b" })),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["session_id"], "missing");

        let (status, _) = send(&app, Method::DELETE, "/sessions/missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn sweep_interval_is_bounded() {
        assert_eq!(sweep_interval(Duration::ZERO), Duration::from_secs(1));
        assert_eq!(sweep_interval(Duration::from_secs(400)), Duration::from_secs(100));
        assert_eq!(sweep_interval(Duration::from_secs(3600)), Duration::from_secs(300));
    }

    #[tokio::test]
    async fn sweeper_drops_expired_sessions() {
        let (state, _) = test_state();
        let storage = state.session_storage.clone();
        let session = storage.create().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let sweeper = spawn_session_sweeper(storage.clone(), Duration::ZERO);
        for _ in 0..100 {
            if storage.get(&session.id).await.unwrap().is_none() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        sweeper.abort();

        assert!(storage.get(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reset_while_loading_conflicts() {
        let (state, _) = test_state();
        let storage = state.session_storage.clone();
        let app = build_router(state);
        let session = storage.create().await.unwrap();
        storage
            .begin_submission(&session.id, FormFields::default())
            .await
            .unwrap();

        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/sessions/{}/reset", session.id),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        let (_, view) = send(&app, Method::GET, &format!("/sessions/{}", session.id), None).await;
        assert_eq!(view["state"], "loading");
    }
}
