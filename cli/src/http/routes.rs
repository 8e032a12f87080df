//! HTTP路由handlers

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    routing::{get, post},
    Json, Router,
};
use c3d_core::api::{import_local_stl, ExecutionOutcome};
use chrono::Local;
use std::path::Path;
use tower_http::services::ServeDir;

use crate::http::{
    models::*,
    state::AppState,
    validation::{validate_file_path, validate_render_request},
};

/// 创建所有路由
pub fn create_router(state: AppState) -> Router {
    let files = ServeDir::new(state.gateway.temp_root());

    let router = Router::new()
        .route("/render", post(render_handler))
        .route("/api/render", post(render_handler))
        .route("/health", get(health_handler))
        .route("/api/health", get(health_handler))
        .route("/api/load-stl", get(load_stl_handler))
        .nest_service("/files", files);

    let router = match state.frontend_dir.as_deref() {
        Some(dir) if dir.is_dir() => router.fallback_service(ServeDir::new(dir)),
        _ => router.fallback(frontend_missing_handler),
    };

    router.with_state(state)
}

/// POST /render - 执行脚本并返回生成的模型文件
async fn render_handler(
    State(state): State<AppState>,
    payload: Result<Json<RenderRequest>, JsonRejection>,
) -> Result<Json<RenderResponse>, HttpServerError> {
    state.record_request("/render");

    let result = render(&state, payload).await;
    if result.is_err() {
        state.record_error();
    }
    result
}

async fn render(
    state: &AppState,
    payload: Result<Json<RenderRequest>, JsonRejection>,
) -> Result<Json<RenderResponse>, HttpServerError> {
    let Json(req) = payload.map_err(|e| HttpServerError::InvalidRequest(e.body_text()))?;
    let req = validate_render_request(req)?;

    match state.gateway.execute(req).await? {
        ExecutionOutcome::Success(result) => Ok(Json(RenderResponse::from(result))),
        other => {
            tracing::info!(outcome = other.kind(), "render request did not produce a model");
            Err(HttpServerError::from_outcome(other).unwrap_or_else(|| {
                HttpServerError::Internal("unexpected execution outcome".to_string())
            }))
        }
    }
}

/// GET /api/load-stl?file_path= - 将本地STL复制到临时目录供前端加载
async fn load_stl_handler(
    State(state): State<AppState>,
    query: Result<Query<LoadStlQuery>, QueryRejection>,
) -> Result<Json<LoadStlResponse>, HttpServerError> {
    state.record_request("/api/load-stl");

    let result = load_stl(&state, query).await;
    if result.is_err() {
        state.record_error();
    }
    result
}

async fn load_stl(
    state: &AppState,
    query: Result<Query<LoadStlQuery>, QueryRejection>,
) -> Result<Json<LoadStlResponse>, HttpServerError> {
    let Query(q) = query.map_err(|e| HttpServerError::InvalidRequest(e.body_text()))?;
    validate_file_path(&q.file_path)?;

    let import =
        import_local_stl(Path::new(q.file_path.trim()), state.gateway.temp_root()).await?;
    Ok(Json(LoadStlResponse::from(import)))
}

/// GET /health - 健康检查
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let frontend_available = state.frontend_available();
    let stats = state.stats.read().unwrap_or_else(|e| e.into_inner());

    Json(HealthResponse {
        status: "healthy".into(),
        frontend_available,
        api_version: API_VERSION.into(),
        uptime_seconds: stats.uptime_seconds(),
        requests_handled: stats.requests_total,
        timestamp: Local::now().to_rfc3339(),
    })
}

async fn frontend_missing_handler() -> HttpServerError {
    HttpServerError::NotFound("Frontend not found".to_string())
}
