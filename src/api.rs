use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

use crate::{
    app_state::AppState,
    models::{Analysis, AnalysisDetail},
    pipeline::{AnalysisOutcome, AnalyzeError},
};

// --- Payloads y Respuestas de la API ---

#[derive(Deserialize)]
pub struct AnalyzePayload {
    video_url: Option<String>,
}

#[derive(Serialize)]
pub struct AnalyzeResponse {
    success: bool,
    #[serde(flatten)]
    outcome: AnalysisOutcome,
}

impl IntoResponse for AnalyzeError {
    fn into_response(self) -> Response {
        let status = match &self {
            AnalyzeError::InvalidInput(_) | AnalyzeError::EmptyResult => StatusCode::BAD_REQUEST,
            AnalyzeError::NotFound(_) => StatusCode::NOT_FOUND,
            AnalyzeError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            AnalyzeError::PersistenceFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

// --- Router ---

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/analyze", post(analyze_handler))
        .route("/api/recent-analyses", get(recent_analyses_handler))
        .route("/api/analyses/:id", get(analysis_detail_handler))
        .route("/api/health", get(health_handler))
        .route("/api/shutdown", post(shutdown_handler))
        .with_state(app_state)
}

// --- Handlers ---

#[axum::debug_handler]
async fn analyze_handler(
    State(state): State<AppState>,
    Json(payload): Json<AnalyzePayload>,
) -> Result<Json<AnalyzeResponse>, AnalyzeError> {
    let outcome = state.pipeline.analyze(payload.video_url.as_deref()).await?;
    Ok(Json(AnalyzeResponse {
        success: true,
        outcome,
    }))
}

#[axum::debug_handler]
async fn recent_analyses_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<Analysis>>, (StatusCode, Json<serde_json::Value>)> {
    match state.store.list_recent(state.config.recent_analyses_limit).await {
        Ok(analyses) => Ok(Json(analyses)),
        Err(e) => {
            error!("Error listando análisis recientes: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": format!("Error al listar los análisis: {}", e)})),
            ))
        }
    }
}

#[axum::debug_handler]
async fn analysis_detail_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<AnalysisDetail>, (StatusCode, Json<serde_json::Value>)> {
    match state.store.get_analysis(id).await {
        Ok(Some(detail)) => Ok(Json(detail)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(json!({"error": format!("No existe el análisis {}", id)})),
        )),
        Err(e) => {
            error!("Error leyendo el análisis {}: {}", id, e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": format!("Error al leer el análisis: {}", e)})),
            ))
        }
    }
}

#[axum::debug_handler]
async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let remote_classifier = state.pipeline.classifier().remote_enabled();
    let store = state.store.backend_name();

    match state.store.health_check().await {
        Ok(_) => Ok(Json(json!({
            "status": "ok",
            "store": store,
            "remote_classifier": remote_classifier,
        }))),
        Err(e) => {
            error!("Error en el health check del almacén ({}): {}", store, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

// --- Handler de Apagado ---

#[axum::debug_handler]
async fn shutdown_handler(
    State(state): State<AppState>,
) -> impl IntoResponse {
    info!("Petición de apagado recibida.");
    if let Some(sender) = state.shutdown_sender.lock().unwrap().take() {
        let _ = sender.send(());
    }
    StatusCode::OK
}
