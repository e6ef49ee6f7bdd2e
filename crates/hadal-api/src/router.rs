use axum::{
    Json, Router,
    extract::{Request, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde_json::json;

use crate::{
    audio, error::ApiError, middleware::RequestId, progress, quiz, state::ApiState, tiers, words,
};

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(ready))
        .merge(words::routes())
        .merge(progress::routes())
        .merge(quiz::routes())
        .merge(tiers::routes())
        .merge(audio::routes())
        .fallback(handler_404)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

/// Ready once the store answers
async fn ready(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    state.store.ping().await?;
    Ok(Json(json!({ "status": "ready" })))
}

async fn handler_404(req: Request) -> ApiError {
    if let Some(request_id) = req.extensions().get::<RequestId>() {
        tracing::debug!(
            %request_id,
            method = %req.method(),
            uri = %req.uri(),
            "No route matched"
        );
    }
    ApiError::NotFound("The requested resource was not found".to_string())
}
