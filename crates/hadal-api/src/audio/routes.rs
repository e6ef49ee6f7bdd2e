use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::{ApiState, error::ApiError, validation::validate_body};

const fn default_speed() -> f64 {
    1.0
}

#[derive(Debug, Deserialize, Validate)]
struct SynthesizeRequest {
    #[validate(length(min = 1, max = 500, message = "text must be 1 to 500 characters"))]
    text: String,
    #[serde(default = "default_speed")]
    #[validate(range(min = 0.25, max = 4.0, message = "speed must be between 0.25 and 4.0"))]
    speed: f64,
}

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/audio/synthesize", post(synthesize))
        .route("/audio/cache-stats", get(cache_stats))
        .route("/audio/cache", delete(clear_cache))
        .route("/audio/pregenerate", post(pregenerate))
}

async fn synthesize(
    State(state): State<ApiState>,
    body: Result<Json<SynthesizeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body?;
    validate_body(&request)?;

    let text = request.text.trim();
    if text.is_empty() {
        return Err(ApiError::Validation("text cannot be blank".to_string()));
    }

    let audio = state.audio.synthesize(text, request.speed).await?;
    Ok(Json(audio))
}

async fn cache_stats(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.audio.stats().await?))
}

async fn clear_cache(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let cleared = state.audio.clear().await?;

    Ok(Json(json!({
        "message": format!("Cleared {cleared} cached audio items"),
        "cleared_count": cleared,
    })))
}

async fn pregenerate(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.audio.pregenerate().await?))
}
