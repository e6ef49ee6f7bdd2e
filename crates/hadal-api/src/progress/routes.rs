use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection, rejection::QueryRejection},
    response::IntoResponse,
    routing::get,
};
use hadal_engine::ProgressUpdate;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::{
    ApiState,
    error::ApiError,
    validation::{validate_body, validate_user_id},
};

const DEFAULT_HISTORY_LIMIT: u32 = 20;

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route(
            "/progress/{user_id}",
            get(get_progress).post(create_progress).put(update_progress),
        )
        .route("/progress/{user_id}/stats", get(get_stats))
        .route("/progress/{user_id}/favorites", get(get_favorites))
        .route("/progress/{user_id}/badges", get(get_badges))
        .route("/progress/{user_id}/quiz-history", get(get_quiz_history))
}

async fn get_progress(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let progress = state.progress.get(&user_id).await?;
    Ok(Json(progress))
}

/// Get or create the learner's record
async fn create_progress(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    validate_user_id(&user_id)?;

    let progress = state.progress.get_or_create(&user_id).await?;
    Ok(Json(progress))
}

async fn update_progress(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
    body: Result<Json<ProgressUpdate>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(update) = body?;

    let applied = state.progress.update(&user_id, update).await?;
    Ok(Json(applied))
}

async fn get_stats(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = state.progress.stats(&user_id).await?;
    Ok(Json(stats))
}

async fn get_favorites(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let favorites = state.progress.favorites(&user_id).await?;

    Ok(Json(json!({
        "user_id": user_id,
        "favorite_count": favorites.len(),
        "favorites": favorites,
    })))
}

async fn get_badges(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let board = state.progress.badges(&user_id).await?;
    Ok(Json(board))
}

#[derive(Debug, Deserialize, Validate)]
struct HistoryQuery {
    #[validate(range(min = 1, max = 100))]
    limit: Option<u32>,
}

async fn get_quiz_history(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    validate_body(&query)?;

    let quizzes = state
        .progress
        .quiz_history(&user_id, query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT))
        .await?;

    Ok(Json(json!({
        "user_id": user_id,
        "quiz_count": quizzes.len(),
        "quizzes": quizzes,
    })))
}
