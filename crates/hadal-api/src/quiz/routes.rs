use axum::{
    Json, Router,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use hadal_engine::AnswerSubmission;
use uuid::Uuid;

use super::service::GenerateQuiz;
use crate::{ApiState, error::ApiError, validation::validate_body};

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/quiz/generate", post(generate_quiz))
        .route("/quiz/{id}", get(get_quiz))
        .route("/quiz/{id}/answer", post(submit_answer))
        .route("/quiz/{id}/results", get(get_results))
}

async fn generate_quiz(
    State(state): State<ApiState>,
    body: Result<Json<GenerateQuiz>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body?;
    validate_body(&request)?;

    let session = state.quizzes.generate(request).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn get_quiz(
    State(state): State<ApiState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id?;

    let view = state.quizzes.view(id).await?;
    Ok(Json(view))
}

async fn submit_answer(
    State(state): State<ApiState>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<AnswerSubmission>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id?;
    let Json(submission) = body?;

    let outcome = state.quizzes.submit(id, submission).await?;
    Ok(Json(outcome))
}

async fn get_results(
    State(state): State<ApiState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id?;

    let results = state.quizzes.results(id).await?;
    Ok(Json(results))
}
