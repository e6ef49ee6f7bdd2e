use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use hadal_db::WordFilter;
use hadal_engine::{Category, TierId};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::{ApiState, error::ApiError, validation::validate_body};

const DEFAULT_WORD_LIMIT: u32 = 100;
const SEARCH_LIMIT: u32 = 50;

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/words", get(list_words))
        .route("/words/seed", post(seed_words))
        .route("/words/{id}", get(get_word))
        .route("/words/tier/{tier_id}", get(get_tier_words))
        .route("/words/category/{category}", get(get_category_words))
        .route("/categories", get(list_categories))
        .route("/search", get(search_words))
}

#[derive(Debug, Deserialize, Validate)]
struct WordQuery {
    tier: Option<TierId>,
    category: Option<String>,
    #[validate(range(min = 1, max = 1000))]
    limit: Option<u32>,
}

fn parse_category(raw: &str) -> Result<Category, ApiError> {
    Ok(raw.parse::<Category>()?)
}

/// List words in catalogue order, optionally filtered
async fn list_words(
    State(state): State<ApiState>,
    query: Result<Query<WordQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    validate_body(&query)?;

    let filter = WordFilter {
        tier: query.tier,
        category: query.category.as_deref().map(parse_category).transpose()?,
        limit: Some(query.limit.unwrap_or(DEFAULT_WORD_LIMIT)),
    };

    let words = state.store.find_words(&filter).await?;
    Ok(Json(words))
}

async fn get_word(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let word = state
        .store
        .find_word(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Word {id} not found")))?;

    Ok(Json(word))
}

/// Load the bundled vocabulary into an empty store
async fn seed_words(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let existing = state.store.count_words().await?;
    if existing > 0 {
        return Ok((
            StatusCode::OK,
            Json(json!({
                "message": format!("Database already contains {existing} words"),
                "seeded": false,
            })),
        ));
    }

    let vocabulary = state.catalogue.vocabulary(Utc::now())?;
    let inserted = state.store.insert_words(&vocabulary).await?;

    tracing::info!(inserted, "Seeded vocabulary");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("Successfully seeded {inserted} words"),
            "seeded": true,
            "word_count": inserted,
        })),
    ))
}

async fn get_tier_words(
    State(state): State<ApiState>,
    tier_id: Result<Path<TierId>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(tier_id) = tier_id?;
    state.catalogue.require_tier(tier_id)?;

    let words = state
        .store
        .find_words(&WordFilter {
            tier: Some(tier_id),
            ..WordFilter::default()
        })
        .await?;

    Ok(Json(json!({
        "tier": tier_id,
        "word_count": words.len(),
        "words": words,
    })))
}

#[derive(Debug, Deserialize)]
struct CategoryQuery {
    tier: Option<TierId>,
}

async fn get_category_words(
    State(state): State<ApiState>,
    Path(category): Path<String>,
    query: Result<Query<CategoryQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let category = parse_category(&category)?;

    let words = state
        .store
        .find_words(&WordFilter {
            tier: query.tier,
            category: Some(category),
            limit: None,
        })
        .await?;

    Ok(Json(json!({
        "category": category,
        "tier": query.tier,
        "word_count": words.len(),
        "words": words,
    })))
}

/// Categories that hold at least one word, with counts and tiers
async fn list_categories(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let summaries = state.store.category_summaries().await?;

    let categories: Vec<_> = summaries
        .into_iter()
        .map(|s| {
            json!({
                "category": s.category,
                "display_name": s.category.display_name(),
                "icon": s.category.icon(),
                "word_count": s.word_count,
                "tiers": s.tiers,
            })
        })
        .collect();

    Ok(Json(json!({ "categories": categories })))
}

#[derive(Debug, Deserialize, Validate)]
struct SearchQuery {
    #[validate(length(min = 1, max = 100))]
    q: String,
}

async fn search_words(
    State(state): State<ApiState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    validate_body(&query)?;

    let term = query.q.trim();
    if term.is_empty() {
        return Err(ApiError::Validation("q cannot be blank".to_string()));
    }

    let words = state.store.search_words(term, SEARCH_LIMIT).await?;

    Ok(Json(json!({
        "query": query.q,
        "results": words.len(),
        "words": words,
    })))
}
