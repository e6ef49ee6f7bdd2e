use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
    response::IntoResponse,
    routing::{get, post},
};
use hadal_db::WordFilter;
use hadal_engine::{Tier, TierId, unlock::check_unlock};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{ApiState, error::ApiError};

/// Words shown as a preview on the tier detail page.
const SAMPLE_WORD_COUNT: usize = 3;

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/tiers", get(list_tiers))
        .route("/tiers/{tier_id}", get(get_tier))
        .route("/tiers/check-unlock/{tier_id}", get(check_tier_unlock))
        .route(
            "/tiers/{tier_id}/cultural-acknowledge",
            post(acknowledge_guidelines),
        )
        .route("/cultural-guidelines/{tier_id}", get(get_guidelines))
}

#[derive(Serialize)]
struct TierSummary<'a> {
    #[serde(flatten)]
    tier: &'a Tier,
    actual_word_count: u64,
}

/// Tier ladder with the number of words actually stored per tier
async fn list_tiers(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let counts = state.store.count_words_by_tier().await?;

    let tiers: Vec<TierSummary<'_>> = state
        .catalogue
        .tiers()
        .iter()
        .map(|tier| TierSummary {
            tier,
            actual_word_count: counts.get(&tier.id).copied().unwrap_or(0),
        })
        .collect();

    Ok(Json(json!({
        "total_tiers": tiers.len(),
        "tiers": tiers,
    })))
}

async fn get_tier(
    State(state): State<ApiState>,
    tier_id: Result<Path<TierId>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(tier_id) = tier_id?;
    let tier = state.catalogue.require_tier(tier_id)?;

    let words = state
        .store
        .find_words(&WordFilter {
            tier: Some(tier_id),
            ..WordFilter::default()
        })
        .await?;

    let mut category_breakdown: BTreeMap<&str, u32> = BTreeMap::new();
    let mut difficulty_breakdown: BTreeMap<&str, u32> = BTreeMap::new();
    for word in &words {
        *category_breakdown.entry(word.category.as_str()).or_default() += 1;
        *difficulty_breakdown
            .entry(word.difficulty.as_str())
            .or_default() += 1;
    }

    Ok(Json(json!({
        "tier": tier,
        "word_count": words.len(),
        "category_breakdown": category_breakdown,
        "difficulty_breakdown": difficulty_breakdown,
        "cultural_sensitivity": tier.cultural_guidelines,
        "sample_words": words.iter().take(SAMPLE_WORD_COUNT).collect::<Vec<_>>(),
    })))
}

#[derive(Debug, Deserialize)]
struct UserQuery {
    #[serde(alias = "userId")]
    user_id: String,
}

/// Read-only: reports every unmet requirement without changing anything
async fn check_tier_unlock(
    State(state): State<ApiState>,
    tier_id: Result<Path<TierId>, PathRejection>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(tier_id) = tier_id?;
    let Query(query) = query?;

    let tier = state.catalogue.require_tier(tier_id)?;
    let progress = state.progress.get(&query.user_id).await?;

    Ok(Json(check_unlock(&progress, tier)))
}

async fn acknowledge_guidelines(
    State(state): State<ApiState>,
    tier_id: Result<Path<TierId>, PathRejection>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(tier_id) = tier_id?;
    let Query(query) = query?;

    let tier = state.catalogue.require_tier(tier_id)?;
    let applied = state.progress.acknowledge(&query.user_id, tier_id).await?;
    let check = check_unlock(&applied.progress, tier);

    Ok(Json(json!({
        "tier_id": tier_id,
        "acknowledged": true,
        "can_now_unlock": check.can_unlock,
        "tier_unlocked": applied.progress.is_unlocked(tier_id),
        "newly_unlocked": applied.outcome.tiers_unlocked.contains(&tier_id),
        "cultural_message": tier.cultural_guidelines,
    })))
}

async fn get_guidelines(
    State(state): State<ApiState>,
    tier_id: Result<Path<TierId>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(tier_id) = tier_id?;

    let guidelines = state
        .catalogue
        .tier(tier_id)
        .and_then(|t| t.cultural_guidelines.as_ref())
        .ok_or_else(|| {
            ApiError::NotFound(format!("No cultural guidelines for tier {tier_id}"))
        })?;

    Ok(Json(json!({
        "tier_id": tier_id,
        "guidelines": guidelines,
    })))
}
