use chrono::{DateTime, Utc};
use hadal_engine::{Category, TierId};
use serde::{Deserialize, Serialize};

/// Filter for word listings. Results keep catalogue order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordFilter {
    pub tier: Option<TierId>,
    pub category: Option<Category>,
    pub limit: Option<u32>,
}

/// Per-category aggregate over the stored words.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub category: Category,
    pub word_count: u64,
    /// Distinct tiers holding words of this category, ascending
    pub tiers: Vec<TierId>,
}

/// A synthesized clip stored in the audio cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CachedAudio {
    /// SHA-256 hex of the synthesis input
    pub cache_key: String,
    pub text: String,
    pub speed: f64,
    /// Base64 encoded MP3
    pub audio_content: String,
    pub duration_seconds: f64,
    pub access_count: i64,
    pub pregenerated: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct SpeedCount {
    pub speed: f64,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioCacheStats {
    pub total_cached_items: i64,
    pub total_access_count: i64,
    pub average_access_count: f64,
    /// Cached clips per speed, ascending by speed
    pub speed_distribution: Vec<SpeedCount>,
}
