use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hadal_engine::{Category, QuizSession, TierId, UserProgress, Word};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    models::{AudioCacheStats, CachedAudio, CategorySummary, WordFilter},
    repositories::{audio, progress, quiz, word},
    store::{AudioCacheStore, ProgressStore, QuizStore, Store, StoreError, WordStore},
};

/// PostgreSQL backed store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn tier_from_column(value: i64) -> Option<TierId> {
    TierId::try_from(value).ok()
}

#[async_trait]
impl WordStore for PgStore {
    async fn count_words(&self) -> Result<u64, StoreError> {
        let count = word::count(&self.pool).await?;
        Ok(count.max(0).unsigned_abs())
    }

    async fn insert_words(&self, words: &[Word]) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let start = word::max_position(&mut *tx).await?;

        let mut inserted = 0;
        for (offset, entry) in (1_i64..).zip(words) {
            if word::insert(&mut *tx, start + offset, entry).await? {
                inserted += 1;
            }
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn find_word(&self, id: &str) -> Result<Option<Word>, StoreError> {
        Ok(word::find_by_id(&self.pool, id).await?)
    }

    async fn find_words(&self, filter: &WordFilter) -> Result<Vec<Word>, StoreError> {
        Ok(word::list(
            &self.pool,
            filter.tier.map(i64::from),
            filter.category.map(Category::as_str),
            filter.limit.map(i64::from),
        )
        .await?)
    }

    async fn find_words_by_ids(&self, ids: &[String]) -> Result<Vec<Word>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(word::list_by_ids(&self.pool, ids).await?)
    }

    async fn search_words(&self, query: &str, limit: u32) -> Result<Vec<Word>, StoreError> {
        Ok(word::search(&self.pool, query.trim(), i64::from(limit)).await?)
    }

    async fn category_summaries(&self) -> Result<Vec<CategorySummary>, StoreError> {
        let rows = word::category_counts(&self.pool).await?;

        Ok(rows
            .into_iter()
            .filter_map(|(category, count, tiers)| {
                Some(CategorySummary {
                    category: category.parse().ok()?,
                    word_count: count.max(0).unsigned_abs(),
                    tiers: tiers.into_iter().filter_map(tier_from_column).collect(),
                })
            })
            .collect())
    }

    async fn count_words_by_tier(&self) -> Result<BTreeMap<TierId, u64>, StoreError> {
        let rows = word::tier_counts(&self.pool).await?;

        Ok(rows
            .into_iter()
            .filter_map(|(tier, count)| Some((tier_from_column(tier)?, count.max(0).unsigned_abs())))
            .collect())
    }
}

#[async_trait]
impl ProgressStore for PgStore {
    async fn find_progress(&self, user_id: &str) -> Result<Option<UserProgress>, StoreError> {
        Ok(progress::find(&self.pool, user_id).await?)
    }

    async fn insert_progress(&self, record: &UserProgress) -> Result<UserProgress, StoreError> {
        progress::insert_if_absent(&self.pool, record).await?;
        progress::find(&self.pool, &record.user_id)
            .await?
            .ok_or_else(|| StoreError::Missing(format!("progress for {}", record.user_id)))
    }

    async fn save_progress(&self, record: &UserProgress) -> Result<(), StoreError> {
        if progress::update(&self.pool, record).await? {
            Ok(())
        } else {
            Err(StoreError::Missing(format!("progress for {}", record.user_id)))
        }
    }
}

#[async_trait]
impl QuizStore for PgStore {
    async fn insert_session(&self, session: &QuizSession) -> Result<(), StoreError> {
        Ok(quiz::insert(&self.pool, session).await?)
    }

    async fn find_session(&self, id: Uuid) -> Result<Option<QuizSession>, StoreError> {
        Ok(quiz::find(&self.pool, id).await?)
    }

    async fn save_session(&self, session: &QuizSession) -> Result<(), StoreError> {
        if quiz::update(&self.pool, session).await? {
            Ok(())
        } else {
            Err(StoreError::Missing(format!("quiz {}", session.id)))
        }
    }

    async fn completed_sessions(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<QuizSession>, StoreError> {
        Ok(quiz::list_completed_for_user(&self.pool, user_id, i64::from(limit)).await?)
    }
}

#[async_trait]
impl AudioCacheStore for PgStore {
    async fn find_audio(&self, cache_key: &str) -> Result<Option<CachedAudio>, StoreError> {
        Ok(audio::touch(&self.pool, cache_key).await?)
    }

    async fn audio_exists(&self, cache_key: &str) -> Result<bool, StoreError> {
        Ok(audio::exists(&self.pool, cache_key).await?)
    }

    async fn upsert_audio(&self, clip: &CachedAudio) -> Result<(), StoreError> {
        Ok(audio::upsert(&self.pool, clip).await?)
    }

    async fn audio_stats(&self) -> Result<AudioCacheStats, StoreError> {
        let (total_cached_items, total_access_count, average_access_count) =
            audio::totals(&self.pool).await?;
        let speed_distribution = audio::speed_distribution(&self.pool).await?;

        Ok(AudioCacheStats {
            total_cached_items,
            total_access_count,
            average_access_count,
            speed_distribution,
        })
    }

    async fn clear_audio(&self) -> Result<u64, StoreError> {
        Ok(audio::delete_all(&self.pool).await?)
    }

    async fn purge_audio_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        Ok(audio::delete_created_before(&self.pool, cutoff).await?)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
