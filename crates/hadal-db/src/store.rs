//! Storage seams used by the API services.
//!
//! The engine and quiz services only ever talk to these traits. Two
//! implementations exist: [`crate::PgStore`] for PostgreSQL and
//! [`crate::MemoryStore`] for tests and local runs without a database.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hadal_engine::{QuizSession, TierId, UserProgress, Word};
use uuid::Uuid;

use crate::models::{AudioCacheStats, CachedAudio, CategorySummary, WordFilter};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored document could not be decoded: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("{0} does not exist")]
    Missing(String),
}

#[async_trait]
pub trait WordStore: Send + Sync {
    async fn count_words(&self) -> Result<u64, StoreError>;

    /// Insert words in the given order. Existing ids are left alone.
    /// Returns how many rows were added.
    async fn insert_words(&self, words: &[Word]) -> Result<u64, StoreError>;

    async fn find_word(&self, id: &str) -> Result<Option<Word>, StoreError>;

    async fn find_words(&self, filter: &WordFilter) -> Result<Vec<Word>, StoreError>;

    /// Words whose id is in `ids`, in catalogue order. Unknown ids are skipped.
    async fn find_words_by_ids(&self, ids: &[String]) -> Result<Vec<Word>, StoreError>;

    async fn all_words(&self) -> Result<Vec<Word>, StoreError> {
        self.find_words(&WordFilter::default()).await
    }

    async fn search_words(&self, query: &str, limit: u32) -> Result<Vec<Word>, StoreError>;

    async fn category_summaries(&self) -> Result<Vec<CategorySummary>, StoreError>;

    async fn count_words_by_tier(&self) -> Result<BTreeMap<TierId, u64>, StoreError>;
}

#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn find_progress(&self, user_id: &str) -> Result<Option<UserProgress>, StoreError>;

    /// Insert `progress` unless the user already has a record. Returns the
    /// record that is stored afterwards.
    async fn insert_progress(&self, progress: &UserProgress) -> Result<UserProgress, StoreError>;

    /// Replace an existing record.
    async fn save_progress(&self, progress: &UserProgress) -> Result<(), StoreError>;
}

#[async_trait]
pub trait QuizStore: Send + Sync {
    async fn insert_session(&self, session: &QuizSession) -> Result<(), StoreError>;

    async fn find_session(&self, id: Uuid) -> Result<Option<QuizSession>, StoreError>;

    /// Replace an existing session.
    async fn save_session(&self, session: &QuizSession) -> Result<(), StoreError>;

    /// Completed sessions of `user_id`, most recently completed first.
    async fn completed_sessions(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<QuizSession>, StoreError>;
}

#[async_trait]
pub trait AudioCacheStore: Send + Sync {
    /// Look up a clip and count the access.
    async fn find_audio(&self, cache_key: &str) -> Result<Option<CachedAudio>, StoreError>;

    /// Presence check that does not count as an access.
    async fn audio_exists(&self, cache_key: &str) -> Result<bool, StoreError>;

    /// Insert or overwrite a clip.
    async fn upsert_audio(&self, audio: &CachedAudio) -> Result<(), StoreError>;

    async fn audio_stats(&self) -> Result<AudioCacheStats, StoreError>;

    /// Remove every clip. Returns the number removed.
    async fn clear_audio(&self) -> Result<u64, StoreError>;

    /// Remove clips created before `cutoff`. Returns the number removed.
    async fn purge_audio_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// Everything the API needs from persistence.
#[async_trait]
pub trait Store: WordStore + ProgressStore + QuizStore + AudioCacheStore {
    /// Cheap round trip used by the readiness probe.
    async fn ping(&self) -> Result<(), StoreError>;
}

pub type SharedStore = Arc<dyn Store>;
