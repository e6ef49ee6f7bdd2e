//! Applies learning events to stored progress records.
//!
//! Every update of one learner runs under that learner's lock: load, apply
//! the ordered events to a working copy, persist. A failing event leaves the
//! stored record untouched.

use std::sync::Arc;

use chrono::Utc;
use hadal_db::SharedStore;
use hadal_engine::{
    Catalogue, EventOutcome, ProgressEvent, ProgressUpdate, TierId, UserProgress, Word,
    badge::{BadgeBoard, badge_board},
    quiz::QuizHistoryEntry,
    stats::{UserStats, user_stats},
};
use serde::Serialize;

use crate::{error::ApiError, locks::KeyedLocks, metrics};

/// Result of applying a batch of events. Serializes as the updated record
/// with the outcome under `outcome`.
#[derive(Debug, Clone, Serialize)]
pub struct AppliedUpdate {
    #[serde(flatten)]
    pub progress: UserProgress,
    pub outcome: EventOutcome,
}

/// Reads and updates learner records, one learner at a time.
pub struct ProgressEngine {
    store: SharedStore,
    catalogue: Arc<Catalogue>,
    locks: KeyedLocks,
}

impl ProgressEngine {
    pub fn new(store: SharedStore, catalogue: Arc<Catalogue>) -> Self {
        Self {
            store,
            catalogue,
            locks: KeyedLocks::new(),
        }
    }

    /// The stored record, or `NotFound`.
    pub async fn get(&self, user_id: &str) -> Result<UserProgress, ApiError> {
        self.store
            .find_progress(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Progress for user {user_id} not found")))
    }

    /// Return the learner's record, creating a fresh one on first contact.
    pub async fn get_or_create(&self, user_id: &str) -> Result<UserProgress, ApiError> {
        let progress = self
            .store
            .insert_progress(&UserProgress::new(user_id, Utc::now()))
            .await?;

        tracing::debug!(user_id, "Progress loaded or created");
        Ok(progress)
    }

    /// Validate a request body and apply the events it describes.
    pub async fn update(
        &self,
        user_id: &str,
        update: ProgressUpdate,
    ) -> Result<AppliedUpdate, ApiError> {
        let events = update.into_events()?;
        self.apply(user_id, &events).await
    }

    /// Apply `events` in order as one unit.
    pub async fn apply(
        &self,
        user_id: &str,
        events: &[ProgressEvent],
    ) -> Result<AppliedUpdate, ApiError> {
        self.ensure_words_exist(events).await?;

        let _guard = self.locks.lock(user_id).await;

        let mut progress = self.get(user_id).await?;
        let outcome = progress.apply_all(events, &self.catalogue, Utc::now())?;
        self.store.save_progress(&progress).await?;

        let kinds: Vec<&'static str> = events.iter().map(ProgressEvent::kind).collect();
        metrics::record_progress_update(&kinds, outcome.points_added, outcome.tiers_unlocked.len());
        for badge in &outcome.badges_awarded {
            metrics::record_badge_awarded(badge);
        }

        tracing::info!(
            user_id,
            events = ?kinds,
            points_added = outcome.points_added,
            badges = ?outcome.badges_awarded,
            tiers_unlocked = ?outcome.tiers_unlocked,
            "Progress updated"
        );

        Ok(AppliedUpdate { progress, outcome })
    }

    /// Record that the learner accepted the cultural guidelines of `tier_id`.
    pub async fn acknowledge(&self, user_id: &str, tier_id: TierId) -> Result<AppliedUpdate, ApiError> {
        self.apply(user_id, &[ProgressEvent::CulturalAcknowledged { tier_id }])
            .await
    }

    async fn ensure_words_exist(&self, events: &[ProgressEvent]) -> Result<(), ApiError> {
        for event in events {
            let word_id = match event {
                ProgressEvent::WordCompleted { word_id, .. }
                | ProgressEvent::FavoriteToggled { word_id } => word_id,
                _ => continue,
            };

            if self.store.find_word(word_id).await?.is_none() {
                return Err(ApiError::NotFound(format!("Word {word_id} not found")));
            }
        }
        Ok(())
    }

    /// Statistics over the completed words.
    pub async fn stats(&self, user_id: &str) -> Result<UserStats, ApiError> {
        let progress = self.get(user_id).await?;
        let words = self
            .store
            .find_words_by_ids(&progress.completed_words)
            .await?;

        Ok(user_stats(&progress, &words))
    }

    /// Favorite words with their full details, in catalogue order.
    pub async fn favorites(&self, user_id: &str) -> Result<Vec<Word>, ApiError> {
        let progress = self.get(user_id).await?;
        Ok(self.store.find_words_by_ids(&progress.favorites).await?)
    }

    /// Earned and available badges.
    pub async fn badges(&self, user_id: &str) -> Result<BadgeBoard, ApiError> {
        let progress = self.get(user_id).await?;
        Ok(badge_board(&progress))
    }

    /// Completed quizzes of the learner, newest first.
    pub async fn quiz_history(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<QuizHistoryEntry>, ApiError> {
        self.get(user_id).await?;

        let sessions = self.store.completed_sessions(user_id, limit).await?;
        Ok(sessions.iter().filter_map(|s| s.history_entry()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hadal_db::{MemoryStore, WordStore};

    async fn engine() -> ProgressEngine {
        let catalogue = Arc::new(Catalogue::standard().unwrap());
        let store = Arc::new(MemoryStore::default());
        store
            .insert_words(&catalogue.vocabulary(Utc::now()).unwrap())
            .await
            .unwrap();

        ProgressEngine::new(store, catalogue)
    }

    fn complete(word_id: &str, points: u32) -> ProgressEvent {
        ProgressEvent::WordCompleted {
            word_id: word_id.to_string(),
            points_earned: points,
        }
    }

    #[tokio::test]
    async fn test_apply_requires_existing_progress() {
        let engine = engine().await;

        let err = engine.apply("amina", &[complete("word_1", 10)]).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_apply_rejects_unknown_word() {
        let engine = engine().await;
        engine.get_or_create("amina").await.unwrap();

        let err = engine
            .apply("amina", &[complete("word_999", 10)])
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(ref msg) if msg.contains("word_999")));
    }

    #[tokio::test]
    async fn test_failed_batch_is_not_persisted() {
        let engine = engine().await;
        engine.get_or_create("amina").await.unwrap();

        // Tier 1 has no cultural guidelines, so the whole batch fails
        let err = engine
            .apply(
                "amina",
                &[
                    complete("word_1", 10),
                    ProgressEvent::CulturalAcknowledged { tier_id: 1 },
                ],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidState(_)));

        let stored = engine.get("amina").await.unwrap();
        assert!(stored.completed_words.is_empty());
        assert_eq!(stored.total_points, 0);
    }

    #[tokio::test]
    async fn test_concurrent_updates_are_not_lost() {
        let engine = Arc::new(engine().await);
        engine.get_or_create("amina").await.unwrap();

        let mut handles = Vec::new();
        for n in 1..=8 {
            let engine = Arc::clone(&engine);
            handles.push(tokio::spawn(async move {
                engine
                    .apply("amina", &[complete(&format!("word_{n}"), 5)])
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let stored = engine.get("amina").await.unwrap();
        assert_eq!(stored.completed_words.len(), 8);
        assert_eq!(stored.total_points, 40);
    }

    #[tokio::test]
    async fn test_get_or_create_keeps_existing_record() {
        let engine = engine().await;
        engine.get_or_create("amina").await.unwrap();
        engine.apply("amina", &[complete("word_1", 10)]).await.unwrap();

        let again = engine.get_or_create("amina").await.unwrap();
        assert_eq!(again.total_points, 10);
    }
}
