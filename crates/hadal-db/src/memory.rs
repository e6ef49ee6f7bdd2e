//! In-process store used by tests and by local runs without `DATABASE_URL`.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hadal_engine::{Category, QuizSession, TierId, UserProgress, Word};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    models::{AudioCacheStats, CachedAudio, CategorySummary, SpeedCount, WordFilter},
    store::{AudioCacheStore, ProgressStore, QuizStore, Store, StoreError, WordStore},
};

#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Insertion order is catalogue order
    words: RwLock<Vec<Word>>,
    progress: RwLock<HashMap<String, UserProgress>>,
    sessions: RwLock<HashMap<Uuid, QuizSession>>,
    audio: RwLock<HashMap<String, CachedAudio>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WordStore for MemoryStore {
    async fn count_words(&self) -> Result<u64, StoreError> {
        Ok(self.words.read().await.len() as u64)
    }

    async fn insert_words(&self, words: &[Word]) -> Result<u64, StoreError> {
        let mut stored = self.words.write().await;
        let mut inserted = 0;

        for word in words {
            if stored.iter().any(|w| w.id == word.id) {
                continue;
            }
            stored.push(word.clone());
            inserted += 1;
        }

        Ok(inserted)
    }

    async fn find_word(&self, id: &str) -> Result<Option<Word>, StoreError> {
        Ok(self.words.read().await.iter().find(|w| w.id == id).cloned())
    }

    async fn find_words(&self, filter: &WordFilter) -> Result<Vec<Word>, StoreError> {
        let limit = filter.limit.map_or(usize::MAX, |l| l as usize);

        Ok(self
            .words
            .read()
            .await
            .iter()
            .filter(|w| filter.tier.is_none_or(|t| w.tier == t))
            .filter(|w| filter.category.is_none_or(|c| w.category == c))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn find_words_by_ids(&self, ids: &[String]) -> Result<Vec<Word>, StoreError> {
        Ok(self
            .words
            .read()
            .await
            .iter()
            .filter(|w| ids.contains(&w.id))
            .cloned()
            .collect())
    }

    async fn search_words(&self, query: &str, limit: u32) -> Result<Vec<Word>, StoreError> {
        Ok(self
            .words
            .read()
            .await
            .iter()
            .filter(|w| w.matches_query(query))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn category_summaries(&self) -> Result<Vec<CategorySummary>, StoreError> {
        let words = self.words.read().await;
        let mut grouped: BTreeMap<&'static str, (Category, u64, BTreeSet<TierId>)> =
            BTreeMap::new();

        for word in words.iter() {
            let entry = grouped
                .entry(word.category.as_str())
                .or_insert_with(|| (word.category, 0, BTreeSet::new()));
            entry.1 += 1;
            entry.2.insert(word.tier);
        }

        Ok(grouped
            .into_values()
            .map(|(category, word_count, tiers)| CategorySummary {
                category,
                word_count,
                tiers: tiers.into_iter().collect(),
            })
            .collect())
    }

    async fn count_words_by_tier(&self) -> Result<BTreeMap<TierId, u64>, StoreError> {
        let mut counts = BTreeMap::new();
        for word in self.words.read().await.iter() {
            *counts.entry(word.tier).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn find_progress(&self, user_id: &str) -> Result<Option<UserProgress>, StoreError> {
        Ok(self.progress.read().await.get(user_id).cloned())
    }

    async fn insert_progress(&self, record: &UserProgress) -> Result<UserProgress, StoreError> {
        let mut progress = self.progress.write().await;
        let stored = progress
            .entry(record.user_id.clone())
            .or_insert_with(|| record.clone());
        Ok(stored.clone())
    }

    async fn save_progress(&self, record: &UserProgress) -> Result<(), StoreError> {
        let mut progress = self.progress.write().await;
        let stored = progress
            .get_mut(&record.user_id)
            .ok_or_else(|| StoreError::Missing(format!("progress for {}", record.user_id)))?;
        *stored = record.clone();
        Ok(())
    }
}

#[async_trait]
impl QuizStore for MemoryStore {
    async fn insert_session(&self, session: &QuizSession) -> Result<(), StoreError> {
        self.sessions
            .write()
            .await
            .insert(session.id, session.clone());
        Ok(())
    }

    async fn find_session(&self, id: Uuid) -> Result<Option<QuizSession>, StoreError> {
        Ok(self.sessions.read().await.get(&id).cloned())
    }

    async fn save_session(&self, session: &QuizSession) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        let stored = sessions
            .get_mut(&session.id)
            .ok_or_else(|| StoreError::Missing(format!("quiz {}", session.id)))?;
        *stored = session.clone();
        Ok(())
    }

    async fn completed_sessions(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<QuizSession>, StoreError> {
        let mut completed: Vec<QuizSession> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.user_id == user_id && s.is_completed())
            .cloned()
            .collect();

        completed.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        completed.truncate(limit as usize);
        Ok(completed)
    }
}

#[async_trait]
impl AudioCacheStore for MemoryStore {
    async fn find_audio(&self, cache_key: &str) -> Result<Option<CachedAudio>, StoreError> {
        let mut audio = self.audio.write().await;
        Ok(audio.get_mut(cache_key).map(|clip| {
            clip.access_count += 1;
            clip.clone()
        }))
    }

    async fn audio_exists(&self, cache_key: &str) -> Result<bool, StoreError> {
        Ok(self.audio.read().await.contains_key(cache_key))
    }

    async fn upsert_audio(&self, clip: &CachedAudio) -> Result<(), StoreError> {
        let mut audio = self.audio.write().await;
        match audio.get_mut(&clip.cache_key) {
            Some(existing) => {
                existing.audio_content.clone_from(&clip.audio_content);
                existing.duration_seconds = clip.duration_seconds;
            }
            None => {
                audio.insert(clip.cache_key.clone(), clip.clone());
            }
        }
        Ok(())
    }

    async fn audio_stats(&self) -> Result<AudioCacheStats, StoreError> {
        let audio = self.audio.read().await;

        let total_cached_items = audio.len() as i64;
        let total_access_count: i64 = audio.values().map(|c| c.access_count).sum();
        let average_access_count = if audio.is_empty() {
            0.0
        } else {
            total_access_count as f64 / total_cached_items as f64
        };

        let mut speed_distribution: Vec<SpeedCount> = Vec::new();
        for clip in audio.values() {
            match speed_distribution.iter_mut().find(|s| s.speed == clip.speed) {
                Some(bucket) => bucket.count += 1,
                None => speed_distribution.push(SpeedCount {
                    speed: clip.speed,
                    count: 1,
                }),
            }
        }
        speed_distribution.sort_by(|a, b| a.speed.total_cmp(&b.speed));

        Ok(AudioCacheStats {
            total_cached_items,
            total_access_count,
            average_access_count,
            speed_distribution,
        })
    }

    async fn clear_audio(&self) -> Result<u64, StoreError> {
        let mut audio = self.audio.write().await;
        let removed = audio.len() as u64;
        audio.clear();
        Ok(removed)
    }

    async fn purge_audio_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut audio = self.audio.write().await;
        let before = audio.len();
        audio.retain(|_, clip| clip.created_at >= cutoff);
        Ok((before - audio.len()) as u64)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use hadal_engine::Catalogue;

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        let words = Catalogue::standard()
            .unwrap()
            .vocabulary(Utc::now())
            .unwrap();
        store.insert_words(&words).await.unwrap();
        store
    }

    fn clip(key: &str, speed: f64, created_at: DateTime<Utc>) -> CachedAudio {
        CachedAudio {
            cache_key: key.to_string(),
            text: "Mahadsanid".to_string(),
            speed,
            audio_content: "AAAA".to_string(),
            duration_seconds: 0.5,
            access_count: 1,
            pregenerated: false,
            created_at,
        }
    }

    #[tokio::test]
    async fn test_insert_words_skips_existing_ids() {
        let store = seeded().await;
        let again = store.all_words().await.unwrap();

        assert_eq!(store.insert_words(&again).await.unwrap(), 0);
        assert_eq!(store.count_words().await.unwrap(), 23);
    }

    #[tokio::test]
    async fn test_filters_keep_catalogue_order() {
        let store = seeded().await;

        let tier_two = store
            .find_words(&WordFilter {
                tier: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        let ids: Vec<&str> = tier_two.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["word_9", "word_10", "word_11", "word_12", "word_13"]);

        let limited = store
            .find_words(&WordFilter {
                category: Some(Category::Greetings),
                limit: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(limited.len(), 2);
        assert!(limited.iter().all(|w| w.category == Category::Greetings));
    }

    #[tokio::test]
    async fn test_find_by_ids_skips_unknown() {
        let store = seeded().await;
        let ids = vec!["word_3".to_string(), "word_404".to_string(), "word_1".to_string()];

        let words = store.find_words_by_ids(&ids).await.unwrap();
        let found: Vec<&str> = words.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(found, vec!["word_1", "word_3"]);
    }

    #[tokio::test]
    async fn test_category_summaries() {
        let store = seeded().await;
        let summaries = store.category_summaries().await.unwrap();

        let compliments = summaries
            .iter()
            .find(|s| s.category == Category::Compliments)
            .unwrap();
        assert_eq!(compliments.word_count, 8);
        assert_eq!(compliments.tiers, vec![2, 3, 5]);
        assert_eq!(summaries.len(), 5);
    }

    #[tokio::test]
    async fn test_insert_progress_is_get_or_create() {
        let store = MemoryStore::new();
        let first = UserProgress::new("amina", Utc::now());
        let second = UserProgress::new("amina", Utc::now());

        let stored = store.insert_progress(&first).await.unwrap();
        let again = store.insert_progress(&second).await.unwrap();
        assert_eq!(stored.id, first.id);
        assert_eq!(again.id, first.id);

        let missing = UserProgress::new("ghost", Utc::now());
        assert!(matches!(
            store.save_progress(&missing).await,
            Err(StoreError::Missing(_))
        ));
    }

    #[tokio::test]
    async fn test_audio_access_counting_and_purge() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.upsert_audio(&clip("fresh", 1.0, now)).await.unwrap();
        store
            .upsert_audio(&clip("stale", 0.7, now - Duration::days(31)))
            .await
            .unwrap();

        assert!(store.audio_exists("fresh").await.unwrap());
        let hit = store.find_audio("fresh").await.unwrap().unwrap();
        assert_eq!(hit.access_count, 2);

        let stats = store.audio_stats().await.unwrap();
        assert_eq!(stats.total_cached_items, 2);
        assert_eq!(stats.total_access_count, 3);
        assert_eq!(stats.speed_distribution[0].speed, 0.7);

        let purged = store
            .purge_audio_before(now - Duration::days(30))
            .await
            .unwrap();
        assert_eq!(purged, 1);
        assert!(!store.audio_exists("stale").await.unwrap());
        assert_eq!(store.clear_audio().await.unwrap(), 1);
    }
}
