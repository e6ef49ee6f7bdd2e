//! Progress & unlock engine.
//!
//! A learner's record is only ever changed by applying [`ProgressEvent`]s.
//! Events in one request are applied in a fixed order (word completion,
//! favorite toggle, quiz recording, cultural acknowledgment) against a working
//! copy; the record is replaced only if every event succeeds.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    badge,
    catalogue::{Catalogue, STARTING_TIER, TierId},
    error::EngineError,
    unlock,
};

/// Points needed per level.
pub const POINTS_PER_LEVEL: u32 = 100;

/// Level reached with `total_points`: 0-99 is level 1, 100-199 level 2, ...
pub const fn level_for_points(total_points: u32) -> u32 {
    total_points / POINTS_PER_LEVEL + 1
}

/// One entry of a learner's quiz history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizSummary {
    #[serde(default, alias = "quizId")]
    pub quiz_id: Option<Uuid>,
    /// Correct answers, or a raw score for quizzes taken elsewhere
    pub score: f64,
    #[serde(default, alias = "totalQuestions")]
    pub total_questions: Option<u32>,
    #[serde(default)]
    pub percentage: Option<f64>,
    #[serde(default, alias = "completedAt")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Persisted learning state of one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProgress {
    pub id: Uuid,
    /// Caller supplied id, unique across records
    pub user_id: String,
    /// Always `level_for_points(total_points)`
    pub level: u32,
    pub total_points: u32,
    /// Days with activity; grows by one on a new calendar day
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_activity: DateTime<Utc>,
    /// Only ever grows. Tier 1 is present from the start.
    pub unlocked_tiers: BTreeSet<TierId>,
    /// Word ids in completion order, without duplicates
    pub completed_words: Vec<String>,
    /// Word ids in the order they were favorited
    pub favorites: Vec<String>,
    /// Badge ids in award order. Badges are never revoked.
    pub badges_earned: Vec<String>,
    pub quiz_scores: Vec<QuizSummary>,
    pub cultural_acknowledgments: BTreeSet<TierId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProgress {
    /// Fresh record: level 1, tier 1 unlocked, `newcomer` badge.
    pub fn new(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            level: 1,
            total_points: 0,
            current_streak: 0,
            longest_streak: 0,
            last_activity: now,
            unlocked_tiers: BTreeSet::from([STARTING_TIER]),
            completed_words: Vec::new(),
            favorites: Vec::new(),
            badges_earned: vec![badge::NEWCOMER.to_string()],
            quiz_scores: Vec::new(),
            cultural_acknowledgments: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether badge `id` has been awarded.
    pub fn has_badge(&self, id: &str) -> bool {
        self.badges_earned.iter().any(|b| b == id)
    }

    /// Whether `word_id` is in the completed list.
    pub fn has_completed(&self, word_id: &str) -> bool {
        self.completed_words.iter().any(|w| w == word_id)
    }

    /// Whether `word_id` is currently a favorite.
    pub fn is_favorite(&self, word_id: &str) -> bool {
        self.favorites.iter().any(|w| w == word_id)
    }

    /// Whether `tier` is unlocked.
    pub fn is_unlocked(&self, tier: TierId) -> bool {
        self.unlocked_tiers.contains(&tier)
    }

    /// Whether the cultural guidelines of `tier` were acknowledged.
    pub fn has_acknowledged(&self, tier: TierId) -> bool {
        self.cultural_acknowledgments.contains(&tier)
    }

    fn award(&mut self, id: &str, outcome: &mut EventOutcome) {
        if !self.has_badge(id) {
            self.badges_earned.push(id.to_string());
            outcome.badges_awarded.push(id.to_string());
        }
    }

    /// Apply `events` in order and stamp the activity timestamps.
    ///
    /// On error the record is left untouched.
    pub fn apply_all(
        &mut self,
        events: &[ProgressEvent],
        catalogue: &Catalogue,
        now: DateTime<Utc>,
    ) -> Result<EventOutcome, EngineError> {
        let mut next = self.clone();
        let mut outcome = EventOutcome::default();

        for event in events {
            next.apply(event, catalogue, &mut outcome)?;
        }

        next.updated_at = now;
        next.last_activity = now;
        *self = next;

        Ok(outcome)
    }

    fn apply(
        &mut self,
        event: &ProgressEvent,
        catalogue: &Catalogue,
        outcome: &mut EventOutcome,
    ) -> Result<(), EngineError> {
        match event {
            ProgressEvent::WordCompleted {
                word_id,
                points_earned,
            } => self.complete_word(word_id, *points_earned, catalogue, outcome),
            ProgressEvent::FavoriteToggled { word_id } => self.toggle_favorite(word_id, outcome),
            ProgressEvent::QuizRecorded(summary) => self.record_quiz(summary, outcome),
            ProgressEvent::CulturalAcknowledged { tier_id } => {
                self.acknowledge(*tier_id, catalogue, outcome)?;
            }
        }
        Ok(())
    }

    fn complete_word(
        &mut self,
        word_id: &str,
        points_earned: u32,
        catalogue: &Catalogue,
        outcome: &mut EventOutcome,
    ) {
        // Already credited
        if self.has_completed(word_id) {
            return;
        }

        self.completed_words.push(word_id.to_string());
        self.total_points = self.total_points.saturating_add(points_earned);
        outcome.points_added = outcome.points_added.saturating_add(points_earned);

        self.current_streak += 1;
        if self.current_streak > self.longest_streak {
            self.longest_streak = self.current_streak;
        }

        let new_level = level_for_points(self.total_points);
        if new_level > self.level {
            self.level = new_level;
            self.award(&badge::level_badge(new_level), outcome);
        }

        let unlocked = unlock::unlock_eligible_tiers(self, catalogue);
        if !unlocked.is_empty() {
            outcome.tiers_unlocked.extend(unlocked);
            self.award(badge::TIER_MASTER, outcome);
        }
    }

    fn toggle_favorite(&mut self, word_id: &str, outcome: &mut EventOutcome) {
        if let Some(pos) = self.favorites.iter().position(|w| w == word_id) {
            self.favorites.remove(pos);
            return;
        }

        self.favorites.push(word_id.to_string());
        if self.favorites.len() == 1 {
            self.award(badge::FIRST_FAVORITE, outcome);
        }
    }

    fn record_quiz(&mut self, summary: &QuizSummary, outcome: &mut EventOutcome) {
        self.quiz_scores.push(summary.clone());

        match self.quiz_scores.len() {
            1 => self.award(badge::FIRST_QUIZ, outcome),
            badge::QUIZ_MASTER_COUNT => self.award(badge::QUIZ_MASTER, outcome),
            _ => {}
        }
    }

    fn acknowledge(
        &mut self,
        tier_id: TierId,
        catalogue: &Catalogue,
        outcome: &mut EventOutcome,
    ) -> Result<(), EngineError> {
        let tier = catalogue.require_tier(tier_id)?;
        if !tier.has_cultural_content() {
            return Err(EngineError::InvalidState(format!(
                "Tier {tier_id} does not require cultural acknowledgment"
            )));
        }

        if !self.cultural_acknowledgments.insert(tier_id) {
            return Ok(());
        }

        // Only the acknowledged tier is re-evaluated here.
        if !self.is_unlocked(tier_id) && unlock::missing_requirements(self, tier).is_empty() {
            self.unlocked_tiers.insert(tier_id);
            outcome.tiers_unlocked.push(tier_id);
        }

        Ok(())
    }
}

/// A discrete learning event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Credits points the first time a word is completed
    WordCompleted { word_id: String, points_earned: u32 },
    /// Adds the word to favorites, or removes it when already there
    FavoriteToggled { word_id: String },
    /// Appends to the quiz history
    QuizRecorded(QuizSummary),
    /// Records the acknowledgment and re-checks that tier
    CulturalAcknowledged { tier_id: TierId },
}

impl ProgressEvent {
    /// Stable name used in logs and metric labels.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::WordCompleted { .. } => "word_completed",
            Self::FavoriteToggled { .. } => "favorite_toggled",
            Self::QuizRecorded(_) => "quiz_recorded",
            Self::CulturalAcknowledged { .. } => "cultural_acknowledged",
        }
    }
}

/// What changed while applying a batch of events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventOutcome {
    /// Zero when every completed word was already known
    pub points_added: u32,
    /// Newly awarded badges, in award order
    pub badges_awarded: Vec<String>,
    pub tiers_unlocked: Vec<TierId>,
}

/// Request body for a progress update. Any combination of fields may be
/// present; they are turned into events in the engine's fixed order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    #[serde(default, alias = "wordCompleted")]
    pub word_completed: Option<String>,
    #[serde(default, alias = "pointsEarned")]
    pub points_earned: Option<u32>,
    #[serde(default, alias = "favoriteToggled")]
    pub favorite_toggled: Option<String>,
    #[serde(default, alias = "quizCompleted")]
    pub quiz_completed: Option<QuizSummary>,
    #[serde(default, alias = "culturalTierAcknowledged")]
    pub cultural_tier_acknowledged: Option<TierId>,
}

impl ProgressUpdate {
    /// Validate the fields and order them as events.
    pub fn into_events(self) -> Result<Vec<ProgressEvent>, EngineError> {
        let mut events = Vec::new();

        match (self.word_completed, self.points_earned) {
            (Some(word_id), Some(points_earned)) => {
                if points_earned == 0 {
                    return Err(EngineError::InvalidArgument(
                        "points_earned must be positive".to_string(),
                    ));
                }
                events.push(ProgressEvent::WordCompleted {
                    word_id,
                    points_earned,
                });
            }
            (Some(_), None) => {
                return Err(EngineError::InvalidArgument(
                    "points_earned is required with word_completed".to_string(),
                ));
            }
            (None, Some(_)) => {
                return Err(EngineError::InvalidArgument(
                    "points_earned requires word_completed".to_string(),
                ));
            }
            (None, None) => {}
        }

        if let Some(word_id) = self.favorite_toggled {
            events.push(ProgressEvent::FavoriteToggled { word_id });
        }

        if let Some(summary) = self.quiz_completed {
            if !summary.score.is_finite() || summary.score < 0.0 {
                return Err(EngineError::InvalidArgument(
                    "quiz score must be a non-negative number".to_string(),
                ));
            }
            events.push(ProgressEvent::QuizRecorded(summary));
        }

        if let Some(tier_id) = self.cultural_tier_acknowledged {
            events.push(ProgressEvent::CulturalAcknowledged { tier_id });
        }

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalogue() -> Catalogue {
        Catalogue::standard().unwrap()
    }

    fn complete(word_id: &str, points_earned: u32) -> ProgressEvent {
        ProgressEvent::WordCompleted {
            word_id: word_id.to_string(),
            points_earned,
        }
    }

    fn quiz(score: f64) -> ProgressEvent {
        ProgressEvent::QuizRecorded(QuizSummary {
            quiz_id: None,
            score,
            total_questions: Some(5),
            percentage: None,
            completed_at: None,
        })
    }

    fn ack(tier_id: TierId) -> ProgressEvent {
        ProgressEvent::CulturalAcknowledged { tier_id }
    }

    #[test]
    fn test_level_for_points() {
        assert_eq!(level_for_points(0), 1);
        assert_eq!(level_for_points(99), 1);
        assert_eq!(level_for_points(100), 2);
        assert_eq!(level_for_points(199), 2);
        assert_eq!(level_for_points(200), 3);
    }

    #[test]
    fn test_new_progress_defaults() {
        let progress = UserProgress::new("amina", Utc::now());
        assert_eq!(progress.level, 1);
        assert!(progress.is_unlocked(STARTING_TIER));
        assert!(progress.has_badge(badge::NEWCOMER));
    }

    #[test]
    fn test_word_completion_is_idempotent() {
        let catalogue = catalogue();
        let mut progress = UserProgress::new("amina", Utc::now());

        progress
            .apply_all(&[complete("word_1", 10)], &catalogue, Utc::now())
            .unwrap();
        let outcome = progress
            .apply_all(&[complete("word_1", 10)], &catalogue, Utc::now())
            .unwrap();

        assert_eq!(progress.total_points, 10);
        assert_eq!(progress.completed_words, vec!["word_1".to_string()]);
        assert_eq!(progress.current_streak, 1);
        assert_eq!(outcome, EventOutcome::default());
    }

    #[test]
    fn test_streak_tracks_distinct_completions() {
        let catalogue = catalogue();
        let mut progress = UserProgress::new("amina", Utc::now());

        let events = [complete("word_1", 10), complete("word_2", 10)];
        progress.apply_all(&events, &catalogue, Utc::now()).unwrap();

        assert_eq!(progress.current_streak, 2);
        assert_eq!(progress.longest_streak, 2);
    }

    #[test]
    fn test_level_boundary_awards_badge() {
        let catalogue = catalogue();
        let mut progress = UserProgress::new("amina", Utc::now());

        progress
            .apply_all(&[complete("word_1", 99)], &catalogue, Utc::now())
            .unwrap();
        assert_eq!(progress.level, 1);

        let outcome = progress
            .apply_all(&[complete("word_2", 1)], &catalogue, Utc::now())
            .unwrap();
        assert_eq!(progress.total_points, 100);
        assert_eq!(progress.level, 2);
        assert!(outcome.badges_awarded.contains(&"level_2".to_string()));
    }

    #[test]
    fn test_tier_unlock_awards_tier_master_once() {
        let catalogue = catalogue();
        let mut progress = UserProgress::new("amina", Utc::now());

        let first = progress
            .apply_all(&[complete("word_1", 80)], &catalogue, Utc::now())
            .unwrap();
        assert_eq!(first.tiers_unlocked, vec![2]);
        assert!(first.badges_awarded.contains(&badge::TIER_MASTER.to_string()));

        let second = progress
            .apply_all(&[complete("word_2", 80)], &catalogue, Utc::now())
            .unwrap();
        assert_eq!(second.tiers_unlocked, vec![3]);
        assert!(!second.badges_awarded.contains(&badge::TIER_MASTER.to_string()));
        assert_eq!(
            progress
                .badges_earned
                .iter()
                .filter(|b| *b == badge::TIER_MASTER)
                .count(),
            1
        );
    }

    #[test]
    fn test_single_event_cascades_unlocks() {
        let catalogue = catalogue();
        let mut progress = UserProgress::new("amina", Utc::now());
        progress.apply_all(&[ack(4)], &catalogue, Utc::now()).unwrap();

        let outcome = progress
            .apply_all(&[complete("word_9", 240)], &catalogue, Utc::now())
            .unwrap();

        assert_eq!(outcome.tiers_unlocked, vec![2, 3, 4]);
        assert_eq!(
            progress.unlocked_tiers,
            BTreeSet::from([1, 2, 3, 4])
        );
    }

    #[test]
    fn test_sensitive_tier_waits_for_acknowledgment() {
        let catalogue = catalogue();
        let mut progress = UserProgress::new("amina", Utc::now());

        progress
            .apply_all(&[complete("word_1", 300)], &catalogue, Utc::now())
            .unwrap();
        assert!(!progress.is_unlocked(4));

        let outcome = progress.apply_all(&[ack(4)], &catalogue, Utc::now()).unwrap();
        assert_eq!(outcome.tiers_unlocked, vec![4]);
        assert!(progress.is_unlocked(4));
        // Tier 5 needs its own acknowledgment and more points
        assert!(!progress.is_unlocked(5));
    }

    #[test]
    fn test_acknowledgment_respects_prerequisite() {
        let catalogue = catalogue();
        let mut progress = UserProgress::new("amina", Utc::now());
        // Plenty of points but tier 4 never unlocked
        progress.total_points = 400;

        let outcome = progress.apply_all(&[ack(5)], &catalogue, Utc::now()).unwrap();
        assert!(outcome.tiers_unlocked.is_empty());
        assert!(!progress.is_unlocked(5));
        assert!(progress.has_acknowledged(5));
    }

    #[test]
    fn test_acknowledgment_errors_leave_record_untouched() {
        let catalogue = catalogue();
        let mut progress = UserProgress::new("amina", Utc::now());
        let before = progress.clone();

        let err = progress
            .apply_all(&[complete("word_1", 10), ack(2)], &catalogue, Utc::now())
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
        assert_eq!(progress, before);

        let err = progress.apply_all(&[ack(42)], &catalogue, Utc::now()).unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn test_double_acknowledgment_is_noop() {
        let catalogue = catalogue();
        let mut progress = UserProgress::new("amina", Utc::now());

        progress.apply_all(&[ack(4)], &catalogue, Utc::now()).unwrap();
        progress.apply_all(&[ack(4)], &catalogue, Utc::now()).unwrap();
        assert_eq!(progress.cultural_acknowledgments, BTreeSet::from([4]));
    }

    #[test]
    fn test_favorite_toggle_and_badge() {
        let catalogue = catalogue();
        let mut progress = UserProgress::new("amina", Utc::now());
        let toggle = ProgressEvent::FavoriteToggled {
            word_id: "word_3".to_string(),
        };

        let outcome = progress
            .apply_all(&[toggle.clone()], &catalogue, Utc::now())
            .unwrap();
        assert_eq!(outcome.badges_awarded, vec![badge::FIRST_FAVORITE.to_string()]);
        assert!(progress.is_favorite("word_3"));

        progress
            .apply_all(&[toggle.clone()], &catalogue, Utc::now())
            .unwrap();
        assert!(progress.favorites.is_empty());
        assert!(progress.has_badge(badge::FIRST_FAVORITE));

        let outcome = progress.apply_all(&[toggle], &catalogue, Utc::now()).unwrap();
        assert!(outcome.badges_awarded.is_empty());
    }

    #[test]
    fn test_quiz_master_on_exactly_tenth_quiz() {
        let catalogue = catalogue();
        let mut progress = UserProgress::new("amina", Utc::now());

        let first = progress.apply_all(&[quiz(3.0)], &catalogue, Utc::now()).unwrap();
        assert_eq!(first.badges_awarded, vec![badge::FIRST_QUIZ.to_string()]);

        for _ in 2..10 {
            progress.apply_all(&[quiz(3.0)], &catalogue, Utc::now()).unwrap();
            assert!(!progress.has_badge(badge::QUIZ_MASTER));
        }

        let tenth = progress.apply_all(&[quiz(3.0)], &catalogue, Utc::now()).unwrap();
        assert_eq!(tenth.badges_awarded, vec![badge::QUIZ_MASTER.to_string()]);

        let eleventh = progress.apply_all(&[quiz(3.0)], &catalogue, Utc::now()).unwrap();
        assert!(eleventh.badges_awarded.is_empty());
        assert_eq!(progress.quiz_scores.len(), 11);
    }

    #[test]
    fn test_monotonic_sets_never_shrink() {
        let catalogue = catalogue();
        let mut progress = UserProgress::new("amina", Utc::now());
        let events = vec![
            complete("word_1", 50),
            ProgressEvent::FavoriteToggled {
                word_id: "word_1".to_string(),
            },
            quiz(2.0),
            ack(4),
            complete("word_2", 50),
            ProgressEvent::FavoriteToggled {
                word_id: "word_1".to_string(),
            },
            complete("word_1", 50),
            ack(4),
            complete("word_3", 200),
        ];

        for event in events {
            let before = progress.clone();
            progress.apply_all(&[event], &catalogue, Utc::now()).unwrap();

            assert!(progress.unlocked_tiers.is_superset(&before.unlocked_tiers));
            assert!(
                progress
                    .cultural_acknowledgments
                    .is_superset(&before.cultural_acknowledgments)
            );
            assert!(before.completed_words.iter().all(|w| progress.has_completed(w)));
            assert!(before.badges_earned.iter().all(|b| progress.has_badge(b)));
            assert!(progress.total_points >= before.total_points);
        }
    }

    #[test]
    fn test_update_into_events_orders_fields() {
        let update = ProgressUpdate {
            word_completed: Some("word_1".to_string()),
            points_earned: Some(10),
            favorite_toggled: Some("word_1".to_string()),
            quiz_completed: Some(QuizSummary {
                quiz_id: None,
                score: 4.0,
                total_questions: None,
                percentage: None,
                completed_at: None,
            }),
            cultural_tier_acknowledged: Some(4),
        };

        let kinds: Vec<&str> = update
            .into_events()
            .unwrap()
            .iter()
            .map(ProgressEvent::kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                "word_completed",
                "favorite_toggled",
                "quiz_recorded",
                "cultural_acknowledged"
            ]
        );
    }

    #[test]
    fn test_update_rejects_incomplete_word_fields() {
        let missing_points = ProgressUpdate {
            word_completed: Some("word_1".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            missing_points.into_events(),
            Err(EngineError::InvalidArgument(_))
        ));

        let zero_points = ProgressUpdate {
            word_completed: Some("word_1".to_string()),
            points_earned: Some(0),
            ..Default::default()
        };
        assert!(zero_points.into_events().is_err());

        assert!(ProgressUpdate::default().into_events().unwrap().is_empty());
    }

    #[test]
    fn test_update_accepts_camel_case_aliases() {
        let update: ProgressUpdate = serde_json::from_str(
            r#"{"wordCompleted": "word_2", "pointsEarned": 15, "culturalTierAcknowledged": 4}"#,
        )
        .unwrap();
        assert_eq!(update.word_completed.as_deref(), Some("word_2"));
        assert_eq!(update.points_earned, Some(15));
        assert_eq!(update.cultural_tier_acknowledged, Some(4));
    }
}
