//! Learner statistics derived from a progress record.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{catalogue::Word, progress::UserProgress};

/// Rough study time credited per completed word.
pub const MINUTES_PER_WORD: u32 = 2;

/// Summary of a learner's record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserStats {
    pub user_id: String,
    pub total_words_learned: usize,
    pub words_by_category: BTreeMap<String, u32>,
    /// Keyed by the tier id as a string
    pub words_by_tier: BTreeMap<String, u32>,
    /// Mean quiz percentage, two decimals
    pub average_quiz_score: f64,
    /// Estimated minutes
    pub time_spent_learning: u32,
    /// Not tracked yet, always 0
    pub pronunciation_attempts: u32,
}

/// Round `value` to `decimals` places, half away from zero.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Compute stats for `progress`.
///
/// `completed_words` are the catalogue entries behind the record's completed
/// ids; ids no longer in the catalogue still count towards the totals.
pub fn user_stats(progress: &UserProgress, completed_words: &[Word]) -> UserStats {
    let mut words_by_category = BTreeMap::new();
    let mut words_by_tier = BTreeMap::new();

    for word in completed_words {
        *words_by_category
            .entry(word.category.as_str().to_string())
            .or_insert(0) += 1;
        *words_by_tier.entry(word.tier.to_string()).or_insert(0) += 1;
    }

    let average_quiz_score = if progress.quiz_scores.is_empty() {
        0.0
    } else {
        let total: f64 = progress.quiz_scores.iter().map(|q| q.score).sum();
        round_to(total / progress.quiz_scores.len() as f64, 2)
    };

    let learned = progress.completed_words.len();

    UserStats {
        user_id: progress.user_id.clone(),
        total_words_learned: learned,
        words_by_category,
        words_by_tier,
        average_quiz_score,
        time_spent_learning: u32::try_from(learned)
            .unwrap_or(u32::MAX)
            .saturating_mul(MINUTES_PER_WORD),
        pronunciation_attempts: 0,
    }
}
