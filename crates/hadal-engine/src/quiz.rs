//! Multiple-choice quiz sessions.
//!
//! A session is generated once with a fixed list of questions and moves from
//! active to completed when the number of recorded answers reaches the number
//! of questions. Completed sessions reject further answers.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{catalogue::Word, error::EngineError, progress::QuizSummary, stats::round_to};

/// Wrong options offered next to the correct answer.
pub const MAX_DISTRACTORS: usize = 3;

/// Questions per quiz when the caller does not say.
pub const DEFAULT_QUESTION_COUNT: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// How the client picked the words. Stored as given.
pub enum QuizType {
    #[default]
    Mixed,
    Favorites,
    Tier,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Only multiple choice is generated.
pub enum QuestionType {
    #[default]
    MultipleChoice,
}

/// A question asking for the English translation of one word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: Uuid,
    pub word_id: String,
    pub question_type: QuestionType,
    /// Shuffled; holds the correct answer and up to three distractors
    pub options: Vec<String>,
    pub correct_answer: String,
}

impl QuizQuestion {
    /// Build a question for `target`, drawing distractors from `words`.
    ///
    /// Distractors come from the target's tier when it has other words, then
    /// from its category, then from the whole catalogue. Words sharing the
    /// target's translation are never offered as wrong answers.
    pub fn build<R: Rng + ?Sized>(target: &Word, words: &[Word], rng: &mut R) -> Self {
        let pool = distractor_pool(target, words);

        let mut options = Vec::with_capacity(MAX_DISTRACTORS + 1);
        options.push(target.english.clone());
        options.extend(
            pool.choose_multiple(rng, MAX_DISTRACTORS)
                .map(|english| (*english).to_string()),
        );
        options.shuffle(rng);

        Self {
            id: Uuid::new_v4(),
            word_id: target.id.clone(),
            question_type: QuestionType::MultipleChoice,
            options,
            correct_answer: target.english.clone(),
        }
    }
}

fn distractor_pool<'a>(target: &Word, words: &'a [Word]) -> Vec<&'a str> {
    let same_tier = |w: &Word| w.tier == target.tier;
    let same_category = |w: &Word| w.category == target.category;
    let anything = |_: &Word| true;
    let groups: [&dyn Fn(&Word) -> bool; 3] = [&same_tier, &same_category, &anything];

    for in_group in groups {
        let mut pool: Vec<&str> = Vec::new();
        for word in words {
            if word.id == target.id || word.english == target.english || !in_group(word) {
                continue;
            }
            if !pool.contains(&word.english.as_str()) {
                pool.push(&word.english);
            }
        }
        if !pool.is_empty() {
            return pool;
        }
    }

    Vec::new()
}

/// Clamp a requested question count to the number of distinct candidates.
pub fn clamp_question_count(word_ids: &[String], requested: usize) -> Result<usize, EngineError> {
    let distinct = word_ids.iter().collect::<HashSet<_>>().len();
    if distinct == 0 {
        return Err(EngineError::InvalidArgument(
            "At least one word id is required".to_string(),
        ));
    }
    if requested == 0 {
        return Err(EngineError::InvalidArgument(
            "question_count must be at least 1".to_string(),
        ));
    }
    Ok(requested.min(distinct))
}

/// A recorded answer. Correctness is always computed here, never taken from
/// the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: Uuid,
    pub selected_answer: String,
    pub is_correct: bool,
    pub time_taken: f64,
}

/// An answer as sent by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerSubmission {
    #[serde(alias = "questionId")]
    pub question_id: Uuid,
    #[serde(alias = "selectedAnswer")]
    pub selected_answer: String,
    /// Accepted for client compatibility and ignored
    #[serde(default, alias = "isCorrect")]
    pub is_correct: Option<bool>,
    #[serde(default, alias = "timeTaken")]
    /// Seconds
    pub time_taken: f64,
}

/// Feedback returned for one answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerOutcome {
    pub correct: bool,
    pub correct_answer: String,
    pub current_score: u32,
    pub questions_answered: usize,
    pub total_questions: u32,
    /// True only on the answer that completed the session
    pub quiz_completed: bool,
}

/// A generated quiz and the answers recorded so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizSession {
    pub id: Uuid,
    pub user_id: String,
    pub quiz_type: QuizType,
    /// Fixed at generation
    pub questions: Vec<QuizQuestion>,
    /// At most one per question, in submission order
    pub answers: Vec<Answer>,
    /// Number of correct answers
    pub score: u32,
    pub total_questions: u32,
    pub started_at: DateTime<Utc>,
    /// Set once, when the last question is answered
    pub completed_at: Option<DateTime<Utc>>,
}

impl QuizSession {
    /// Generate an active session of `count` questions.
    ///
    /// `candidates` are the words to be asked about (duplicates are ignored);
    /// `catalogue` is the full word list distractors are drawn from.
    pub fn generate<R: Rng + ?Sized>(
        user_id: impl Into<String>,
        quiz_type: QuizType,
        candidates: &[Word],
        count: usize,
        catalogue: &[Word],
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Self, EngineError> {
        if count == 0 {
            return Err(EngineError::InvalidArgument(
                "question_count must be at least 1".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let distinct: Vec<&Word> = candidates
            .iter()
            .filter(|w| seen.insert(w.id.as_str()))
            .collect();

        if distinct.len() < count {
            return Err(EngineError::InvalidArgument(format!(
                "Not enough words available. Found {}, needed {count}",
                distinct.len()
            )));
        }

        let selected: Vec<&Word> = distinct.choose_multiple(rng, count).copied().collect();
        let questions: Vec<QuizQuestion> = selected
            .into_iter()
            .map(|word| QuizQuestion::build(word, catalogue, &mut *rng))
            .collect();

        Ok(Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            quiz_type,
            total_questions: u32::try_from(questions.len()).unwrap_or(u32::MAX),
            questions,
            answers: Vec::new(),
            score: 0,
            started_at: now,
            completed_at: None,
        })
    }

    /// Whether every question has been answered.
    pub const fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Question `id` of this session.
    pub fn question(&self, id: Uuid) -> Option<&QuizQuestion> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Whether an answer to question `id` has been recorded.
    pub fn is_answered(&self, id: Uuid) -> bool {
        self.answers.iter().any(|a| a.question_id == id)
    }

    /// Record an answer and complete the session on the last one.
    /// Each question takes one answer.
    pub fn submit(
        &mut self,
        submission: AnswerSubmission,
        now: DateTime<Utc>,
    ) -> Result<AnswerOutcome, EngineError> {
        if self.is_completed() {
            return Err(EngineError::InvalidState(
                "Quiz already completed".to_string(),
            ));
        }

        if !submission.time_taken.is_finite() || submission.time_taken < 0.0 {
            return Err(EngineError::InvalidArgument(
                "time_taken must be a non-negative number of seconds".to_string(),
            ));
        }

        let correct_answer = self
            .question(submission.question_id)
            .map(|q| q.correct_answer.clone())
            .ok_or_else(|| EngineError::NotFound("Question not found".to_string()))?;

        if self.is_answered(submission.question_id) {
            return Err(EngineError::InvalidState(
                "Question already answered".to_string(),
            ));
        }

        let correct = submission.selected_answer == correct_answer;
        if correct {
            self.score += 1;
        }

        self.answers.push(Answer {
            question_id: submission.question_id,
            selected_answer: submission.selected_answer,
            is_correct: correct,
            time_taken: submission.time_taken,
        });

        if self.answers.len() >= self.total_questions as usize && self.completed_at.is_none() {
            self.completed_at = Some(now);
        }

        Ok(AnswerOutcome {
            correct,
            correct_answer,
            current_score: self.score,
            questions_answered: self.answers.len(),
            total_questions: self.total_questions,
            quiz_completed: self.is_completed(),
        })
    }

    /// Score over total questions, see [`percentage`].
    pub fn percentage(&self) -> f64 {
        percentage(self.score, self.total_questions)
    }

    /// The entry to relay to the progress engine once the quiz is finished.
    pub fn summary(&self) -> QuizSummary {
        QuizSummary {
            quiz_id: Some(self.id),
            score: f64::from(self.score),
            total_questions: Some(self.total_questions),
            percentage: Some(self.percentage()),
            completed_at: self.completed_at,
        }
    }

    /// Scored results. `words` should hold the words behind the questions;
    /// mistakes on words it lacks are filed under `unknown`.
    pub fn results(&self, words: &[Word]) -> Result<QuizResults, EngineError> {
        let Some(completed_at) = self.completed_at else {
            return Err(EngineError::InvalidState(
                "Quiz not yet completed".to_string(),
            ));
        };

        let percentage = self.percentage();

        let total_time: f64 = self.answers.iter().map(|a| a.time_taken).sum();
        let average_time = if self.answers.is_empty() {
            0.0
        } else {
            round_to(total_time / self.answers.len() as f64, 1)
        };

        let word_by_id: HashMap<&str, &Word> = words.iter().map(|w| (w.id.as_str(), w)).collect();
        let mut mistake_analysis = BTreeMap::new();
        for answer in self.answers.iter().filter(|a| !a.is_correct) {
            let category = self
                .question(answer.question_id)
                .and_then(|q| word_by_id.get(q.word_id.as_str()))
                .map_or("unknown", |w| w.category.as_str());
            *mistake_analysis.entry(category.to_string()).or_insert(0) += 1;
        }

        Ok(QuizResults {
            quiz_id: self.id,
            user_id: self.user_id.clone(),
            completed_at,
            score: ScoreBreakdown {
                correct: self.score,
                total: self.total_questions,
                percentage,
            },
            performance: Performance::for_percentage(percentage).into(),
            timing: Timing {
                total_time_seconds: round_to(total_time, 1),
                average_time_per_question: average_time,
            },
            mistake_analysis,
            detailed_answers: self.answers.clone(),
            summary: self.summary(),
        })
    }

    /// History row for a completed session.
    pub fn history_entry(&self) -> Option<QuizHistoryEntry> {
        let completed_at = self.completed_at?;
        let seconds = (completed_at - self.started_at).num_milliseconds() as f64 / 1000.0;

        Some(QuizHistoryEntry {
            quiz_id: self.id,
            completed_at,
            score: self.score,
            total_questions: self.total_questions,
            percentage: self.percentage(),
            duration_minutes: round_to(seconds / 60.0, 1),
        })
    }
}

/// `correct / total` as a percentage with one decimal, 0 for an empty quiz.
pub fn percentage(correct: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_to(f64::from(correct) / f64::from(total) * 100.0, 1)
}

/// Performance band of a finished quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Performance {
    Excellent,
    Good,
    Fair,
    #[serde(rename = "Needs Improvement")]
    NeedsImprovement,
}

impl Performance {
    /// 90 and up is excellent, 75 good, 60 fair.
    pub fn for_percentage(percentage: f64) -> Self {
        if percentage >= 90.0 {
            Self::Excellent
        } else if percentage >= 75.0 {
            Self::Good
        } else if percentage >= 60.0 {
            Self::Fair
        } else {
            Self::NeedsImprovement
        }
    }

    pub const fn badge(self) -> &'static str {
        match self {
            Self::Excellent => "🏆",
            Self::Good => "⭐",
            Self::Fair => "📖",
            Self::NeedsImprovement => "💪",
        }
    }

    pub const fn message(self) -> &'static str {
        match self {
            Self::Excellent => "Outstanding mastery!",
            Self::Good => "Great progress!",
            Self::Fair => "Keep practicing!",
            Self::NeedsImprovement => "Don't give up!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
/// Band plus the badge and message shown for it.
pub struct PerformanceReport {
    pub level: Performance,
    pub badge: &'static str,
    pub message: &'static str,
}

impl From<Performance> for PerformanceReport {
    fn from(level: Performance) -> Self {
        Self {
            level,
            badge: level.badge(),
            message: level.message(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub correct: u32,
    pub total: u32,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timing {
    pub total_time_seconds: f64,
    pub average_time_per_question: f64,
}

/// Scored view of a completed session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizResults {
    pub quiz_id: Uuid,
    pub user_id: String,
    pub completed_at: DateTime<Utc>,
    pub score: ScoreBreakdown,
    pub performance: PerformanceReport,
    pub timing: Timing,
    /// Wrong answers per word category
    pub mistake_analysis: BTreeMap<String, u32>,
    pub detailed_answers: Vec<Answer>,
    /// Ready to send as `quiz_completed` in a progress update
    pub summary: QuizSummary,
}

/// One row of a learner's quiz history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizHistoryEntry {
    pub quiz_id: Uuid,
    pub completed_at: DateTime<Utc>,
    pub score: u32,
    pub total_questions: u32,
    pub percentage: f64,
    pub duration_minutes: f64,
}
