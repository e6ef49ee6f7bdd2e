//! Domain rules for Hadal, the Somali vocabulary trainer.
//!
//! This crate holds everything that does not need a database or a network:
//! the static vocabulary catalogue and tier ladder, the progress engine that
//! turns learning events into points, badges and unlocks, the read-only unlock
//! query, the quiz session state machine and the statistics derived from a
//! learner's record.

pub mod badge;
pub mod catalogue;
pub mod error;
pub mod progress;
pub mod quiz;
pub mod stats;
pub mod unlock;

pub use catalogue::{Catalogue, Category, Difficulty, Tier, TierId, Word};
pub use error::EngineError;
pub use progress::{EventOutcome, ProgressEvent, ProgressUpdate, QuizSummary, UserProgress};
pub use quiz::{Answer, AnswerSubmission, QuizQuestion, QuizResults, QuizSession};
pub use unlock::{MissingRequirement, UnlockCheck};
