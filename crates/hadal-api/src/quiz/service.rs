//! Quiz sessions backed by the store.

use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use chrono::Utc;
use hadal_db::SharedStore;
use hadal_engine::{
    AnswerSubmission, QuizQuestion, QuizResults, QuizSession, Word,
    quiz::{AnswerOutcome, DEFAULT_QUESTION_COUNT, QuizType, clamp_question_count},
};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{error::ApiError, locks::KeyedLocks, metrics};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GenerateQuiz {
    #[serde(alias = "userId")]
    #[validate(length(min = 1, max = 255))]
    pub user_id: String,
    #[serde(alias = "wordIds")]
    pub word_ids: Vec<String>,
    #[serde(default, alias = "quizType")]
    pub quiz_type: QuizType,
    #[serde(default, alias = "questionCount")]
    #[validate(range(min = 1, max = 100))]
    pub question_count: Option<usize>,
}

/// The subset of a word shown next to a question.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionWord {
    pub somali: String,
    pub phonetic: String,
    pub category: String,
    pub cultural_tip: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    #[serde(flatten)]
    pub question: QuizQuestion,
    pub word: Option<QuestionWord>,
}

/// A session as returned by `GET /quiz/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct QuizView {
    pub quiz_id: Uuid,
    pub user_id: String,
    pub quiz_type: QuizType,
    pub total_questions: u32,
    pub current_score: u32,
    pub started_at: chrono::DateTime<Utc>,
    pub completed_at: Option<chrono::DateTime<Utc>>,
    pub is_completed: bool,
    pub questions: Vec<QuestionView>,
    pub answers: Vec<hadal_engine::Answer>,
}

/// Generates quiz sessions and records answers to them.
pub struct QuizService {
    store: SharedStore,
    rng: Mutex<StdRng>,
    locks: KeyedLocks,
}

impl QuizService {
    /// Service drawing questions from `rng`; pass a seeded one for
    /// reproducible quizzes.
    pub fn with_rng(store: SharedStore, rng: StdRng) -> Self {
        Self {
            store,
            rng: Mutex::new(rng),
            locks: KeyedLocks::new(),
        }
    }

    pub async fn generate(&self, request: GenerateQuiz) -> Result<QuizSession, ApiError> {
        let count = clamp_question_count(
            &request.word_ids,
            request.question_count.unwrap_or(DEFAULT_QUESTION_COUNT),
        )?;

        let candidates = self.store.find_words_by_ids(&request.word_ids).await?;
        let catalogue = self.store.all_words().await?;

        let session = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            QuizSession::generate(
                request.user_id,
                request.quiz_type,
                &candidates,
                count,
                &catalogue,
                Utc::now(),
                &mut *rng,
            )?
        };

        self.store.insert_session(&session).await?;

        metrics::record_quiz_generated(session.questions.len());
        tracing::info!(
            quiz_id = %session.id,
            user_id = %session.user_id,
            questions = session.questions.len(),
            "Quiz generated"
        );

        Ok(session)
    }

    pub async fn get(&self, id: Uuid) -> Result<QuizSession, ApiError> {
        self.store
            .find_session(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Quiz not found".to_string()))
    }

    async fn question_words(&self, session: &QuizSession) -> Result<Vec<Word>, ApiError> {
        let ids: Vec<String> = session.questions.iter().map(|q| q.word_id.clone()).collect();
        Ok(self.store.find_words_by_ids(&ids).await?)
    }

    /// The session with word details attached to each question.
    pub async fn view(&self, id: Uuid) -> Result<QuizView, ApiError> {
        let session = self.get(id).await?;
        let words = self.question_words(&session).await?;
        let by_id: HashMap<&str, &Word> = words.iter().map(|w| (w.id.as_str(), w)).collect();

        let questions = session
            .questions
            .iter()
            .map(|q| QuestionView {
                question: q.clone(),
                word: by_id.get(q.word_id.as_str()).map(|w| QuestionWord {
                    somali: w.somali.clone(),
                    phonetic: w.phonetic.clone(),
                    category: w.category.as_str().to_string(),
                    cultural_tip: w.cultural_tip.clone(),
                }),
            })
            .collect();

        Ok(QuizView {
            quiz_id: session.id,
            is_completed: session.is_completed(),
            user_id: session.user_id,
            quiz_type: session.quiz_type,
            total_questions: session.total_questions,
            current_score: session.score,
            started_at: session.started_at,
            completed_at: session.completed_at,
            questions,
            answers: session.answers,
        })
    }

    /// Record an answer. Answers to one session are applied one at a time.
    pub async fn submit(
        &self,
        id: Uuid,
        submission: AnswerSubmission,
    ) -> Result<AnswerOutcome, ApiError> {
        let _guard = self.locks.lock(&id.to_string()).await;

        let mut session = self.get(id).await?;
        let question_id = submission.question_id;
        let outcome = session.submit(submission, Utc::now())?;
        self.store.save_session(&session).await?;

        metrics::record_quiz_answer(outcome.correct);
        if outcome.quiz_completed {
            metrics::record_quiz_completed();
        }

        tracing::info!(
            quiz_id = %id,
            question_id = %question_id,
            correct = outcome.correct,
            completed = outcome.quiz_completed,
            "Answer submitted"
        );

        Ok(outcome)
    }

    pub async fn results(&self, id: Uuid) -> Result<QuizResults, ApiError> {
        let session = self.get(id).await?;
        let words = self.question_words(&session).await?;
        Ok(session.results(&words)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use hadal_db::{MemoryStore, WordStore};
    use hadal_engine::Catalogue;
    use rand::SeedableRng;

    async fn service() -> QuizService {
        let catalogue = Catalogue::standard().unwrap();
        let store = Arc::new(MemoryStore::default());
        store
            .insert_words(&catalogue.vocabulary(Utc::now()).unwrap())
            .await
            .unwrap();

        QuizService::with_rng(store, StdRng::seed_from_u64(7))
    }

    fn request(word_ids: &[&str], question_count: Option<usize>) -> GenerateQuiz {
        GenerateQuiz {
            user_id: "amina".to_string(),
            word_ids: word_ids.iter().map(|s| s.to_string()).collect(),
            quiz_type: QuizType::Mixed,
            question_count,
        }
    }

    #[tokio::test]
    async fn test_generate_clamps_to_candidates() {
        let service = service().await;

        let session = service
            .generate(request(&["word_1", "word_2", "word_2"], Some(10)))
            .await
            .unwrap();

        assert_eq!(session.total_questions, 2);
        assert_eq!(service.get(session.id).await.unwrap(), session);
    }

    #[tokio::test]
    async fn test_generate_fails_when_ids_do_not_resolve() {
        let service = service().await;

        let err = service
            .generate(request(&["word_1", "nope"], None))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Validation(ref msg) if msg.contains("Found 1, needed 2")));
    }

    #[tokio::test]
    async fn test_generate_rejects_empty_candidates() {
        let service = service().await;

        let err = service.generate(request(&[], None)).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_concurrent_answers_complete_once() {
        let service = Arc::new(service().await);
        let session = service
            .generate(request(&["word_1", "word_2", "word_3"], Some(3)))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for question in &session.questions {
            let service = Arc::clone(&service);
            let submission = AnswerSubmission {
                question_id: question.id,
                selected_answer: question.correct_answer.clone(),
                is_correct: None,
                time_taken: 1.0,
            };
            handles.push(tokio::spawn(async move {
                service.submit(session.id, submission).await.unwrap()
            }));
        }

        let mut completed = 0;
        for handle in handles {
            if handle.await.unwrap().quiz_completed {
                completed += 1;
            }
        }

        let stored = service.get(session.id).await.unwrap();
        assert_eq!(stored.answers.len(), 3);
        assert_eq!(stored.score, 3);
        assert!(stored.is_completed());
        // Only the last answer observes the transition
        assert_eq!(completed, 1);
    }

    #[tokio::test]
    async fn test_view_attaches_word_details() {
        let service = service().await;
        let session = service
            .generate(request(&["word_1"], Some(1)))
            .await
            .unwrap();

        let view = service.view(session.id).await.unwrap();

        let word = view.questions[0].word.as_ref().unwrap();
        assert!(!word.somali.is_empty());
        assert!(!view.is_completed);
    }
}
