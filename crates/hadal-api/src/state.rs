use std::{sync::Arc, time::Duration};

use hadal_db::SharedStore;
use hadal_engine::Catalogue;
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    ApiConfig,
    audio::{AudioService, GoogleTtsClient, TtsProvider},
    config::Environment,
    progress::ProgressEngine,
    quiz::QuizService,
};

/// Shared handles given to every handler.
#[derive(Clone)]
pub struct ApiState {
    pub store: SharedStore,
    pub catalogue: Arc<Catalogue>,
    pub progress: Arc<ProgressEngine>,
    pub quizzes: Arc<QuizService>,
    pub audio: Arc<AudioService>,
    pub environment: Environment,
}

impl ApiState {
    /// State for the running server: Google TTS and an entropy-seeded quiz rng.
    pub fn new(config: &ApiConfig, store: SharedStore) -> anyhow::Result<Self> {
        let tts = GoogleTtsClient::new(
            config.google_tts_api_key.clone(),
            config.tts_language_code.clone(),
            config.tts_voice_name.clone(),
        );

        Self::assemble(
            store,
            Arc::new(tts),
            Duration::from_secs(config.tts_timeout_secs),
            StdRng::from_entropy(),
            config.environment,
        )
    }

    /// Wire the services from explicit parts.
    pub fn assemble(
        store: SharedStore,
        tts: Arc<dyn TtsProvider>,
        tts_timeout: Duration,
        quiz_rng: StdRng,
        environment: Environment,
    ) -> anyhow::Result<Self> {
        let catalogue = Arc::new(Catalogue::standard()?);

        Ok(Self {
            progress: Arc::new(ProgressEngine::new(store.clone(), Arc::clone(&catalogue))),
            quizzes: Arc::new(QuizService::with_rng(store.clone(), quiz_rng)),
            audio: Arc::new(AudioService::new(store.clone(), tts, tts_timeout)),
            catalogue,
            store,
            environment,
        })
    }
}
