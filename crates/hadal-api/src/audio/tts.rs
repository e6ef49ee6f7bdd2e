//! Text-to-speech providers.

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

const GOOGLE_TTS_ENDPOINT: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

/// Sample rate requested from the provider.
pub const SAMPLE_RATE_HERTZ: u32 = 24_000;

#[derive(Debug, thiserror::Error)]
pub enum TtsError {
    #[error("text-to-speech is not configured")]
    NotConfigured,

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed provider response: {0}")]
    Malformed(String),
}

/// Turns text into base64 encoded MP3 audio.
#[async_trait]
pub trait TtsProvider: Send + Sync {
    async fn synthesize(&self, text: &str, speed: f64) -> Result<String, TtsError>;

    /// Locale the voice speaks; part of the audio cache key.
    fn language_code(&self) -> &str;
}

/// Google Cloud Text-to-Speech over its REST API.
#[derive(Clone)]
pub struct GoogleTtsClient {
    http: reqwest::Client,
    api_key: Option<String>,
    language_code: String,
    voice_name: String,
}

impl GoogleTtsClient {
    pub fn new(
        api_key: Option<String>,
        language_code: impl Into<String>,
        voice_name: impl Into<String>,
    ) -> Self {
        let api_key = api_key.filter(|k| !k.is_empty());
        if api_key.is_none() {
            tracing::warn!("GOOGLE_TTS_API_KEY not set, only cached audio can be served");
        }

        Self {
            http: reqwest::Client::new(),
            api_key,
            language_code: language_code.into(),
            voice_name: voice_name.into(),
        }
    }

    fn request_body<'a>(&'a self, text: &'a str, speed: f64) -> SynthesizeRequest<'a> {
        SynthesizeRequest {
            input: SynthesisInput { text },
            voice: VoiceSelection {
                language_code: &self.language_code,
                name: &self.voice_name,
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
                speaking_rate: speed,
                sample_rate_hertz: SAMPLE_RATE_HERTZ,
            },
        }
    }
}

#[derive(Serialize)]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    #[serde(rename = "audioConfig")]
    audio_config: AudioConfig,
}

#[derive(Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct VoiceSelection<'a> {
    #[serde(rename = "languageCode")]
    language_code: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
    speaking_rate: f64,
    sample_rate_hertz: u32,
}

#[derive(Deserialize)]
struct SynthesizeResponse {
    #[serde(rename = "audioContent")]
    audio_content: Option<String>,
}

#[async_trait]
impl TtsProvider for GoogleTtsClient {
    async fn synthesize(&self, text: &str, speed: f64) -> Result<String, TtsError> {
        let api_key = self.api_key.as_deref().ok_or(TtsError::NotConfigured)?;

        let response = self
            .http
            .post(GOOGLE_TTS_ENDPOINT)
            .query(&[("key", api_key)])
            .json(&self.request_body(text, speed))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TtsError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: SynthesizeResponse = response.json().await?;
        let audio = payload
            .audio_content
            .filter(|a| !a.is_empty())
            .ok_or_else(|| TtsError::Malformed("missing audioContent".to_string()))?;

        STANDARD
            .decode(&audio)
            .map_err(|e| TtsError::Malformed(format!("audioContent is not base64: {e}")))?;

        Ok(audio)
    }

    fn language_code(&self) -> &str {
        &self.language_code
    }
}
