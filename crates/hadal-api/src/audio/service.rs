//! Read-through cache in front of the text-to-speech provider.

use std::{sync::Arc, time::Duration, time::Instant};

use chrono::Utc;
use hadal_db::{CachedAudio, SharedStore, SpeedCount, WordFilter};
use hadal_engine::{TierId, stats::round_to};
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::tts::TtsProvider;
use crate::{error::ApiError, metrics};

/// Speaking rate assumed by the duration estimate.
const WORDS_PER_MINUTE: f64 = 150.0;

/// Shortest duration ever reported.
const MIN_DURATION_SECONDS: f64 = 0.5;

/// Tiers whose words are synthesized ahead of time.
pub const PREGENERATE_TIERS: [TierId; 2] = [1, 2];

/// Normal, slow and very slow playback.
pub const PREGENERATE_SPEEDS: [f64; 3] = [1.0, 0.7, 0.4];

/// SHA-256 hex digest identifying a clip.
pub fn cache_key(text: &str, speed: f64, language_code: &str) -> String {
    let digest = Sha256::digest(format!("{text}|{speed:?}|{language_code}").as_bytes());
    hex::encode(digest)
}

/// Rough playback length in seconds at `speed`.
pub fn estimate_duration(text: &str, speed: f64) -> f64 {
    let words = text.split_whitespace().count() as f64;
    let seconds = words / WORDS_PER_MINUTE * 60.0 / speed;
    round_to(seconds.max(MIN_DURATION_SECONDS), 2)
}

#[derive(Debug, Clone, Serialize)]
pub struct SynthesizedAudio {
    /// Base64 encoded MP3
    pub audio_content: String,
    pub cache_key: String,
    pub duration_seconds: f64,
    pub cached: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AudioCacheReport {
    pub total_cached_items: i64,
    pub total_access_count: i64,
    pub average_access_count: f64,
    pub speed_distribution: Vec<SpeedCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PregenerateReport {
    pub message: String,
    pub generated_count: usize,
    pub skipped_count: usize,
    pub failed_count: usize,
    pub total_words_processed: usize,
    pub speeds_generated: Vec<f64>,
}

/// Read-through cache in front of the speech provider.
pub struct AudioService {
    store: SharedStore,
    tts: Arc<dyn TtsProvider>,
    timeout: Duration,
}

impl AudioService {
    pub fn new(store: SharedStore, tts: Arc<dyn TtsProvider>, timeout: Duration) -> Self {
        Self {
            store,
            tts,
            timeout,
        }
    }

    fn key_for(&self, text: &str, speed: f64) -> String {
        cache_key(text, speed, self.tts.language_code())
    }

    /// Call the provider, bounded by the configured timeout.
    async fn call_provider(&self, text: &str, speed: f64) -> Result<String, ApiError> {
        let start = Instant::now();
        let result = tokio::time::timeout(self.timeout, self.tts.synthesize(text, speed)).await;
        let elapsed = start.elapsed().as_secs_f64();

        match result {
            Ok(Ok(audio)) => {
                metrics::record_tts_call(elapsed, true);
                Ok(audio)
            }
            Ok(Err(e)) => {
                metrics::record_tts_call(elapsed, false);
                Err(e.into())
            }
            Err(_) => {
                metrics::record_tts_call(elapsed, false);
                Err(ApiError::UpstreamTimeout(format!(
                    "Text-to-speech did not answer within {}s",
                    self.timeout.as_secs()
                )))
            }
        }
    }

    /// Serve `text` from the cache, synthesizing and storing it on a miss.
    pub async fn synthesize(&self, text: &str, speed: f64) -> Result<SynthesizedAudio, ApiError> {
        let key = self.key_for(text, speed);

        if let Some(clip) = self.store.find_audio(&key).await? {
            metrics::record_audio_lookup(true);
            tracing::debug!(cache_key = %key, "Serving cached audio");
            return Ok(SynthesizedAudio {
                audio_content: clip.audio_content,
                cache_key: key,
                duration_seconds: clip.duration_seconds,
                cached: true,
            });
        }

        metrics::record_audio_lookup(false);
        let audio_content = self.call_provider(text, speed).await?;
        let duration_seconds = estimate_duration(text, speed);

        // A concurrent miss on the same key overwrites with equivalent audio
        self.store
            .upsert_audio(&CachedAudio {
                cache_key: key.clone(),
                text: text.to_string(),
                speed,
                audio_content: audio_content.clone(),
                duration_seconds,
                access_count: 1,
                pregenerated: false,
                created_at: Utc::now(),
            })
            .await?;

        tracing::info!(cache_key = %key, speed, "Generated and cached new audio");

        Ok(SynthesizedAudio {
            audio_content,
            cache_key: key,
            duration_seconds,
            cached: false,
        })
    }

    pub async fn stats(&self) -> Result<AudioCacheReport, ApiError> {
        let stats = self.store.audio_stats().await?;

        Ok(AudioCacheReport {
            total_cached_items: stats.total_cached_items,
            total_access_count: stats.total_access_count,
            average_access_count: round_to(stats.average_access_count, 2),
            speed_distribution: stats.speed_distribution,
        })
    }

    /// Remove every cached clip. Returns the number removed.
    pub async fn clear(&self) -> Result<u64, ApiError> {
        let cleared = self.store.clear_audio().await?;
        tracing::info!(cleared, "Cleared audio cache");
        Ok(cleared)
    }

    /// Synthesize the words of the first tiers at every preset speed.
    ///
    /// Clips already cached are skipped. Provider failures are logged and
    /// counted, they do not abort the run.
    pub async fn pregenerate(&self) -> Result<PregenerateReport, ApiError> {
        let mut words = Vec::new();
        for tier in PREGENERATE_TIERS {
            words.extend(
                self.store
                    .find_words(&WordFilter {
                        tier: Some(tier),
                        ..WordFilter::default()
                    })
                    .await?,
            );
        }

        let mut generated = 0;
        let mut skipped = 0;
        let mut failed = 0;

        for word in &words {
            for speed in PREGENERATE_SPEEDS {
                let key = self.key_for(&word.somali, speed);
                if self.store.audio_exists(&key).await? {
                    skipped += 1;
                    continue;
                }

                let audio_content = match self.call_provider(&word.somali, speed).await {
                    Ok(audio) => audio,
                    Err(e) => {
                        tracing::warn!(word_id = %word.id, speed, error = %e, "Pregeneration failed");
                        failed += 1;
                        continue;
                    }
                };

                self.store
                    .upsert_audio(&CachedAudio {
                        cache_key: key,
                        text: word.somali.clone(),
                        speed,
                        audio_content,
                        duration_seconds: estimate_duration(&word.somali, speed),
                        access_count: 0,
                        pregenerated: true,
                        created_at: Utc::now(),
                    })
                    .await?;
                generated += 1;
            }
        }

        tracing::info!(generated, skipped, failed, "Audio pregeneration finished");

        Ok(PregenerateReport {
            message: format!("Pre-generated {generated} audio files"),
            generated_count: generated,
            skipped_count: skipped,
            failed_count: failed,
            total_words_processed: words.len(),
            speeds_generated: PREGENERATE_SPEEDS.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_is_stable_sha256_hex() {
        let key = cache_key("Salaan", 1.0, "so-SO");

        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(key, cache_key("Salaan", 1.0, "so-SO"));
        assert_ne!(key, cache_key("Salaan", 0.7, "so-SO"));
        assert_ne!(key, cache_key("Salaan", 1.0, "en-US"));
    }

    #[test]
    fn test_estimate_duration() {
        // 150 words per minute at normal speed
        let text = vec!["erey"; 150].join(" ");
        assert_eq!(estimate_duration(&text, 1.0), 60.0);
        assert_eq!(estimate_duration(&text, 2.0), 30.0);

        // Short phrases bottom out
        assert_eq!(estimate_duration("Haa", 1.0), 0.5);
        assert_eq!(estimate_duration("", 1.0), 0.5);
    }
}
