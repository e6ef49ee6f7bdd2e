//! Prometheus metrics: HTTP request tracking plus learning domain counters.

use std::{sync::LazyLock, time::Instant};

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use regex::Regex;

static UUID_SEGMENT: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}").ok()
});
static NUMBER_SEGMENT: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"/\d+").ok());

/// Install the Prometheus recorder and return the handle `/metrics` renders.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        )?
        .set_buckets_for_metric(
            Matcher::Full("tts_synthesis_duration_seconds".to_string()),
            &[0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 15.0],
        )?
        .install_recorder()?;

    Ok(handle)
}

/// Middleware recording request count and latency per normalized path.
pub async fn track_metrics(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = normalize_path(req.uri().path());

    let response = next.run(req).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!(
        "http_requests_total",
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status.clone()
    )
    .increment(1);

    histogram!(
        "http_request_duration_seconds",
        "method" => method,
        "path" => path,
        "status" => status
    )
    .record(duration);

    response
}

/// Replace ids in a path with `:id` to keep label cardinality low.
///
/// Word ids (`word_12`) and user ids are free-form and collapse only when
/// they are numeric or UUIDs.
fn normalize_path(path: &str) -> String {
    let mut normalized = path.to_string();

    if let Some(re) = UUID_SEGMENT.as_ref() {
        normalized = re.replace_all(&normalized, ":id").into_owned();
    }
    if let Some(re) = NUMBER_SEGMENT.as_ref() {
        normalized = re.replace_all(&normalized, "/:id").into_owned();
    }

    normalized
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (StatusCode::OK, handle.render())
}

/// A batch of progress events was applied.
pub fn record_progress_update(event_kinds: &[&'static str], points_added: u32, tiers_unlocked: usize) {
    for kind in event_kinds {
        counter!("progress_events_total", "type" => *kind).increment(1);
    }
    counter!("points_awarded_total").increment(u64::from(points_added));
    counter!("tiers_unlocked_total").increment(tiers_unlocked as u64);
}

pub fn record_badge_awarded(badge: &str) {
    counter!("badges_awarded_total", "badge" => badge.to_string()).increment(1);
}

pub fn record_quiz_generated(question_count: usize) {
    counter!("quizzes_generated_total").increment(1);
    histogram!("quiz_question_count").record(question_count as f64);
}

pub fn record_quiz_answer(correct: bool) {
    let outcome = if correct { "correct" } else { "incorrect" };
    counter!("quiz_answers_total", "outcome" => outcome).increment(1);
}

pub fn record_quiz_completed() {
    counter!("quizzes_completed_total").increment(1);
}

/// `hit` is false when the clip had to be synthesized.
pub fn record_audio_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("audio_cache_lookups_total", "result" => result).increment(1);
}

pub fn record_tts_call(duration_secs: f64, success: bool) {
    let status = if success { "success" } else { "failure" };

    counter!("tts_requests_total", "status" => status).increment(1);
    histogram!("tts_synthesis_duration_seconds").record(duration_secs);
}
