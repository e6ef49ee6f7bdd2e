use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use hadal_api::{
    ApiState,
    audio::{TtsError, TtsProvider},
    config::Environment,
    router,
};
use hadal_db::{MemoryStore, SharedStore};
use http_body_util::BodyExt;
use rand::{SeedableRng, rngs::StdRng};
use serde::Deserialize;
use serde_json::Value;
use tower::ServiceExt;

/// How the fake provider answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeTtsMode {
    Succeed,
    Fail,
    Hang,
}

/// Text-to-speech double that counts calls instead of hitting the network.
pub struct FakeTts {
    mode: FakeTtsMode,
    calls: AtomicUsize,
}

impl FakeTts {
    pub fn new(mode: FakeTtsMode) -> Self {
        Self {
            mode,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TtsProvider for FakeTts {
    async fn synthesize(&self, text: &str, speed: f64) -> Result<String, TtsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match self.mode {
            FakeTtsMode::Succeed => {
                use base64::Engine;
                Ok(base64::engine::general_purpose::STANDARD.encode(format!("{text}@{speed}")))
            }
            FakeTtsMode::Fail => Err(TtsError::Status {
                status: 403,
                body: "forbidden".to_string(),
            }),
            FakeTtsMode::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Err(TtsError::Malformed("unreachable".to_string()))
            }
        }
    }

    fn language_code(&self) -> &str {
        "so-SO"
    }
}

/// Builds an `ApiState` on the in-memory store.
pub struct TestStateBuilder {
    tts_mode: FakeTtsMode,
    tts_timeout: Duration,
    seed: u64,
}

impl TestStateBuilder {
    pub fn new() -> Self {
        Self {
            tts_mode: FakeTtsMode::Succeed,
            tts_timeout: Duration::from_secs(5),
            seed: 42,
        }
    }

    pub fn tts_mode(mut self, mode: FakeTtsMode) -> Self {
        self.tts_mode = mode;
        self
    }

    pub fn tts_timeout(mut self, timeout: Duration) -> Self {
        self.tts_timeout = timeout;
        self
    }

    pub fn build(self) -> TestContext {
        let store: SharedStore = Arc::new(MemoryStore::default());
        let tts = Arc::new(FakeTts::new(self.tts_mode));

        let state = ApiState::assemble(
            store,
            tts.clone(),
            self.tts_timeout,
            StdRng::seed_from_u64(self.seed),
            Environment::Development,
        )
        .expect("Failed to assemble test state");

        TestContext {
            client: TestClient::new(router::router().with_state(state.clone())),
            state,
            tts,
        }
    }
}

impl Default for TestStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct TestContext {
    pub client: TestClient,
    pub state: ApiState,
    pub tts: Arc<FakeTts>,
}

impl TestContext {
    /// Seed the vocabulary through the API.
    pub async fn seeded(self) -> Self {
        self.client
            .post("/words/seed")
            .await
            .assert_status(StatusCode::CREATED);
        self
    }

    /// Create a progress record for `user_id`.
    pub async fn with_user(self, user_id: &str) -> Self {
        self.client
            .post(&format!("/progress/{user_id}"))
            .await
            .assert_status(StatusCode::OK);
        self
    }
}

/// Helper to make requests to the test app
pub struct TestClient {
    router: Router,
}

impl TestClient {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read response body")
            .to_bytes();

        TestResponse {
            status,
            body: body_bytes.to_vec(),
            headers,
        }
    }

    async fn send(&self, method: &str, uri: &str) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .expect("Failed to build request");

        self.request(request).await
    }

    async fn send_json<T: serde::Serialize>(&self, method: &str, uri: &str, body: &T) -> TestResponse {
        let json_body = serde_json::to_string(body).expect("Failed to serialize body");

        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(json_body))
            .expect("Failed to build request");

        self.request(request).await
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send("GET", uri).await
    }

    /// Send a POST request with no body
    pub async fn post(&self, uri: &str) -> TestResponse {
        self.send("POST", uri).await
    }

    pub async fn delete(&self, uri: &str) -> TestResponse {
        self.send("DELETE", uri).await
    }

    pub async fn post_json<T: serde::Serialize>(&self, uri: &str, body: &T) -> TestResponse {
        self.send_json("POST", uri, body).await
    }

    pub async fn put_json<T: serde::Serialize>(&self, uri: &str, body: &T) -> TestResponse {
        self.send_json("PUT", uri, body).await
    }

    /// Send a raw string body, for malformed JSON cases
    pub async fn send_raw(&self, method: &str, uri: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("Failed to build request");

        self.request(request).await
    }
}

/// Test response wrapper
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
    pub headers: axum::http::HeaderMap,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("Response body is not valid UTF-8")
    }

    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to parse JSON response")
    }

    pub fn assert_status(&self, expected: StatusCode) {
        assert_eq!(
            self.status,
            expected,
            "Expected status {}, got {}. Body: {}",
            expected,
            self.status,
            self.text()
        );
    }

    /// Assert the uniform error body and return its message.
    pub fn assert_error(&self, status: StatusCode, kind: &str) -> String {
        self.assert_status(status);
        let body: Value = self.json();
        assert_eq!(body["error"], kind, "Unexpected error body: {body}");
        body["message"]
            .as_str()
            .expect("error message should be a string")
            .to_string()
    }
}
