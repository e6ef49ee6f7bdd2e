mod routes;
pub mod service;
pub mod tts;

pub use routes::routes;
pub use service::AudioService;
pub use tts::{GoogleTtsClient, TtsError, TtsProvider};
