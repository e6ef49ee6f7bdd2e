pub mod audio;
pub mod config;
pub mod error;
pub mod jobs;
pub mod locks;
pub mod metrics;
pub mod middleware;
pub mod progress;
pub mod quiz;
pub mod router;
pub mod state;
pub mod tiers;
pub mod tracing;
pub mod validation;
pub mod words;

pub use config::ApiConfig;
pub use state::ApiState;
