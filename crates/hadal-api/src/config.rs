use serde::Deserialize;

/// Deployment environment, read from `ENVIRONMENT`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub const fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    pub const fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8001
}

const fn default_db_max_connections() -> u32 {
    10
}

fn default_allowed_origins() -> String {
    "http://localhost:3000".to_string()
}

fn default_tts_language_code() -> String {
    "so-SO".to_string()
}

fn default_tts_voice_name() -> String {
    "so-SO-Standard-B".to_string()
}

const fn default_tts_timeout_secs() -> u64 {
    15
}

const fn default_audio_cache_ttl_days() -> i64 {
    30
}

/// Process configuration, loaded from environment variables with `envy`.
///
/// Field names map to upper-case variables (`database_url` is read from
/// `DATABASE_URL`). Only optional integrations may be left unset.
#[derive(Clone, Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Without a database URL the server runs on the in-memory store
    pub database_url: Option<String>,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    /// Comma separated list
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: String,
    pub google_tts_api_key: Option<String>,
    #[serde(default = "default_tts_language_code")]
    pub tts_language_code: String,
    #[serde(default = "default_tts_voice_name")]
    pub tts_voice_name: String,
    #[serde(default = "default_tts_timeout_secs")]
    pub tts_timeout_secs: u64,
    #[serde(default = "default_audio_cache_ttl_days")]
    pub audio_cache_ttl_days: i64,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    pub fn parsed_allowed_origins(&self) -> Vec<String> {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config: ApiConfig = envy::from_iter(vars(&[])).unwrap();

        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.bind_address(), "0.0.0.0:8001");
        assert!(config.database_url.is_none());
        assert!(config.google_tts_api_key.is_none());
        assert_eq!(config.tts_language_code, "so-SO");
        assert_eq!(config.audio_cache_ttl_days, 30);
    }

    #[test]
    fn test_overrides() {
        let config: ApiConfig = envy::from_iter(vars(&[
            ("ENVIRONMENT", "production"),
            ("PORT", "9000"),
            ("DATABASE_URL", "postgres://localhost/hadal"),
            ("ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
        ]))
        .unwrap();

        assert!(config.environment.is_production());
        assert_eq!(config.port, 9000);
        assert_eq!(
            config.parsed_allowed_origins(),
            vec!["https://a.example", "https://b.example"]
        );
    }
}
