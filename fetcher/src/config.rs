use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_KAKAO_API_BASE_URL: &str = "https://dapi.kakao.com";
pub const DEFAULT_AIR_KOREA_API_BASE_URL: &str = "https://apis.data.go.kr";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing env var: {0}")]
    Missing(&'static str),

    #[error("Invalid value '{value}' for env var {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub kakao_api_key: String,
    pub air_korea_service_key: String,
    pub kakao_api_base_url: String,
    pub air_korea_api_base_url: String,
    pub http_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`; blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let required = |key: &'static str| read(key).ok_or(ConfigError::Missing(key));

        let http_timeout = match read("HTTP_TIMEOUT_SECS") {
            Some(value) => value
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or(ConfigError::Invalid {
                    key: "HTTP_TIMEOUT_SECS",
                    value,
                })?,
            None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        };

        Ok(Self {
            kakao_api_key: required("KAKAO_API_KEY")?,
            air_korea_service_key: required("AIR_KOREA_SERVICE_KEY")?,
            kakao_api_base_url: read("KAKAO_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_KAKAO_API_BASE_URL.to_string()),
            air_korea_api_base_url: read("AIR_KOREA_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_AIR_KOREA_API_BASE_URL.to_string()),
            http_timeout,
        })
    }
}
