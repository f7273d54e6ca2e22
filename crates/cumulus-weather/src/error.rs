//! Weather-specific error types.

use cumulus_core::{ConfigError, NetworkError, ReqwestErrorExt};
use thiserror::Error;

/// Failures of the response cache backend.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache backend failure: {0}")]
    Backend(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Backend(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum WeatherError {
    /// A required setting (the API key) is absent.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The provider answered with a non-success status.
    #[error("{service} error {status}: {body}")]
    Provider {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        WeatherError::Network(err.into_network_error())
    }
}

impl WeatherError {
    /// User-friendly error message for display.
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(e) => e.user_message().to_string(),
            Self::Provider { status: 401, .. } => {
                "Weather API key is invalid. Check settings.".to_string()
            }
            Self::Provider { status: 404, .. } => {
                "Location not found. Check and try again.".to_string()
            }
            Self::Provider { status, .. } if *status >= 500 => {
                "Weather service unavailable. Please try again later.".to_string()
            }
            Self::Provider { status, .. } => format!("Weather service error ({}).", status),
            Self::Network(e) => e.user_message().to_string(),
            Self::Parse(_) => "Received unexpected weather data.".to_string(),
            Self::Cache(_) => "Weather cache is unavailable.".to_string(),
        }
    }

    /// Whether a later attempt could succeed. The client itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Provider { status, .. } => *status == 429 || *status >= 500,
            Self::Network(e) => e.is_transient(),
            Self::Config(_) | Self::Parse(_) | Self::Cache(_) => false,
        }
    }
}
