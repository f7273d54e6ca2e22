//! OpenWeather client: cache-aside current conditions.

use cumulus_core::{ConfigError, WeatherConfig, WEATHER_API_KEY_VAR};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::cache::{WeatherCache, CACHE_TTL};
use crate::error::WeatherError;
use crate::types::{CurrentConditions, WeatherQuery};

const USER_AGENT: &str = concat!("Cumulus/", env!("CARGO_PKG_VERSION"));
const WEATHER_SERVICE: &str = "OpenWeather";

/// Client for the weather and geocoding endpoints.
///
/// Configuration and the cache are injected at construction; nothing is
/// read from the environment per call.
#[derive(Clone)]
pub struct WeatherClient {
    pub(crate) http: Client,
    cache: Arc<dyn WeatherCache>,
    api_key: Option<String>,
    weather_url: String,
    pub(crate) geo_url: String,
}

impl std::fmt::Debug for WeatherClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherClient")
            .field("weather_url", &self.weather_url)
            .field("geo_url", &self.geo_url)
            .field("api_key_set", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

impl WeatherClient {
    pub fn new(config: &WeatherConfig, cache: Arc<dyn WeatherCache>) -> Result<Self, WeatherError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            cache,
            api_key: config.api_key().map(str::to_string),
            weather_url: config.weather_url.clone(),
            geo_url: config.geo_url.clone(),
        })
    }

    /// The configured API key, or the configuration error every operation
    /// must fail with before doing any I/O.
    pub(crate) fn require_api_key(&self) -> Result<&str, WeatherError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingSetting(WEATHER_API_KEY_VAR.to_string()).into())
    }

    /// Current conditions for `query`, served from cache when present.
    ///
    /// On a miss the provider is called once and its raw response text is
    /// cached for [`CACHE_TTL`]. Failed responses are never cached.
    #[instrument(skip(self), fields(key = %query.cache_key()), level = "info")]
    pub async fn fetch_weather(
        &self,
        query: &WeatherQuery,
    ) -> Result<CurrentConditions, WeatherError> {
        let api_key = self.require_api_key()?;
        let cache_key = query.cache_key();

        // An empty entry is treated as a miss
        let cached = self.cache.get(&cache_key).await?;
        if let Some(cached) = cached.filter(|body| !body.is_empty()) {
            tracing::debug!("Weather cache hit");
            return Ok(serde_json::from_str(&cached)?);
        }
        tracing::debug!("Weather cache miss, calling provider");

        let response = self
            .http
            .get(&self.weather_url)
            .query(&query.query_params())
            .query(&[("appid", api_key)])
            .send()
            .await?;

        let body = read_success_body(response, WEATHER_SERVICE).await?;

        self.cache.set(&cache_key, &body, CACHE_TTL).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Response text on success, otherwise a provider error with status and body.
pub(crate) async fn read_success_body(
    response: reqwest::Response,
    service: &'static str,
) -> Result<String, WeatherError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        tracing::debug!(%status, service, "Provider returned failure status");
        return Err(WeatherError::Provider {
            service,
            status: status.as_u16(),
            body,
        });
    }

    Ok(body)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::cache::MemoryCache;
    use cumulus_core::Units;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> WeatherConfig {
        WeatherConfig {
            api_key: Some("test-key".to_string()),
            weather_url: format!("{}/data/2.5/weather", server.uri()),
            geo_url: format!("{}/geo/1.0/zip", server.uri()),
            ..WeatherConfig::default()
        }
    }

    #[tokio::test]
    async fn test_sends_query_params_and_api_key() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("lat", "45.4215"))
            .and(query_param("lon", "-75.6972"))
            .and(query_param("units", "metric"))
            .and(query_param("appid", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "weather": [{"id": 800, "main": "Clear", "description": "clear sky"}],
                "main": {"temp": 18.2},
                "name": "Ottawa"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = WeatherClient::new(&config_for(&server), Arc::new(MemoryCache::new())).unwrap();
        let conditions = client
            .fetch_weather(&WeatherQuery::new(45.4215, -75.6972, Units::Metric))
            .await
            .unwrap();

        assert_eq!(conditions.name(), Some("Ottawa"));
        assert_eq!(conditions.main().and_then(|m| m.temp), Some(18.2));
    }

    #[tokio::test]
    async fn test_different_units_are_separate_entries() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"weather":[]}"#))
            .expect(2)
            .mount(&server)
            .await;

        let client = WeatherClient::new(&config_for(&server), Arc::new(MemoryCache::new())).unwrap();
        client
            .fetch_weather(&WeatherQuery::new(1.0, 2.0, Units::Metric))
            .await
            .unwrap();
        client
            .fetch_weather(&WeatherQuery::new(1.0, 2.0, Units::Imperial))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_non_json_success_body_is_parse_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = WeatherClient::new(&config_for(&server), Arc::new(MemoryCache::new())).unwrap();
        let result = client
            .fetch_weather(&WeatherQuery::new(1.0, 2.0, Units::Metric))
            .await;

        assert!(matches!(result, Err(WeatherError::Parse(_))));
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_network_error() {
        let config = WeatherConfig {
            api_key: Some("k".to_string()),
            // Port 9 (discard) on localhost is closed in test environments
            weather_url: "http://127.0.0.1:9/data/2.5/weather".to_string(),
            ..WeatherConfig::default()
        };
        let client = WeatherClient::new(&config, Arc::new(MemoryCache::new())).unwrap();
        let result = client
            .fetch_weather(&WeatherQuery::new(1.0, 2.0, Units::Metric))
            .await;

        assert!(matches!(result, Err(WeatherError::Network(_))));
    }

    #[test]
    fn test_debug_hides_api_key() {
        let config = WeatherConfig {
            api_key: Some("super-secret".to_string()),
            ..WeatherConfig::default()
        };
        let client = WeatherClient::new(&config, Arc::new(MemoryCache::new())).unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("api_key_set: true"));
    }
}
