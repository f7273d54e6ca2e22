//! Postal code geocoding via the OpenWeather zip endpoint. Never cached.

use tracing::instrument;

use crate::error::WeatherError;
use crate::provider::{read_success_body, WeatherClient};
use crate::types::{GeoCoordinates, GeoQuery};

const GEO_SERVICE: &str = "OpenWeather GEO";

impl WeatherClient {
    /// Resolve a postal code and country code to coordinates.
    ///
    /// Every call reaches the network; the response cache is not consulted.
    #[instrument(skip(self), level = "info")]
    pub async fn resolve_coordinates(
        &self,
        query: &GeoQuery,
    ) -> Result<GeoCoordinates, WeatherError> {
        let api_key = self.require_api_key()?;

        let response = self
            .http
            .get(&self.geo_url)
            .query(&[("zip", query.zip_param().as_str()), ("appid", api_key)])
            .send()
            .await?;

        let body = read_success_body(response, GEO_SERVICE).await?;
        let coordinates: GeoCoordinates = serde_json::from_str(&body)?;

        tracing::info!(
            "Resolved {} to {}, {}",
            query.zip_param(),
            coordinates.lat,
            coordinates.lon
        );
        Ok(coordinates)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::cache::MemoryCache;
    use cumulus_core::WeatherConfig;
    use std::sync::Arc;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> WeatherClient {
        let config = WeatherConfig {
            api_key: Some("geo-key".to_string()),
            geo_url: format!("{}/geo/1.0/zip", server.uri()),
            ..WeatherConfig::default()
        };
        WeatherClient::new(&config, Arc::new(MemoryCache::new())).unwrap()
    }

    #[tokio::test]
    async fn test_resolve_coordinates() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/geo/1.0/zip"))
            .and(query_param("zip", "K1A 0B1,CA"))
            .and(query_param("appid", "geo-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "zip": "K1A 0B1",
                "name": "Ottawa",
                "lat": 45.4215,
                "lon": -75.6972,
                "country": "CA"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let coords = client_for(&server)
            .resolve_coordinates(&GeoQuery::new("K1A 0B1", "CA"))
            .await
            .unwrap();

        assert_eq!(coords.name.as_deref(), Some("Ottawa"));
        assert_eq!(coords.lat, 45.4215);
        assert_eq!(coords.lon, -75.6972);
    }

    #[tokio::test]
    async fn test_not_found_is_geo_provider_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/geo/1.0/zip"))
            .respond_with(
                ResponseTemplate::new(404).set_body_string(r#"{"cod":"404","message":"not found"}"#),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .resolve_coordinates(&GeoQuery::new("00000", "ZZ"))
            .await
            .unwrap_err();

        match &err {
            WeatherError::Provider { service, status, body } => {
                assert_eq!(*service, GEO_SERVICE);
                assert_eq!(*status, 404);
                assert!(body.contains("not found"));
            }
            other => unreachable!("expected provider error, got {:?}", other),
        }
        assert!(err.to_string().starts_with("OpenWeather GEO error 404"));
    }
}
