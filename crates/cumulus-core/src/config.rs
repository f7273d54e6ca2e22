use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Environment variable holding the OpenWeather API key.
pub const WEATHER_API_KEY_VAR: &str = "WEATHER_API_KEY";

/// Environment variable holding the Redis connection URL.
pub const REDIS_URL_VAR: &str = "REDIS_URL";

const DEFAULT_WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
const DEFAULT_GEO_URL: &str = "http://api.openweathermap.org/geo/1.0/zip";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// Weather provider settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Response cache settings
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Unit system requested from the weather provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    /// Kelvin, meters/sec
    Standard,
    /// Celsius, meters/sec
    #[default]
    Metric,
    /// Fahrenheit, miles/hour
    Imperial,
}

impl Units {
    /// Wire form used in query strings and cache keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Standard => "standard",
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }
}

impl std::fmt::Display for Units {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Units {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(Units::Standard),
            "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            other => Err(ConfigError::Invalid(format!("unknown units: {}", other))),
        }
    }
}

/// Location used when no coordinates are given
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DefaultLocation {
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for DefaultLocation {
    fn default() -> Self {
        // Ottawa
        Self {
            latitude: 45.4215,
            longitude: -75.6972,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// OpenWeather API key (usually supplied via `WEATHER_API_KEY`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Current weather endpoint
    pub weather_url: String,

    /// Postal code geocoding endpoint
    pub geo_url: String,

    /// HTTP request timeout in seconds
    pub request_timeout_secs: u64,

    /// Unit system preference
    pub units: Units,

    /// Location used when none is given on the command line
    pub default_location: DefaultLocation,
}

impl WeatherConfig {
    /// The API key, if one is set and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            weather_url: DEFAULT_WEATHER_URL.to_string(),
            geo_url: DEFAULT_GEO_URL.to_string(),
            request_timeout_secs: 10,
            units: Units::default(),
            default_location: DefaultLocation::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Redis connection URL; an in-process cache is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis_url: Option<String>,
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cumulus")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            weather: WeatherConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, writing defaults there if missing
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(config_path)
            .context("Failed to read config file")?;

        let config = Self::from_toml_str(&contents)
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Parse configuration from TOML text; missing sections take defaults
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Override settings from the process environment
    pub fn apply_env(self) -> Self {
        self.apply_env_with(|name| std::env::var(name).ok())
    }

    /// Override settings from an arbitrary variable lookup
    pub fn apply_env_with<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(WEATHER_API_KEY_VAR).filter(|v| !v.trim().is_empty()) {
            self.weather.api_key = Some(key);
        }
        if let Some(url) = lookup(REDIS_URL_VAR).filter(|v| !v.trim().is_empty()) {
            self.cache.redis_url = Some(url);
        }
        self
    }

    /// Load configuration, apply environment overrides, and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?.apply_env();
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        validate_http_url(&self.weather.weather_url, "weather.weather_url", &mut result);
        validate_http_url(&self.weather.geo_url, "weather.geo_url", &mut result);

        if self.weather.request_timeout_secs == 0 {
            result.add_error(
                "weather.request_timeout_secs",
                "Request timeout must be greater than 0",
            );
        } else if self.weather.request_timeout_secs > 120 {
            result.add_warning(
                "weather.request_timeout_secs",
                "Request timeout is unusually long (>120s)",
            );
        }

        let location = &self.weather.default_location;
        if !(-90.0..=90.0).contains(&location.latitude) {
            result.add_error(
                "weather.default_location.latitude",
                format!("Latitude out of range: {}", location.latitude),
            );
        }
        if !(-180.0..=180.0).contains(&location.longitude) {
            result.add_error(
                "weather.default_location.longitude",
                format!("Longitude out of range: {}", location.longitude),
            );
        }

        // The client enforces the key per request; here it is only a warning
        if self.weather.api_key().is_none() {
            result.add_warning(
                "weather.api_key",
                format!("{} is not set - weather requests will fail", WEATHER_API_KEY_VAR),
            );
        }

        if let Some(redis_url) = &self.cache.redis_url {
            match Url::parse(redis_url) {
                Ok(url) if url.scheme() == "redis" || url.scheme() == "rediss" => {}
                Ok(url) => result.add_error(
                    "cache.redis_url",
                    format!("URL must use redis or rediss scheme, got: {}", url.scheme()),
                ),
                Err(e) => result.add_error("cache.redis_url", format!("Invalid URL: {}", e)),
            }
        }

        result
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Ensure config directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(config_path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("cumulus");

        Ok(config_dir.join("config.toml"))
    }
}

/// Validate a URL field
fn validate_http_url(url_str: &str, field_name: &str, result: &mut ValidationResult) {
    match Url::parse(url_str) {
        Ok(url) => {
            if url.scheme() != "http" && url.scheme() != "https" {
                result.add_error(
                    field_name,
                    format!("URL must use http or https scheme, got: {}", url.scheme()),
                );
            }

            if url.host().is_none() {
                result.add_error(field_name, "URL must have a host");
            }
        }
        Err(e) => {
            result.add_error(field_name, format!("Invalid URL: {}", e));
        }
    }
}
