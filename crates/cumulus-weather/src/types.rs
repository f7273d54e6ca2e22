use chrono::{DateTime, Utc};
use cumulus_core::{DefaultLocation, Units};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Coordinates and unit system for a current-conditions request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub units: Units,
}

impl WeatherQuery {
    pub fn new(latitude: f64, longitude: f64, units: Units) -> Self {
        Self {
            latitude,
            longitude,
            units,
        }
    }

    pub fn from_location(location: &DefaultLocation, units: Units) -> Self {
        Self::new(location.latitude, location.longitude, units)
    }

    /// Canonical cache key: `lat=<lat>&lon=<lon>&units=<units>`, always in this order.
    pub fn cache_key(&self) -> String {
        format!(
            "lat={}&lon={}&units={}",
            self.latitude,
            self.longitude,
            self.units.as_str()
        )
    }

    /// Query parameters sent to the provider, formatted exactly as in the cache key.
    pub fn query_params(&self) -> [(&'static str, String); 3] {
        [
            ("lat", self.latitude.to_string()),
            ("lon", self.longitude.to_string()),
            ("units", self.units.as_str().to_string()),
        ]
    }
}

/// Postal code lookup request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoQuery {
    pub postal_code: String,
    pub country_code: String,
}

impl GeoQuery {
    pub fn new(postal_code: impl Into<String>, country_code: impl Into<String>) -> Self {
        Self {
            postal_code: postal_code.into(),
            country_code: country_code.into(),
        }
    }

    /// Value of the `zip` query parameter, e.g. `K1A 0B1,CA`.
    pub fn zip_param(&self) -> String {
        format!("{},{}", self.postal_code, self.country_code)
    }
}

/// Current conditions as returned by the provider.
///
/// The payload is kept as received and serializes back to the same JSON.
/// The fields the application reads are extracted from it leniently: a
/// field that is missing, `null` or of an unexpected type reads as absent
/// instead of rejecting the whole response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub struct CurrentConditions {
    raw: Value,
    weather: Vec<ConditionSummary>,
    main: Option<MainReadings>,
    wind: Option<Wind>,
    coord: Option<Coord>,
    name: Option<String>,
    dt: Option<i64>,
}

impl From<Value> for CurrentConditions {
    fn from(raw: Value) -> Self {
        let weather = raw
            .get("weather")
            .and_then(Value::as_array)
            .map(|entries| entries.iter().map(ConditionSummary::from_value).collect())
            .unwrap_or_default();

        Self {
            weather,
            main: object(&raw, "main").map(MainReadings::from_value),
            wind: object(&raw, "wind").map(Wind::from_value),
            coord: object(&raw, "coord").and_then(Coord::from_value),
            name: field(&raw, "name"),
            dt: field(&raw, "dt"),
            raw,
        }
    }
}

impl From<CurrentConditions> for Value {
    fn from(conditions: CurrentConditions) -> Self {
        conditions.raw
    }
}

impl CurrentConditions {
    /// The payload exactly as the provider sent it.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn weather(&self) -> &[ConditionSummary] {
        &self.weather
    }

    /// First condition entry; the provider lists the dominant one first.
    pub fn primary_condition(&self) -> Option<&ConditionSummary> {
        self.weather.first()
    }

    pub fn main(&self) -> Option<&MainReadings> {
        self.main.as_ref()
    }

    pub fn wind(&self) -> Option<&Wind> {
        self.wind.as_ref()
    }

    pub fn coord(&self) -> Option<Coord> {
        self.coord
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Observation time, unix seconds
    pub fn dt(&self) -> Option<i64> {
        self.dt
    }

    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        self.dt.and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}

/// `key` of `value` as `T`, or `None` when absent or of another shape.
fn field<T: DeserializeOwned>(value: &Value, key: &str) -> Option<T> {
    value.get(key).and_then(|v| T::deserialize(v).ok())
}

fn object<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.get(key).filter(|v| v.is_object())
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionSummary {
    pub id: Option<i64>,
    pub main: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
}

impl ConditionSummary {
    fn from_value(value: &Value) -> Self {
        Self {
            id: field(value, "id"),
            main: field(value, "main"),
            description: field(value, "description"),
            icon: field(value, "icon"),
        }
    }

    pub fn category(&self) -> Option<WeatherCondition> {
        self.id.map(WeatherCondition::from_condition_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MainReadings {
    pub temp: Option<f64>,
    pub feels_like: Option<f64>,
    pub temp_min: Option<f64>,
    pub temp_max: Option<f64>,
    pub pressure: Option<f64>,
    pub humidity: Option<f64>,
}

impl MainReadings {
    fn from_value(value: &Value) -> Self {
        Self {
            temp: field(value, "temp"),
            feels_like: field(value, "feels_like"),
            temp_min: field(value, "temp_min"),
            temp_max: field(value, "temp_max"),
            pressure: field(value, "pressure"),
            humidity: field(value, "humidity"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Wind {
    pub speed: Option<f64>,
    pub deg: Option<f64>,
    pub gust: Option<f64>,
}

impl Wind {
    fn from_value(value: &Value) -> Self {
        Self {
            speed: field(value, "speed"),
            deg: field(value, "deg"),
            gust: field(value, "gust"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

impl Coord {
    fn from_value(value: &Value) -> Option<Self> {
        Some(Self {
            lat: field(value, "lat")?,
            lon: field(value, "lon")?,
        })
    }
}

/// Postal code lookup result. Never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GeoCoordinates {
    pub fn to_weather_query(&self, units: Units) -> WeatherQuery {
        WeatherQuery::new(self.lat, self.lon, units)
    }
}

/// Weather condition categories mapped from OpenWeather condition ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    HeavyRain,
    Snow,
    Sleet,
    Thunderstorm,
}

impl WeatherCondition {
    /// Convert an OpenWeather condition id to a WeatherCondition
    /// See: https://openweathermap.org/weather-conditions
    pub fn from_condition_id(id: i64) -> Self {
        match id {
            200..=299 => Self::Thunderstorm,
            300..=399 => Self::Drizzle,
            500 | 501 | 520 | 521 => Self::Rain,
            502..=504 | 522 | 531 => Self::HeavyRain,
            511 => Self::Sleet, // Freezing rain
            611..=616 => Self::Sleet,
            600..=699 => Self::Snow,
            700..=799 => Self::Fog,
            801 | 802 => Self::PartlyCloudy,
            803 | 804 => Self::Cloudy,
            _ => Self::Clear, // 800 and unknown ids
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::HeavyRain => "Heavy Rain",
            Self::Snow => "Snow",
            Self::Sleet => "Sleet",
            Self::Thunderstorm => "Thunderstorm",
        }
    }
}
