//! Current-conditions view: the loader result the presentation layer renders.
//! Failures are captured in the view instead of propagated.

use serde::Serialize;

use crate::error::WeatherError;
use crate::provider::WeatherClient;
use crate::types::{CurrentConditions, WeatherQuery};

const ERROR_HINT: &str =
    "Check that WEATHER_API_KEY is set and valid, and that Redis is running.";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionsView {
    pub current_conditions: Option<CurrentConditions>,
    pub error: Option<String>,
    /// Short explanation for people, shown under the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ConditionsView {
    pub fn loaded(conditions: CurrentConditions) -> Self {
        Self {
            current_conditions: Some(conditions),
            error: None,
            hint: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            current_conditions: None,
            error: Some(message.into()),
            hint: None,
        }
    }

    /// Failed view carrying the error's display text and its user message.
    pub fn from_error(error: &WeatherError) -> Self {
        Self {
            hint: Some(error.user_message()),
            ..Self::failed(error.to_string())
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// `"<main> - <description>"` for the first condition entry, if any.
    pub fn headline(&self) -> Option<String> {
        let primary = self.current_conditions.as_ref()?.primary_condition()?;
        let main = primary
            .main
            .clone()
            .or_else(|| primary.category().map(|c| c.description().to_string()));

        match (main, primary.description.as_deref()) {
            (Some(main), Some(description)) => Some(format!("{} - {}", main, description)),
            (Some(main), None) => Some(main),
            (None, Some(description)) => Some(description.to_string()),
            (None, None) => None,
        }
    }

    /// Plain-text page for terminal output.
    pub fn render(&self) -> String {
        if let Some(error) = &self.error {
            let mut out = format!("Weather App\nError: {}\n", error);
            if let Some(hint) = &self.hint {
                out.push_str(hint);
                out.push('\n');
            }
            out.push_str(ERROR_HINT);
            out.push('\n');
            return out;
        }

        let Some(conditions) = &self.current_conditions else {
            return "Weather App\nLoading...\n".to_string();
        };

        let mut out = String::from("Current Conditions\n");
        match self.headline() {
            Some(headline) => out.push_str(&headline),
            None => out.push_str("Weather data unavailable."),
        }
        out.push('\n');

        if let Some(observed) = conditions.observed_at() {
            out.push_str(&format!("Observed {}\n", observed.format("%Y-%m-%d %H:%M UTC")));
        }

        if let Ok(pretty) = serde_json::to_string_pretty(conditions.raw()) {
            out.push('\n');
            out.push_str(&pretty);
            out.push('\n');
        }
        out
    }
}

/// Fetch current conditions for `query` and wrap the outcome in a view.
pub async fn load_current_conditions(client: &WeatherClient, query: &WeatherQuery) -> ConditionsView {
    match client.fetch_weather(query).await {
        Ok(conditions) => ConditionsView::loaded(conditions),
        Err(e) => {
            tracing::warn!(retryable = e.is_retryable(), "Failed to load weather data: {}", e);
            ConditionsView::from_error(&e)
        }
    }
}
