use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;

use cumulus_core::{Config, Units};
use cumulus_weather::{
    load_current_conditions, ConditionsView, GeoQuery, MemoryCache, RedisCache, WeatherCache,
    WeatherClient, WeatherQuery,
};

/// Current weather conditions from OpenWeather
#[derive(Debug, Parser)]
#[command(name = "cumulus", version, about)]
struct Cli {
    /// Latitude in decimal degrees
    #[arg(long, allow_hyphen_values = true, requires = "lon")]
    lat: Option<f64>,

    /// Longitude in decimal degrees
    #[arg(long, allow_hyphen_values = true, requires = "lat")]
    lon: Option<f64>,

    /// Unit system: metric, imperial or standard
    #[arg(long)]
    units: Option<Units>,

    /// Postal code to look up instead of coordinates
    #[arg(long, requires = "country", conflicts_with_all = ["lat", "lon"])]
    zip: Option<String>,

    /// Two-letter country code for --zip
    #[arg(long, requires = "zip")]
    country: Option<String>,

    /// Print the view as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    cumulus_core::init()?;
    let (config, _) = Config::load_validated()?;

    let cache = build_cache(&config).await?;
    let client = WeatherClient::new(&config.weather, cache)?;
    let units = cli.units.unwrap_or(config.weather.units);

    let view = match resolve_query(&cli, &config, &client, units).await {
        Ok(query) => load_current_conditions(&client, &query).await,
        Err(e) => ConditionsView::from_error(&e),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print!("{}", view.render());
    }

    if view.is_error() {
        std::process::exit(1);
    }
    Ok(())
}

async fn build_cache(config: &Config) -> Result<Arc<dyn WeatherCache>> {
    match &config.cache.redis_url {
        Some(url) => {
            let cache = RedisCache::connect(url)
                .await
                .context("Failed to connect to Redis")?;
            tracing::info!("Using Redis response cache");
            Ok(Arc::new(cache))
        }
        None => {
            tracing::info!("No Redis URL configured, using in-process response cache");
            Ok(Arc::new(MemoryCache::new()))
        }
    }
}

async fn resolve_query(
    cli: &Cli,
    config: &Config,
    client: &WeatherClient,
    units: Units,
) -> Result<WeatherQuery, cumulus_weather::WeatherError> {
    if let (Some(zip), Some(country)) = (&cli.zip, &cli.country) {
        let coords = client
            .resolve_coordinates(&GeoQuery::new(zip.as_str(), country.as_str()))
            .await?;
        return Ok(coords.to_weather_query(units));
    }

    Ok(match (cli.lat, cli.lon) {
        (Some(lat), Some(lon)) => WeatherQuery::new(lat, lon, units),
        _ => WeatherQuery::from_location(&config.weather.default_location, units),
    })
}
