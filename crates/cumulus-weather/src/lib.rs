//! Weather service for Cumulus
//!
//! Fetches current conditions from OpenWeather through a cache-aside
//! response cache, and resolves postal codes to coordinates.

pub mod cache;
pub mod conditions;
pub mod error;
pub mod geocode;
pub mod provider;
pub mod redis_cache;
pub mod types;

pub use cache::{Clock, ManualClock, MemoryCache, SystemClock, WeatherCache, CACHE_TTL};
pub use conditions::{load_current_conditions, ConditionsView};
pub use cumulus_core::Units;
pub use error::{CacheError, WeatherError};
pub use provider::WeatherClient;
pub use redis_cache::RedisCache;
pub use types::*;
