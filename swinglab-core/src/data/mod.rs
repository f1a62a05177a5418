//! Price data: providers, circuit breaker, and the on-disk cache.

pub mod alpha_vantage;
pub mod cache;
pub mod circuit_breaker;
pub mod csv_import;
pub mod provider;

pub use alpha_vantage::AlphaVantageProvider;
pub use cache::{hash_bars, BarCache, CacheEntry, CacheMeta};
pub use circuit_breaker::CircuitBreaker;
pub use csv_import::CsvProvider;
pub use provider::{DataError, DataProvider, DataSource, FetchResult};
