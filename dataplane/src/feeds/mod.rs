//! Market data feeds consumed by the snapshot collector

pub mod http;
pub mod static_feed;
pub mod traits;

// Re-export commonly used types
pub use http::{HttpFeedConfig, HttpMarketDataFeed};
pub use static_feed::StaticMarketDataFeed;
pub use traits::MarketDataProvider;
