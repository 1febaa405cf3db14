// Library exports for integration tests and reusable components

pub mod aggregate;
pub mod authors;
pub mod cancel;
pub mod config;
pub mod feeds;
pub mod fetch;
pub mod models;
pub mod normalize;
pub mod pagination;
pub mod reader;

// Re-export the types most callers need at crate root
pub use cancel::CancelSignal;
pub use config::ScraperConfig;
pub use feeds::FeedId;
pub use models::{FeedQuery, ScrapedSong};
pub use reader::{FeedError, FeedReader, SearchType};

// Test support (only available in unit tests or with the test-utils feature)
#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;
