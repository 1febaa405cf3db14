use crate::cancel::CancelSignal;
use crate::config::ScraperConfig;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} responded with {status}")]
    Status { url: String, status: StatusCode },
    #[error("Request to {url} was cancelled")]
    Cancelled { url: String },
    #[error("Failed to create HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

impl FetchError {
    /// HTTP status of a status failure
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Trait for page retrieval (allows mocking for tests)
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    /// GET `url` and return the body text. Never retries.
    async fn fetch_page(&self, url: &str, cancel: &CancelSignal) -> Result<String, FetchError>;
}

/// Plain unauthenticated GET over reqwest
#[derive(Clone)]
pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new(config: &ScraperConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client })
    }

    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        debug!("Response status for {}: {}", url, status);
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        response.text().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait::async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(&self, url: &str, cancel: &CancelSignal) -> Result<String, FetchError> {
        let cancelled = || FetchError::Cancelled {
            url: url.to_string(),
        };
        if cancel.is_cancelled() {
            return Err(cancelled());
        }

        debug!("GET {}", url);
        tokio::select! {
            result = self.get_text(url) => result,
            _ = cancel.cancelled() => Err(cancelled()),
        }
    }
}
