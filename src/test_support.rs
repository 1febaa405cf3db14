// Test support utilities for both unit and integration tests

use crate::cancel::CancelSignal;
use crate::fetch::{FetchError, PageFetcher};
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

enum MockResponse {
    Body(String),
    Status(StatusCode),
}

/// Mock page fetcher for testing
///
/// Serves bodies from memory instead of hitting the catalog and records every
/// URL that was requested. Unknown URLs answer 404.
#[derive(Default)]
pub struct MockPageFetcher {
    responses: Mutex<HashMap<String, MockResponse>>,
    delays: Mutex<HashMap<String, Duration>>,
    requests: Mutex<Vec<String>>,
}

impl MockPageFetcher {
    /// Create a new mock fetcher with no pages
    #[allow(unused)] // Used in tests
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`
    pub fn with_page(self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(url.into(), MockResponse::Body(body.into()));
        self
    }

    /// Answer `url` with a non-success status
    pub fn with_status(self, url: impl Into<String>, status: StatusCode) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(url.into(), MockResponse::Status(status));
        self
    }

    /// Hold the response for `url` back by `delay`
    pub fn with_delay(self, url: impl Into<String>, delay: Duration) -> Self {
        self.delays.lock().unwrap().insert(url.into(), delay);
        self
    }

    /// URLs requested so far, in request order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// How many times `url` was requested
    pub fn request_count(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }
}

#[async_trait::async_trait]
impl PageFetcher for MockPageFetcher {
    async fn fetch_page(&self, url: &str, cancel: &CancelSignal) -> Result<String, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled {
                url: url.to_string(),
            });
        }
        self.requests.lock().unwrap().push(url.to_string());

        let delay = self.delays.lock().unwrap().get(url).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match self.responses.lock().unwrap().get(url) {
            Some(MockResponse::Body(body)) => Ok(body.clone()),
            Some(MockResponse::Status(status)) => Err(FetchError::Status {
                url: url.to_string(),
                status: *status,
            }),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: StatusCode::NOT_FOUND,
            }),
        }
    }
}

/// Build a collection page body with one document per `(key, hash, name, uploader)`
pub fn collection_page(
    total_docs: u64,
    last_page: u64,
    docs: &[(&str, &str, &str, &str)],
) -> String {
    let docs: Vec<_> = docs
        .iter()
        .map(|(key, hash, name, uploader)| song_document(key, hash, name, uploader))
        .collect();
    serde_json::json!({
        "totalDocs": total_docs,
        "lastPage": last_page,
        "docs": docs,
    })
    .to_string()
}

/// A single song document; the uploader id is `id-<uploader>`
pub fn song_document(key: &str, hash: &str, name: &str, uploader: &str) -> serde_json::Value {
    serde_json::json!({
        "key": key,
        "hash": hash,
        "name": name,
        "uploader": { "_id": format!("id-{}", uploader), "username": uploader },
    })
}
