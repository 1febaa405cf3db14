use crate::cancel::CancelSignal;
use crate::config::ScraperConfig;
use crate::feeds::FeedId;
use crate::fetch::{FetchError, PageFetcher};
use crate::models::{PageResult, ScrapedSong};
use crate::normalize;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Last page index to read: the server's last page, capped by `max_pages`
/// when that is non-zero.
pub fn last_page_to_read(server_last_page: u64, max_pages: u32) -> u64 {
    if max_pages > 0 {
        server_last_page.min(u64::from(max_pages) - 1)
    } else {
        server_last_page
    }
}

/// Reads every page of a feed and joins the songs in page order
#[derive(Clone)]
pub struct PageCollector {
    fetcher: Arc<dyn PageFetcher>,
    max_concurrent_pages: usize,
}

impl PageCollector {
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: &ScraperConfig) -> Self {
        Self {
            fetcher,
            max_concurrent_pages: config.max_concurrent_pages,
        }
    }

    /// Collect the songs of `feed` with the given token bindings.
    ///
    /// Page 0 is fetched first to learn `totalDocs` and `lastPage`; if that
    /// fails or reports nothing, the result is empty. A page 0 without
    /// `lastPage` is read as the only page. The remaining pages are
    /// fetched concurrently. A page that fails contributes no songs, so the
    /// result is best-effort. Songs come back in page order, then in the
    /// order the server listed them.
    pub async fn collect(
        &self,
        feed: FeedId,
        max_pages: u32,
        replacements: &[(&str, &str)],
        cancel: &CancelSignal,
    ) -> Vec<ScrapedSong> {
        let first_url = feed.page_url(0, replacements);
        let Some(first_page) = self.fetch_and_parse(&first_url, cancel).await else {
            warn!("Error checking the {} feed at {}", feed.name(), first_url);
            return Vec::new();
        };

        let (total_docs, server_last_page) = match (first_page.total_docs, first_page.last_page) {
            (Some(total), last) if total > 0 => (total, last.unwrap_or(0)),
            _ => {
                warn!("No songs found on the {} feed at {}", feed.name(), first_url);
                return Vec::new();
            }
        };
        let last_page = last_page_to_read(server_last_page, max_pages);
        info!(
            "Checking the {} feed, {} songs available, reading pages 0..={}",
            feed.name(),
            total_docs,
            last_page
        );

        let remaining = usize::try_from(last_page).unwrap_or(usize::MAX);
        let limit = match self.max_concurrent_pages {
            0 => remaining.max(1),
            n => n,
        };

        let later_pages: Vec<Vec<ScrapedSong>> = stream::iter(1..=last_page)
            .map(|page| {
                let url = feed.page_url(page, replacements);
                async move {
                    if cancel.is_cancelled() {
                        debug!("Cancelled before reading {}", url);
                        return Vec::new();
                    }
                    debug!("Creating task for {}", url);
                    self.fetch_and_parse(&url, cancel)
                        .await
                        .map(|page| page.songs)
                        .unwrap_or_default()
                }
            })
            .buffered(limit)
            .collect()
            .await;

        let mut songs = first_page.songs;
        for page_songs in later_pages {
            songs.extend(page_songs);
        }
        songs
    }

    /// Fetch and normalize one page, logging instead of failing
    pub async fn fetch_and_parse(&self, url: &str, cancel: &CancelSignal) -> Option<PageResult> {
        let body = match self.fetcher.fetch_page(url, cancel).await {
            Ok(body) => body,
            Err(e @ FetchError::Cancelled { .. }) => {
                debug!("{}", e);
                return None;
            }
            Err(e) => {
                error!("Error getting songs from page: {}", e);
                return None;
            }
        };

        match normalize::parse_page(&body) {
            Ok(page) => Some(page),
            Err(e) => {
                error!("Error reading songs from {}: {}", url, e);
                None
            }
        }
    }
}
