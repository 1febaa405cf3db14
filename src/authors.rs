use crate::cancel::CancelSignal;
use crate::feeds::{FeedId, SEARCH_KEY, SEARCH_TYPE_KEY, TEXT_SEARCH_TYPE};
use crate::fetch::{FetchError, PageFetcher};
use crate::normalize::parse_search_page;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Results per page on the search feed
pub const AUTHOR_SEARCH_PAGE_SIZE: u64 = 10;

#[derive(Error, Debug)]
pub enum AuthorError {
    #[error("Error getting uploader id for {name}: {source}")]
    Fetch {
        name: String,
        #[source]
        source: FetchError,
    },
}

/// Name → uploader id cache (allows sharing or mocking across resolvers)
///
/// Names are compared case-insensitively. Entries are never invalidated.
#[async_trait::async_trait]
pub trait AuthorCache: Send + Sync {
    async fn get(&self, name: &str) -> Option<String>;
    /// Store `id` for `name` unless an id is already cached; returns the cached id
    async fn get_or_insert(&self, name: &str, id: String) -> String;
}

/// Process-lifetime in-memory author cache
#[derive(Clone, Default)]
pub struct InMemoryAuthorCache {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryAuthorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl AuthorCache for InMemoryAuthorCache {
    async fn get(&self, name: &str) -> Option<String> {
        self.entries.read().await.get(&name.to_lowercase()).cloned()
    }

    async fn get_or_insert(&self, name: &str, id: String) -> String {
        let mut entries = self.entries.write().await;
        entries.entry(name.to_lowercase()).or_insert(id).clone()
    }
}

/// URL of one page of the uploader-name search
pub fn author_search_url(name: &str, page: u64) -> String {
    let encoded = urlencoding::encode(name);
    FeedId::Search.page_url(
        page * AUTHOR_SEARCH_PAGE_SIZE,
        &[(SEARCH_KEY, encoded.as_ref()), (SEARCH_TYPE_KEY, TEXT_SEARCH_TYPE)],
    )
}

/// Resolves uploader names to catalog uploader ids
#[derive(Clone)]
pub struct AuthorResolver {
    fetcher: Arc<dyn PageFetcher>,
    cache: Arc<dyn AuthorCache>,
}

impl AuthorResolver {
    pub fn new(fetcher: Arc<dyn PageFetcher>, cache: Arc<dyn AuthorCache>) -> Self {
        Self { fetcher, cache }
    }

    /// Find the uploader id for `name`.
    ///
    /// Search pages are read one at a time because each page decides whether
    /// the next one is needed. The first document whose uploader name matches
    /// case-insensitively wins. A failed request aborts the search with an
    /// error; running out of results gives `Ok(None)`.
    pub async fn resolve(
        &self,
        name: &str,
        cancel: &CancelSignal,
    ) -> Result<Option<String>, AuthorError> {
        if let Some(id) = self.cache.get(name).await {
            debug!("Uploader id for {} found in cache: {}", name, id);
            return Ok(Some(id));
        }

        let wanted = name.to_lowercase();
        let mut page = 0u64;
        loop {
            let url = author_search_url(name, page);
            if cancel.is_cancelled() {
                return Err(AuthorError::Fetch {
                    name: name.to_string(),
                    source: FetchError::Cancelled { url },
                });
            }

            debug!("Checking page {} for the author ID.", page + 1);
            let body = self.fetcher.fetch_page(&url, cancel).await.map_err(|source| {
                error!("Error getting uploader id from author name: {}", source);
                AuthorError::Fetch {
                    name: name.to_string(),
                    source,
                }
            })?;

            let results = match parse_search_page(&body) {
                Ok(results) => results,
                Err(e) => {
                    error!("Unable to read search results from {}: {}", url, e);
                    return Ok(None);
                }
            };

            let total_docs = results.total_docs.unwrap_or(0);
            if total_docs == 0 {
                warn!("No songs by {} found, is the name spelled correctly?", name);
                return Ok(None);
            }

            let matching = results.docs.into_iter().filter_map(|doc| doc.uploader).find(|u| {
                u.username
                    .as_deref()
                    .is_some_and(|username| username.to_lowercase() == wanted)
            });

            if let Some(uploader) = matching {
                return match uploader.id.filter(|id| !id.is_empty()) {
                    Some(id) => {
                        let id = self.cache.get_or_insert(name, id).await;
                        info!("Resolved uploader {} to id {}", name, id);
                        Ok(Some(id))
                    }
                    None => {
                        warn!("Uploader {} has no id in the search results", name);
                        Ok(None)
                    }
                };
            }

            page += 1;
            if page * AUTHOR_SEARCH_PAGE_SIZE >= total_docs {
                warn!("No songs by {} found, is the name spelled correctly?", name);
                return Ok(None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{collection_page, MockPageFetcher};
    use reqwest::StatusCode;

    fn setup(fetcher: Arc<MockPageFetcher>) -> (AuthorResolver, InMemoryAuthorCache) {
        let cache = InMemoryAuthorCache::new();
        (
            AuthorResolver::new(fetcher, Arc::new(cache.clone())),
            cache,
        )
    }

    /// Three search pages for "Alice" (25 results); "alice" uploads only on the last
    fn alice_search(last_page_uploader: &str) -> MockPageFetcher {
        MockPageFetcher::new()
            .with_page(
                author_search_url("Alice", 0),
                collection_page(25, 2, &[("1", "h1", "Alice in Chains", "bob")]),
            )
            .with_page(
                author_search_url("Alice", 1),
                collection_page(25, 2, &[("2", "h2", "Go Ask Alice", "carol")]),
            )
            .with_page(
                author_search_url("Alice", 2),
                collection_page(25, 2, &[("3", "h3", "Wonderland", last_page_uploader)]),
            )
    }

    #[test]
    fn test_search_url_uses_offsets() {
        assert_eq!(
            author_search_url("Some Mapper", 2),
            "https://beatsaver.com/api/search/text/20?q=Some%20Mapper"
        );
    }

    #[tokio::test]
    async fn test_match_on_third_page() {
        let fetcher = Arc::new(alice_search("alice"));
        let (resolver, cache) = setup(fetcher.clone());

        let id = resolver.resolve("Alice", &CancelSignal::new()).await.unwrap();
        assert_eq!(id.as_deref(), Some("id-alice"));
        assert_eq!(fetcher.requests().len(), 3);
        assert_eq!(cache.get("ALICE").await.as_deref(), Some("id-alice"));
    }

    #[tokio::test]
    async fn test_no_match_stops_at_total() {
        let fetcher = Arc::new(alice_search("dave"));
        let (resolver, cache) = setup(fetcher.clone());

        let id = resolver.resolve("Alice", &CancelSignal::new()).await.unwrap();
        assert_eq!(id, None);
        assert_eq!(
            fetcher.requests(),
            vec![
                author_search_url("Alice", 0),
                author_search_url("Alice", 1),
                author_search_url("Alice", 2),
            ]
        );
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_first_page_match_stops_early() {
        let fetcher = Arc::new(
            MockPageFetcher::new().with_page(
                author_search_url("BOB", 0),
                collection_page(25, 2, &[("1", "h1", "x", "someone"), ("2", "h2", "y", "bob")]),
            ),
        );
        let (resolver, _) = setup(fetcher.clone());

        let id = resolver.resolve("BOB", &CancelSignal::new()).await.unwrap();
        assert_eq!(id.as_deref(), Some("id-bob"));
        assert_eq!(fetcher.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let fetcher = Arc::new(MockPageFetcher::new());
        let (resolver, cache) = setup(fetcher.clone());
        cache.get_or_insert("Alice", "cached-id".to_string()).await;

        let id = resolver.resolve("aLiCe", &CancelSignal::new()).await.unwrap();
        assert_eq!(id.as_deref(), Some("cached-id"));
        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts() {
        let fetcher = Arc::new(
            alice_search("alice")
                .with_status(author_search_url("Alice", 1), StatusCode::SERVICE_UNAVAILABLE),
        );
        let (resolver, _) = setup(fetcher.clone());

        let err = resolver
            .resolve("Alice", &CancelSignal::new())
            .await
            .unwrap_err();
        let AuthorError::Fetch { name, source } = err;
        assert_eq!(name, "Alice");
        assert_eq!(source.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
        assert_eq!(fetcher.request_count(&author_search_url("Alice", 2)), 0);
    }

    #[tokio::test]
    async fn test_zero_results() {
        let fetcher = Arc::new(
            MockPageFetcher::new()
                .with_page(author_search_url("nobody", 0), collection_page(0, 0, &[])),
        );
        let (resolver, _) = setup(fetcher);
        let id = resolver.resolve("nobody", &CancelSignal::new()).await.unwrap();
        assert_eq!(id, None);
    }

    #[tokio::test]
    async fn test_cancelled_before_search() {
        let fetcher = Arc::new(alice_search("alice"));
        let (resolver, _) = setup(fetcher.clone());
        let cancel = CancelSignal::new();
        cancel.cancel();

        let err = resolver.resolve("Alice", &cancel).await.unwrap_err();
        assert!(matches!(
            err,
            AuthorError::Fetch { source: FetchError::Cancelled { .. }, .. }
        ));
        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn test_cache_keeps_first_insert_under_concurrency() {
        let cache = InMemoryAuthorCache::new();
        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    let name = if i % 2 == 0 { "alice" } else { "bob" };
                    cache.get_or_insert(name, format!("{}-{}", name, i)).await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(cache.len().await, 2);
        let alice = cache.get("ALICE").await.unwrap();
        assert_eq!(cache.get_or_insert("alice", "late".to_string()).await, alice);
    }
}
