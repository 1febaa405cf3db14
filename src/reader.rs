use crate::aggregate::aggregate;
use crate::authors::{AuthorCache, AuthorResolver, InMemoryAuthorCache};
use crate::cancel::CancelSignal;
use crate::config::ScraperConfig;
use crate::feeds::{
    FeedId, AUTHOR_ID_KEY, BY_HASH_URL_BASE, DETAILS_URL_BASE, SEARCH_KEY, SEARCH_TYPE_KEY,
    TEXT_SEARCH_TYPE,
};
use crate::fetch::{FetchError, HttpPageFetcher, PageFetcher};
use crate::models::{FeedQuery, ScrapedSong};
use crate::normalize::{self, NormalizeError};
use crate::pagination::PageCollector;
use reqwest::StatusCode;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Invalid feed query: {0}")]
    InvalidQuery(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

/// How `FeedReader::search` interprets its criteria
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchType {
    /// Song author name (not necessarily the uploader)
    Author,
    /// Song name only
    Name,
    /// Uploader name
    User,
    /// Content hash
    Hash,
    /// Song name, sub name and author
    Song,
    Key,
    All,
}

impl SearchType {
    /// `{TYPE}` value for the text search endpoint
    pub fn type_token(self) -> &'static str {
        match self {
            SearchType::Author => "author",
            SearchType::Name => "name",
            SearchType::User => "user",
            SearchType::Hash => "hash",
            SearchType::Song => "song",
            SearchType::Key => "key",
            SearchType::All => "all",
        }
    }
}

/// Entry point for reading songs from the catalog
#[derive(Clone)]
pub struct FeedReader {
    fetcher: Arc<dyn PageFetcher>,
    collector: PageCollector,
    authors: AuthorResolver,
}

impl FeedReader {
    /// Reader over HTTP with a fresh author cache
    pub fn new(config: &ScraperConfig) -> Result<Self, FeedError> {
        let fetcher = Arc::new(HttpPageFetcher::new(config)?);
        Ok(Self::with_fetcher(
            fetcher,
            Arc::new(InMemoryAuthorCache::new()),
            config,
        ))
    }

    pub fn with_fetcher(
        fetcher: Arc<dyn PageFetcher>,
        cache: Arc<dyn AuthorCache>,
        config: &ScraperConfig,
    ) -> Self {
        Self {
            collector: PageCollector::new(fetcher.clone(), config),
            authors: AuthorResolver::new(fetcher.clone(), cache),
            fetcher,
        }
    }

    /// Read a feed and return its songs keyed by hash.
    ///
    /// Fails only for a query that can't be run (author feed without
    /// authors, search feed without text). Everything past that is
    /// best-effort and may come back empty.
    pub async fn get_songs_from_feed(
        &self,
        query: &FeedQuery,
        cancel: &CancelSignal,
    ) -> Result<HashMap<String, ScrapedSong>, FeedError> {
        validate_query(query)?;

        let songs = match query.feed {
            FeedId::Author => {
                let mut songs = Vec::new();
                for author in &query.authors {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let found = self
                        .get_songs_by_author(author, query.max_pages, cancel)
                        .await;
                    info!("Found {} songs uploaded by {}", found.len(), author);
                    songs.extend(found);
                }
                songs
            }
            FeedId::Search => {
                let text = query.search.as_deref().unwrap_or_default();
                self.search_text(text, TEXT_SEARCH_TYPE, query.max_pages, cancel)
                    .await
            }
            feed => {
                self.collector
                    .collect(feed, query.max_pages, &[], cancel)
                    .await
            }
        };

        let by_hash = aggregate(songs);
        info!(
            "Read {} unique songs from the {} feed",
            by_hash.len(),
            query.feed.name()
        );
        Ok(by_hash)
    }

    /// All songs uploaded by the user with this name. Unresolvable names
    /// give an empty list.
    pub async fn get_songs_by_author(
        &self,
        name: &str,
        max_pages: u32,
        cancel: &CancelSignal,
    ) -> Vec<ScrapedSong> {
        match self.authors.resolve(name, cancel).await {
            Ok(Some(id)) => self.get_songs_by_uploader_id(&id, max_pages, cancel).await,
            Ok(None) => Vec::new(),
            Err(e) => {
                error!("{}", e);
                Vec::new()
            }
        }
    }

    /// All songs on the uploader feed of `uploader_id` (NOT the username)
    pub async fn get_songs_by_uploader_id(
        &self,
        uploader_id: &str,
        max_pages: u32,
        cancel: &CancelSignal,
    ) -> Vec<ScrapedSong> {
        self.collector
            .collect(FeedId::Author, max_pages, &[(AUTHOR_ID_KEY, uploader_id)], cancel)
            .await
    }

    /// Distinct uploader names seen on an uploader id's feed, in first-seen order
    pub async fn get_author_names_by_id(
        &self,
        uploader_id: &str,
        cancel: &CancelSignal,
    ) -> Vec<String> {
        let songs = self.get_songs_by_uploader_id(uploader_id, 0, cancel).await;
        let mut seen = HashSet::new();
        songs
            .into_iter()
            .filter_map(|song| song.mapper_name)
            .filter(|name| seen.insert(name.clone()))
            .collect()
    }

    pub async fn get_song_by_hash(
        &self,
        hash: &str,
        cancel: &CancelSignal,
    ) -> Result<Option<ScrapedSong>, FeedError> {
        let url = format!("{}{}", BY_HASH_URL_BASE, hash.to_lowercase());
        self.get_single_song(&url, cancel).await
    }

    pub async fn get_song_by_key(
        &self,
        key: &str,
        cancel: &CancelSignal,
    ) -> Result<Option<ScrapedSong>, FeedError> {
        let url = format!("{}{}", DETAILS_URL_BASE, key.to_lowercase());
        self.get_single_song(&url, cancel).await
    }

    /// Search the catalog. Key and hash searches go to the single-song
    /// endpoints, user searches to the uploader feed, and the rest to the
    /// text search feed.
    pub async fn search(
        &self,
        criteria: &str,
        search_type: SearchType,
        max_pages: u32,
        cancel: &CancelSignal,
    ) -> Result<Vec<ScrapedSong>, FeedError> {
        if criteria.trim().is_empty() {
            return Err(FeedError::InvalidQuery(
                "search criteria cannot be empty".to_string(),
            ));
        }

        let songs = match search_type {
            SearchType::Key => self
                .get_song_by_key(criteria, cancel)
                .await?
                .into_iter()
                .collect(),
            SearchType::Hash => self
                .get_song_by_hash(criteria, cancel)
                .await?
                .into_iter()
                .collect(),
            SearchType::User => self.get_songs_by_author(criteria, max_pages, cancel).await,
            SearchType::Author | SearchType::Name | SearchType::Song | SearchType::All => {
                self.search_text(criteria, search_type.type_token(), max_pages, cancel)
                    .await
            }
        };
        Ok(songs)
    }

    async fn search_text(
        &self,
        text: &str,
        search_type: &str,
        max_pages: u32,
        cancel: &CancelSignal,
    ) -> Vec<ScrapedSong> {
        let encoded = urlencoding::encode(text);
        self.collector
            .collect(
                FeedId::Search,
                max_pages,
                &[(SEARCH_KEY, encoded.as_ref()), (SEARCH_TYPE_KEY, search_type)],
                cancel,
            )
            .await
    }

    /// Fetch a single-song endpoint. Missing songs and request failures give
    /// `None`; a song document without a hash is an error.
    async fn get_single_song(
        &self,
        url: &str,
        cancel: &CancelSignal,
    ) -> Result<Option<ScrapedSong>, FeedError> {
        let body = match self.fetcher.fetch_page(url, cancel).await {
            Ok(body) => body,
            Err(e) if e.status() == Some(StatusCode::NOT_FOUND) => {
                warn!("No song found at {}", url);
                return Ok(None);
            }
            Err(e) => {
                error!("Error getting song: {}", e);
                return Ok(None);
            }
        };

        if body.trim().is_empty() {
            warn!("Unable to get web page at {}", url);
            return Ok(None);
        }

        let page = normalize::parse_page(&body)?;
        Ok(page.songs.into_iter().next())
    }
}

fn validate_query(query: &FeedQuery) -> Result<(), FeedError> {
    match query.feed {
        FeedId::Author if query.authors.iter().all(|a| a.trim().is_empty()) => Err(
            FeedError::InvalidQuery("the author feed needs at least one author name".to_string()),
        ),
        FeedId::Search
            if query
                .search
                .as_deref()
                .map_or(true, |s| s.trim().is_empty()) =>
        {
            Err(FeedError::InvalidQuery(
                "the search feed needs search text".to_string(),
            ))
        }
        _ => Ok(()),
    }
}
