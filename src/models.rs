use crate::feeds::FeedId;
use serde::{Deserialize, Deserializer, Serialize};
use std::hash::{Hash, Hasher};

/// A song scraped from one of the catalog feeds
///
/// The hash is the aggregation key and is always stored upper-cased, so two
/// songs are the same song iff their hashes match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedSong {
    #[serde(deserialize_with = "deserialize_upper")]
    hash: String,
    /// Direct download URL, empty when the document had no key
    pub download_url: String,
    pub song_name: Option<String>,
    pub mapper_name: Option<String>,
    /// Catalog identifier, lower-cased
    pub key: Option<String>,
    /// The source JSON document, kept verbatim
    pub raw_data: String,
}

impl ScrapedSong {
    pub fn new(hash: &str) -> Self {
        Self {
            hash: hash.to_uppercase(),
            download_url: String::new(),
            song_name: None,
            mapper_name: None,
            key: None,
            raw_data: String::new(),
        }
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }
}

impl PartialEq for ScrapedSong {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for ScrapedSong {}

impl Hash for ScrapedSong {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

fn deserialize_upper<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(|s| s.to_uppercase())
}

/// Songs and pagination metadata parsed from a single page body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageResult {
    pub songs: Vec<ScrapedSong>,
    /// `totalDocs` as reported by the server, if present
    pub total_docs: Option<u64>,
    /// `lastPage` as reported by the server, if present
    pub last_page: Option<u64>,
}

/// What to read from which feed
///
/// Built once per request. `max_pages == 0` follows the server's last page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    pub feed: FeedId,
    pub max_pages: u32,
    /// Uploader names, only used by the author feed
    pub authors: Vec<String>,
    /// Search text, only used by the search feed
    pub search: Option<String>,
}

impl FeedQuery {
    pub fn new(feed: FeedId) -> Self {
        Self {
            feed,
            max_pages: 0,
            authors: Vec::new(),
            search: None,
        }
    }

    pub fn authors<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            authors: names.into_iter().map(Into::into).collect(),
            ..Self::new(FeedId::Author)
        }
    }

    pub fn search(text: impl Into<String>) -> Self {
        Self {
            search: Some(text.into()),
            ..Self::new(FeedId::Search)
        }
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_hash_is_uppercased() {
        let song = ScrapedSong::new("abc123def");
        assert_eq!(song.hash(), "ABC123DEF");
    }

    #[test]
    fn test_equality_follows_hash() {
        let mut a = ScrapedSong::new("aa");
        a.song_name = Some("First".to_string());
        let mut b = ScrapedSong::new("AA");
        b.song_name = Some("Second".to_string());
        assert_eq!(a, b);

        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_deserialize_normalizes_hash() {
        let json = serde_json::json!({
            "hash": "ff00",
            "download_url": "",
            "song_name": null,
            "mapper_name": null,
            "key": null,
            "raw_data": "",
        });
        let song: ScrapedSong = serde_json::from_value(json).unwrap();
        assert_eq!(song.hash(), "FF00");
    }

    #[test]
    fn test_feed_query_builders() {
        let query = FeedQuery::authors(["Alice", "Bob"]).with_max_pages(3);
        assert_eq!(query.feed, FeedId::Author);
        assert_eq!(query.authors, vec!["Alice".to_string(), "Bob".to_string()]);
        assert_eq!(query.max_pages, 3);

        let query = FeedQuery::search("camellia");
        assert_eq!(query.feed, FeedId::Search);
        assert_eq!(query.search.as_deref(), Some("camellia"));
        assert_eq!(query.max_pages, 0);
    }
}
