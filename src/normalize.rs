//! Page body → `ScrapedSong` normalization
//!
//! Catalog endpoints answer with one of two shapes: a paged collection
//! (`totalDocs`, `lastPage`, `docs`) or a bare song document (has `key`).
//! The shape is decided once by [`PageShape::classify`] and each branch has
//! its own fixed decoder.

use crate::feeds::DOWNLOAD_URL_BASE;
use crate::models::{PageResult, ScrapedSong};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("Unable to parse JSON from text: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unable to find hash for song {key:?}, is this a valid song document?")]
    MissingHash { key: Option<String> },
    #[error("Invalid page text: 'docs' field not found")]
    MissingDocs,
}

/// Uploader object nested in a song document
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Uploader {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    pub username: Option<String>,
}

/// The fields of a song document this crate consumes
#[derive(Debug, Clone, Default, Deserialize)]
struct SongDocument {
    key: Option<String>,
    hash: Option<String>,
    name: Option<String>,
    uploader: Option<Uploader>,
}

/// Collection page as seen by the author search
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct SearchPage {
    #[serde(rename = "totalDocs")]
    pub total_docs: Option<u64>,
    #[serde(default)]
    pub docs: Vec<SearchDoc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct SearchDoc {
    pub uploader: Option<Uploader>,
}

/// Response shape of one page body
#[derive(Debug, PartialEq)]
enum PageShape {
    Collection {
        total_docs: u64,
        last_page: Option<u64>,
        docs: Option<Vec<Value>>,
    },
    Single(Value),
    Empty,
}

impl PageShape {
    fn classify(value: Value) -> Self {
        let total_docs = value.get("totalDocs").and_then(Value::as_u64);
        match (total_docs, value) {
            (Some(total_docs), Value::Object(mut map)) => PageShape::Collection {
                total_docs,
                last_page: map.get("lastPage").and_then(Value::as_u64),
                docs: match map.remove("docs") {
                    Some(Value::Array(docs)) => Some(docs),
                    _ => None,
                },
            },
            (None, value) if value.get("key").is_some() => PageShape::Single(value),
            _ => PageShape::Empty,
        }
    }
}

/// Parse one page body into songs plus pagination metadata.
///
/// Malformed JSON and collection pages without `docs` are logged and give an
/// empty result. Collection elements that fail mapping are logged and
/// skipped. A single-song body whose document can't be mapped is an error.
pub fn parse_page(text: &str) -> Result<PageResult, NormalizeError> {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            error!("Unable to parse JSON from text: {}", e);
            return Ok(PageResult::default());
        }
    };

    match PageShape::classify(value) {
        PageShape::Collection {
            total_docs,
            last_page,
            docs,
        } => {
            let mut result = PageResult {
                songs: Vec::new(),
                total_docs: Some(total_docs),
                last_page,
            };
            let Some(docs) = docs else {
                error!("{}", NormalizeError::MissingDocs);
                return Ok(result);
            };
            result.songs.reserve(docs.len());
            for doc in &docs {
                match parse_song(doc) {
                    Ok(song) => result.songs.push(song),
                    Err(e) => warn!("Skipping song document: {}", e),
                }
            }
            Ok(result)
        }
        PageShape::Single(doc) => Ok(PageResult {
            songs: vec![parse_song(&doc)?],
            total_docs: None,
            last_page: None,
        }),
        PageShape::Empty => Ok(PageResult::default()),
    }
}

/// Map a single song document.
///
/// The hash is required since it keys aggregation; a missing key only
/// leaves the download URL empty.
pub fn parse_song(doc: &Value) -> Result<ScrapedSong, NormalizeError> {
    let parsed = SongDocument::deserialize(doc)?;

    let key = parsed
        .key
        .filter(|k| !k.is_empty())
        .map(|k| k.to_lowercase());
    let hash = match parsed.hash.as_deref() {
        Some(hash) if !hash.is_empty() => hash,
        _ => return Err(NormalizeError::MissingHash { key }),
    };

    let mut song = ScrapedSong::new(hash);
    song.download_url = key
        .as_ref()
        .map(|k| format!("{}{}", DOWNLOAD_URL_BASE, k))
        .unwrap_or_default();
    song.song_name = parsed.name;
    song.mapper_name = parsed.uploader.and_then(|u| u.username);
    song.key = key;
    song.raw_data = doc.to_string();
    Ok(song)
}

/// Decode a search results page for uploader matching
pub(crate) fn parse_search_page(text: &str) -> Result<SearchPage, NormalizeError> {
    Ok(serde_json::from_str(text)?)
}
