//! Feed registry and URL template substitution

pub const PAGE_KEY: &str = "{PAGE}";
pub const AUTHOR_ID_KEY: &str = "{AUTHORID}";
pub const SEARCH_KEY: &str = "{SEARCH}";
pub const SEARCH_TYPE_KEY: &str = "{TYPE}";

/// `{TYPE}` value for plain text search
pub const TEXT_SEARCH_TYPE: &str = "text";

pub const DOWNLOAD_URL_BASE: &str = "https://beatsaver.com/api/download/key/";
pub const DETAILS_URL_BASE: &str = "https://beatsaver.com/api/maps/detail/";
pub const BY_HASH_URL_BASE: &str = "https://beatsaver.com/api/maps/by-hash/";

/// Catalog feeds that can be paged through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedId {
    /// Songs by uploader id
    Author,
    Latest,
    Hot,
    Plays,
    Downloads,
    Search,
}

/// Static description of a feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedInfo {
    pub id: FeedId,
    pub name: &'static str,
    /// Base URL with placeholder tokens
    pub url_template: &'static str,
}

const FEEDS: [FeedInfo; 6] = [
    FeedInfo {
        id: FeedId::Author,
        name: "author",
        url_template: "https://beatsaver.com/api/maps/uploader/{AUTHORID}/{PAGE}",
    },
    FeedInfo {
        id: FeedId::Latest,
        name: "latest",
        url_template: "https://beatsaver.com/api/maps/latest/{PAGE}",
    },
    FeedInfo {
        id: FeedId::Hot,
        name: "hot",
        url_template: "https://beatsaver.com/api/maps/hot/{PAGE}",
    },
    FeedInfo {
        id: FeedId::Plays,
        name: "plays",
        url_template: "https://beatsaver.com/api/maps/plays/{PAGE}",
    },
    FeedInfo {
        id: FeedId::Downloads,
        name: "downloads",
        url_template: "https://beatsaver.com/api/maps/downloads/{PAGE}",
    },
    FeedInfo {
        id: FeedId::Search,
        name: "search",
        url_template: "https://beatsaver.com/api/search/{TYPE}/{PAGE}?q={SEARCH}",
    },
];

impl FeedId {
    pub const ALL: [FeedId; 6] = [
        FeedId::Author,
        FeedId::Latest,
        FeedId::Hot,
        FeedId::Plays,
        FeedId::Downloads,
        FeedId::Search,
    ];

    pub fn info(self) -> &'static FeedInfo {
        // FEEDS is declared in the same order as the enum
        &FEEDS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    /// Look up a feed by its display name, case-insensitively
    pub fn from_name(name: &str) -> Option<FeedId> {
        Self::ALL
            .into_iter()
            .find(|id| id.name().eq_ignore_ascii_case(name))
    }

    /// URL of one page of this feed with the given token bindings
    pub fn page_url(self, page: u64, replacements: &[(&str, &str)]) -> String {
        resolve_url(self.info().url_template, replacements, page)
    }
}

/// Substitute placeholder tokens in a feed URL template.
///
/// Every occurrence of every supplied token is replaced first, then `{PAGE}`
/// becomes `page`. Tokens with no binding are left in the output as-is.
pub fn resolve_url(template: &str, replacements: &[(&str, &str)], page: u64) -> String {
    let mut url = template.to_string();
    for &(token, value) in replacements {
        url = url.replace(token, value);
    }
    url.replace(PAGE_KEY, &page.to_string())
}
