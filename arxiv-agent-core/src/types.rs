//! Core data types: the normalized paper record, search requests, and the
//! small pieces of per-user state the service persists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::QueryError;
use crate::query::{self, ArxivQuery};

/// One paper, normalized from a single Atom feed entry.
///
/// Built fresh per query and never mutated afterwards. Two fetches of the same
/// paper yield independent records; key on `id` to deduplicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub title: String,
    /// Listing order from the feed.
    pub authors: Vec<String>,
    pub summary: String,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    /// Canonical abstract URL, e.g. `http://arxiv.org/abs/1706.03762v7`.
    pub id: String,
    pub pdf_url: Option<String>,
    pub categories: BTreeSet<String>,
}

impl PaperRecord {
    /// Short arXiv identifier (`1706.03762v7`) derived from the canonical id URL.
    pub fn arxiv_id(&self) -> &str {
        if let Some(pos) = self.id.rfind("/abs/") {
            &self.id[pos + 5..]
        } else {
            &self.id
        }
    }
}

/// A single search, in one of the two shapes the query builder understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SearchRequest {
    Author {
        author: String,
        max_results: u32,
    },
    Daily {
        #[serde(default)]
        categories: Vec<String>,
        #[serde(default)]
        date_range: Option<String>,
    },
}

impl SearchRequest {
    pub fn author(author: impl Into<String>, max_results: u32) -> Self {
        SearchRequest::Author {
            author: author.into(),
            max_results,
        }
    }

    pub fn daily(categories: Vec<String>, date_range: Option<String>) -> Self {
        SearchRequest::Daily {
            categories,
            date_range,
        }
    }

    /// Build the upstream query for this request.
    pub fn to_query(&self) -> Result<ArxivQuery, QueryError> {
        match self {
            SearchRequest::Author {
                author,
                max_results,
            } => query::author_query(author, i64::from(*max_results)),
            SearchRequest::Daily {
                categories,
                date_range,
            } => query::daily_query(categories, date_range.as_deref()),
        }
    }

    pub fn mode(&self) -> SearchMode {
        match self {
            SearchRequest::Author { .. } => SearchMode::Author,
            SearchRequest::Daily { .. } => SearchMode::Daily,
        }
    }
}

/// Which request shape produced a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Author,
    Daily,
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchMode::Author => write!(f, "author"),
            SearchMode::Daily => write!(f, "daily"),
        }
    }
}

/// A user's research profile, stored as `profiles/<user_id>.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub favorite_authors: Vec<String>,
    /// arXiv ids of papers the user kept.
    #[serde(default)]
    pub saved_papers: Vec<String>,
}

impl UserProfile {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    /// Trim entries and drop blanks and repeats, keeping first-seen order.
    pub fn normalized(mut self) -> Self {
        self.interests = dedup_trimmed(self.interests);
        self.favorite_authors = dedup_trimmed(self.favorite_authors);
        self.saved_papers = dedup_trimmed(self.saved_papers);
        self
    }
}

fn dedup_trimmed(items: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect()
}

/// One executed search, appended to `history.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHistoryEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub mode: SearchMode,
    /// The `search_query` expression that was sent upstream.
    pub query: String,
    pub result_count: usize,
}

/// Categories a user chose to hide from daily browsing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPreferences {
    #[serde(default)]
    pub hidden: BTreeSet<String>,
}

impl CategoryPreferences {
    /// The requested categories minus the hidden and blank ones, in request order.
    pub fn visible(&self, requested: &[String]) -> Vec<String> {
        requested
            .iter()
            .filter(|c| {
                let c = c.trim();
                !c.is_empty() && !self.hidden.contains(c)
            })
            .cloned()
            .collect()
    }

    /// True when the request names at least one category and all of them are hidden.
    pub fn hides_all(&self, requested: &[String]) -> bool {
        requested.iter().any(|c| !c.trim().is_empty()) && self.visible(requested).is_empty()
    }
}
