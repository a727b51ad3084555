//! Query builder for the arXiv search API.
//!
//! Pure functions: a request goes in, a `search_query` expression and the
//! accompanying URL parameters come out. No I/O happens here.
//!
//! Daily queries place the category constraint first and the date constraint
//! second: `(cat:cs.LG OR cat:stat.ML) AND submittedDate:[now-3d TO now]`.

use crate::error::QueryError;

/// Inclusive bounds for author-mode `max_results`.
pub const MIN_RESULTS: u32 = 1;
pub const MAX_RESULTS: u32 = 100;

/// Fixed result cap for daily browsing.
pub const DAILY_MAX_RESULTS: u32 = 50;

/// Trailing window used when a daily request names no date range.
pub const DEFAULT_DATE_WINDOW: &str = "[now-3d TO now]";

/// Sort criteria accepted by the arXiv API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArxivSortBy {
    Relevance,
    LastUpdatedDate,
    SubmittedDate,
}

impl ArxivSortBy {
    pub fn as_api_str(&self) -> &str {
        match self {
            ArxivSortBy::Relevance => "relevance",
            ArxivSortBy::LastUpdatedDate => "lastUpdatedDate",
            ArxivSortBy::SubmittedDate => "submittedDate",
        }
    }
}

/// Sort order accepted by the arXiv API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArxivSortOrder {
    Ascending,
    Descending,
}

impl ArxivSortOrder {
    pub fn as_api_str(&self) -> &str {
        match self {
            ArxivSortOrder::Ascending => "ascending",
            ArxivSortOrder::Descending => "descending",
        }
    }
}

/// A fully built upstream query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArxivQuery {
    /// The field-query expression, unencoded (`au:Hinton`, `cat:cs.AI AND ...`).
    pub search_query: String,
    pub max_results: u32,
    pub sort: Option<(ArxivSortBy, ArxivSortOrder)>,
}

impl ArxivQuery {
    /// URL query string, e.g. `search_query=au%3AGeoffrey+Hinton&max_results=25`.
    pub fn to_query_string(&self) -> String {
        let mut qs = format!(
            "search_query={}&max_results={}",
            encode_component(&self.search_query),
            self.max_results
        );
        if let Some((by, order)) = self.sort {
            qs.push_str(&format!(
                "&sortBy={}&sortOrder={}",
                by.as_api_str(),
                order.as_api_str()
            ));
        }
        qs
    }

    /// Full request URL against the given API endpoint.
    pub fn url(&self, base: &str) -> String {
        format!("{}?{}", base, self.to_query_string())
    }
}

/// Form-style encoding: everything outside the unreserved set is percent-encoded
/// and spaces always become `+`.
fn encode_component(value: &str) -> String {
    urlencoding::encode(value).replace("%20", "+")
}

/// Build the author-mode query string.
pub fn build_author_query(author: &str, max_results: i64) -> Result<String, QueryError> {
    author_query(author, max_results).map(|q| q.to_query_string())
}

/// Build the daily-mode query string.
pub fn build_daily_query(
    categories: &[String],
    date_range: Option<&str>,
) -> Result<String, QueryError> {
    daily_query(categories, date_range).map(|q| q.to_query_string())
}

/// Author-mode query: `au:<author>` with the caller's `max_results`.
///
/// Out-of-range `max_results` is rejected rather than clamped.
pub fn author_query(author: &str, max_results: i64) -> Result<ArxivQuery, QueryError> {
    let author = author.trim();
    if author.is_empty() {
        return Err(QueryError::EmptyAuthor);
    }
    if max_results < i64::from(MIN_RESULTS) || max_results > i64::from(MAX_RESULTS) {
        return Err(QueryError::MaxResultsOutOfRange {
            value: max_results,
            min: MIN_RESULTS,
            max: MAX_RESULTS,
        });
    }

    Ok(ArxivQuery {
        search_query: format!("au:{}", author),
        max_results: max_results as u32,
        sort: None,
    })
}

/// Daily-mode query over the given categories and optional date range.
///
/// Blank category strings are skipped and a blank date range counts as absent.
/// Without categories the query is the date window alone, never a match-all.
pub fn daily_query(
    categories: &[String],
    date_range: Option<&str>,
) -> Result<ArxivQuery, QueryError> {
    let mut cats = Vec::new();
    for raw in categories {
        let cat = raw.trim();
        if cat.is_empty() {
            continue;
        }
        validate_category(cat)?;
        cats.push(format!("cat:{}", cat));
    }

    let window = date_range
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(DEFAULT_DATE_WINDOW);
    let date_clause = format!("submittedDate:{}", window);

    let search_query = match cats.len() {
        0 => date_clause,
        1 => format!("{} AND {}", cats[0], date_clause),
        _ => format!("({}) AND {}", cats.join(" OR "), date_clause),
    };

    Ok(ArxivQuery {
        search_query,
        max_results: DAILY_MAX_RESULTS,
        sort: Some((ArxivSortBy::SubmittedDate, ArxivSortOrder::Descending)),
    })
}

/// Category codes look like `cs.AI`, `stat.ML`, `hep-th` or `cs.*`.
fn validate_category(cat: &str) -> Result<(), QueryError> {
    if let Some(bad) = cat
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '*')))
    {
        return Err(QueryError::InvalidCategory {
            category: cat.to_string(),
            reason: format!("unexpected character {:?}", bad),
        });
    }
    Ok(())
}
