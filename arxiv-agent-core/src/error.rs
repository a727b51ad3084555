//! Error types for the arXiv Agent core.
//!
//! Uses `thiserror` for public API error types. Each layer owns its own enum
//! (query building, transport, feed entries, storage, configuration) and
//! `ArxivAgentError` unifies them for callers that don't care which layer failed.

use std::path::PathBuf;

/// Top-level error type for the arXiv Agent core library.
#[derive(Debug, thiserror::Error)]
pub enum ArxivAgentError {
    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<QueryError> for ArxivAgentError {
    fn from(err: QueryError) -> Self {
        ArxivAgentError::Search(SearchError::Validation(err))
    }
}

impl From<TransportError> for ArxivAgentError {
    fn from(err: TransportError) -> Self {
        ArxivAgentError::Search(SearchError::Transport(err))
    }
}

/// Malformed caller input to the query builder. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("Author name cannot be empty")]
    EmptyAuthor,

    #[error("max_results must be between {min} and {max}, got {value}")]
    MaxResultsOutOfRange { value: i64, min: u32, max: u32 },

    #[error("Invalid category '{category}': {reason}")]
    InvalidCategory { category: String, reason: String },
}

/// Network or HTTP failure while fetching a feed.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Connection to {url} failed: {message}")]
    Connection { url: String, message: String },

    #[error("Request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    #[error("arXiv API returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to read response body from {url}: {message}")]
    Body { url: String, message: String },

    #[error("Failed to build HTTP client: {message}")]
    ClientBuild { message: String },
}

impl TransportError {
    /// Connection-level failures and timeouts are worth another attempt;
    /// a definitive HTTP status is not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TransportError::Connection { .. }
                | TransportError::Timeout { .. }
                | TransportError::Body { .. }
        )
    }
}

/// The two ways a search can fail before producing a (possibly empty) list of papers.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Invalid search request: {0}")]
    Validation(#[from] QueryError),

    #[error("Fetch failed: {0}")]
    Transport(#[from] TransportError),
}

/// Why a single feed entry was dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntryError {
    #[error("entry has no title")]
    MissingTitle,

    #[error("entry has no id")]
    MissingId,

    #[error("entry field '{field}' is not a valid timestamp: '{value}'")]
    InvalidTimestamp { field: &'static str, value: String },
}

/// Errors from the flat-file JSON store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid storage key '{key}'")]
    InvalidKey { key: String },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt JSON in {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// A type alias for results using the top-level `ArxivAgentError`.
pub type Result<T> = std::result::Result<T, ArxivAgentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_validation() {
        let err = ArxivAgentError::from(QueryError::MaxResultsOutOfRange {
            value: 250,
            min: 1,
            max: 100,
        });
        assert_eq!(
            err.to_string(),
            "Search error: Invalid search request: max_results must be between 1 and 100, got 250"
        );
    }

    #[test]
    fn test_error_display_transport() {
        let err = ArxivAgentError::from(TransportError::Status {
            url: "https://export.arxiv.org/api/query".into(),
            status: 503,
        });
        assert_eq!(
            err.to_string(),
            "Search error: Fetch failed: arXiv API returned HTTP 503 for https://export.arxiv.org/api/query"
        );
    }

    #[test]
    fn test_transient_classification() {
        assert!(
            TransportError::Connection {
                url: "u".into(),
                message: "refused".into()
            }
            .is_transient()
        );
        assert!(
            TransportError::Timeout {
                url: "u".into(),
                timeout_secs: 30
            }
            .is_transient()
        );
        assert!(
            TransportError::Body {
                url: "u".into(),
                message: "reset".into()
            }
            .is_transient()
        );
        assert!(
            !TransportError::Status {
                url: "u".into(),
                status: 500
            }
            .is_transient()
        );
        assert!(
            !TransportError::ClientBuild {
                message: "tls".into()
            }
            .is_transient()
        );
    }

    #[test]
    fn test_search_error_keeps_kinds_apart() {
        let validation: SearchError = QueryError::EmptyAuthor.into();
        assert!(matches!(validation, SearchError::Validation(_)));

        let transport: SearchError = TransportError::Status {
            url: "u".into(),
            status: 404,
        }
        .into();
        assert!(matches!(transport, SearchError::Transport(_)));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ArxivAgentError = io_err.into();
        assert!(matches!(err, ArxivAgentError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_entry_error_display() {
        let err = EntryError::InvalidTimestamp {
            field: "published",
            value: "yesterday".into(),
        };
        assert_eq!(
            err.to_string(),
            "entry field 'published' is not a valid timestamp: 'yesterday'"
        );
    }
}
