//! # arXiv Agent Core
//!
//! Core library for arXiv Agent.
//! Provides the query builder, Atom feed normalizer, retrying arXiv transport,
//! flat-file storage, result sorting, configuration and the HTTP service.

pub mod client;
pub mod config;
pub mod error;
pub mod feed;
pub mod gateway;
pub mod persistence;
pub mod query;
pub mod retry;
pub mod sort;
pub mod storage;
pub mod types;

// Re-export commonly used types at the crate root.
pub use client::{ArxivClient, PaperSource};
pub use config::{AppConfig, ArxivConfig, ServerConfig, StorageConfig, load_config};
pub use error::{
    ArxivAgentError, ConfigError, EntryError, QueryError, Result, SearchError, StorageError,
    TransportError,
};
pub use feed::{FeedDiagnostic, FeedReport, parse_feed, parse_feed_report};
pub use query::{ArxivQuery, build_author_query, build_daily_query};
pub use retry::{RetryConfig, with_retry};
pub use sort::{SortKey, SortOrder, sort_papers};
pub use storage::FileStorage;
pub use types::{
    CategoryPreferences, PaperRecord, SearchHistoryEntry, SearchMode, SearchRequest, UserProfile,
};
