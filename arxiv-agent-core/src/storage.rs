//! Flat-file JSON store for profiles, cached daily results, category
//! preferences and search history.
//!
//! Layout under the data directory:
//!
//! ```text
//! profiles/<user_id>.json
//! categories/<user_id>.json
//! papers/<cache_id>.json
//! history.json
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::StorageConfig;
use crate::error::StorageError;
use crate::persistence::{atomic_write_json, load_json};
use crate::query::ArxivQuery;
use crate::types::{CategoryPreferences, PaperRecord, SearchHistoryEntry, UserProfile};

const PROFILES_DIR: &str = "profiles";
const PAPERS_DIR: &str = "papers";
const CATEGORIES_DIR: &str = "categories";
const HISTORY_FILE: &str = "history.json";

/// A cached result list with the time it was fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedPapers {
    cached_at: DateTime<Utc>,
    papers: Vec<PaperRecord>,
}

/// JSON-file store rooted at a data directory.
#[derive(Debug)]
pub struct FileStorage {
    root: PathBuf,
    history_limit: usize,
    /// Serializes read-modify-write of `history.json`.
    history_lock: Mutex<()>,
}

impl FileStorage {
    /// Open (and create) a store under `root`.
    pub fn new(root: impl Into<PathBuf>, history_limit: usize) -> Result<Self, StorageError> {
        let root = root.into();
        for sub in [PROFILES_DIR, PAPERS_DIR, CATEGORIES_DIR] {
            let dir = root.join(sub);
            std::fs::create_dir_all(&dir).map_err(|source| StorageError::Write {
                path: dir.clone(),
                source,
            })?;
        }
        tracing::debug!(root = %root.display(), "Opened file storage");
        Ok(Self {
            root,
            history_limit: history_limit.max(1),
            history_lock: Mutex::new(()),
        })
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        Self::new(&config.data_dir, config.history_limit)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn keyed_path(&self, dir: &str, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.root.join(dir).join(format!("{}.json", key)))
    }

    // --- Profiles ---

    pub fn save_profile(&self, profile: &UserProfile) -> Result<(), StorageError> {
        let path = self.keyed_path(PROFILES_DIR, &profile.user_id)?;
        atomic_write_json(&path, profile)?;
        tracing::info!(user_id = %profile.user_id, "Saved profile");
        Ok(())
    }

    pub fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StorageError> {
        load_json(&self.keyed_path(PROFILES_DIR, user_id)?)
    }

    /// Ids of all stored profiles, sorted.
    pub fn list_profiles(&self) -> Result<Vec<String>, StorageError> {
        let dir = self.root.join(PROFILES_DIR);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StorageError::Read { path: dir, source }),
        };

        let mut ids: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(String::from))
            .filter(|id| validate_key(id).is_ok())
            .collect();
        ids.sort();
        Ok(ids)
    }

    // --- Paper cache ---

    pub fn save_paper_cache(
        &self,
        cache_id: &str,
        papers: &[PaperRecord],
    ) -> Result<(), StorageError> {
        let path = self.keyed_path(PAPERS_DIR, cache_id)?;
        let cached = CachedPapers {
            cached_at: Utc::now(),
            papers: papers.to_vec(),
        };
        atomic_write_json(&path, &cached)?;
        tracing::debug!(cache_id, papers = papers.len(), "Cached papers");
        Ok(())
    }

    /// Cached papers, or `None` when absent or older than `max_age`.
    pub fn get_paper_cache(
        &self,
        cache_id: &str,
        max_age: Duration,
    ) -> Result<Option<Vec<PaperRecord>>, StorageError> {
        let path = self.keyed_path(PAPERS_DIR, cache_id)?;
        let Some(cached) = load_json::<CachedPapers>(&path)? else {
            return Ok(None);
        };
        let age = Utc::now() - cached.cached_at;
        if age > max_age {
            tracing::debug!(cache_id, age_secs = age.num_seconds(), "Paper cache is stale");
            return Ok(None);
        }
        Ok(Some(cached.papers))
    }

    // --- Category preferences ---

    pub fn save_category_preferences(
        &self,
        user_id: &str,
        prefs: &CategoryPreferences,
    ) -> Result<(), StorageError> {
        atomic_write_json(&self.keyed_path(CATEGORIES_DIR, user_id)?, prefs)
    }

    /// Stored preferences, or the empty default when the user has none.
    pub fn get_category_preferences(
        &self,
        user_id: &str,
    ) -> Result<CategoryPreferences, StorageError> {
        Ok(load_json(&self.keyed_path(CATEGORIES_DIR, user_id)?)?.unwrap_or_default())
    }

    // --- Search history ---

    /// Append a history entry, keeping only the newest `history_limit` entries.
    pub fn record_search(&self, entry: SearchHistoryEntry) -> Result<(), StorageError> {
        let _guard = self
            .history_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let path = self.root.join(HISTORY_FILE);
        let mut history: Vec<SearchHistoryEntry> = load_json(&path)?.unwrap_or_default();
        history.push(entry);
        if history.len() > self.history_limit {
            let excess = history.len() - self.history_limit;
            history.drain(..excess);
        }
        atomic_write_json(&path, &history)
    }

    /// Up to `limit` history entries, newest first.
    pub fn search_history(&self, limit: usize) -> Result<Vec<SearchHistoryEntry>, StorageError> {
        let history: Vec<SearchHistoryEntry> =
            load_json(&self.root.join(HISTORY_FILE))?.unwrap_or_default();
        Ok(history.into_iter().rev().take(limit).collect())
    }
}

/// Keys become file names: `[A-Za-z0-9._-]+`, not starting with a dot.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey {
            key: key.to_string(),
        })
    }
}

/// Stable cache id for a query: hex SHA-256 of its URL parameters.
pub fn cache_id_for(query: &ArxivQuery) -> String {
    format!("{:x}", Sha256::digest(query.to_query_string().as_bytes()))
}
