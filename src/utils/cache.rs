//! Persistent cache of LLM relevance decisions.
//!
//! Decisions are content-addressed: the key is the MD5 of `title|abstract`, so the
//! same paper seen through two sources (or on two runs) is judged only once.
//!
//! # Cache Structure
//!
//! ```text
//! .cache/llm_decisions/
//!   <md5>.json
//! ```
//!
//! Each file holds one compact JSON object: the decision fields plus `cached_at`.

use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::models::RelevanceDecision;

const ENTRY_EXTENSION: &str = "json";

/// A decision as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedDecision {
    #[serde(flatten)]
    decision: RelevanceDecision,

    /// RFC 3339 write time; absent in entries written by older tools
    #[serde(default)]
    cached_at: Option<String>,
}

/// Only the timestamp, for the expiry sweep
#[derive(Debug, Deserialize)]
struct EntryTimestamp {
    cached_at: Option<String>,
}

/// File-per-key store of relevance decisions
#[derive(Debug, Clone)]
pub struct DecisionCache {
    dir: PathBuf,
}

impl DecisionCache {
    /// Open (and create if needed) a cache rooted at `dir`
    pub fn open(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        tracing::debug!("Decision cache at: {}", dir.display());
        Ok(Self { dir })
    }

    /// Get the cache directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cache key for a paper's content
    pub fn key(title: &str, abstract_text: &str) -> String {
        let input = format!("{}|{}", title, abstract_text);
        format!("{:x}", md5::compute(input.as_bytes()))
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", key, ENTRY_EXTENSION))
    }

    /// Look up a decision. Missing or unreadable entries are reported as absent.
    pub fn get(&self, key: &str) -> Option<RelevanceDecision> {
        let path = self.entry_path(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Cache MISS for decision: {}", key);
                return None;
            }
            Err(e) => {
                tracing::warn!("Failed to read cache entry {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_str::<CachedDecision>(&content) {
            Ok(cached) => {
                tracing::debug!("Cache HIT for decision: {}", key);
                Some(cached.decision)
            }
            Err(e) => {
                tracing::warn!("Ignoring corrupt cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Store a decision stamped with the current time.
    ///
    /// The entry is written to a temporary file in the cache directory and renamed
    /// into place, so readers never see a partial entry.
    pub fn put(&self, key: &str, decision: &RelevanceDecision) -> std::io::Result<()> {
        let cached = CachedDecision {
            decision: decision.clone(),
            cached_at: Some(Utc::now().to_rfc3339()),
        };
        let content = serde_json::to_string(&cached)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".")
            .suffix(".tmp")
            .tempfile_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.persist(self.entry_path(key)).map_err(|e| e.error)?;

        tracing::debug!("Cached decision: {}", key);
        Ok(())
    }

    /// Remove entries written more than `max_age` ago; returns how many were removed.
    ///
    /// Entries without a timestamp, or that cannot be parsed, are left alone.
    pub fn evict_older_than(&self, max_age: Duration) -> std::io::Result<usize> {
        let cutoff = Utc::now() - max_age;
        let mut removed = 0;

        for path in self.entry_paths()? {
            let Some(cached_at) = read_timestamp(&path) else {
                tracing::debug!("Skipping cache entry without timestamp: {}", path.display());
                continue;
            };

            if cached_at < cutoff {
                match fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
                }
            }
        }

        tracing::info!("Evicted {} cache entries older than {} days", removed, max_age.num_days());
        Ok(removed)
    }

    /// Remove every entry
    pub fn clear(&self) -> std::io::Result<usize> {
        let mut removed = 0;
        for path in self.entry_paths()? {
            fs::remove_file(&path)?;
            removed += 1;
        }
        tracing::info!("Decision cache cleared ({} entries)", removed);
        Ok(removed)
    }

    /// Get cache statistics
    pub fn stats(&self) -> std::io::Result<CacheStats> {
        let paths = self.entry_paths()?;
        let total_bytes = paths
            .iter()
            .filter_map(|p| p.metadata().ok())
            .map(|m| m.len())
            .sum::<u64>();

        Ok(CacheStats {
            cache_dir: self.dir.clone(),
            entries: paths.len(),
            total_size_kb: total_bytes / 1024,
        })
    }

    fn entry_paths(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir)?.flatten() {
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == ENTRY_EXTENSION) {
                paths.push(path);
            }
        }
        Ok(paths)
    }
}

/// Parse `cached_at` from an entry file. Accepts RFC 3339 as well as naive ISO
/// timestamps, which are read as local time.
fn read_timestamp(path: &Path) -> Option<DateTime<Utc>> {
    let content = fs::read_to_string(path).ok()?;
    let entry: EntryTimestamp = serde_json::from_str(&content).ok()?;
    parse_timestamp(&entry.cached_at?)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Statistics about the cache
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Cache directory path
    pub cache_dir: PathBuf,

    /// Number of cached decisions
    pub entries: usize,

    /// Total size in KB
    pub total_size_kb: u64,
}
