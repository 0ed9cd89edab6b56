//! File-backed cache of scan results.
//!
//! One JSON file per cache key lives under the cache root. Entries are
//! written to a temporary file and renamed into place, so readers never see
//! a partial entry. Anything that cannot be read back is treated as a miss.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use ring::digest::{SHA256, digest};
use serde::{Deserialize, Serialize};

use crate::config::CacheConfig;
use crate::domain::{ScanMode, ScanResult, ScanWarning};
use crate::error::Result;

/// Version of the on-disk entry layout. Entries with another version are ignored.
pub const CACHE_SCHEMA_VERSION: u32 = 1;

const ENTRY_EXTENSION: &str = "json";
const TEMP_MARKER: &str = ".json.tmp-";

/// Stable identifier of one (repository, scan parameters) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for `path` scanned in `mode`.
    ///
    /// The path is canonicalized when it exists so that `./repo`, `repo/` and
    /// the absolute path share one entry.
    pub fn derive(path: &Path, mode: ScanMode) -> Self {
        let normalized = normalize_path(path);
        let material = format!("{}\0mode={}", normalized.display(), mode.as_str());
        let hash = digest(&SHA256, material.as_bytes());
        Self(hex::encode(hash.as_ref()))
    }

    /// Hex digest used as the entry file stem.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Absolute, canonical form of `path`, falling back to the input when it cannot be resolved.
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize()
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Self-describing on-disk record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Layout version, see [`CACHE_SCHEMA_VERSION`].
    pub schema_version: u32,
    /// Key the entry was written under.
    pub key: String,
    /// Normalized repository path.
    pub repo_path: PathBuf,
    /// Scan mode the result was computed in.
    pub mode: ScanMode,
    /// When the entry was written.
    pub written_at: DateTime<Utc>,
    /// Repository modification time observed before the scan.
    pub source_mtime: Option<DateTime<Utc>>,
    /// Cached verdict.
    pub result: ScanResult,
}

impl CacheEntry {
    /// Build an entry stamped with the current time.
    pub fn new(
        key: &CacheKey,
        repo_path: &Path,
        mode: ScanMode,
        source_mtime: Option<DateTime<Utc>>,
        result: ScanResult,
    ) -> Self {
        Self {
            schema_version: CACHE_SCHEMA_VERSION,
            key: key.as_str().to_string(),
            repo_path: normalize_path(repo_path),
            mode,
            written_at: Utc::now(),
            source_mtime,
            result,
        }
    }
}

/// Why a lookup did not produce a result.
#[derive(Debug, Clone, PartialEq)]
pub enum MissReason {
    /// No entry exists for the key.
    Absent,
    /// The entry is older than the TTL.
    Expired,
    /// The repository changed after the entry was written.
    Stale,
    /// The entry was written by another layout version.
    SchemaMismatch(u32),
    /// The entry could not be read or parsed.
    Corrupt(ScanWarning),
}

/// Outcome of a cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    /// A fresh entry was found.
    Hit(ScanResult),
    /// No usable entry; the caller must rescan.
    Miss(MissReason),
}

/// Size of the cache directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Cache root.
    pub root: PathBuf,
    /// Number of entry files.
    pub entries: usize,
    /// Total size of entry files in bytes.
    pub bytes: u64,
}

/// Cache of [`ScanResult`] values keyed by [`CacheKey`].
#[derive(Debug, Clone)]
pub struct ScanCache {
    config: CacheConfig,
}

impl ScanCache {
    /// Create a cache; the root directory is created on first write.
    pub fn new(config: CacheConfig) -> Self {
        Self { config }
    }

    /// Cache root.
    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Entry lifetime.
    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }

    /// Path of the entry file for `key`.
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.config
            .root
            .join(format!("{}.{ENTRY_EXTENSION}", key.as_str()))
    }

    /// Look up `key` given the repository's current modification time.
    pub fn get(&self, key: &CacheKey, current_mtime: Option<DateTime<Utc>>) -> CacheLookup {
        self.lookup_at(key, current_mtime, Utc::now())
    }

    /// Look up `key` as of `now`.
    ///
    /// An entry is fresh iff it is no older than the TTL and the repository
    /// has not been modified after the time recorded in the entry. A
    /// modification time that appears or disappears counts as a change.
    pub fn lookup_at(
        &self,
        key: &CacheKey,
        current_mtime: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> CacheLookup {
        let path = self.entry_path(key);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return CacheLookup::Miss(MissReason::Absent);
            }
            Err(err) => return self.corrupt(key, err.to_string()),
        };

        let value: serde_json::Value = match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(err) => return self.corrupt(key, err.to_string()),
        };
        let version = value
            .get("schema_version")
            .and_then(|version| version.as_u64())
            .and_then(|version| u32::try_from(version).ok());
        match version {
            Some(CACHE_SCHEMA_VERSION) => {}
            Some(other) => {
                debug!("cache entry {key} has schema version {other}");
                return CacheLookup::Miss(MissReason::SchemaMismatch(other));
            }
            None => return self.corrupt(key, "missing schema_version".to_string()),
        }
        let entry: CacheEntry = match serde_json::from_value(value) {
            Ok(entry) => entry,
            Err(err) => return self.corrupt(key, err.to_string()),
        };
        if entry.key != key.as_str() {
            return self.corrupt(key, format!("entry was written for key {}", entry.key));
        }

        let age = now
            .signed_duration_since(entry.written_at)
            .to_std()
            .unwrap_or_default();
        if age > self.config.ttl {
            return CacheLookup::Miss(MissReason::Expired);
        }

        let stale = match (current_mtime, entry.source_mtime) {
            (Some(current), Some(recorded)) => current > recorded,
            (None, None) => false,
            _ => true,
        };
        if stale {
            return CacheLookup::Miss(MissReason::Stale);
        }

        CacheLookup::Hit(entry.result)
    }

    /// Write `entry`, replacing any previous entry for the same key.
    pub fn put(&self, entry: &CacheEntry) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.config.root)?;
        let target = self
            .config
            .root
            .join(format!("{}.{ENTRY_EXTENSION}", entry.key));
        let temp = self.config.root.join(format!(
            "{}{TEMP_MARKER}{}-{}",
            entry.key,
            std::process::id(),
            unique_suffix()
        ));

        let payload = serde_json::to_vec_pretty(entry)?;
        if let Err(err) = std::fs::write(&temp, payload) {
            let _ = std::fs::remove_file(&temp);
            return Err(err.into());
        }
        if let Err(err) = std::fs::rename(&temp, &target) {
            let _ = std::fs::remove_file(&temp);
            return Err(err.into());
        }
        debug!("cached {} at {}", entry.repo_path.display(), target.display());
        Ok(target)
    }

    /// Remove the entry for `key`, returning whether one existed.
    pub fn invalidate(&self, key: &CacheKey) -> Result<bool> {
        match std::fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Remove every entry and leftover temporary file, returning the entry count removed.
    pub fn clear(&self) -> Result<usize> {
        let mut removed = 0usize;
        for (path, is_entry) in self.cache_files()? {
            match std::fs::remove_file(&path) {
                Ok(()) if is_entry => removed += 1,
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(removed)
    }

    /// Count entries and their total size.
    pub fn stats(&self) -> Result<CacheStats> {
        let mut entries = 0usize;
        let mut bytes = 0u64;
        for (path, is_entry) in self.cache_files()? {
            if !is_entry {
                continue;
            }
            entries += 1;
            bytes += std::fs::metadata(&path).map(|meta| meta.len()).unwrap_or(0);
        }
        Ok(CacheStats {
            root: self.config.root.clone(),
            entries,
            bytes,
        })
    }

    fn cache_files(&self) -> Result<Vec<(PathBuf, bool)>> {
        let entries = match std::fs::read_dir(&self.config.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if name.contains(TEMP_MARKER) {
                files.push((path, false));
            } else if path.extension().is_some_and(|ext| ext == ENTRY_EXTENSION) {
                files.push((path, true));
            }
        }
        files.sort();
        Ok(files)
    }

    fn corrupt(&self, key: &CacheKey, message: String) -> CacheLookup {
        warn!("ignoring unreadable cache entry {key}: {message}");
        CacheLookup::Miss(MissReason::Corrupt(ScanWarning::CacheCorrupt {
            key: key.as_str().to_string(),
            message,
        }))
    }
}

fn unique_suffix() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RepoFacts, Tier};
    use chrono::TimeZone;

    fn sample_result(path: &Path) -> ScanResult {
        ScanResult {
            facts: RepoFacts::empty(path.to_path_buf()),
            violations: Vec::new(),
            score: 100,
            is_runt: false,
            tier: Tier::Minimal,
            mode: ScanMode::Fast,
            generated_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            warnings: Vec::new(),
        }
    }

    fn temp_cache(ttl: Duration) -> ScanCache {
        ScanCache::new(CacheConfig::new(
            std::env::temp_dir().join(unique_dir_name()),
            ttl,
        ))
    }

    fn mtime(seconds: i64) -> Option<DateTime<Utc>> {
        Some(Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap())
    }

    #[test]
    fn keys_separate_modes_and_are_stable() {
        let path = Path::new("/srv/servers/weather");
        let fast = CacheKey::derive(path, ScanMode::Fast);
        assert_eq!(fast, CacheKey::derive(path, ScanMode::Fast));
        assert_ne!(fast, CacheKey::derive(path, ScanMode::Thorough));
        assert_eq!(fast.as_str().len(), 64);
    }

    #[test]
    fn put_then_get_hits_within_ttl() {
        let cache = temp_cache(Duration::from_secs(60));
        let key = CacheKey::derive(Path::new("/srv/a"), ScanMode::Fast);
        let result = sample_result(Path::new("/srv/a"));
        let entry = CacheEntry::new(
            &key,
            Path::new("/srv/a"),
            ScanMode::Fast,
            mtime(0),
            result.clone(),
        );
        cache.put(&entry).expect("put");

        assert_eq!(cache.get(&key, mtime(0)), CacheLookup::Hit(result));
        assert_eq!(cache.stats().expect("stats").entries, 1);

        std::fs::remove_dir_all(cache.root()).expect("cleanup");
    }

    #[test]
    fn expired_and_stale_entries_miss() {
        let cache = temp_cache(Duration::from_secs(60));
        let key = CacheKey::derive(Path::new("/srv/b"), ScanMode::Fast);
        let entry = CacheEntry::new(
            &key,
            Path::new("/srv/b"),
            ScanMode::Fast,
            mtime(0),
            sample_result(Path::new("/srv/b")),
        );
        cache.put(&entry).expect("put");

        let later = entry.written_at + chrono::Duration::seconds(61);
        assert_eq!(
            cache.lookup_at(&key, mtime(0), later),
            CacheLookup::Miss(MissReason::Expired)
        );
        assert_eq!(
            cache.get(&key, mtime(5)),
            CacheLookup::Miss(MissReason::Stale)
        );
        assert!(matches!(cache.get(&key, mtime(-5)), CacheLookup::Hit(_)));
        assert_eq!(cache.get(&key, None), CacheLookup::Miss(MissReason::Stale));

        std::fs::remove_dir_all(cache.root()).expect("cleanup");
    }

    #[test]
    fn corrupt_and_foreign_entries_miss() {
        let cache = temp_cache(Duration::from_secs(60));
        let key = CacheKey::derive(Path::new("/srv/c"), ScanMode::Fast);
        std::fs::create_dir_all(cache.root()).expect("create root");

        std::fs::write(cache.entry_path(&key), "{\"schema_version\": 1, \"key\":").expect("write");
        assert!(matches!(
            cache.get(&key, None),
            CacheLookup::Miss(MissReason::Corrupt(ScanWarning::CacheCorrupt { .. }))
        ));

        std::fs::write(cache.entry_path(&key), "{\"schema_version\": 0}").expect("write");
        assert_eq!(
            cache.get(&key, None),
            CacheLookup::Miss(MissReason::SchemaMismatch(0))
        );

        let entry = CacheEntry::new(
            &key,
            Path::new("/srv/c"),
            ScanMode::Fast,
            None,
            sample_result(Path::new("/srv/c")),
        );
        cache.put(&entry).expect("overwrite corrupt entry");
        assert!(matches!(cache.get(&key, None), CacheLookup::Hit(_)));

        std::fs::remove_dir_all(cache.root()).expect("cleanup");
    }

    #[test]
    fn invalidate_and_clear_remove_entries() {
        let cache = temp_cache(Duration::from_secs(60));
        assert_eq!(cache.clear().expect("clear empty"), 0);

        let first = CacheKey::derive(Path::new("/srv/d"), ScanMode::Fast);
        let second = CacheKey::derive(Path::new("/srv/d"), ScanMode::Thorough);
        for key in [&first, &second] {
            let entry = CacheEntry::new(
                key,
                Path::new("/srv/d"),
                ScanMode::Fast,
                None,
                sample_result(Path::new("/srv/d")),
            );
            cache.put(&entry).expect("put");
        }
        std::fs::write(cache.root().join(format!("{first}{TEMP_MARKER}1-2")), "{").expect("write");

        assert!(cache.invalidate(&first).expect("invalidate"));
        assert!(!cache.invalidate(&first).expect("invalidate again"));
        assert_eq!(cache.get(&first, None), CacheLookup::Miss(MissReason::Absent));
        assert_eq!(cache.clear().expect("clear"), 1);
        assert_eq!(cache.stats().expect("stats").entries, 0);

        std::fs::remove_dir_all(cache.root()).expect("cleanup");
    }

    fn unique_dir_name() -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system time")
            .as_nanos();
        PathBuf::from(format!("runtcheck_cache_test_{nanos}"))
    }
}
