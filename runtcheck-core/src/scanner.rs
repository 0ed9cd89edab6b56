//! Cache-fronted scan pipeline: extract, evaluate, score, persist.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::cache::{CacheEntry, CacheKey, CacheLookup, MissReason, ScanCache, normalize_path};
use crate::config::{Baseline, ExtractorConfig};
use crate::domain::{ScanMode, ScanResult};
use crate::error::{Result, RuntCheckError};
use crate::evaluator::evaluate;
use crate::extractor::MetadataExtractor;
use crate::fs::FileSystem;
use crate::report::RepoOutcome;
use crate::rules::RuleCatalog;
use crate::score::score;

/// Entry point for status requests and fleet scans.
pub struct Scanner<F: FileSystem> {
    extractor: MetadataExtractor<F>,
    catalog: RuleCatalog,
    cache: Option<ScanCache>,
}

impl<F: FileSystem> Scanner<F> {
    /// Create an uncached scanner.
    pub fn new(fs: F, config: ExtractorConfig, catalog: RuleCatalog) -> Self {
        Self {
            extractor: MetadataExtractor::with_config(fs, config),
            catalog,
            cache: None,
        }
    }

    /// Create an uncached scanner with the default configuration and shipped catalog.
    pub fn with_defaults(fs: F) -> Result<Self> {
        let catalog = RuleCatalog::standard(&Baseline::default())?;
        Ok(Self::new(fs, ExtractorConfig::default(), catalog))
    }

    /// Memoize results in `cache`.
    pub fn with_cache(mut self, cache: ScanCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// The full catalog; each scan filters it by mode.
    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    /// The cache, when one is configured.
    pub fn cache(&self) -> Option<&ScanCache> {
        self.cache.as_ref()
    }

    /// Return the verdict for the repository at `path`, reusing a fresh cache entry when present.
    ///
    /// Missing paths fail before the cache is touched. A failed cache write is
    /// logged and the computed result is still returned. Results always carry
    /// the normalized path, however the caller spelled it.
    pub fn status(&self, path: &Path, mode: ScanMode) -> Result<ScanResult> {
        let path = &normalize_path(path);
        let fs = self.extractor.fs();
        if !fs.exists(path) {
            return Err(RuntCheckError::RepoNotFound(path.to_path_buf()));
        }
        let Some(cache) = &self.cache else {
            return self.compute(path, mode);
        };

        let key = CacheKey::derive(path, mode);
        let source_mtime = fs.latest_modified(path, &self.extractor.config().walk)?;
        let mut carried = Vec::new();
        match cache.get(&key, source_mtime) {
            CacheLookup::Hit(result) => {
                debug!("cache hit for {} ({mode})", path.display());
                return Ok(result);
            }
            CacheLookup::Miss(MissReason::Corrupt(warning)) => carried.push(warning),
            CacheLookup::Miss(reason) => {
                debug!("cache miss for {} ({mode}): {reason:?}", path.display());
            }
        }

        let mut result = self.compute_at(path, mode, Utc::now())?;
        let entry = CacheEntry::new(&key, path, mode, source_mtime, result.clone());
        if let Err(err) = cache.put(&entry) {
            warn!("failed to cache result for {}: {err}", path.display());
        }
        result.warnings.extend(carried);
        Ok(result)
    }

    /// Scan `path` without consulting or updating the cache.
    pub fn compute(&self, path: &Path, mode: ScanMode) -> Result<ScanResult> {
        self.compute_at(path, mode, Utc::now())
    }

    fn compute_at(
        &self,
        path: &Path,
        mode: ScanMode,
        generated_at: DateTime<Utc>,
    ) -> Result<ScanResult> {
        let facts = self.extractor.extract(path)?;
        let catalog = self.catalog.for_mode(mode);
        let outcome = evaluate(&facts, &catalog);
        let verdict = score(&outcome, &facts);

        let mut warnings = facts.warnings.clone();
        warnings.extend(outcome.warnings);
        info!(
            "scanned {}: score {}, {}",
            path.display(),
            verdict.score,
            if verdict.is_runt { "runt" } else { "sota" }
        );

        Ok(ScanResult {
            facts,
            violations: outcome.violations,
            score: verdict.score,
            is_runt: verdict.is_runt,
            tier: verdict.tier,
            mode,
            generated_at,
            warnings,
        })
    }

    /// Find repositories under `root`, descending at most `max_depth` levels.
    ///
    /// A directory holding a packaging manifest is a repository; its
    /// subdirectories are not searched further. Results are sorted.
    pub fn discover(&self, root: &Path, max_depth: usize) -> Result<Vec<PathBuf>> {
        let fs = self.extractor.fs();
        if !fs.exists(root) {
            return Err(RuntCheckError::RepoNotFound(root.to_path_buf()));
        }
        let config = self.extractor.config();

        let mut found = Vec::new();
        let mut pending = vec![(root.to_path_buf(), 0usize)];
        while let Some((dir, depth)) = pending.pop() {
            if config
                .packaging_manifests
                .iter()
                .any(|manifest| fs.exists(&dir.join(manifest)))
            {
                found.push(dir);
                continue;
            }
            if depth >= max_depth {
                continue;
            }
            match fs.list_dirs(&dir, &config.walk) {
                Ok(children) => {
                    pending.extend(children.into_iter().map(|child| (child, depth + 1)));
                }
                Err(err) if dir != root => {
                    warn!("skipping unreadable directory {}: {err}", dir.display());
                }
                Err(err) => return Err(err),
            }
        }

        found.sort();
        Ok(found)
    }

    /// Discover and scan every repository under `root` in order.
    ///
    /// Each repository yields an outcome; a failed repository does not stop the scan.
    pub fn scan_tree(
        &self,
        root: &Path,
        max_depth: usize,
        mode: ScanMode,
    ) -> Result<Vec<RepoOutcome>> {
        let repos = self.discover(root, max_depth)?;
        Ok(repos
            .into_iter()
            .map(|repo| match self.status(&repo, mode) {
                Ok(result) => RepoOutcome::scanned(repo, result),
                Err(err) => {
                    warn!("scan failed for {}: {err}", repo.display());
                    RepoOutcome::failed(repo, err.to_string())
                }
            })
            .collect())
    }

    /// Drop the cached result for `path` in `mode`.
    pub fn invalidate(&self, path: &Path, mode: ScanMode) -> Result<bool> {
        match &self.cache {
            Some(cache) => cache.invalidate(&CacheKey::derive(path, mode)),
            None => Ok(false),
        }
    }

    /// Drop every cached result, returning how many were removed.
    pub fn clear_cache(&self) -> Result<usize> {
        match &self.cache {
            Some(cache) => cache.clear(),
            None => Ok(0),
        }
    }
}
