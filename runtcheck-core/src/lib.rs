#![deny(missing_docs)]
//! runtcheck core library.
//!
//! Audits protocol-server repositories against a best-practice baseline:
//! extracts facts from a repository on disk, runs the rule catalog over them,
//! scores the result and memoizes verdicts in a file-backed cache.

pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod evaluator;
pub mod extractor;
pub mod fs;
pub mod report;
pub mod rules;
pub mod scanner;
pub mod score;
pub mod version;

pub use cache::{
    CACHE_SCHEMA_VERSION, CacheEntry, CacheKey, CacheLookup, CacheStats, MissReason, ScanCache,
};
pub use config::{
    Baseline, CacheConfig, DEFAULT_CACHE_TTL, DEFAULT_MAX_FILES, ExtractorConfig, FrameworkBaseline,
};
pub use domain::{
    Category, Dependency, FileCounts, RepoFacts, ScanMode, ScanResult, ScanWarning, Severity,
    Tier, Violation,
};
pub use error::{Result, RuntCheckError};
pub use evaluator::{EvaluationOutcome, evaluate};
pub use extractor::MetadataExtractor;
pub use fs::{FileSystem, StdFileSystem, WalkOptions};
pub use report::{
    FleetSummary, RepoOutcome, render_fleet_markdown, render_json, render_status_markdown,
    render_value,
};
pub use rules::{
    CatalogBuilder, CountField, Deduction, Flag, Predicate, Rule, RuleCatalog, RuleError,
    VersionThresholds,
};
pub use scanner::Scanner;
pub use score::{Verdict, classify_tier, compliance_score, score};
pub use version::Version;
