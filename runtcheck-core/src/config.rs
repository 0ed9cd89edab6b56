//! Configuration structs passed into the extractor, catalog and cache.
//!
//! Every pattern table the scanner uses lives here so that a scan is a pure
//! function of its inputs and the configuration it was built with.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::fs::WalkOptions;
use crate::version::Version;

/// Default ceiling on files visited per repository.
pub const DEFAULT_MAX_FILES: usize = 10_000;

/// Default cache time-to-live.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Patterns and limits used by [`crate::MetadataExtractor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Directory walk limits and exclusions.
    pub walk: WalkOptions,
    /// Package names that provide the protocol framework, in priority order.
    pub framework_packages: Vec<String>,
    /// Line fragments that indicate the framework is imported.
    pub framework_import_markers: Vec<String>,
    /// Line fragments that register a tool; each matching line counts once.
    pub tool_markers: Vec<String>,
    /// Tool names every compliant server is expected to expose.
    pub baseline_tools: Vec<String>,
    /// Call prefixes counted as logging.
    pub logging_markers: Vec<String>,
    /// Call prefixes counted as direct stdout writes.
    pub print_markers: Vec<String>,
    /// File extensions scanned line by line.
    pub source_extensions: Vec<String>,
    /// Exact file names that count as linter configuration.
    pub linter_files: Vec<String>,
    /// File name prefixes that count as linter configuration.
    pub linter_prefixes: Vec<String>,
    /// Root files that count as a packaging manifest.
    pub packaging_manifests: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            walk: WalkOptions::default(),
            framework_packages: strings(&["mcp", "fastmcp", "@modelcontextprotocol/sdk", "rmcp"]),
            framework_import_markers: strings(&[
                "from mcp",
                "import mcp",
                "from fastmcp",
                "import fastmcp",
                "@modelcontextprotocol/sdk",
                "use rmcp",
                "rmcp::",
            ]),
            tool_markers: strings(&[
                "@mcp.tool",
                "@server.tool",
                "@app.tool",
                "server.tool(",
                "server.registerTool(",
                "#[tool(",
            ]),
            baseline_tools: strings(&["health_check", "server_info"]),
            logging_markers: strings(&[
                "logger.",
                "logging.",
                "log::",
                "tracing::",
                "console.error(",
                "console.warn(",
            ]),
            print_markers: strings(&["print(", "console.log(", "println!(", "sys.stdout.write("]),
            source_extensions: strings(&["py", "ts", "js", "mjs", "cjs", "rs"]),
            linter_files: strings(&[
                "ruff.toml",
                ".ruff.toml",
                ".flake8",
                ".pylintrc",
                "biome.json",
                "clippy.toml",
                "rustfmt.toml",
                ".rustfmt.toml",
            ]),
            linter_prefixes: strings(&[".eslintrc", "eslint.config"]),
            packaging_manifests: strings(&[
                "pyproject.toml",
                "setup.py",
                "package.json",
                "Cargo.toml",
            ]),
        }
    }
}

impl ExtractorConfig {
    /// Override the file ceiling.
    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.walk.max_files = max_files;
        self
    }
}

/// Version reference for one framework package.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkBaseline {
    /// Releases older than this are critically outdated.
    pub floor: Version,
    /// Oldest release still considered current.
    pub current: Version,
}

impl FrameworkBaseline {
    /// Pair a floor with a current release.
    pub fn new(floor: Version, current: Version) -> Self {
        Self { floor, current }
    }
}

/// The state-of-the-art reference a repository is measured against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    /// Version references keyed by framework package name.
    pub frameworks: BTreeMap<String, FrameworkBaseline>,
    /// Reference for framework packages without an entry.
    pub default_framework: FrameworkBaseline,
    /// Tool count above which the server is considered sprawling.
    pub tool_ceiling: usize,
    /// Largest acceptable share of print calls among output calls.
    pub max_print_ratio: f64,
}

impl Default for Baseline {
    fn default() -> Self {
        let sdk = FrameworkBaseline::new(Version::new(1, 0, 0), Version::new(1, 20, 0));
        let frameworks = [
            ("mcp", sdk),
            ("@modelcontextprotocol/sdk", sdk),
            (
                "fastmcp",
                FrameworkBaseline::new(Version::new(2, 0, 0), Version::new(2, 12, 0)),
            ),
            (
                "rmcp",
                FrameworkBaseline::new(Version::new(0, 3, 0), Version::new(0, 8, 0)),
            ),
        ]
        .into_iter()
        .map(|(package, framework)| (package.to_string(), framework))
        .collect();

        Self {
            frameworks,
            default_framework: sdk,
            tool_ceiling: 40,
            max_print_ratio: 0.5,
        }
    }
}


/// Location and freshness window of the scan cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Directory holding one file per cache key.
    pub root: PathBuf,
    /// How long an entry stays fresh after it was written.
    pub ttl: Duration,
}

impl CacheConfig {
    /// Create a cache configuration rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            root: root.into(),
            ttl,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new(std::env::temp_dir().join("runtcheck-cache"), DEFAULT_CACHE_TTL)
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
