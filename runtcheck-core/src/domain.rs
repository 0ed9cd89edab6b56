//! Domain entities for runtcheck.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A mapping of language names to the number of files detected for each.
pub type FileCounts = BTreeMap<String, usize>;

/// Compliance area a rule belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Protocol framework dependency checks.
    Version,
    /// Exposed tool surface checks.
    Tools,
    /// Repository layout and packaging checks.
    Structure,
    /// Code quality checks.
    Quality,
    /// Test presence checks.
    Testing,
    /// Continuous integration checks.
    Ci,
    /// Documentation checks.
    Documentation,
}

impl Category {
    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Version => "version",
            Self::Tools => "tools",
            Self::Structure => "structure",
            Self::Quality => "quality",
            Self::Testing => "testing",
            Self::Ci => "ci",
            Self::Documentation => "documentation",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// How serious a violation is.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Missing mandatory capability; any critical violation makes a runt.
    Critical,
    /// Lowers the score without flagging the repository.
    Warning,
    /// Informational only.
    Info,
}

impl Severity {
    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Size label derived from the exposed tool count.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Fewer than three tools.
    Minimal,
    /// Three to nine tools.
    Standard,
    /// Ten to twenty-four tools.
    Large,
    /// Twenty-five tools or more.
    Extensive,
}

impl Tier {
    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Standard => "standard",
            Self::Large => "large",
            Self::Extensive => "extensive",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Scan depth requested by the caller.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Version, tools, structure and CI rules only.
    #[default]
    Fast,
    /// Every rule category, including quality, testing and documentation.
    Thorough,
}

impl ScanMode {
    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Thorough => "thorough",
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A dependency declared in one of the repository manifests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Dependency {
    /// Package name as written in the manifest.
    pub name: String,
    /// Version requirement, when the manifest gives one.
    pub requirement: Option<String>,
    /// Manifest file the dependency was read from.
    pub manifest: String,
}

/// A recoverable problem recorded during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanWarning {
    /// A manifest exists but could not be parsed.
    ManifestParse {
        /// Manifest file name.
        manifest: String,
        /// Parser error message.
        message: String,
    },
    /// A rule could not be evaluated against the facts.
    RuleEvaluation {
        /// Rule that failed.
        rule_id: String,
        /// Failure message.
        message: String,
    },
    /// A cache entry could not be read and was ignored.
    CacheCorrupt {
        /// Cache key of the entry.
        key: String,
        /// Parser error message.
        message: String,
    },
    /// A source file could not be read and was skipped.
    UnreadableFile {
        /// Path relative to the repository root.
        path: String,
        /// I/O error message.
        message: String,
    },
}

impl fmt::Display for ScanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ManifestParse { manifest, message } => {
                write!(f, "manifest {manifest} could not be parsed: {message}")
            }
            Self::RuleEvaluation { rule_id, message } => {
                write!(f, "rule {rule_id} could not be evaluated: {message}")
            }
            Self::CacheCorrupt { key, message } => {
                write!(f, "cache entry {key} ignored: {message}")
            }
            Self::UnreadableFile { path, message } => {
                write!(f, "skipped unreadable file {path}: {message}")
            }
        }
    }
}

/// Facts extracted from one repository on disk.
///
/// Built fresh by the extractor on every cache miss and never mutated after.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RepoFacts {
    /// Repository root.
    #[schema(value_type = String)]
    pub path: PathBuf,
    /// Framework package that supplied `framework_version`.
    pub framework_package: Option<String>,
    /// Protocol framework version requirement, normalized.
    pub framework_version: Option<String>,
    /// Number of tool registrations found in source files.
    pub tool_count: usize,
    /// Tool names that could be recovered from registrations.
    pub tool_names: Vec<String>,
    /// Whether every baseline tool name appears in the sources.
    pub has_baseline_tools: bool,
    /// Whether any source file imports the protocol framework.
    pub has_framework_import: bool,
    /// Whether test files exist.
    pub has_tests: bool,
    /// Whether a CI workflow exists.
    pub has_ci: bool,
    /// Whether a linter configuration exists.
    pub has_linter_config: bool,
    /// Whether a packaging manifest exists at the root.
    pub has_packaging_manifest: bool,
    /// Whether a README or docs directory exists.
    pub has_documentation: bool,
    /// Dependencies declared across root manifests.
    pub dependencies: Vec<Dependency>,
    /// File counts keyed by language.
    pub file_counts: FileCounts,
    /// Lines using a logging call.
    pub logging_calls: usize,
    /// Lines writing to stdout directly.
    pub print_calls: usize,
    /// Files visited by the walk.
    pub files_inspected: usize,
    /// Newest modification time among visited files.
    pub last_modified: Option<DateTime<Utc>>,
    /// Problems recorded while extracting.
    pub warnings: Vec<ScanWarning>,
}

impl RepoFacts {
    /// Create an empty fact set for `path`.
    pub fn empty(path: PathBuf) -> Self {
        Self {
            path,
            framework_package: None,
            framework_version: None,
            tool_count: 0,
            tool_names: Vec::new(),
            has_baseline_tools: false,
            has_framework_import: false,
            has_tests: false,
            has_ci: false,
            has_linter_config: false,
            has_packaging_manifest: false,
            has_documentation: false,
            dependencies: Vec::new(),
            file_counts: FileCounts::new(),
            logging_calls: 0,
            print_calls: 0,
            files_inspected: 0,
            last_modified: None,
            warnings: Vec::new(),
        }
    }

    /// Share of output lines that print instead of log.
    pub fn print_ratio(&self) -> f64 {
        let total = self.print_calls + self.logging_calls;
        if total == 0 {
            return 0.0;
        }
        self.print_calls as f64 / total as f64
    }
}

/// One triggered rule against one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Violation {
    /// Identifier of the rule that fired.
    pub rule_id: String,
    /// Rule category.
    pub category: Category,
    /// Severity of the violation.
    pub severity: Severity,
    /// Rendered message.
    pub message: String,
    /// Rendered remediation hint.
    pub remediation: String,
    /// Points subtracted from the score.
    pub deduction: u32,
}

/// Aggregate verdict for one repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ScanResult {
    /// Facts the verdict was computed from.
    pub facts: RepoFacts,
    /// Violations in catalog order.
    pub violations: Vec<Violation>,
    /// Compliance score, 0-100.
    pub score: u8,
    /// True when at least one critical violation fired.
    pub is_runt: bool,
    /// Size label from the tool count.
    pub tier: Tier,
    /// Mode the scan ran in.
    pub mode: ScanMode,
    /// When the verdict was computed.
    pub generated_at: DateTime<Utc>,
    /// Every warning recorded by extraction and evaluation.
    pub warnings: Vec<ScanWarning>,
}

impl ScanResult {
    /// Number of critical violations.
    pub fn critical_count(&self) -> usize {
        self.violations
            .iter()
            .filter(|violation| violation.severity == Severity::Critical)
            .count()
    }

    /// Human label for the verdict.
    pub fn status_label(&self) -> &'static str {
        if self.is_runt { "runt" } else { "sota" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn print_ratio_handles_zero_totals() {
        let mut facts = RepoFacts::empty(PathBuf::from("/repo"));
        assert_eq!(facts.print_ratio(), 0.0);

        facts.print_calls = 3;
        facts.logging_calls = 1;
        assert_eq!(facts.print_ratio(), 0.75);
    }

    #[test]
    fn tiers_are_ordered() {
        assert!(Tier::Minimal < Tier::Standard);
        assert!(Tier::Large < Tier::Extensive);
    }

    #[test]
    fn scan_warning_serializes_with_kind_tag() {
        let warning = ScanWarning::ManifestParse {
            manifest: "package.json".to_string(),
            message: "expected value".to_string(),
        };
        let json = serde_json::to_value(&warning).expect("serialize");
        assert_eq!(json["kind"], "manifest_parse");
        assert_eq!(json["manifest"], "package.json");
    }

    #[test]
    fn enums_use_snake_case_names() {
        assert_eq!(
            serde_json::to_string(&Category::Documentation).expect("serialize"),
            "\"documentation\""
        );
        assert_eq!(Severity::Critical.to_string(), "critical");
        assert_eq!(ScanMode::default(), ScanMode::Fast);
    }

    #[test]
    fn labels_honour_column_width() {
        assert_eq!(format!("[{:<8}]", Severity::Info), "[info    ]");
        assert_eq!(format!("[{:<13}]", Category::Ci), "[ci           ]");
        assert_eq!(format!("[{:>9}]", Tier::Large), "[    large]");
        assert_eq!(format!("[{:<9}]", ScanMode::Fast), "[fast     ]");
    }
}
