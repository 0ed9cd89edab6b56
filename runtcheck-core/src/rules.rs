//! Declarative compliance rules.
//!
//! Rules are plain data: a [`Predicate`] tree interpreted against
//! [`RepoFacts`], an optional guard, and a [`Deduction`]. The shipped catalog
//! is built in [`RuleCatalog::standard`]; rule ids are stable once published,
//! so changing what a rule checks means adding a rule with a new id.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::config::{Baseline, FrameworkBaseline};
use crate::domain::{Category, RepoFacts, ScanMode, Severity};
use crate::error::{Result, RuntCheckError};
use crate::version::Version;

/// Boolean facts a predicate can test.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    /// [`RepoFacts::has_baseline_tools`].
    BaselineTools,
    /// [`RepoFacts::has_framework_import`].
    FrameworkImport,
    /// [`RepoFacts::has_tests`].
    Tests,
    /// [`RepoFacts::has_ci`].
    Ci,
    /// [`RepoFacts::has_linter_config`].
    LinterConfig,
    /// [`RepoFacts::has_packaging_manifest`].
    PackagingManifest,
    /// [`RepoFacts::has_documentation`].
    Documentation,
}

impl Flag {
    fn read(self, facts: &RepoFacts) -> bool {
        match self {
            Self::BaselineTools => facts.has_baseline_tools,
            Self::FrameworkImport => facts.has_framework_import,
            Self::Tests => facts.has_tests,
            Self::Ci => facts.has_ci,
            Self::LinterConfig => facts.has_linter_config,
            Self::PackagingManifest => facts.has_packaging_manifest,
            Self::Documentation => facts.has_documentation,
        }
    }
}

/// Numeric facts a predicate or deduction can read.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CountField {
    /// [`RepoFacts::tool_count`].
    Tools,
    /// [`RepoFacts::print_calls`].
    PrintCalls,
    /// [`RepoFacts::logging_calls`].
    LoggingCalls,
    /// Number of declared dependencies.
    Dependencies,
}

impl CountField {
    fn read(self, facts: &RepoFacts) -> usize {
        match self {
            Self::Tools => facts.tool_count,
            Self::PrintCalls => facts.print_calls,
            Self::LoggingCalls => facts.logging_calls,
            Self::Dependencies => facts.dependencies.len(),
        }
    }
}

/// A predicate could not be decided for the given facts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleError(pub String);

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for RuleError {}

/// Release thresholds keyed by framework package.
///
/// Framework packages version independently, so each is compared against its
/// own threshold. Packages without an entry use `fallback`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionThresholds {
    /// Threshold per package name.
    pub packages: BTreeMap<String, Version>,
    /// Threshold for unlisted or unknown packages.
    pub fallback: Version,
}

impl VersionThresholds {
    /// The same threshold for every package.
    pub fn uniform(version: Version) -> Self {
        Self {
            packages: BTreeMap::new(),
            fallback: version,
        }
    }

    /// Build thresholds from `baseline`, picking one release per framework.
    pub fn from_baseline(baseline: &Baseline, pick: fn(&FrameworkBaseline) -> Version) -> Self {
        Self {
            packages: baseline
                .frameworks
                .iter()
                .map(|(package, framework)| (package.clone(), pick(framework)))
                .collect(),
            fallback: pick(&baseline.default_framework),
        }
    }

    /// Threshold applied to `package`.
    pub fn for_package(&self, package: Option<&str>) -> Version {
        package
            .and_then(|package| self.packages.get(package))
            .copied()
            .unwrap_or(self.fallback)
    }
}

/// Condition over [`RepoFacts`]; a rule triggers when its predicate holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "args", rename_all = "snake_case")]
pub enum Predicate {
    /// The flag is false.
    FlagMissing(Flag),
    /// The flag is true.
    FlagPresent(Flag),
    /// No framework version was detected.
    FrameworkVersionMissing,
    /// A framework version was detected and is older than the release listed
    /// for the package that supplied it.
    FrameworkVersionBelow(VersionThresholds),
    /// The count is strictly below `min`.
    CountBelow {
        /// Field to read.
        field: CountField,
        /// Exclusive lower bound.
        min: usize,
    },
    /// The count is strictly above `max`.
    CountAbove {
        /// Field to read.
        field: CountField,
        /// Exclusive upper bound.
        max: usize,
    },
    /// The print share of output calls is strictly above the threshold.
    PrintRatioAbove(f64),
    /// Every child holds.
    All(Vec<Predicate>),
    /// At least one child holds.
    Any(Vec<Predicate>),
    /// The child does not hold.
    Not(Box<Predicate>),
}

impl Predicate {
    /// Decide the predicate. Errors are reported per rule by the evaluator.
    pub fn evaluate(&self, facts: &RepoFacts) -> std::result::Result<bool, RuleError> {
        match self {
            Self::FlagMissing(flag) => Ok(!flag.read(facts)),
            Self::FlagPresent(flag) => Ok(flag.read(facts)),
            Self::FrameworkVersionMissing => Ok(facts.framework_version.is_none()),
            Self::FrameworkVersionBelow(thresholds) => match facts.framework_version.as_deref() {
                None => Ok(false),
                Some(raw) => {
                    let threshold = thresholds.for_package(facts.framework_package.as_deref());
                    Version::parse(raw)
                        .map(|found| found < threshold)
                        .map_err(RuleError)
                }
            },
            Self::CountBelow { field, min } => Ok(field.read(facts) < *min),
            Self::CountAbove { field, max } => Ok(field.read(facts) > *max),
            Self::PrintRatioAbove(threshold) => Ok(facts.print_ratio() > *threshold),
            Self::All(children) => {
                for child in children {
                    if !child.evaluate(facts)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Self::Any(children) => {
                for child in children {
                    if child.evaluate(facts)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Self::Not(child) => child.evaluate(facts).map(|holds| !holds),
        }
    }

    /// First version threshold in the tree, resolved for the facts' package.
    pub fn version_threshold(&self, facts: &RepoFacts) -> Option<Version> {
        match self {
            Self::FrameworkVersionBelow(thresholds) => {
                Some(thresholds.for_package(facts.framework_package.as_deref()))
            }
            Self::All(children) | Self::Any(children) => children
                .iter()
                .find_map(|child| child.version_threshold(facts)),
            Self::Not(child) => child.version_threshold(facts),
            _ => None,
        }
    }
}

/// Points a triggered rule subtracts from the score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Deduction {
    /// A constant penalty.
    Fixed {
        /// Points subtracted.
        points: u32,
    },
    /// `per_unit` points for every unit of `field` above `above`, capped at `max`.
    Graduated {
        /// Field to read.
        field: CountField,
        /// Count at which the penalty starts.
        above: usize,
        /// Points per unit over the threshold.
        per_unit: u32,
        /// Largest penalty applied.
        max: u32,
    },
}

impl Deduction {
    /// Penalty applied for `facts`.
    pub fn amount(&self, facts: &RepoFacts) -> u32 {
        match self {
            Self::Fixed { points } => *points,
            Self::Graduated {
                field,
                above,
                per_unit,
                max,
            } => {
                let excess = field.read(facts).saturating_sub(*above);
                let excess = u32::try_from(excess).unwrap_or(u32::MAX);
                excess.saturating_mul(*per_unit).min(*max)
            }
        }
    }
}

/// A named, categorized compliance check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rule {
    /// Stable unique identifier.
    pub id: String,
    /// Area the rule belongs to.
    pub category: Category,
    /// Severity of a violation.
    pub severity: Severity,
    /// Condition under which the rule triggers.
    pub predicate: Predicate,
    /// The rule is skipped unless the guard holds.
    pub guard: Option<Predicate>,
    /// Penalty applied when the rule triggers.
    pub deduction: Deduction,
    /// Message template; `{framework_package}`, `{framework_version}`,
    /// `{threshold}`, `{tool_count}`, `{print_calls}` and `{logging_calls}`
    /// are substituted.
    pub description: String,
    /// Remediation text.
    pub remediation: String,
}

impl Rule {
    /// Start a rule with a zero deduction and empty texts.
    pub fn new(
        id: impl Into<String>,
        category: Category,
        severity: Severity,
        predicate: Predicate,
    ) -> Self {
        Self {
            id: id.into(),
            category,
            severity,
            predicate,
            guard: None,
            deduction: Deduction::Fixed { points: 0 },
            description: String::new(),
            remediation: String::new(),
        }
    }

    /// Only evaluate the rule when `guard` holds.
    pub fn guarded_by(mut self, guard: Predicate) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Subtract a constant number of points.
    pub fn deducting(mut self, points: u32) -> Self {
        self.deduction = Deduction::Fixed { points };
        self
    }

    /// Subtract a penalty computed from the facts.
    pub fn deducting_by(mut self, deduction: Deduction) -> Self {
        self.deduction = deduction;
        self
    }

    /// Set the message template and remediation text.
    pub fn described(
        mut self,
        description: impl Into<String>,
        remediation: impl Into<String>,
    ) -> Self {
        self.description = description.into();
        self.remediation = remediation.into();
        self
    }

    /// Render the message template against `facts`.
    pub fn render_message(&self, facts: &RepoFacts) -> String {
        self.render_template(&self.description, facts)
    }

    /// Render the remediation text against `facts`.
    pub fn render_remediation(&self, facts: &RepoFacts) -> String {
        self.render_template(&self.remediation, facts)
    }

    fn render_template(&self, template: &str, facts: &RepoFacts) -> String {
        let threshold = self
            .predicate
            .version_threshold(facts)
            .map(|version| version.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        render_facts(template, facts).replace("{threshold}", &threshold)
    }
}

fn render_facts(template: &str, facts: &RepoFacts) -> String {
    template
        .replace(
            "{framework_package}",
            facts.framework_package.as_deref().unwrap_or("protocol SDK"),
        )
        .replace(
            "{framework_version}",
            facts.framework_version.as_deref().unwrap_or("unknown"),
        )
        .replace("{tool_count}", &facts.tool_count.to_string())
        .replace("{print_calls}", &facts.print_calls.to_string())
        .replace("{logging_calls}", &facts.logging_calls.to_string())
}

/// Whether rules of `category` run in `mode`.
pub fn mode_includes(mode: ScanMode, category: Category) -> bool {
    match mode {
        ScanMode::Thorough => true,
        ScanMode::Fast => matches!(
            category,
            Category::Version | Category::Tools | Category::Structure | Category::Ci
        ),
    }
}

/// An ordered, duplicate-free list of rules.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleCatalog {
    rules: Vec<Rule>,
}

/// Collects rules and rejects duplicate ids on [`CatalogBuilder::build`].
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    rules: Vec<Rule>,
}

impl CatalogBuilder {
    /// Append a rule.
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Finish the catalog.
    pub fn build(self) -> Result<RuleCatalog> {
        let mut seen = HashSet::new();
        for rule in &self.rules {
            if !seen.insert(rule.id.as_str()) {
                return Err(RuntCheckError::DuplicateRule(rule.id.clone()));
            }
        }
        Ok(RuleCatalog { rules: self.rules })
    }
}

impl RuleCatalog {
    /// Start an empty catalog.
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// The shipped catalog measured against `baseline`.
    pub fn standard(baseline: &Baseline) -> Result<Self> {
        let floor = VersionThresholds::from_baseline(baseline, |framework| framework.floor);
        let current = VersionThresholds::from_baseline(baseline, |framework| framework.current);

        Self::builder()
            .rule(
                Rule::new(
                    "version.framework-missing",
                    Category::Version,
                    Severity::Critical,
                    Predicate::All(vec![
                        Predicate::FrameworkVersionMissing,
                        Predicate::FlagMissing(Flag::FrameworkImport),
                    ]),
                )
                .deducting(30)
                .described(
                    "No protocol framework dependency or import was found.",
                    "Declare the protocol SDK in the package manifest and import it from the server entry point.",
                ),
            )
            .rule(
                Rule::new(
                    "version.framework-unpinned",
                    Category::Version,
                    Severity::Warning,
                    Predicate::All(vec![
                        Predicate::FrameworkVersionMissing,
                        Predicate::FlagPresent(Flag::FrameworkImport),
                    ]),
                )
                .deducting(5)
                .described(
                    "The protocol framework is imported but no version requirement is declared.",
                    "Declare a minimum version for the protocol SDK in the package manifest.",
                ),
            )
            .rule(
                Rule::new(
                    "version.framework-outdated",
                    Category::Version,
                    Severity::Critical,
                    Predicate::FrameworkVersionBelow(floor.clone()),
                )
                .deducting(25)
                .described(
                    "Protocol framework {framework_package} {framework_version} predates {threshold}.",
                    "Upgrade {framework_package} to a supported release.",
                ),
            )
            .rule(
                Rule::new(
                    "version.framework-behind",
                    Category::Version,
                    Severity::Warning,
                    Predicate::All(vec![
                        Predicate::FrameworkVersionBelow(current),
                        Predicate::Not(Box::new(Predicate::FrameworkVersionBelow(floor))),
                    ]),
                )
                .deducting(10)
                .described(
                    "Protocol framework {framework_package} {framework_version} is behind {threshold}.",
                    "Upgrade {framework_package} to {threshold} or newer.",
                ),
            )
            .rule(
                Rule::new(
                    "tools.none-exposed",
                    Category::Tools,
                    Severity::Critical,
                    Predicate::CountBelow {
                        field: CountField::Tools,
                        min: 1,
                    },
                )
                .deducting(25)
                .described(
                    "The server does not register any tools.",
                    "Register at least one tool with the protocol server.",
                ),
            )
            .rule(
                Rule::new(
                    "tools.baseline-missing",
                    Category::Tools,
                    Severity::Critical,
                    Predicate::FlagMissing(Flag::BaselineTools),
                )
                .guarded_by(Predicate::CountAbove {
                    field: CountField::Tools,
                    max: 0,
                })
                .deducting(20)
                .described(
                    "The server exposes {tool_count} tools but not the baseline health and info tools.",
                    "Add the baseline health_check and server_info tools.",
                ),
            )
            .rule(
                Rule::new(
                    "tools.sprawl",
                    Category::Tools,
                    Severity::Info,
                    Predicate::CountAbove {
                        field: CountField::Tools,
                        max: baseline.tool_ceiling,
                    },
                )
                .deducting_by(Deduction::Graduated {
                    field: CountField::Tools,
                    above: baseline.tool_ceiling,
                    per_unit: 1,
                    max: 10,
                })
                .described(
                    format!(
                        "The server exposes {{tool_count}} tools, more than {}.",
                        baseline.tool_ceiling
                    ),
                    "Split the server or consolidate related tools.",
                ),
            )
            .rule(
                Rule::new(
                    "structure.no-manifest",
                    Category::Structure,
                    Severity::Critical,
                    Predicate::FlagMissing(Flag::PackagingManifest),
                )
                .deducting(20)
                .described(
                    "No packaging manifest was found at the repository root.",
                    "Add a pyproject.toml, package.json or Cargo.toml describing the server.",
                ),
            )
            .rule(
                Rule::new(
                    "ci.no-workflow",
                    Category::Ci,
                    Severity::Warning,
                    Predicate::FlagMissing(Flag::Ci),
                )
                .deducting(10)
                .described(
                    "No CI workflow was found.",
                    "Add a workflow under .github/workflows or a .gitlab-ci.yml.",
                ),
            )
            .rule(
                Rule::new(
                    "testing.no-tests",
                    Category::Testing,
                    Severity::Warning,
                    Predicate::FlagMissing(Flag::Tests),
                )
                .deducting(15)
                .described(
                    "No test files were found.",
                    "Add tests that exercise each registered tool.",
                ),
            )
            .rule(
                Rule::new(
                    "quality.no-linter",
                    Category::Quality,
                    Severity::Warning,
                    Predicate::FlagMissing(Flag::LinterConfig),
                )
                .deducting(5)
                .described(
                    "No linter configuration was found.",
                    "Configure ruff, eslint, biome or clippy for the repository.",
                ),
            )
            .rule(
                Rule::new(
                    "quality.print-over-logging",
                    Category::Quality,
                    Severity::Warning,
                    Predicate::PrintRatioAbove(baseline.max_print_ratio),
                )
                .guarded_by(Predicate::CountAbove {
                    field: CountField::PrintCalls,
                    max: 0,
                })
                .deducting(10)
                .described(
                    "Sources print to stdout {print_calls} times against {logging_calls} logging calls.",
                    "Replace print calls with a logger; stdout carries protocol messages on stdio transports.",
                ),
            )
            .rule(
                Rule::new(
                    "documentation.no-readme",
                    Category::Documentation,
                    Severity::Info,
                    Predicate::FlagMissing(Flag::Documentation),
                )
                .deducting(5)
                .described(
                    "No README or docs directory was found.",
                    "Add a README describing the tools and how to configure a client.",
                ),
            )
            .build()
    }

    /// Rules that run in `mode`, in catalog order.
    pub fn for_mode(&self, mode: ScanMode) -> Self {
        Self {
            rules: self
                .rules
                .iter()
                .filter(|rule| mode_includes(mode, rule.category))
                .cloned()
                .collect(),
        }
    }

    /// Rules in catalog order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Look up a rule by id.
    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.id == id)
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the catalog has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
