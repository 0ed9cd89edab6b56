//! Report formatting utilities for runtcheck outputs.

use std::fmt::Write;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Dependency, ScanResult, ScanWarning, Violation};

/// Dependencies listed in full before the summary is truncated.
const DEPENDENCY_PREVIEW: usize = 8;

/// Result of scanning one repository in a fleet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepoOutcome {
    /// Repository path.
    #[schema(value_type = String)]
    pub path: PathBuf,
    /// Verdict, when the scan succeeded.
    pub result: Option<ScanResult>,
    /// Failure message, when it did not.
    pub error: Option<String>,
}

impl RepoOutcome {
    /// Outcome for a successful scan.
    pub fn scanned(path: PathBuf, result: ScanResult) -> Self {
        Self {
            path,
            result: Some(result),
            error: None,
        }
    }

    /// Outcome for a failed scan.
    pub fn failed(path: PathBuf, error: impl Into<String>) -> Self {
        Self {
            path,
            result: None,
            error: Some(error.into()),
        }
    }

    /// Whether the repository was scanned and flagged as a runt.
    pub fn is_runt(&self) -> bool {
        self.result.as_ref().is_some_and(|result| result.is_runt)
    }
}

/// Fleet-wide totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FleetSummary {
    /// Repositories attempted.
    pub total: usize,
    /// Scanned repositories with a critical violation.
    pub runts: usize,
    /// Scanned repositories without one.
    pub sota: usize,
    /// Repositories that could not be scanned.
    pub failed: usize,
    /// Mean score over scanned repositories.
    pub mean_score: Option<f64>,
}

impl FleetSummary {
    /// Summarize a batch of outcomes.
    pub fn from_outcomes(outcomes: &[RepoOutcome]) -> Self {
        let scores: Vec<u8> = outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().map(|result| result.score))
            .collect();
        let runts = outcomes.iter().filter(|outcome| outcome.is_runt()).count();
        let mean_score = if scores.is_empty() {
            None
        } else {
            let sum: u32 = scores.iter().map(|score| u32::from(*score)).sum();
            Some(f64::from(sum) / scores.len() as f64)
        };
        Self {
            total: outcomes.len(),
            runts,
            sota: scores.len() - runts,
            failed: outcomes.len() - scores.len(),
            mean_score,
        }
    }
}

/// Render one scan result as Markdown.
pub fn render_status_markdown(result: &ScanResult) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# runtcheck status: {}\n", result.facts.path.display());
    append_overview(&mut output, result);
    append_violations(&mut output, &result.violations);
    append_metadata(&mut output, result);
    append_warnings(&mut output, &result.warnings);
    output
}

/// Render an untrusted payload that should hold a [`ScanResult`].
///
/// Payloads that do not match the result shape produce a short failure notice.
pub fn render_value(payload: &serde_json::Value) -> String {
    match ScanResult::deserialize(payload) {
        Ok(result) => render_status_markdown(&result),
        Err(err) => {
            let mut output = String::new();
            let _ = writeln!(output, "# runtcheck status unavailable\n");
            let _ = writeln!(output, "The result could not be rendered: {err}.");
            output
        }
    }
}

/// Render a fleet scan as Markdown.
pub fn render_fleet_markdown(outcomes: &[RepoOutcome]) -> String {
    let summary = FleetSummary::from_outcomes(outcomes);
    let mut output = String::new();
    let _ = writeln!(output, "# runtcheck fleet report\n");
    let _ = writeln!(
        output,
        "- Repositories: {} ({} runt, {} SOTA, {} failed)",
        summary.total, summary.runts, summary.sota, summary.failed
    );
    match summary.mean_score {
        Some(mean) => {
            let _ = writeln!(output, "- Mean score: {mean:.1}");
        }
        None => {
            let _ = writeln!(output, "- Mean score: n/a");
        }
    }
    let _ = writeln!(output);

    for outcome in outcomes {
        let _ = writeln!(output, "## {}\n", outcome.path.display());
        match (&outcome.result, &outcome.error) {
            (Some(result), _) => {
                append_overview(&mut output, result);
                append_violations(&mut output, &result.violations);
            }
            (None, Some(error)) => {
                let _ = writeln!(output, "- Status: failed ({error})\n");
            }
            (None, None) => {
                let _ = writeln!(output, "- Status: failed (no result)\n");
            }
        }
    }
    output
}

/// Render any serializable report payload as JSON.
pub fn render_json<T: Serialize + ?Sized>(payload: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(payload)
}

fn append_overview(output: &mut String, result: &ScanResult) {
    let status = if result.is_runt { "RUNT" } else { "SOTA" };
    let _ = writeln!(
        output,
        "- Overview: {status}, score {}/100, tier {}",
        result.score, result.tier
    );
    let _ = writeln!(
        output,
        "- Critical violations: {}",
        result.critical_count()
    );
    let _ = writeln!(output, "- Mode: {}", result.mode);
    let _ = writeln!(
        output,
        "- Generated: {}",
        result.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(output);
}

fn append_violations(output: &mut String, violations: &[Violation]) {
    if violations.is_empty() {
        let _ = writeln!(output, "### Violations\nNo violations found.\n");
        return;
    }
    let _ = writeln!(output, "### Violations");
    for (index, violation) in violations.iter().enumerate() {
        let _ = writeln!(
            output,
            "{}. [{}] `{}` (-{}): {}",
            index + 1,
            violation.severity,
            violation.rule_id,
            violation.deduction,
            violation.message
        );
        if !violation.remediation.is_empty() {
            let _ = writeln!(output, "   - Fix: {}", violation.remediation);
        }
    }
    let _ = writeln!(output);
}

fn append_metadata(output: &mut String, result: &ScanResult) {
    let facts = &result.facts;
    let _ = writeln!(output, "### Metadata");
    if facts.tool_names.is_empty() {
        let _ = writeln!(output, "- Tools: {}", facts.tool_count);
    } else {
        let _ = writeln!(
            output,
            "- Tools: {} ({})",
            facts.tool_count,
            facts.tool_names.join(", ")
        );
    }
    let _ = writeln!(
        output,
        "- Framework version: {}",
        facts.framework_version.as_deref().unwrap_or("not detected")
    );
    let _ = writeln!(
        output,
        "- Dependencies: {}",
        dependency_summary(&facts.dependencies)
    );
    let _ = writeln!(output, "- Files inspected: {}", facts.files_inspected);
    if !facts.file_counts.is_empty() {
        let counts: Vec<String> = facts
            .file_counts
            .iter()
            .map(|(language, count)| format!("{language}: {count}"))
            .collect();
        let _ = writeln!(output, "- Languages: {}", counts.join(", "));
    }
    let _ = writeln!(
        output,
        "- Output calls: {} logging, {} print",
        facts.logging_calls, facts.print_calls
    );
    let _ = writeln!(output);
}

fn append_warnings(output: &mut String, warnings: &[ScanWarning]) {
    if warnings.is_empty() {
        let _ = writeln!(output, "### Warnings\nNo warnings reported.\n");
        return;
    }
    let _ = writeln!(output, "### Warnings");
    for warning in warnings {
        let _ = writeln!(output, "- {warning}");
    }
    let _ = writeln!(output);
}

fn dependency_summary(dependencies: &[Dependency]) -> String {
    if dependencies.is_empty() {
        return "none".to_string();
    }
    let mut names: Vec<String> = dependencies
        .iter()
        .take(DEPENDENCY_PREVIEW)
        .map(|dependency| match &dependency.requirement {
            Some(requirement) => format!("{} {requirement}", dependency.name),
            None => dependency.name.clone(),
        })
        .collect();
    if dependencies.len() > DEPENDENCY_PREVIEW {
        names.push(format!("+{} more", dependencies.len() - DEPENDENCY_PREVIEW));
    }
    format!("{} ({})", dependencies.len(), names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Category, RepoFacts, ScanMode, Severity, Tier};
    use chrono::{TimeZone, Utc};

    fn sample_result() -> ScanResult {
        let mut facts = RepoFacts::empty(PathBuf::from("/srv/weather"));
        facts.framework_version = Some("0.9.0".to_string());
        facts.tool_count = 2;
        facts.tool_names = vec!["forecast".to_string(), "health_check".to_string()];
        facts.dependencies = vec![Dependency {
            name: "mcp".to_string(),
            requirement: Some(">=0.9.0".to_string()),
            manifest: "pyproject.toml".to_string(),
        }];
        facts.file_counts.insert("Python".to_string(), 3);
        ScanResult {
            facts,
            violations: vec![Violation {
                rule_id: "version.framework-outdated".to_string(),
                category: Category::Version,
                severity: Severity::Critical,
                message: "Framework 0.9.0 is critically outdated.".to_string(),
                remediation: "Upgrade the framework.".to_string(),
                deduction: 25,
            }],
            score: 75,
            is_runt: true,
            tier: Tier::Minimal,
            mode: ScanMode::Fast,
            generated_at: Utc.with_ymd_and_hms(2026, 5, 4, 3, 2, 1).unwrap(),
            warnings: vec![ScanWarning::ManifestParse {
                manifest: "package.json".to_string(),
                message: "expected value".to_string(),
            }],
        }
    }

    #[test]
    fn renders_status_markdown() {
        let output = render_status_markdown(&sample_result());
        assert!(output.contains("runtcheck status: /srv/weather"));
        assert!(output.contains("RUNT, score 75/100, tier minimal"));
        assert!(output.contains("1. [critical] `version.framework-outdated` (-25)"));
        assert!(output.contains("Fix: Upgrade the framework."));
        assert!(output.contains("Tools: 2 (forecast, health_check)"));
        assert!(output.contains("Framework version: 0.9.0"));
        assert!(output.contains("Dependencies: 1 (mcp >=0.9.0)"));
        assert!(output.contains("package.json"));
    }

    #[test]
    fn renders_clean_result() {
        let mut result = sample_result();
        result.violations.clear();
        result.warnings.clear();
        result.is_runt = false;
        result.score = 100;
        result.facts.dependencies.clear();
        let output = render_status_markdown(&result);
        assert!(output.contains("SOTA, score 100/100"));
        assert!(output.contains("No violations found."));
        assert!(output.contains("Dependencies: none"));
        assert!(output.contains("No warnings reported."));
    }

    #[test]
    fn render_value_handles_malformed_payloads() {
        let valid = serde_json::to_value(sample_result()).expect("value");
        assert!(render_value(&valid).contains("RUNT, score 75/100"));

        let mut missing = valid.clone();
        if let Some(object) = missing.as_object_mut() {
            object.remove("facts");
        }
        let output = render_value(&missing);
        assert!(output.contains("runtcheck status unavailable"));

        assert!(render_value(&serde_json::json!([1, 2, 3])).contains("unavailable"));
    }

    #[test]
    fn renders_fleet_markdown_with_failures() {
        let outcomes = vec![
            RepoOutcome::scanned(PathBuf::from("/srv/weather"), sample_result()),
            RepoOutcome::failed(PathBuf::from("/srv/huge"), "repository too large"),
        ];
        let output = render_fleet_markdown(&outcomes);
        assert!(output.contains("Repositories: 2 (1 runt, 0 SOTA, 1 failed)"));
        assert!(output.contains("Mean score: 75.0"));
        assert!(output.contains("## /srv/huge"));
        assert!(output.contains("Status: failed (repository too large)"));
    }

    #[test]
    fn summarizes_fleet() {
        let mut clean = sample_result();
        clean.is_runt = false;
        clean.score = 90;
        let outcomes = vec![
            RepoOutcome::scanned(PathBuf::from("/a"), sample_result()),
            RepoOutcome::scanned(PathBuf::from("/b"), clean),
            RepoOutcome::failed(PathBuf::from("/c"), "missing"),
        ];
        let summary = FleetSummary::from_outcomes(&outcomes);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.runts, 1);
        assert_eq!(summary.sota, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.mean_score, Some(82.5));
        assert_eq!(FleetSummary::from_outcomes(&[]).mean_score, None);
    }

    #[test]
    fn renders_json_payload() {
        let outcome = RepoOutcome::failed(PathBuf::from("/srv/x"), "boom");
        let json = render_json(&vec![outcome]).expect("json");
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("parse");
        assert!(parsed.is_array());
        assert_eq!(parsed[0]["error"], "boom");
        assert!(parsed[0]["result"].is_null());
    }
}
