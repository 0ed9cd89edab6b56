//! Score calculation and tier classification.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{RepoFacts, Tier};
use crate::evaluator::EvaluationOutcome;

/// Score, runt flag and tier for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Verdict {
    /// Compliance score, 0-100.
    pub score: u8,
    /// True when at least one critical violation fired.
    pub is_runt: bool,
    /// Size label from the tool count.
    pub tier: Tier,
}

/// Turn an evaluation into a verdict.
///
/// The runt flag depends only on the critical count, never on the score.
pub fn score(outcome: &EvaluationOutcome, facts: &RepoFacts) -> Verdict {
    Verdict {
        score: compliance_score(outcome.score_deduction_total),
        is_runt: outcome.critical_count > 0,
        tier: classify_tier(facts.tool_count),
    }
}

/// `100 - deductions`, clamped to `0..=100`.
pub fn compliance_score(total_deduction: u32) -> u8 {
    let score = 100u32.saturating_sub(total_deduction).min(100);
    score as u8
}

/// Tier for a repository exposing `tool_count` tools.
pub fn classify_tier(tool_count: usize) -> Tier {
    match tool_count {
        0..=2 => Tier::Minimal,
        3..=9 => Tier::Standard,
        10..=24 => Tier::Large,
        _ => Tier::Extensive,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Category, Severity, Violation};
    use std::path::PathBuf;

    fn outcome(deductions: &[(Severity, u32)]) -> EvaluationOutcome {
        let violations: Vec<Violation> = deductions
            .iter()
            .enumerate()
            .map(|(index, (severity, deduction))| Violation {
                rule_id: format!("rule-{index}"),
                category: Category::Quality,
                severity: *severity,
                message: String::new(),
                remediation: String::new(),
                deduction: *deduction,
            })
            .collect();
        EvaluationOutcome {
            score_deduction_total: violations.iter().map(|v| v.deduction).sum(),
            critical_count: violations
                .iter()
                .filter(|v| v.severity == Severity::Critical)
                .count(),
            violations,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn score_is_clamped_at_zero() {
        let facts = RepoFacts::empty(PathBuf::from("/repo"));
        let verdict = score(
            &outcome(&[(Severity::Warning, 80), (Severity::Warning, 70)]),
            &facts,
        );
        assert_eq!(verdict.score, 0);
        assert!(!verdict.is_runt);
        assert_eq!(compliance_score(u32::MAX), 0);
        assert_eq!(compliance_score(0), 100);
    }

    #[test]
    fn runt_ignores_numeric_score() {
        let facts = RepoFacts::empty(PathBuf::from("/repo"));
        let verdict = score(&outcome(&[(Severity::Critical, 0)]), &facts);
        assert_eq!(verdict.score, 100);
        assert!(verdict.is_runt);

        let verdict = score(&outcome(&[(Severity::Warning, 95)]), &facts);
        assert_eq!(verdict.score, 5);
        assert!(!verdict.is_runt);
    }

    #[test]
    fn tiers_follow_tool_thresholds() {
        assert_eq!(classify_tier(0), Tier::Minimal);
        assert_eq!(classify_tier(2), Tier::Minimal);
        assert_eq!(classify_tier(3), Tier::Standard);
        assert_eq!(classify_tier(10), Tier::Large);
        assert_eq!(classify_tier(24), Tier::Large);
        assert_eq!(classify_tier(25), Tier::Extensive);
    }
}
