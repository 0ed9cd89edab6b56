//! Applies a [`RuleCatalog`] to extracted facts.

use log::warn;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{RepoFacts, ScanWarning, Severity, Violation};
use crate::rules::{Rule, RuleCatalog, RuleError};

/// Violations produced by one evaluation, in catalog order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EvaluationOutcome {
    /// Triggered rules, including informational entries for rules that errored.
    pub violations: Vec<Violation>,
    /// Sum of every violation's deduction.
    pub score_deduction_total: u32,
    /// Number of critical violations.
    pub critical_count: usize,
    /// Rules that could not be evaluated.
    pub warnings: Vec<ScanWarning>,
}

/// Evaluate every rule of `catalog` against `facts`.
///
/// Rules run in catalog order. A rule whose guard or predicate cannot be
/// decided is reported as an informational violation with no deduction and
/// the remaining rules still run.
pub fn evaluate(facts: &RepoFacts, catalog: &RuleCatalog) -> EvaluationOutcome {
    let mut violations = Vec::new();
    let mut warnings = Vec::new();

    for rule in catalog.rules() {
        match check(rule, facts) {
            Ok(false) => {}
            Ok(true) => violations.push(Violation {
                rule_id: rule.id.clone(),
                category: rule.category,
                severity: rule.severity,
                message: rule.render_message(facts),
                remediation: rule.render_remediation(facts),
                deduction: rule.deduction.amount(facts),
            }),
            Err(err) => {
                warn!(
                    "rule {} failed for {}: {err}",
                    rule.id,
                    facts.path.display()
                );
                violations.push(rule_error_violation(rule, &err));
                warnings.push(ScanWarning::RuleEvaluation {
                    rule_id: rule.id.clone(),
                    message: err.to_string(),
                });
            }
        }
    }

    let score_deduction_total = violations
        .iter()
        .fold(0u32, |total, violation| total.saturating_add(violation.deduction));
    let critical_count = violations
        .iter()
        .filter(|violation| violation.severity == Severity::Critical)
        .count();

    EvaluationOutcome {
        violations,
        score_deduction_total,
        critical_count,
        warnings,
    }
}

fn check(rule: &Rule, facts: &RepoFacts) -> Result<bool, RuleError> {
    if let Some(guard) = &rule.guard {
        if !guard.evaluate(facts)? {
            return Ok(false);
        }
    }
    rule.predicate.evaluate(facts)
}

fn rule_error_violation(rule: &Rule, err: &RuleError) -> Violation {
    Violation {
        rule_id: rule.id.clone(),
        category: rule.category,
        severity: Severity::Info,
        message: format!("Rule could not be evaluated: {err}."),
        remediation: "Check the repository value this rule reads; the rule was skipped."
            .to_string(),
        deduction: 0,
    }
}
