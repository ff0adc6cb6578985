//! Verdict aggregation
//!
//! The verdict keeps every upstream result next to the severity so a reader
//! can see which signal produced it.

use serde::{Deserialize, Serialize};

use crate::anomaly::{AnomalyFlag, AnomalyReport};
use crate::detection::ManipulationReport;
use crate::reconciliation::{FeeModelDecision, MatchStatus, ReconciliationResult};
use crate::types::*;

/// Aggregated severity of a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    NoIssues,
    Critical,
    Fatal,
}

/// Rule of the severity table that matched first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictRule {
    /// Balance failed and the document shows tampering evidence
    BalanceFailedWithTampering,
    BalanceFailed,
    StructuralManipulation,
    AnomalyThresholdExceeded,
}

/// Individual signal observed on the statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signal", content = "detail", rename_all = "snake_case")]
pub enum Signal {
    BalanceMismatch { mismatches: usize },
    StructuralManipulation { pages: usize },
    DuplicateIds { count: usize },
    Anomaly(AnomalyFlag),
}

/// Final record for one statement-processing run
///
/// Created once per run and never mutated; reprocessing produces a new
/// verdict that replaces the old one under the same run id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub run_id: RunId,
    pub account_number: String,
    pub provider_code: Option<String>,
    pub severity: Severity,
    pub triggered_by: Option<VerdictRule>,
    pub signals: Vec<Signal>,
    pub reconciliation: CheckOutcome<ReconciliationResult>,
    pub fee_model: FeeModelDecision,
    pub manipulation: CheckOutcome<ManipulationReport>,
    pub anomalies: AnomalyReport,
}

/// Severity, matching rule and contributing signals
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub severity: Severity,
    pub rule: Option<VerdictRule>,
    pub signals: Vec<Signal>,
}

/// Apply the severity table, first matching row wins
///
/// | condition                                          | severity  |
/// |----------------------------------------------------|-----------|
/// | balance failed and (manipulated or duplicate ids)  | FATAL     |
/// | balance failed                                     | CRITICAL  |
/// | manipulated                                        | CRITICAL  |
/// | any anomaly threshold exceeded                     | CRITICAL  |
/// | otherwise                                          | NO_ISSUES |
///
/// Unavailable checks contribute no signal.
pub fn aggregate(
    reconciliation: &CheckOutcome<ReconciliationResult>,
    manipulation: &CheckOutcome<ManipulationReport>,
    anomalies: &AnomalyReport,
) -> Aggregation {
    let mut signals = Vec::new();

    let balance_failed = match reconciliation.available() {
        Some(result) if result.match_status == MatchStatus::Failed => {
            signals.push(Signal::BalanceMismatch {
                mismatches: result.balance_diff_changes,
            });
            true
        }
        _ => false,
    };

    let manipulated = match manipulation.available() {
        Some(report) if report.is_manipulated => {
            signals.push(Signal::StructuralManipulation {
                pages: report.manipulated_pages_count,
            });
            true
        }
        _ => false,
    };

    let duplicate_ids = anomalies.duplicate_id_count();
    if duplicate_ids > 0 {
        signals.push(Signal::DuplicateIds {
            count: duplicate_ids,
        });
    }
    signals.extend(anomalies.flags.iter().cloned().map(Signal::Anomaly));

    let rule = if balance_failed && (manipulated || duplicate_ids > 0) {
        Some(VerdictRule::BalanceFailedWithTampering)
    } else if balance_failed {
        Some(VerdictRule::BalanceFailed)
    } else if manipulated {
        Some(VerdictRule::StructuralManipulation)
    } else if anomalies.has_flags() {
        Some(VerdictRule::AnomalyThresholdExceeded)
    } else {
        None
    };

    let severity = match rule {
        Some(VerdictRule::BalanceFailedWithTampering) => Severity::Fatal,
        Some(_) => Severity::Critical,
        None => Severity::NoIssues,
    };

    Aggregation {
        severity,
        rule,
        signals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::IdIntegrityReport;
    use bigdecimal::BigDecimal;

    fn reconciliation(status: MatchStatus) -> CheckOutcome<ReconciliationResult> {
        CheckOutcome::Available(ReconciliationResult {
            opening_balance: BigDecimal::from(0),
            declared_opening_balance: None,
            calculated_closing_balance: BigDecimal::from(10),
            declared_closing_balance: BigDecimal::from(10),
            transaction_count: 1,
            balance_diff_changes: usize::from(status == MatchStatus::Failed),
            balance_diff_change_ratio: 0.0,
            mismatched_sequences: Vec::new(),
            running_balances: vec![BigDecimal::from(10)],
            match_status: status,
        })
    }

    fn manipulation(is_manipulated: bool) -> CheckOutcome<ManipulationReport> {
        CheckOutcome::Available(ManipulationReport {
            layout: "standard".to_string(),
            pages: Vec::new(),
            manipulated_pages_count: usize::from(is_manipulated),
            total_pages: 1,
            is_manipulated,
            warnings: Vec::new(),
        })
    }

    fn anomalies(duplicate_count: usize, flags: Vec<AnomalyFlag>) -> AnomalyReport {
        AnomalyReport {
            id_integrity: CheckOutcome::Available(IdIntegrityReport {
                checked: 3,
                missing_ids: 0,
                gap_count: 0,
                missing_sequence_values: 0,
                gaps: Vec::new(),
                duplicate_ids: Vec::new(),
                duplicate_count,
                pattern_breaks: 0,
                pattern_break_sequences: Vec::new(),
                format_boundary: None,
            }),
            balance_jumps: CheckOutcome::unavailable("n/a"),
            timestamps: CheckOutcome::unavailable("n/a"),
            amount_patterns: CheckOutcome::unavailable("n/a"),
            flags,
        }
    }

    #[test]
    fn test_severity_table() {
        let cases = [
            (MatchStatus::Failed, true, 0, vec![], Severity::Fatal),
            (MatchStatus::Failed, false, 2, vec![], Severity::Fatal),
            (MatchStatus::Failed, false, 0, vec![], Severity::Critical),
            (MatchStatus::Success, true, 0, vec![], Severity::Critical),
            (
                MatchStatus::Success,
                false,
                0,
                vec![AnomalyFlag::BalanceJumps { count: 1 }],
                Severity::Critical,
            ),
            (MatchStatus::Success, false, 0, vec![], Severity::NoIssues),
        ];

        for (status, manipulated, duplicates, flags, expected) in cases {
            let aggregation = aggregate(
                &reconciliation(status),
                &manipulation(manipulated),
                &anomalies(duplicates, flags),
            );
            assert_eq!(aggregation.severity, expected);
        }
    }

    #[test]
    fn test_signals_name_their_source() {
        let aggregation = aggregate(
            &reconciliation(MatchStatus::Failed),
            &manipulation(true),
            &anomalies(0, vec![]),
        );

        assert_eq!(
            aggregation.rule,
            Some(VerdictRule::BalanceFailedWithTampering)
        );
        assert_eq!(
            aggregation.signals,
            vec![
                Signal::BalanceMismatch { mismatches: 1 },
                Signal::StructuralManipulation { pages: 1 },
            ]
        );
    }

    #[test]
    fn test_unavailable_checks_do_not_raise_severity() {
        let aggregation = aggregate(
            &CheckOutcome::unavailable("no balances"),
            &CheckOutcome::unavailable("no pages"),
            &anomalies(0, vec![]),
        );

        assert_eq!(aggregation.severity, Severity::NoIssues);
        assert!(aggregation.signals.is_empty());
    }
}
