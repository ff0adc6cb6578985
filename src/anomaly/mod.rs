//! Ledger anomaly analysis
//!
//! Four independent checks over the ordered ledger. A check that lacks the
//! field it needs reports itself unavailable; the others still run.

pub mod amounts;
pub mod ids;
pub mod jumps;
pub mod timestamps;

pub use amounts::*;
pub use ids::*;
pub use jumps::*;
pub use timestamps::*;

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::config::{AnomalyConfig, AnomalyThresholds};
use crate::ledger::Ledger;
use crate::types::*;

/// A sub-check result that crossed its configured threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "flag", rename_all = "snake_case")]
pub enum AnomalyFlag {
    IdGaps { count: usize },
    DuplicateIds { count: usize },
    IdPatternBreaks { count: usize },
    BalanceJumps { count: usize },
    SameSecondBursts { groups: usize },
    OutOfOrder { count: usize },
    RoundNumbers { ratio: f64 },
    DuplicateAmounts { ratio: f64 },
    BenfordDeviation { score: f64 },
    OffBusinessHours { ratio: f64 },
    WeekendActivity { ratio: f64 },
}

/// Combined anomaly findings for one ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub id_integrity: CheckOutcome<IdIntegrityReport>,
    pub balance_jumps: CheckOutcome<BalanceJumpReport>,
    pub timestamps: CheckOutcome<TimestampReport>,
    pub amount_patterns: CheckOutcome<AmountPatternReport>,
    /// Thresholds exceeded by the available checks
    pub flags: Vec<AnomalyFlag>,
}

impl AnomalyReport {
    pub fn has_flags(&self) -> bool {
        !self.flags.is_empty()
    }

    /// Duplicate provider ids, zero when the id check was unavailable
    pub fn duplicate_id_count(&self) -> usize {
        self.id_integrity
            .available()
            .map(|ids| ids.duplicate_count)
            .unwrap_or(0)
    }
}

/// Runs all anomaly checks over a ledger
pub struct LedgerAnalyzer<'a> {
    config: &'a AnomalyConfig,
    tolerance: &'a BigDecimal,
}

impl<'a> LedgerAnalyzer<'a> {
    pub fn new(config: &'a AnomalyConfig, tolerance: &'a BigDecimal) -> Self {
        Self { config, tolerance }
    }

    pub fn analyze(&self, ledger: &Ledger) -> AnomalyReport {
        let id_integrity = CheckOutcome::from(check_transaction_ids(ledger, self.config));
        let balance_jumps =
            CheckOutcome::from(check_balance_jumps(ledger, self.config, self.tolerance));
        let timestamps = CheckOutcome::from(check_timestamps(ledger, self.config));
        let amount_patterns = CheckOutcome::from(check_amount_patterns(ledger, self.config));

        let mut report = AnomalyReport {
            id_integrity,
            balance_jumps,
            timestamps,
            amount_patterns,
            flags: Vec::new(),
        };
        report.flags = evaluate(&report, &self.config.thresholds);

        if report.has_flags() {
            tracing::debug!(flags = ?report.flags, "Ledger anomalies exceed thresholds");
        }
        report
    }
}

/// Compare every available check against its threshold
pub fn evaluate(report: &AnomalyReport, limits: &AnomalyThresholds) -> Vec<AnomalyFlag> {
    let mut flags = Vec::new();

    if let Some(ids) = report.id_integrity.available() {
        if ids.gap_count > limits.max_id_gaps {
            flags.push(AnomalyFlag::IdGaps {
                count: ids.gap_count,
            });
        }
        if ids.duplicate_count > limits.max_duplicate_ids {
            flags.push(AnomalyFlag::DuplicateIds {
                count: ids.duplicate_count,
            });
        }
        if ids.pattern_breaks > limits.max_pattern_breaks {
            flags.push(AnomalyFlag::IdPatternBreaks {
                count: ids.pattern_breaks,
            });
        }
    }

    if let Some(jumps) = report.balance_jumps.available() {
        if jumps.flagged_count > limits.max_balance_jumps {
            flags.push(AnomalyFlag::BalanceJumps {
                count: jumps.flagged_count,
            });
        }
    }

    if let Some(times) = report.timestamps.available() {
        if times.same_second_groups > limits.max_same_second_groups {
            flags.push(AnomalyFlag::SameSecondBursts {
                groups: times.same_second_groups,
            });
        }
        if times.out_of_order > limits.max_out_of_order {
            flags.push(AnomalyFlag::OutOfOrder {
                count: times.out_of_order,
            });
        }
        if let Some(min) = limits.min_business_hours_ratio {
            if times.business_hours_ratio < min {
                flags.push(AnomalyFlag::OffBusinessHours {
                    ratio: times.business_hours_ratio,
                });
            }
        }
        if let Some(max) = limits.max_weekend_ratio {
            if times.weekend_ratio > max {
                flags.push(AnomalyFlag::WeekendActivity {
                    ratio: times.weekend_ratio,
                });
            }
        }
    }

    if let Some(amounts) = report.amount_patterns.available() {
        if amounts.round_number_ratio > limits.max_round_number_ratio {
            flags.push(AnomalyFlag::RoundNumbers {
                ratio: amounts.round_number_ratio,
            });
        }
        if amounts.duplicate_amount_ratio > limits.max_duplicate_amount_ratio {
            flags.push(AnomalyFlag::DuplicateAmounts {
                ratio: amounts.duplicate_amount_ratio,
            });
        }
        if let Some(benford) = &amounts.benford {
            if benford.sample_size >= limits.benford_min_sample
                && benford.score < limits.min_benford_score
            {
                flags.push(AnomalyFlag::BenfordDeviation {
                    score: benford.score,
                });
            }
        }
    }

    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{StatementMetadata, Transaction};
    use chrono::NaiveDate;

    #[test]
    fn test_missing_ids_do_not_block_other_checks() {
        let transactions = (0..4)
            .map(|i| {
                let ts = NaiveDate::from_ymd_opt(2024, 9, 2)
                    .unwrap()
                    .and_hms_opt(10, i, 0)
                    .unwrap();
                Transaction::credit(i as usize, ts, "Received".to_string(), BigDecimal::from(37))
                    .with_balance_after(BigDecimal::from(37 * (i as i64 + 1)))
            })
            .collect();
        let ledger = Ledger::new(StatementMetadata::default(), transactions);

        let config = AnomalyConfig::default();
        let tolerance = BigDecimal::from(0);
        let report = LedgerAnalyzer::new(&config, &tolerance).analyze(&ledger);

        assert!(!report.id_integrity.is_available());
        assert!(report.balance_jumps.is_available());
        assert!(report.timestamps.is_available());
        assert!(report.amount_patterns.is_available());
        assert_eq!(report.duplicate_id_count(), 0);
    }

    #[test]
    fn test_duplicate_ids_raise_flag() {
        let transactions = ["A100", "A101", "A101"]
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let ts = NaiveDate::from_ymd_opt(2024, 9, 2)
                    .unwrap()
                    .and_hms_opt(10, i as u32, 0)
                    .unwrap();
                Transaction::debit(i, ts, "Sent".to_string(), BigDecimal::from(13)).with_id(*id)
            })
            .collect();
        let ledger = Ledger::new(StatementMetadata::default(), transactions);

        let config = AnomalyConfig::default();
        let tolerance = BigDecimal::from(0);
        let report = LedgerAnalyzer::new(&config, &tolerance).analyze(&ledger);

        assert_eq!(report.duplicate_id_count(), 1);
        assert!(report
            .flags
            .contains(&AnomalyFlag::DuplicateIds { count: 1 }));
    }

    #[test]
    fn test_benford_ignored_below_minimum_sample() {
        let mut limits = AnomalyThresholds::default();
        limits.benford_min_sample = 100;
        limits.min_benford_score = 0.99;

        let report = AnomalyReport {
            id_integrity: CheckOutcome::unavailable("none"),
            balance_jumps: CheckOutcome::unavailable("none"),
            timestamps: CheckOutcome::unavailable("none"),
            amount_patterns: CheckOutcome::Available(AmountPatternReport {
                sample_size: 10,
                round_number_ratio: 0.0,
                duplicate_amount_ratio: 0.0,
                benford: Some(BenfordAnalysis {
                    sample_size: 10,
                    digit_frequencies: [0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0],
                    score: 0.2,
                }),
            }),
            flags: Vec::new(),
        };

        assert!(evaluate(&report, &limits).is_empty());
    }
}
