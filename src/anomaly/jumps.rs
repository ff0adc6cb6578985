//! Unexplained jumps between consecutive declared balances

use bigdecimal::{BigDecimal, ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::config::AnomalyConfig;
use crate::ledger::Ledger;
use crate::types::*;

/// One flagged jump
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceJump {
    /// Sequence id of the later transaction of the pair
    pub sequence: usize,
    pub previous_balance: BigDecimal,
    pub balance: BigDecimal,
    pub ratio: f64,
}

/// Balance jump findings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceJumpReport {
    pub pairs_checked: usize,
    pub flagged_count: usize,
    /// Largest ratio seen across all pairs
    pub max_ratio: f64,
    pub flagged: Vec<BalanceJump>,
}

/// Flag relative balance changes no transaction amount accounts for
///
/// The ratio is `|b[i] - b[i-1]| / max(|b[i-1]|, epsilon)`. A jump is
/// explained when the change stays within the transaction's amount plus fee.
pub fn check_balance_jumps(
    ledger: &Ledger,
    config: &AnomalyConfig,
    tolerance: &BigDecimal,
) -> VerifyResult<BalanceJumpReport> {
    if ledger.declared_balance_count() < 2 {
        return Err(VerifyError::InsufficientData(
            "fewer than two declared balances".to_string(),
        ));
    }

    let mut pairs_checked = 0;
    let mut max_ratio = 0.0_f64;
    let mut flagged = Vec::new();

    for pair in ledger.transactions().windows(2) {
        let (previous, current) = (&pair[0], &pair[1]);
        let (Some(before), Some(after)) = (&previous.balance_after, &current.balance_after) else {
            continue;
        };
        pairs_checked += 1;

        let change = (after - before).abs();
        let base = before.abs().max(config.jump_epsilon.clone());
        let ratio = (&change / &base).to_f64().unwrap_or(f64::MAX);
        max_ratio = max_ratio.max(ratio);

        let explained = change <= &current.amount + &current.fee + tolerance;
        if ratio > config.balance_jump_threshold && !explained {
            tracing::debug!(
                sequence = current.sequence,
                ratio,
                "Unexplained balance jump"
            );
            flagged.push(BalanceJump {
                sequence: current.sequence,
                previous_balance: before.clone(),
                balance: after.clone(),
                ratio,
            });
        }
    }

    Ok(BalanceJumpReport {
        pairs_checked,
        flagged_count: flagged.len(),
        max_ratio,
        flagged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{StatementMetadata, Transaction};
    use chrono::NaiveDate;

    fn ledger(steps: &[(i64, i64)]) -> Ledger {
        let transactions = steps
            .iter()
            .enumerate()
            .map(|(i, (amount, balance))| {
                let ts = NaiveDate::from_ymd_opt(2024, 7, 1)
                    .unwrap()
                    .and_hms_opt(9, i as u32, 0)
                    .unwrap();
                Transaction::credit(i, ts, "Received".to_string(), BigDecimal::from(*amount))
                    .with_balance_after(BigDecimal::from(*balance))
            })
            .collect();
        Ledger::new(StatementMetadata::default(), transactions)
    }

    #[test]
    fn test_explained_jump_is_not_flagged() {
        // Deposit of 10,000 onto a balance of 100 is large but fully explained.
        let report = check_balance_jumps(
            &ledger(&[(100, 100), (10_000, 10_100)]),
            &AnomalyConfig::default(),
            &BigDecimal::from(0),
        )
        .unwrap();

        assert_eq!(report.pairs_checked, 1);
        assert_eq!(report.flagged_count, 0);
        assert!(report.max_ratio > 99.0);
    }

    #[test]
    fn test_unexplained_jump_is_flagged() {
        let report = check_balance_jumps(
            &ledger(&[(100, 100), (10, 110), (10, 5_000)]),
            &AnomalyConfig::default(),
            &BigDecimal::from(0),
        )
        .unwrap();

        assert_eq!(report.flagged_count, 1);
        assert_eq!(report.flagged[0].sequence, 2);
        assert!(report.flagged[0].ratio > 40.0);
    }

    #[test]
    fn test_needs_two_declared_balances() {
        assert!(check_balance_jumps(
            &ledger(&[(100, 100)]),
            &AnomalyConfig::default(),
            &BigDecimal::from(0),
        )
        .is_err());
    }
}
