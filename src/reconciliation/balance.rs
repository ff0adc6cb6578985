//! Running balance replay against declared balances

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::config::ReconcileConfig;
use crate::ledger::Ledger;
use crate::reconciliation::{within_tolerance, FeeModelFlags, MerchantMatcher};
use crate::types::*;

/// Whether the replayed closing balance matches the declared one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    Success,
    Failed,
}

/// Outcome of replaying a statement's running balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    /// Opening balance inferred from the first declared balance
    pub opening_balance: BigDecimal,
    /// Opening balance printed in the statement summary, if any
    pub declared_opening_balance: Option<BigDecimal>,
    pub calculated_closing_balance: BigDecimal,
    pub declared_closing_balance: BigDecimal,
    pub transaction_count: usize,
    /// Transactions whose declared balance disagrees with the replay
    pub balance_diff_changes: usize,
    pub balance_diff_change_ratio: f64,
    /// Sequence ids of the mismatching transactions
    pub mismatched_sequences: Vec<usize>,
    /// Replayed balance after each transaction, in ledger order
    pub running_balances: Vec<BigDecimal>,
    pub match_status: MatchStatus,
}

impl ReconciliationResult {
    pub fn is_match(&self) -> bool {
        self.match_status == MatchStatus::Success
    }
}

/// Replays a ledger's running balance
pub struct BalanceReconciler<'a> {
    config: &'a ReconcileConfig,
    matcher: &'a MerchantMatcher,
}

impl<'a> BalanceReconciler<'a> {
    pub fn new(config: &'a ReconcileConfig, matcher: &'a MerchantMatcher) -> Self {
        Self { config, matcher }
    }

    /// Reconcile the ledger under the given fee model flags
    ///
    /// Fails with `InsufficientData` when no transaction declares a balance.
    pub fn reconcile(
        &self,
        ledger: &Ledger,
        flags: &FeeModelFlags,
    ) -> VerifyResult<ReconciliationResult> {
        let transactions = ledger.transactions();
        let anchor = ledger.first_declared_balance().ok_or_else(|| {
            VerifyError::InsufficientData(
                "no transaction carries a declared balance".to_string(),
            )
        })?;
        let tolerance = &self.config.tolerance;

        let changes: Vec<BigDecimal> = transactions
            .iter()
            .map(|t| flags.balance_change(t, self.matcher))
            .collect();

        // Back the anchor's declared balance out through every change up to it.
        // This inverts the forward replay exactly, so a fee-bearing credit
        // anchor yields `after - amount + fee` and never mismatches itself.
        let mut opening_balance = transactions[anchor]
            .balance_after
            .clone()
            .unwrap_or_default();
        for change in &changes[..=anchor] {
            opening_balance -= change;
        }

        let declared_opening_balance = ledger.metadata.declared_opening_balance.clone();
        if let Some(declared) = &declared_opening_balance {
            if !within_tolerance(declared, &opening_balance, tolerance) {
                tracing::warn!(
                    declared = %declared,
                    inferred = %opening_balance,
                    "Declared opening balance disagrees with inferred opening balance"
                );
            }
        }

        let mut running = opening_balance.clone();
        let mut running_balances = Vec::with_capacity(transactions.len());
        let mut mismatched_sequences = Vec::new();
        for (txn, change) in transactions.iter().zip(&changes) {
            running += change;
            if let Some(declared) = &txn.balance_after {
                if !within_tolerance(&running, declared, tolerance) {
                    tracing::debug!(
                        sequence = txn.sequence,
                        declared = %declared,
                        calculated = %running,
                        "Running balance mismatch"
                    );
                    mismatched_sequences.push(txn.sequence);
                }
            }
            running_balances.push(running.clone());
        }

        let (declared_closing_balance, calculated_closing_balance) =
            self.closing_pair(ledger, &running_balances, running);

        let transaction_count = transactions.len();
        let balance_diff_changes = mismatched_sequences.len();
        let balance_diff_change_ratio = balance_diff_changes as f64 / transaction_count as f64;

        let match_status = if within_tolerance(
            &calculated_closing_balance,
            &declared_closing_balance,
            tolerance,
        ) {
            MatchStatus::Success
        } else {
            MatchStatus::Failed
        };

        Ok(ReconciliationResult {
            opening_balance,
            declared_opening_balance,
            calculated_closing_balance,
            declared_closing_balance,
            transaction_count,
            balance_diff_changes,
            balance_diff_change_ratio,
            mismatched_sequences,
            running_balances,
            match_status,
        })
    }

    /// Declared and calculated closing balances to compare
    ///
    /// Prefers the last transaction's declared balance, then the statement
    /// summary. Without either, the last declared balance is compared against
    /// the replay at that same position.
    fn closing_pair(
        &self,
        ledger: &Ledger,
        running_balances: &[BigDecimal],
        final_balance: BigDecimal,
    ) -> (BigDecimal, BigDecimal) {
        let transactions = ledger.transactions();
        if let Some(declared) = transactions.last().and_then(|t| t.balance_after.clone()) {
            return (declared, final_balance);
        }
        if let Some(declared) = ledger.metadata.declared_closing_balance.clone() {
            return (declared, final_balance);
        }
        transactions
            .iter()
            .zip(running_balances)
            .rev()
            .find_map(|(t, running)| {
                t.balance_after
                    .clone()
                    .map(|declared| (declared, running.clone()))
            })
            .unwrap_or((final_balance.clone(), final_balance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeeModelConfig;
    use crate::ledger::{StatementMetadata, Transaction};
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, 12)
            .unwrap()
            .and_hms_opt(9, minute, 0)
            .unwrap()
    }

    fn three_step_ledger(last_declared: i64) -> Ledger {
        Ledger::new(
            StatementMetadata::new("0722000000"),
            vec![
                Transaction::credit(0, ts(1), "Received".to_string(), BigDecimal::from(100))
                    .with_balance_after(BigDecimal::from(1100)),
                Transaction::debit(1, ts(2), "Sent".to_string(), BigDecimal::from(50))
                    .with_fee(BigDecimal::from(5))
                    .with_balance_after(BigDecimal::from(1045)),
                Transaction::credit(2, ts(3), "Received".to_string(), BigDecimal::from(20))
                    .with_balance_after(BigDecimal::from(last_declared)),
            ],
        )
    }

    fn reconcile(ledger: &Ledger) -> VerifyResult<ReconciliationResult> {
        let config = ReconcileConfig::default();
        let matcher = MerchantMatcher::from_config(&FeeModelConfig::default()).unwrap();
        BalanceReconciler::new(&config, &matcher).reconcile(ledger, &FeeModelFlags::default())
    }

    #[test]
    fn test_clean_ledger_reconciles() {
        let result = reconcile(&three_step_ledger(1065)).unwrap();

        assert_eq!(result.opening_balance, BigDecimal::from(1000));
        assert_eq!(
            result.running_balances,
            vec![
                BigDecimal::from(1100),
                BigDecimal::from(1045),
                BigDecimal::from(1065)
            ]
        );
        assert_eq!(result.balance_diff_changes, 0);
        assert_eq!(result.match_status, MatchStatus::Success);
    }

    #[test]
    fn test_tampered_closing_balance_fails() {
        let result = reconcile(&three_step_ledger(1070)).unwrap();

        assert_eq!(result.balance_diff_changes, 1);
        assert_eq!(result.mismatched_sequences, vec![2]);
        assert!((result.balance_diff_change_ratio - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(result.declared_closing_balance, BigDecimal::from(1070));
        assert_eq!(result.calculated_closing_balance, BigDecimal::from(1065));
        assert_eq!(result.match_status, MatchStatus::Failed);
    }

    #[test]
    fn test_missing_declared_balances_is_insufficient_data() {
        let ledger = Ledger::new(
            StatementMetadata::default(),
            vec![Transaction::credit(
                0,
                ts(1),
                "Received".to_string(),
                BigDecimal::from(10),
            )],
        );

        let err = reconcile(&ledger).unwrap_err();
        assert!(matches!(err, VerifyError::InsufficientData(_)));
    }

    #[test]
    fn test_opening_inferred_through_undeclared_prefix() {
        let ledger = Ledger::new(
            StatementMetadata::default(),
            vec![
                Transaction::credit(0, ts(1), "Received".to_string(), BigDecimal::from(200)),
                Transaction::debit(1, ts(2), "Sent".to_string(), BigDecimal::from(30))
                    .with_balance_after(BigDecimal::from(670)),
            ],
        );

        let result = reconcile(&ledger).unwrap();

        assert_eq!(result.opening_balance, BigDecimal::from(500));
        assert!(result.is_match());
    }

    #[test]
    fn test_credit_fee_is_backed_out_consistently() {
        let ledger = Ledger::new(
            StatementMetadata::default(),
            vec![
                Transaction::credit(0, ts(1), "Received".to_string(), BigDecimal::from(100))
                    .with_fee(BigDecimal::from(1))
                    .with_balance_after(BigDecimal::from(599)),
                Transaction::debit(1, ts(2), "Sent".to_string(), BigDecimal::from(99))
                    .with_balance_after(BigDecimal::from(500)),
            ],
        );

        let result = reconcile(&ledger).unwrap();

        assert_eq!(result.opening_balance, BigDecimal::from(500));
        assert_eq!(result.balance_diff_changes, 0);
    }

    #[test]
    fn test_merchant_payment_fee_charged_when_cashback_disabled() {
        let ledger = Ledger::new(
            StatementMetadata::default(),
            vec![
                Transaction::credit(0, ts(1), "Deposit".to_string(), BigDecimal::from(1000))
                    .with_balance_after(BigDecimal::from(1000)),
                Transaction::debit(1, ts(2), "Pay Bill to KPLC".to_string(), BigDecimal::from(100))
                    .with_fee(BigDecimal::from(5))
                    .with_balance_after(BigDecimal::from(895)),
            ],
        );

        let result = reconcile(&ledger).unwrap();

        assert_eq!(
            result.running_balances,
            vec![BigDecimal::from(1000), BigDecimal::from(895)]
        );
        assert_eq!(result.match_status, MatchStatus::Success);
    }
}
