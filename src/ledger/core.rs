//! Ordered statement ledger and its metadata

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ledger::Transaction;

/// Statement-level facts printed outside the transaction table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementMetadata {
    /// Account (usually the mobile number) the statement belongs to
    pub account_number: String,
    /// Provider code, used to pick the page layout convention
    pub provider_code: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Opening balance printed in the statement summary
    pub declared_opening_balance: Option<BigDecimal>,
    /// Closing balance printed in the statement summary
    pub declared_closing_balance: Option<BigDecimal>,
}

impl StatementMetadata {
    pub fn new(account_number: impl Into<String>) -> Self {
        Self {
            account_number: account_number.into(),
            ..Self::default()
        }
    }

    pub fn with_provider(mut self, provider_code: impl Into<String>) -> Self {
        self.provider_code = Some(provider_code.into());
        self
    }

    pub fn with_period(mut self, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        self.start_date = Some(start_date);
        self.end_date = Some(end_date);
        self
    }
}

/// Ordered transactions of one statement
///
/// Construction sorts transactions by timestamp. The sort is stable, so
/// transactions sharing a timestamp keep their extraction order.
/// Deserialization goes through [`Ledger::new`] as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "LedgerRecord")]
pub struct Ledger {
    pub metadata: StatementMetadata,
    transactions: Vec<Transaction>,
}

/// Wire shape of a ledger before ordering
#[derive(Deserialize)]
struct LedgerRecord {
    metadata: StatementMetadata,
    transactions: Vec<Transaction>,
}

impl From<LedgerRecord> for Ledger {
    fn from(record: LedgerRecord) -> Self {
        Ledger::new(record.metadata, record.transactions)
    }
}

impl Ledger {
    /// Create a ledger, sorting the transactions chronologically
    pub fn new(metadata: StatementMetadata, mut transactions: Vec<Transaction>) -> Self {
        transactions.sort_by_key(|t| t.timestamp);
        Self {
            metadata,
            transactions,
        }
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Index of the first transaction carrying a declared balance
    pub fn first_declared_balance(&self) -> Option<usize> {
        self.transactions
            .iter()
            .position(|t| t.balance_after.is_some())
    }

    /// Number of transactions carrying a declared balance
    pub fn declared_balance_count(&self) -> usize {
        self.transactions
            .iter()
            .filter(|t| t.balance_after.is_some())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn ts(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(12, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_ledger_sorts_stably_by_timestamp() {
        let transactions = vec![
            Transaction::credit(0, ts(30), "late".to_string(), BigDecimal::from(1)),
            Transaction::credit(1, ts(10), "tie a".to_string(), BigDecimal::from(2)),
            Transaction::credit(2, ts(10), "tie b".to_string(), BigDecimal::from(3)),
            Transaction::credit(3, ts(5), "early".to_string(), BigDecimal::from(4)),
        ];

        let ledger = Ledger::new(StatementMetadata::new("0700000000"), transactions);
        let order: Vec<usize> = ledger.transactions().iter().map(|t| t.sequence).collect();

        assert_eq!(order, vec![3, 1, 2, 0]);
    }

    #[test]
    fn test_declared_balance_lookup() {
        let transactions = vec![
            Transaction::credit(0, ts(1), "a".to_string(), BigDecimal::from(1)),
            Transaction::credit(1, ts(2), "b".to_string(), BigDecimal::from(1))
                .with_balance_after(BigDecimal::from(11)),
        ];

        let ledger = Ledger::new(StatementMetadata::default(), transactions);

        assert_eq!(ledger.first_declared_balance(), Some(1));
        assert_eq!(ledger.declared_balance_count(), 1);
    }

    #[test]
    fn test_deserialized_ledger_is_sorted() {
        let ledger = Ledger::new(
            StatementMetadata::new("0700000000"),
            vec![
                Transaction::credit(0, ts(1), "first".to_string(), BigDecimal::from(1)),
                Transaction::credit(1, ts(2), "second".to_string(), BigDecimal::from(2)),
            ],
        );
        let mut value = serde_json::to_value(&ledger).unwrap();
        value["transactions"]
            .as_array_mut()
            .unwrap()
            .reverse();

        let restored: Ledger = serde_json::from_value(value).unwrap();
        let order: Vec<usize> = restored.transactions().iter().map(|t| t.sequence).collect();

        assert_eq!(order, vec![0, 1]);
        assert_eq!(restored, ledger);
    }
}
