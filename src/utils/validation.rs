//! Validation utilities for normalizer output

use bigdecimal::BigDecimal;
use std::collections::HashSet;

use crate::engine::StatementInput;
use crate::ledger::{Ledger, Transaction};
use crate::types::*;

/// Validate that a run identifier is usable as a storage key
pub fn validate_run_id(run_id: &RunId) -> VerifyResult<()> {
    if run_id.as_str().trim().is_empty() {
        return Err(VerifyError::InvalidLedger(
            "Run identifier cannot be empty".to_string(),
        ));
    }

    if run_id.as_str().len() > 128 {
        return Err(VerifyError::InvalidLedger(
            "Run identifier cannot exceed 128 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate the non-negativity of a transaction's monetary columns
pub fn validate_transaction(transaction: &Transaction) -> VerifyResult<()> {
    let zero = BigDecimal::from(0);
    if transaction.amount < zero {
        return Err(VerifyError::InvalidLedger(format!(
            "Transaction {} has a negative amount",
            transaction.sequence
        )));
    }

    if transaction.fee < zero {
        return Err(VerifyError::InvalidLedger(format!(
            "Transaction {} has a negative fee",
            transaction.sequence
        )));
    }

    Ok(())
}

/// Validate every transaction and the uniqueness of sequence ids
pub fn validate_ledger(ledger: &Ledger) -> VerifyResult<()> {
    let mut sequences = HashSet::new();
    for transaction in ledger.transactions() {
        validate_transaction(transaction)?;

        if !sequences.insert(transaction.sequence) {
            return Err(VerifyError::InvalidLedger(format!(
                "Sequence id {} appears more than once",
                transaction.sequence
            )));
        }
    }

    Ok(())
}

/// Validate a complete statement input before verification
pub fn validate_statement_input(input: &StatementInput) -> VerifyResult<()> {
    validate_run_id(&input.run_id)?;
    validate_ledger(&input.ledger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::StatementMetadata;
    use chrono::NaiveDate;

    fn txn(sequence: usize, amount: i64, fee: i64) -> Transaction {
        let ts = NaiveDate::from_ymd_opt(2024, 4, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        Transaction::debit(sequence, ts, "Sent".to_string(), BigDecimal::from(amount))
            .with_fee(BigDecimal::from(fee))
    }

    #[test]
    fn test_run_id_rules() {
        assert!(validate_run_id(&RunId::from("stmt-001")).is_ok());
        assert!(validate_run_id(&RunId::from("  ")).is_err());
        assert!(validate_run_id(&RunId::new("x".repeat(129))).is_err());
    }

    #[test]
    fn test_negative_columns_rejected() {
        assert!(validate_transaction(&txn(0, 10, 0)).is_ok());
        assert!(validate_transaction(&txn(0, -10, 0)).is_err());
        assert!(validate_transaction(&txn(0, 10, -1)).is_err());
    }

    #[test]
    fn test_duplicate_sequence_rejected() {
        let ledger = Ledger::new(StatementMetadata::default(), vec![txn(1, 5, 0), txn(1, 6, 0)]);

        let err = validate_ledger(&ledger).unwrap_err();
        assert!(matches!(err, VerifyError::InvalidLedger(_)));
    }
}
