//! Statement transactions as handed over by the ledger normalizer

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::types::*;

/// One line of a normalized statement ledger
///
/// Transactions are created once by the normalizer and never mutated by the
/// engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Position within the extracted ledger (not the provider's id)
    pub sequence: usize,
    /// Provider transaction id, if the document carried one
    pub transaction_id: Option<String>,
    /// When the transaction happened
    pub timestamp: NaiveDateTime,
    /// Free-text description as printed on the statement
    pub description: String,
    /// Provider transaction type column, if present
    pub transaction_type: Option<String>,
    /// Credit or debit
    pub direction: Direction,
    /// Non-negative transaction amount
    pub amount: BigDecimal,
    /// Non-negative fee, cashback or commission column
    pub fee: BigDecimal,
    /// Balance the statement declares after this transaction
    pub balance_after: Option<BigDecimal>,
}

impl Transaction {
    /// Create a transaction with zero fee and no declared balance
    pub fn new(
        sequence: usize,
        timestamp: NaiveDateTime,
        description: String,
        direction: Direction,
        amount: BigDecimal,
    ) -> Self {
        Self {
            sequence,
            transaction_id: None,
            timestamp,
            description,
            transaction_type: None,
            direction,
            amount,
            fee: BigDecimal::from(0),
            balance_after: None,
        }
    }

    /// Create a credit transaction
    pub fn credit(
        sequence: usize,
        timestamp: NaiveDateTime,
        description: String,
        amount: BigDecimal,
    ) -> Self {
        Self::new(sequence, timestamp, description, Direction::Credit, amount)
    }

    /// Create a debit transaction
    pub fn debit(
        sequence: usize,
        timestamp: NaiveDateTime,
        description: String,
        amount: BigDecimal,
    ) -> Self {
        Self::new(sequence, timestamp, description, Direction::Debit, amount)
    }

    pub fn with_id(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }

    pub fn with_type(mut self, transaction_type: impl Into<String>) -> Self {
        self.transaction_type = Some(transaction_type.into());
        self
    }

    pub fn with_fee(mut self, fee: BigDecimal) -> Self {
        self.fee = fee;
        self
    }

    pub fn with_balance_after(mut self, balance_after: BigDecimal) -> Self {
        self.balance_after = Some(balance_after);
        self
    }

    /// Balance change under the default fee rule
    ///
    /// A credit adds `amount - fee`, a debit removes `amount + fee`.
    pub fn default_effect(&self) -> BigDecimal {
        match self.direction {
            Direction::Credit => &self.amount - &self.fee,
            Direction::Debit => -(&self.amount + &self.fee),
        }
    }

    /// Whether the fee column carries a non-zero value
    pub fn has_fee(&self) -> bool {
        self.fee != BigDecimal::from(0)
    }

    /// Lowercased type and description, for keyword classification
    pub fn classification_text(&self) -> String {
        match &self.transaction_type {
            Some(kind) => format!("{} {}", kind, self.description).to_lowercase(),
            None => self.description.to_lowercase(),
        }
    }
}
