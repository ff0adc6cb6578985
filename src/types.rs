//! Core types shared across the verification engine

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of money movement relative to the statement holder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Money received - increases the balance
    Credit,
    /// Money sent - decreases the balance
    Debit,
}

impl Direction {
    /// Parse a direction from the loose labels statements tend to use
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "credit" | "cr" | "in" | "received" => Some(Direction::Credit),
            "debit" | "dr" | "out" | "paid" | "sent" => Some(Direction::Debit),
            _ => None,
        }
    }
}

/// Unique key for one statement-processing attempt
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    /// Wrap an existing run identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Create a fresh identifier for a new processing attempt
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RunId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Outcome of a sub-check that may lack the data it needs
///
/// A check that cannot run reports `Unavailable` instead of failing the whole
/// verdict, so sibling checks still contribute their signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "result", rename_all = "snake_case")]
pub enum CheckOutcome<T> {
    Available(T),
    Unavailable { reason: String },
}

impl<T> CheckOutcome<T> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        CheckOutcome::Unavailable {
            reason: reason.into(),
        }
    }

    /// Borrow the result if the check ran
    pub fn available(&self) -> Option<&T> {
        match self {
            CheckOutcome::Available(value) => Some(value),
            CheckOutcome::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, CheckOutcome::Available(_))
    }
}

impl<T> From<VerifyResult<T>> for CheckOutcome<T> {
    fn from(result: VerifyResult<T>) -> Self {
        match result {
            Ok(value) => CheckOutcome::Available(value),
            Err(err) => CheckOutcome::unavailable(err.to_string()),
        }
    }
}

/// Errors that can occur while verifying a statement
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VerifyError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Invalid ledger: {0}")]
    InvalidLedger(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerifyError>;
