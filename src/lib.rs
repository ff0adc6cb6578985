//! # Statement Verify
//!
//! Reconciliation and manipulation-detection engine for mobile-money and
//! bank statements that have already been normalized into a ledger.
//!
//! ## Features
//!
//! - **Balance reconciliation**: Replays declared balances and derives the opening balance
//! - **Fee model voting**: Decides per statement whether cashback or commission moved the balance
//! - **Structural detection**: Flags pages whose table header repeats or moved
//! - **Ledger anomalies**: Transaction id gaps, balance jumps, timestamp bursts and amount patterns
//! - **Verdicts**: One deterministic severity per statement with its contributing signals
//! - **Batch driving**: Bounded concurrency with per-statement isolation and cancellation
//!
//! ## Quick Start
//!
//! ```rust
//! use statement_verify::{EngineConfig, Ledger, RunId, StatementEngine, StatementInput,
//!     StatementMetadata, Transaction};
//! use bigdecimal::BigDecimal;
//! use chrono::NaiveDate;
//!
//! let ts = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap().and_hms_opt(9, 0, 0).unwrap();
//! let ledger = Ledger::new(
//!     StatementMetadata::new("0712345678"),
//!     vec![Transaction::credit(0, ts, "Deposit".to_string(), BigDecimal::from(500))
//!         .with_balance_after(BigDecimal::from(1500))],
//! );
//!
//! let engine = StatementEngine::new(EngineConfig::default()).unwrap();
//! let verdict = engine.verify(&StatementInput::new(RunId::from("run-1"), ledger)).unwrap();
//! println!("{:?}", verdict.severity);
//! ```

pub mod anomaly;
pub mod config;
pub mod detection;
pub mod engine;
pub mod ledger;
pub mod reconciliation;
pub mod traits;
pub mod types;
pub mod utils;
pub mod verdict;

// Re-export commonly used types
pub use config::*;
pub use engine::{
    BatchFailure, BatchReport, BatchVerifier, CancelFlag, StatementEngine, StatementInput,
};
pub use ledger::{Ledger, StatementMetadata, Transaction};
pub use traits::*;
pub use types::*;
pub use verdict::{aggregate, Severity, Signal, Verdict, VerdictRule};
