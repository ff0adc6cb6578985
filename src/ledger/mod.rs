//! Ledger module containing statement transactions and their ordering

pub mod core;
pub mod transaction;

pub use self::core::*;
pub use transaction::*;
