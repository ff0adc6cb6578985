//! Balance reconciliation and implicit fee model classification
//!
//! The fee model classifier runs first; its flags decide how eligible
//! transactions are replayed by the balance reconciler.

pub mod balance;
pub mod fee_model;

pub use balance::*;
pub use fee_model::*;

use bigdecimal::BigDecimal;

/// Absolute comparison of two balances
pub(crate) fn within_tolerance(
    left: &BigDecimal,
    right: &BigDecimal,
    tolerance: &BigDecimal,
) -> bool {
    (left - right).abs() <= *tolerance
}
