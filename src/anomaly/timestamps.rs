//! Timestamp bursts, ordering and time-of-week distribution

use chrono::{Datelike, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::AnomalyConfig;
use crate::ledger::Ledger;
use crate::types::*;

/// Timestamp findings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestampReport {
    /// Seconds shared by two or more transactions
    pub same_second_groups: usize,
    /// Transactions falling inside those groups
    pub same_second_transactions: usize,
    pub largest_group: usize,
    /// Transactions out of order relative to their predecessor
    pub out_of_order: usize,
    pub business_hours_ratio: f64,
    pub weekend_ratio: f64,
}

pub fn check_timestamps(ledger: &Ledger, config: &AnomalyConfig) -> VerifyResult<TimestampReport> {
    let transactions = ledger.transactions();
    if transactions.is_empty() {
        return Err(VerifyError::InsufficientData(
            "ledger has no transactions".to_string(),
        ));
    }

    let mut per_second = BTreeMap::new();
    for txn in transactions {
        let second = txn.timestamp.with_nanosecond(0).unwrap_or(txn.timestamp);
        *per_second.entry(second).or_insert(0usize) += 1;
    }
    let bursts: Vec<usize> = per_second.values().copied().filter(|n| *n >= 2).collect();

    // Ties must keep extraction order, so a lower sequence after a higher
    // one at the same instant counts as out of order too.
    let out_of_order = transactions
        .windows(2)
        .filter(|pair| {
            let (a, b) = (&pair[0], &pair[1]);
            b.timestamp < a.timestamp || (b.timestamp == a.timestamp && b.sequence < a.sequence)
        })
        .count();

    let total = transactions.len() as f64;
    let in_hours = transactions
        .iter()
        .filter(|t| config.business_hours.contains(t.timestamp.hour()))
        .count();
    let on_weekend = transactions
        .iter()
        .filter(|t| config.weekend_days.contains(&t.timestamp.weekday()))
        .count();

    Ok(TimestampReport {
        same_second_groups: bursts.len(),
        same_second_transactions: bursts.iter().sum(),
        largest_group: per_second.values().copied().max().unwrap_or(0),
        out_of_order,
        business_hours_ratio: in_hours as f64 / total,
        weekend_ratio: on_weekend as f64 / total,
    })
}
