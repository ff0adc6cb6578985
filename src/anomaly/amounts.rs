//! Amount patterns: round numbers, repeated amounts and Benford conformance

use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::AnomalyConfig;
use crate::ledger::Ledger;
use crate::types::*;

/// Theoretical Benford probability of each leading digit 1..=9
pub fn benford_expected() -> [f64; 9] {
    let mut expected = [0.0; 9];
    for (i, p) in expected.iter_mut().enumerate() {
        let digit = (i + 1) as f64;
        *p = (1.0 + 1.0 / digit).log10();
    }
    expected
}

/// Conformance of a leading-digit distribution to Benford's law
///
/// Scored as `1 - TVD / max_TVD`. The largest possible total variation
/// distance from Benford is reached with all mass on digit 9, so 1.0 means
/// perfect conformance and 0.0 maximal deviation.
pub fn benford_conformance(frequencies: &[f64; 9]) -> f64 {
    let expected = benford_expected();
    let distance: f64 = frequencies
        .iter()
        .zip(expected.iter())
        .map(|(observed, p)| (observed - p).abs())
        .sum::<f64>()
        / 2.0;
    let max_distance = 1.0 - expected[8];
    (1.0 - distance / max_distance).clamp(0.0, 1.0)
}

/// Leading significant digit of a non-zero amount
pub fn leading_digit(amount: &BigDecimal) -> Option<u8> {
    // A zero may print with an exponent whose digits are not significant.
    if amount.is_zero() {
        return None;
    }
    amount
        .abs()
        .to_string()
        .chars()
        .find(|c| ('1'..='9').contains(c))
        .and_then(|c| c.to_digit(10))
        .map(|d| d as u8)
}

/// Leading-digit analysis of the ledger's amounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenfordAnalysis {
    /// Non-zero amounts considered
    pub sample_size: usize,
    /// Observed frequency of leading digits 1..=9
    pub digit_frequencies: [f64; 9],
    pub score: f64,
}

/// Amount pattern findings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmountPatternReport {
    pub sample_size: usize,
    pub round_number_ratio: f64,
    pub duplicate_amount_ratio: f64,
    /// Absent when every amount is zero
    pub benford: Option<BenfordAnalysis>,
}

pub fn check_amount_patterns(
    ledger: &Ledger,
    config: &AnomalyConfig,
) -> VerifyResult<AmountPatternReport> {
    let transactions = ledger.transactions();
    if transactions.is_empty() {
        return Err(VerifyError::InsufficientData(
            "ledger has no transactions".to_string(),
        ));
    }
    let total = transactions.len() as f64;
    let zero = BigDecimal::from(0);

    let round = transactions
        .iter()
        .filter(|t| t.amount != zero && (t.amount.clone() % config.round_unit.clone()) == zero)
        .count();

    let mut repeats: BTreeMap<String, usize> = BTreeMap::new();
    for txn in transactions {
        *repeats
            .entry(txn.amount.normalized().to_string())
            .or_insert(0) += 1;
    }
    let repeated: usize = repeats.values().filter(|n| **n >= 2).sum();

    let mut digit_counts = [0usize; 9];
    for digit in transactions.iter().filter_map(|t| leading_digit(&t.amount)) {
        digit_counts[(digit - 1) as usize] += 1;
    }
    let sample: usize = digit_counts.iter().sum();
    let benford = (sample > 0).then(|| {
        let mut digit_frequencies = [0.0; 9];
        for (frequency, count) in digit_frequencies.iter_mut().zip(digit_counts) {
            *frequency = count as f64 / sample as f64;
        }
        BenfordAnalysis {
            sample_size: sample,
            score: benford_conformance(&digit_frequencies),
            digit_frequencies,
        }
    });

    Ok(AmountPatternReport {
        sample_size: transactions.len(),
        round_number_ratio: round as f64 / total,
        duplicate_amount_ratio: repeated as f64 / total,
        benford,
    })
}
