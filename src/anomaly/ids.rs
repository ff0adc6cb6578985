//! Provider transaction-id integrity

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::AnomalyConfig;
use crate::ledger::Ledger;
use crate::types::*;

/// Number of gaps kept on the report
const MAX_REPORTED_GAPS: usize = 50;

/// Coarse format of a provider transaction id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IdFormat {
    /// Digits only
    Numeric { digits: usize },
    /// Alphabetic prefix followed by digits only
    Prefixed { prefix: String, digits: usize },
    /// Mixed alphanumeric ids with no sequential component
    Opaque { length: usize },
}

/// Parsed form of one id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedId {
    pub format: IdFormat,
    /// Sequential component, when the format has one
    pub number: Option<u64>,
}

/// Split an id into its format and numeric component
pub fn parse_transaction_id(id: &str) -> ParsedId {
    let id = id.trim();
    let split = id
        .char_indices()
        .find(|(_, c)| !c.is_ascii_alphabetic())
        .map(|(i, _)| i)
        .unwrap_or(id.len());
    let (prefix, tail) = id.split_at(split);

    let sequential = !tail.is_empty() && tail.chars().all(|c| c.is_ascii_digit());
    let number = if sequential { tail.parse::<u64>().ok() } else { None };

    let format = match number {
        Some(_) if prefix.is_empty() => IdFormat::Numeric { digits: tail.len() },
        Some(_) => IdFormat::Prefixed {
            prefix: prefix.to_uppercase(),
            digits: tail.len(),
        },
        None => IdFormat::Opaque {
            length: id.chars().count(),
        },
    };

    ParsedId { format, number }
}

/// Missing run of sequence values between two consecutive ids
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdGap {
    pub after: u64,
    pub before: u64,
    pub missing: u64,
}

/// Transaction-id integrity findings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdIntegrityReport {
    /// Transactions that carried an id
    pub checked: usize,
    /// Transactions without an id
    pub missing_ids: usize,
    pub gap_count: usize,
    pub missing_sequence_values: u64,
    /// First gaps found, in ascending order
    pub gaps: Vec<IdGap>,
    /// Ids appearing more than once, sorted
    pub duplicate_ids: Vec<String>,
    /// Extra occurrences beyond the first of each duplicated id
    pub duplicate_count: usize,
    pub pattern_breaks: usize,
    /// Sequence ids where the format changed unexpectedly
    pub pattern_break_sequences: Vec<usize>,
    /// Single format change treated as a provider format version boundary
    pub format_boundary: Option<usize>,
}

/// Check gaps, duplicates and format changes in provider ids
pub fn check_transaction_ids(
    ledger: &Ledger,
    config: &AnomalyConfig,
) -> VerifyResult<IdIntegrityReport> {
    let identified: Vec<(usize, &str)> = ledger
        .transactions()
        .iter()
        .filter_map(|t| {
            t.transaction_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(|id| (t.sequence, id))
        })
        .collect();

    if identified.is_empty() {
        return Err(VerifyError::InsufficientData(
            "no transaction carries a provider id".to_string(),
        ));
    }
    let missing_ids = ledger.len() - identified.len();

    let mut occurrences: BTreeMap<&str, usize> = BTreeMap::new();
    for (_, id) in &identified {
        *occurrences.entry(*id).or_insert(0) += 1;
    }
    let duplicate_ids: Vec<String> = occurrences
        .iter()
        .filter(|(_, count)| **count > 1)
        .map(|(id, _)| id.to_string())
        .collect();
    let duplicate_count = occurrences
        .values()
        .filter(|count| **count > 1)
        .map(|count| count - 1)
        .sum();

    let parsed: Vec<(usize, ParsedId)> = identified
        .iter()
        .map(|(sequence, id)| (*sequence, parse_transaction_id(id)))
        .collect();

    let gaps = find_gaps(&parsed, config.id_gap_max_span);
    let gap_count = gaps.len();
    let missing_sequence_values = gaps.iter().map(|g| g.missing).sum();

    let (pattern_break_sequences, format_boundary) = find_pattern_breaks(&parsed);

    Ok(IdIntegrityReport {
        checked: identified.len(),
        missing_ids,
        gap_count,
        missing_sequence_values,
        gaps: gaps.into_iter().take(MAX_REPORTED_GAPS).collect(),
        duplicate_ids,
        duplicate_count,
        pattern_breaks: pattern_break_sequences.len(),
        pattern_break_sequences,
        format_boundary,
    })
}

fn find_gaps(parsed: &[(usize, ParsedId)], max_span: u64) -> Vec<IdGap> {
    let mut by_format: BTreeMap<&IdFormat, Vec<u64>> = BTreeMap::new();
    for (_, id) in parsed {
        if let Some(number) = id.number {
            by_format.entry(&id.format).or_default().push(number);
        }
    }

    let mut gaps = Vec::new();
    for numbers in by_format.values_mut() {
        numbers.sort_unstable();
        numbers.dedup();
        for pair in numbers.windows(2) {
            let distance = pair[1] - pair[0];
            if distance > 1 && distance <= max_span {
                gaps.push(IdGap {
                    after: pair[0],
                    before: pair[1],
                    missing: distance - 1,
                });
            }
        }
    }
    gaps
}

/// Format changes in ledger order
///
/// A single change is accepted as a format version boundary. Any further
/// change means formats interleave, and every change is reported.
fn find_pattern_breaks(parsed: &[(usize, ParsedId)]) -> (Vec<usize>, Option<usize>) {
    let transitions: Vec<usize> = parsed
        .windows(2)
        .filter(|pair| pair[0].1.format != pair[1].1.format)
        .map(|pair| pair[1].0)
        .collect();

    match transitions.as_slice() {
        [] => (Vec::new(), None),
        [boundary] => (Vec::new(), Some(*boundary)),
        _ => (transitions, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{StatementMetadata, Transaction};
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    fn ledger_with_ids(ids: &[Option<&str>]) -> Ledger {
        let transactions = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let ts = NaiveDate::from_ymd_opt(2024, 6, 1)
                    .unwrap()
                    .and_hms_opt(8, 0, i as u32)
                    .unwrap();
                let txn = Transaction::credit(i, ts, "Received".to_string(), BigDecimal::from(5));
                match id {
                    Some(id) => txn.with_id(*id),
                    None => txn,
                }
            })
            .collect();
        Ledger::new(StatementMetadata::default(), transactions)
    }

    #[test]
    fn test_parse_formats() {
        assert_eq!(
            parse_transaction_id("TX000123"),
            ParsedId {
                format: IdFormat::Prefixed {
                    prefix: "TX".to_string(),
                    digits: 6
                },
                number: Some(123),
            }
        );
        assert_eq!(
            parse_transaction_id("88812").format,
            IdFormat::Numeric { digits: 5 }
        );
        assert_eq!(
            parse_transaction_id("QJK7XYZ12").format,
            IdFormat::Opaque { length: 9 }
        );
        assert_eq!(parse_transaction_id("QJK7XYZ12").number, None);
    }

    #[test]
    fn test_gaps_and_duplicates() {
        let ledger = ledger_with_ids(&[
            Some("TX000001"),
            Some("TX000002"),
            Some("TX000005"),
            Some("TX000005"),
            Some("TX000006"),
            None,
        ]);

        let report = check_transaction_ids(&ledger, &AnomalyConfig::default()).unwrap();

        assert_eq!(report.checked, 5);
        assert_eq!(report.missing_ids, 1);
        assert_eq!(report.gap_count, 1);
        assert_eq!(report.missing_sequence_values, 2);
        assert_eq!(report.duplicate_ids, vec!["TX000005".to_string()]);
        assert_eq!(report.duplicate_count, 1);
        assert_eq!(report.pattern_breaks, 0);
    }

    #[test]
    fn test_random_ids_have_no_gaps() {
        let ledger = ledger_with_ids(&[Some("4810022913"), Some("1299300021"), Some("7730019288")]);

        let report = check_transaction_ids(&ledger, &AnomalyConfig::default()).unwrap();

        assert_eq!(report.gap_count, 0);
    }

    #[test]
    fn test_single_format_change_is_a_boundary() {
        let ledger = ledger_with_ids(&[
            Some("TX0001"),
            Some("TX0002"),
            Some("TXN000003"),
            Some("TXN000004"),
        ]);

        let report = check_transaction_ids(&ledger, &AnomalyConfig::default()).unwrap();

        assert_eq!(report.pattern_breaks, 0);
        assert_eq!(report.format_boundary, Some(2));
    }

    #[test]
    fn test_interleaved_formats_are_pattern_breaks() {
        let ledger = ledger_with_ids(&[
            Some("TX0001"),
            Some("TX0002"),
            Some("AB99"),
            Some("TX0003"),
        ]);

        let report = check_transaction_ids(&ledger, &AnomalyConfig::default()).unwrap();

        assert_eq!(report.pattern_breaks, 2);
        assert_eq!(report.pattern_break_sequences, vec![2, 3]);
        assert_eq!(report.format_boundary, None);
    }

    #[test]
    fn test_no_ids_is_insufficient_data() {
        let ledger = ledger_with_ids(&[None, None]);

        assert!(matches!(
            check_transaction_ids(&ledger, &AnomalyConfig::default()),
            Err(VerifyError::InsufficientData(_))
        ));
    }
}
