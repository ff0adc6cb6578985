//! Engine configuration
//!
//! Every threshold the engine uses lives here and is passed explicitly into
//! each component call. Configuration can be built in code, starting from
//! [`EngineConfig::default`], or parsed from a partial TOML document.

use bigdecimal::BigDecimal;
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::*;

/// Top-level configuration for a verification run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub reconcile: ReconcileConfig,
    pub fee_model: FeeModelConfig,
    pub anomaly: AnomalyConfig,
    pub batch: BatchConfig,
}

impl EngineConfig {
    /// Parse a TOML document; omitted keys keep their defaults
    pub fn from_toml_str(source: &str) -> VerifyResult<Self> {
        let config: EngineConfig = toml::from_str(source)
            .map_err(|e| VerifyError::Configuration(format!("invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject setups that would make every verdict meaningless
    pub fn validate(&self) -> VerifyResult<()> {
        self.reconcile.validate()?;
        self.fee_model.validate()?;
        self.anomaly.validate()?;
        self.batch.validate()
    }
}

/// Balance reconciliation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Absolute tolerance when comparing balances
    pub tolerance: BigDecimal,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            tolerance: BigDecimal::new(1.into(), 2),
        }
    }
}

impl ReconcileConfig {
    fn validate(&self) -> VerifyResult<()> {
        if self.tolerance < BigDecimal::from(0) {
            return Err(VerifyError::Configuration(format!(
                "balance tolerance must not be negative, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Forced fee-model flags for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeModelOverride {
    pub cashback: Option<bool>,
    pub commission: Option<bool>,
}

/// Implicit fee model voting settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeModelConfig {
    /// Required ratio of votes for over votes against
    pub ratio_threshold: f64,
    /// Minimum number of cast votes before a model can be enabled
    pub minimum_vote_count: usize,
    /// Keywords identifying a merchant payment (debit side)
    pub merchant_payment_keywords: Vec<String>,
    /// Keywords identifying a merchant receipt (credit side)
    pub merchant_receipt_keywords: Vec<String>,
    /// Manual decisions keyed by run identifier
    pub overrides: BTreeMap<RunId, FeeModelOverride>,
}

impl Default for FeeModelConfig {
    fn default() -> Self {
        Self {
            ratio_threshold: 2.0,
            minimum_vote_count: 3,
            merchant_payment_keywords: vec![
                "merchant payment".to_string(),
                "buy goods".to_string(),
                "pay bill".to_string(),
                "till".to_string(),
            ],
            merchant_receipt_keywords: vec![
                "merchant receipt".to_string(),
                "payment received".to_string(),
                "till receipt".to_string(),
                "collection".to_string(),
            ],
            overrides: BTreeMap::new(),
        }
    }
}

impl FeeModelConfig {
    fn validate(&self) -> VerifyResult<()> {
        if !self.ratio_threshold.is_finite() || self.ratio_threshold <= 0.0 {
            return Err(VerifyError::Configuration(format!(
                "fee vote ratio threshold must be positive, got {}",
                self.ratio_threshold
            )));
        }
        if self.minimum_vote_count == 0 {
            return Err(VerifyError::Configuration(
                "fee vote minimum vote count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn override_for(&self, run_id: &RunId) -> Option<&FeeModelOverride> {
        self.overrides.get(run_id)
    }
}

/// Half-open `[start_hour, end_hour)` window of local business hours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessHours {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl BusinessHours {
    pub fn contains(&self, hour: u32) -> bool {
        hour >= self.start_hour && hour < self.end_hour
    }
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            start_hour: 8,
            end_hour: 18,
        }
    }
}

/// Limits beyond which an anomaly sub-check raises a flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyThresholds {
    pub max_id_gaps: usize,
    pub max_duplicate_ids: usize,
    pub max_pattern_breaks: usize,
    pub max_balance_jumps: usize,
    pub max_same_second_groups: usize,
    pub max_out_of_order: usize,
    pub max_round_number_ratio: f64,
    pub max_duplicate_amount_ratio: f64,
    pub min_benford_score: f64,
    /// Benford scoring is only judged on at least this many amounts
    pub benford_min_sample: usize,
    pub min_business_hours_ratio: Option<f64>,
    pub max_weekend_ratio: Option<f64>,
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        Self {
            max_id_gaps: 0,
            max_duplicate_ids: 0,
            max_pattern_breaks: 0,
            max_balance_jumps: 0,
            max_same_second_groups: 3,
            max_out_of_order: 0,
            max_round_number_ratio: 0.8,
            max_duplicate_amount_ratio: 0.8,
            min_benford_score: 0.6,
            benford_min_sample: 50,
            min_business_hours_ratio: None,
            max_weekend_ratio: None,
        }
    }
}

/// Ledger anomaly analysis settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Relative balance change above which a jump is considered
    pub balance_jump_threshold: f64,
    /// Denominator floor for jump ratios on near-zero balances
    pub jump_epsilon: BigDecimal,
    /// Amounts divisible by this are counted as round numbers
    pub round_unit: BigDecimal,
    pub business_hours: BusinessHours,
    pub weekend_days: Vec<Weekday>,
    /// Larger numeric distances between ids are not treated as gaps
    pub id_gap_max_span: u64,
    pub thresholds: AnomalyThresholds,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            balance_jump_threshold: 5.0,
            jump_epsilon: BigDecimal::from(1),
            round_unit: BigDecimal::from(1000),
            business_hours: BusinessHours::default(),
            weekend_days: vec![Weekday::Sat, Weekday::Sun],
            id_gap_max_span: 1000,
            thresholds: AnomalyThresholds::default(),
        }
    }
}

impl AnomalyConfig {
    fn validate(&self) -> VerifyResult<()> {
        if !self.balance_jump_threshold.is_finite() || self.balance_jump_threshold <= 0.0 {
            return Err(VerifyError::Configuration(format!(
                "balance jump threshold must be positive, got {}",
                self.balance_jump_threshold
            )));
        }
        if self.jump_epsilon <= BigDecimal::from(0) {
            return Err(VerifyError::Configuration(
                "balance jump epsilon must be positive".to_string(),
            ));
        }
        if self.round_unit <= BigDecimal::from(0) {
            return Err(VerifyError::Configuration(
                "round-number unit must be positive".to_string(),
            ));
        }
        let hours = &self.business_hours;
        if hours.start_hour >= hours.end_hour || hours.end_hour > 24 {
            return Err(VerifyError::Configuration(format!(
                "business hours window {}..{} is invalid",
                hours.start_hour, hours.end_hour
            )));
        }

        let ratios = [
            ("max_round_number_ratio", Some(self.thresholds.max_round_number_ratio)),
            (
                "max_duplicate_amount_ratio",
                Some(self.thresholds.max_duplicate_amount_ratio),
            ),
            ("min_benford_score", Some(self.thresholds.min_benford_score)),
            (
                "min_business_hours_ratio",
                self.thresholds.min_business_hours_ratio,
            ),
            ("max_weekend_ratio", self.thresholds.max_weekend_ratio),
        ];
        for (name, value) in ratios {
            if let Some(value) = value {
                if !(0.0..=1.0).contains(&value) {
                    return Err(VerifyError::Configuration(format!(
                        "{} must be within [0, 1], got {}",
                        name, value
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Batch driver settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum statements processed concurrently
    pub concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { concurrency: 8 }
    }
}

impl BatchConfig {
    fn validate(&self) -> VerifyResult<()> {
        if self.concurrency == 0 {
            return Err(VerifyError::Configuration(
                "batch concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
