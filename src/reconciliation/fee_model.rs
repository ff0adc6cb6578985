//! Implicit fee model classification
//!
//! Some providers fold a cashback or commission into the displayed balance
//! without printing it as its own line. Each eligible transaction votes on
//! whether the fee column moved the balance, and the tally decides whether
//! the reconciler should fold the fee in for that statement.

use bigdecimal::BigDecimal;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::FeeModelConfig;
use crate::ledger::{Ledger, Transaction};
use crate::reconciliation::within_tolerance;
use crate::types::*;

/// Implicit adjustment a provider may apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeModel {
    /// Cashback credited back on merchant payments
    Cashback,
    /// Commission withheld from merchant receipts
    Commission,
}

impl FeeModel {
    pub const ALL: [FeeModel; 2] = [FeeModel::Cashback, FeeModel::Commission];

    /// Whether a transaction takes part in this model's vote
    pub fn is_eligible(&self, txn: &Transaction, matcher: &MerchantMatcher) -> bool {
        if !txn.has_fee() {
            return false;
        }
        let direction = match self {
            FeeModel::Cashback => Direction::Debit,
            FeeModel::Commission => Direction::Credit,
        };
        txn.direction == direction && matcher.matches(*self, &txn.classification_text())
    }

    /// Balance change when the fee column is folded into the balance
    pub fn folded_effect(&self, txn: &Transaction) -> BigDecimal {
        match self {
            FeeModel::Cashback => &txn.fee - &txn.amount,
            FeeModel::Commission => &txn.amount - &txn.fee,
        }
    }
}

/// Whole-word keyword matcher for merchant payments and receipts
///
/// Keywords match case-insensitively on word boundaries, so "till" does not
/// match "until". Whitespace inside a keyword matches any whitespace run.
#[derive(Debug, Clone)]
pub struct MerchantMatcher {
    payment: Option<Regex>,
    receipt: Option<Regex>,
}

impl MerchantMatcher {
    pub fn from_config(config: &FeeModelConfig) -> VerifyResult<Self> {
        Ok(Self {
            payment: keyword_pattern(&config.merchant_payment_keywords)?,
            receipt: keyword_pattern(&config.merchant_receipt_keywords)?,
        })
    }

    pub fn matches(&self, model: FeeModel, text: &str) -> bool {
        let pattern = match model {
            FeeModel::Cashback => &self.payment,
            FeeModel::Commission => &self.receipt,
        };
        pattern.as_ref().is_some_and(|re| re.is_match(text))
    }
}

fn keyword_pattern(keywords: &[String]) -> VerifyResult<Option<Regex>> {
    let alternatives: Vec<String> = keywords
        .iter()
        .map(|k| k.split_whitespace().map(regex::escape).collect::<Vec<_>>().join(r"\s+"))
        .filter(|k| !k.is_empty())
        .collect();
    if alternatives.is_empty() {
        return Ok(None);
    }

    let pattern = format!(r"(?i)\b(?:{})\b", alternatives.join("|"));
    Regex::new(&pattern).map(Some).map_err(|e| {
        VerifyError::Configuration(format!("invalid merchant keyword pattern: {}", e))
    })
}

/// Hypothesis an eligible transaction can support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeHypothesis {
    /// The fee column was folded into the balance as cashback or commission
    FeeAffectsBalance,
    /// The fee was charged like any other fee
    DefaultFeeRule,
}

/// Outcome of one transaction's vote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeVote {
    pub sequence: usize,
    pub transaction_id: Option<String>,
    pub model: FeeModel,
    /// `None` when neither or both hypotheses matched
    pub hypothesis: Option<FeeHypothesis>,
    /// 1 for a cast vote, 0 otherwise
    pub weight: u32,
    pub outcome: VoteOutcome,
}

/// Aggregated votes for one model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub votes_for: usize,
    pub votes_against: usize,
    /// Eligible transactions where neither hypothesis matched
    pub no_match: usize,
    /// Eligible transactions where both hypotheses matched
    pub non_discriminating: usize,
}

impl VoteTally {
    pub fn cast(&self) -> usize {
        self.votes_for + self.votes_against
    }
}

/// Where a model's final flag came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    Vote,
    Override,
}

/// Resolved decision for one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDecision {
    pub model: FeeModel,
    pub tally: VoteTally,
    /// What the vote alone decided
    pub voted: bool,
    /// Final flag after any manual override
    pub enabled: bool,
    pub source: DecisionSource,
}

/// Flags consumed by the balance reconciler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeModelFlags {
    pub cashback_enabled: bool,
    pub commission_enabled: bool,
}

impl FeeModelFlags {
    pub fn is_enabled(&self, model: FeeModel) -> bool {
        match model {
            FeeModel::Cashback => self.cashback_enabled,
            FeeModel::Commission => self.commission_enabled,
        }
    }

    /// Balance change the reconciler should replay for a transaction
    ///
    /// Only a transaction eligible for an enabled model has its fee folded in;
    /// everything else follows the default fee rule.
    pub fn balance_change(&self, txn: &Transaction, matcher: &MerchantMatcher) -> BigDecimal {
        FeeModel::ALL
            .into_iter()
            .find(|model| self.is_enabled(*model) && model.is_eligible(txn, matcher))
            .map(|model| model.folded_effect(txn))
            .unwrap_or_else(|| txn.default_effect())
    }
}

/// Full classifier output, kept on the verdict for audit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeModelDecision {
    pub flags: FeeModelFlags,
    pub cashback: ModelDecision,
    pub commission: ModelDecision,
    pub votes: Vec<FeeVote>,
}

/// Voting classifier for implicit fee models
pub struct FeeModelClassifier<'a> {
    config: &'a FeeModelConfig,
    matcher: &'a MerchantMatcher,
    tolerance: &'a BigDecimal,
}

impl<'a> FeeModelClassifier<'a> {
    pub fn new(
        config: &'a FeeModelConfig,
        matcher: &'a MerchantMatcher,
        tolerance: &'a BigDecimal,
    ) -> Self {
        Self {
            config,
            matcher,
            tolerance,
        }
    }

    /// Vote on both models and apply any override registered for the run
    pub fn classify(&self, ledger: &Ledger, run_id: &RunId) -> FeeModelDecision {
        let (cashback, mut votes) = self.decide(ledger, run_id, FeeModel::Cashback);
        let (commission, commission_votes) = self.decide(ledger, run_id, FeeModel::Commission);
        votes.extend(commission_votes);

        FeeModelDecision {
            flags: FeeModelFlags {
                cashback_enabled: cashback.enabled,
                commission_enabled: commission.enabled,
            },
            cashback,
            commission,
            votes,
        }
    }

    fn decide(
        &self,
        ledger: &Ledger,
        run_id: &RunId,
        model: FeeModel,
    ) -> (ModelDecision, Vec<FeeVote>) {
        let votes = self.cast_votes(ledger, model);
        let tally = tally(&votes);
        let voted = self.resolve(&tally);

        let forced = self
            .config
            .override_for(run_id)
            .and_then(|o| match model {
                FeeModel::Cashback => o.cashback,
                FeeModel::Commission => o.commission,
            });
        let (enabled, source) = match forced {
            Some(value) => {
                tracing::info!(
                    run_id = %run_id,
                    model = ?model,
                    voted,
                    forced = value,
                    "Fee model decided by manual override"
                );
                (value, DecisionSource::Override)
            }
            None => (voted, DecisionSource::Vote),
        };

        tracing::debug!(
            run_id = %run_id,
            model = ?model,
            votes_for = tally.votes_for,
            votes_against = tally.votes_against,
            enabled,
            "Fee model vote tallied"
        );

        let decision = ModelDecision {
            model,
            tally,
            voted,
            enabled,
            source,
        };
        (decision, votes)
    }

    /// Collect one vote per eligible transaction
    pub fn cast_votes(&self, ledger: &Ledger, model: FeeModel) -> Vec<FeeVote> {
        let transactions = ledger.transactions();
        let mut votes = Vec::new();

        for (index, txn) in transactions.iter().enumerate() {
            if !model.is_eligible(txn, self.matcher) {
                continue;
            }

            let previous = index
                .checked_sub(1)
                .and_then(|i| transactions[i].balance_after.as_ref());
            let outcome = match (previous, txn.balance_after.as_ref()) {
                (Some(previous), Some(declared)) => {
                    let folded = previous + model.folded_effect(txn);
                    let charged = previous + txn.default_effect();
                    let folded_matches = within_tolerance(&folded, declared, self.tolerance);
                    let charged_matches = within_tolerance(&charged, declared, self.tolerance);
                    match (folded_matches, charged_matches) {
                        (true, false) => VoteOutcome::Cast(FeeHypothesis::FeeAffectsBalance),
                        (false, true) => VoteOutcome::Cast(FeeHypothesis::DefaultFeeRule),
                        (true, true) => VoteOutcome::NonDiscriminating,
                        (false, false) => VoteOutcome::NoMatch,
                    }
                }
                _ => VoteOutcome::NoMatch,
            };

            votes.push(FeeVote {
                sequence: txn.sequence,
                transaction_id: txn.transaction_id.clone(),
                model,
                hypothesis: outcome.hypothesis(),
                weight: outcome.weight(),
                outcome,
            });
        }

        votes
    }

    /// Decide a model from its tally
    ///
    /// A unanimous tally always resolves to its own side once enough votes
    /// were cast; otherwise the for/against ratio must reach the threshold.
    pub fn resolve(&self, tally: &VoteTally) -> bool {
        if tally.cast() < self.config.minimum_vote_count {
            return false;
        }
        if tally.votes_against == 0 {
            return tally.votes_for > 0;
        }
        let ratio = tally.votes_for as f64 / tally.votes_against.max(1) as f64;
        ratio >= self.config.ratio_threshold
    }
}

/// How an eligible transaction took part in the vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "hypothesis")]
pub enum VoteOutcome {
    Cast(FeeHypothesis),
    /// Neither hypothesis reproduced the declared balance
    NoMatch,
    /// Both hypotheses reproduced it (e.g. zero-effect fee within tolerance)
    NonDiscriminating,
}

impl VoteOutcome {
    pub fn hypothesis(&self) -> Option<FeeHypothesis> {
        match self {
            VoteOutcome::Cast(h) => Some(*h),
            _ => None,
        }
    }

    pub fn weight(&self) -> u32 {
        match self {
            VoteOutcome::Cast(_) => 1,
            _ => 0,
        }
    }
}

fn tally(votes: &[FeeVote]) -> VoteTally {
    let mut tally = VoteTally::default();
    for vote in votes {
        match vote.outcome {
            VoteOutcome::Cast(FeeHypothesis::FeeAffectsBalance) => tally.votes_for += 1,
            VoteOutcome::Cast(FeeHypothesis::DefaultFeeRule) => tally.votes_against += 1,
            VoteOutcome::NoMatch => tally.no_match += 1,
            VoteOutcome::NonDiscriminating => tally.non_discriminating += 1,
        }
    }
    tally
}
