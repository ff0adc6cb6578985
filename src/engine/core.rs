//! Statement engine that runs every check and builds the verdict

use serde::{Deserialize, Serialize};

use crate::anomaly::LedgerAnalyzer;
use crate::config::EngineConfig;
use crate::detection::{LayoutRegistry, StructureDetector};
use crate::ledger::Ledger;
use crate::reconciliation::{BalanceReconciler, FeeModelClassifier, MerchantMatcher};
use crate::types::*;
use crate::utils::validation::validate_statement_input;
use crate::verdict::{aggregate, Verdict};

/// Everything the normalizer hands over for one statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementInput {
    pub run_id: RunId,
    pub ledger: Ledger,
    /// Ordered text lines of each page, when the source was a document
    pub pages: Option<Vec<Vec<String>>>,
}

impl StatementInput {
    pub fn new(run_id: RunId, ledger: Ledger) -> Self {
        Self {
            run_id,
            ledger,
            pages: None,
        }
    }

    pub fn with_pages(mut self, pages: Vec<Vec<String>>) -> Self {
        self.pages = Some(pages);
        self
    }
}

/// Reconciliation and manipulation-detection engine
///
/// Holds no per-statement state; one engine can verify any number of
/// statements, concurrently if needed.
#[derive(Debug, Clone)]
pub struct StatementEngine {
    config: EngineConfig,
    layouts: LayoutRegistry,
    merchants: MerchantMatcher,
}

impl StatementEngine {
    /// Create an engine, rejecting invalid configuration up front
    pub fn new(config: EngineConfig) -> VerifyResult<Self> {
        Self::with_layouts(config, LayoutRegistry::default())
    }

    /// Create an engine with provider-specific page layouts
    pub fn with_layouts(config: EngineConfig, layouts: LayoutRegistry) -> VerifyResult<Self> {
        config.validate()?;
        let merchants = MerchantMatcher::from_config(&config.fee_model)?;
        Ok(Self {
            config,
            layouts,
            merchants,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Verify one statement
    ///
    /// Only an invalid input fails the call; checks lacking data are
    /// reported unavailable on the verdict.
    pub fn verify(&self, input: &StatementInput) -> VerifyResult<Verdict> {
        validate_statement_input(input)?;

        let ledger = &input.ledger;
        let tolerance = &self.config.reconcile.tolerance;

        // The fee decision must exist before the balance replay.
        let fee_model =
            FeeModelClassifier::new(&self.config.fee_model, &self.merchants, tolerance)
                .classify(ledger, &input.run_id);
        let reconciliation = CheckOutcome::from(
            BalanceReconciler::new(&self.config.reconcile, &self.merchants)
                .reconcile(ledger, &fee_model.flags),
        );

        let anomalies = LedgerAnalyzer::new(&self.config.anomaly, tolerance).analyze(ledger);

        let manipulation = match &input.pages {
            Some(pages) => {
                let layout = self
                    .layouts
                    .resolve(ledger.metadata.provider_code.as_deref());
                CheckOutcome::from(StructureDetector::new(layout).scan(pages))
            }
            None => CheckOutcome::unavailable("no page text supplied"),
        };

        let aggregation = aggregate(&reconciliation, &manipulation, &anomalies);

        tracing::info!(
            run_id = %input.run_id,
            severity = ?aggregation.severity,
            rule = ?aggregation.rule,
            transactions = ledger.len(),
            "Statement verified"
        );

        Ok(Verdict {
            run_id: input.run_id.clone(),
            account_number: ledger.metadata.account_number.clone(),
            provider_code: ledger.metadata.provider_code.clone(),
            severity: aggregation.severity,
            triggered_by: aggregation.rule,
            signals: aggregation.signals,
            reconciliation,
            fee_model,
            manipulation,
            anomalies,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{StatementMetadata, Transaction};
    use crate::verdict::Severity;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    #[test]
    fn test_invalid_config_fails_fast() {
        let mut config = EngineConfig::default();
        config.reconcile.tolerance = BigDecimal::from(-1);

        assert!(matches!(
            StatementEngine::new(config),
            Err(VerifyError::Configuration(_))
        ));
    }

    #[test]
    fn test_ledger_without_balances_still_yields_verdict() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 8)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let ledger = Ledger::new(
            StatementMetadata::new("0733000000"),
            vec![Transaction::credit(0, ts, "Received".to_string(), BigDecimal::from(120))],
        );
        let engine = StatementEngine::new(EngineConfig::default()).unwrap();

        let verdict = engine
            .verify(&StatementInput::new(RunId::from("no-balances"), ledger))
            .unwrap();

        assert!(!verdict.reconciliation.is_available());
        assert!(!verdict.manipulation.is_available());
        assert!(verdict.anomalies.timestamps.is_available());
        assert_eq!(verdict.severity, Severity::NoIssues);
    }
}
