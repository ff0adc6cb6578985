//! Concurrent batch driver

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::engine::{StatementEngine, StatementInput};
use crate::traits::VerdictStore;
use crate::types::*;
use crate::verdict::Verdict;

/// Coarse cancellation shared with a running batch
///
/// Statements not yet started when the flag is raised are skipped; a
/// statement already being verified runs to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Statement that could not be verified or stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub run_id: RunId,
    pub error: String,
}

/// Outcome of a batch, each list sorted by run id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub verdicts: Vec<Verdict>,
    pub failures: Vec<BatchFailure>,
    pub skipped: Vec<RunId>,
}

enum Outcome {
    Verified(Box<Verdict>),
    Failed(BatchFailure),
    Skipped(RunId),
}

/// Verifies many statements with bounded concurrency
///
/// Verification itself is synchronous and runs inline on the task polling
/// [`BatchVerifier::run`], one statement at a time. The concurrency limit
/// bounds how many statements are in flight, so it only overlaps the awaits
/// on the verdict store. Callers wanting CPU parallelism split the inputs and
/// run one batch per worker thread, sharing the engine through its `Arc`.
pub struct BatchVerifier {
    engine: Arc<StatementEngine>,
    store: Option<Arc<dyn VerdictStore>>,
    cancel: CancelFlag,
}

impl BatchVerifier {
    pub fn new(engine: Arc<StatementEngine>) -> Self {
        Self {
            engine,
            store: None,
            cancel: CancelFlag::new(),
        }
    }

    /// Upsert every verdict into the given store
    pub fn with_store(mut self, store: Arc<dyn VerdictStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Verify all inputs; one statement's failure never affects another
    pub async fn run(&self, inputs: Vec<StatementInput>) -> BatchReport {
        let limit = self.engine.config().batch.concurrency;

        let outcomes: Vec<Outcome> = stream::iter(inputs)
            .map(|input| async move { self.process(input).await })
            .buffer_unordered(limit)
            .collect()
            .await;

        let mut report = BatchReport::default();
        for outcome in outcomes {
            match outcome {
                Outcome::Verified(verdict) => report.verdicts.push(*verdict),
                Outcome::Failed(failure) => report.failures.push(failure),
                Outcome::Skipped(run_id) => report.skipped.push(run_id),
            }
        }
        report.verdicts.sort_by(|a, b| a.run_id.cmp(&b.run_id));
        report.failures.sort_by(|a, b| a.run_id.cmp(&b.run_id));
        report.skipped.sort();

        tracing::info!(
            verified = report.verdicts.len(),
            failed = report.failures.len(),
            skipped = report.skipped.len(),
            "Batch finished"
        );
        report
    }

    async fn process(&self, input: StatementInput) -> Outcome {
        if self.cancel.is_cancelled() {
            return Outcome::Skipped(input.run_id);
        }

        let verdict = match self.engine.verify(&input) {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::warn!(run_id = %input.run_id, error = %e, "Statement verification failed");
                return Outcome::Failed(BatchFailure {
                    run_id: input.run_id,
                    error: e.to_string(),
                });
            }
        };

        if let Some(store) = &self.store {
            if let Err(e) = store.upsert_verdict(&verdict).await {
                tracing::warn!(run_id = %input.run_id, error = %e, "Failed to store verdict");
                return Outcome::Failed(BatchFailure {
                    run_id: input.run_id,
                    error: e.to_string(),
                });
            }
        }

        Outcome::Verified(Box::new(verdict))
    }
}
