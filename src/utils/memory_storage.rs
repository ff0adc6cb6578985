//! In-memory verdict store for testing

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::traits::*;
use crate::types::*;
use crate::verdict::Verdict;

/// In-memory verdict store for testing and development
#[derive(Debug, Clone, Default)]
pub struct MemoryVerdictStore {
    verdicts: Arc<RwLock<BTreeMap<RunId, Verdict>>>,
}

impl MemoryVerdictStore {
    /// Create a new memory store instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored verdicts
    pub fn len(&self) -> usize {
        self.verdicts.read().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) -> VerifyResult<()> {
        self.verdicts.write().map_err(poisoned)?.clear();
        Ok(())
    }
}

fn poisoned<T>(_: T) -> VerifyError {
    VerifyError::Storage("verdict store lock poisoned".to_string())
}

#[async_trait]
impl VerdictStore for MemoryVerdictStore {
    async fn upsert_verdict(&self, verdict: &Verdict) -> VerifyResult<()> {
        self.verdicts
            .write()
            .map_err(poisoned)?
            .insert(verdict.run_id.clone(), verdict.clone());
        Ok(())
    }

    async fn get_verdict(&self, run_id: &RunId) -> VerifyResult<Option<Verdict>> {
        Ok(self.verdicts.read().map_err(poisoned)?.get(run_id).cloned())
    }

    async fn list_verdicts(&self) -> VerifyResult<Vec<Verdict>> {
        Ok(self.verdicts.read().map_err(poisoned)?.values().cloned().collect())
    }

    async fn delete_verdict(&self, run_id: &RunId) -> VerifyResult<()> {
        match self.verdicts.write().map_err(poisoned)?.remove(run_id) {
            Some(_) => Ok(()),
            None => Err(VerifyError::Storage(format!(
                "No verdict stored for run {}",
                run_id
            ))),
        }
    }
}
