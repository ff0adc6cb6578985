//! Traits for storage abstraction and provider extensibility

use async_trait::async_trait;

use crate::types::*;
use crate::verdict::Verdict;

/// Storage abstraction for verdicts
///
/// Verdicts are keyed by run identifier. Storing a verdict for a run that
/// already has one replaces it outright; implementations must never merge
/// the two records.
#[async_trait]
pub trait VerdictStore: Send + Sync {
    /// Insert or replace the verdict for its run identifier
    async fn upsert_verdict(&self, verdict: &Verdict) -> VerifyResult<()>;

    /// Get the verdict for a run
    async fn get_verdict(&self, run_id: &RunId) -> VerifyResult<Option<Verdict>>;

    /// List all stored verdicts ordered by run identifier
    async fn list_verdicts(&self) -> VerifyResult<Vec<Verdict>>;

    /// Delete the verdict for a run
    async fn delete_verdict(&self, run_id: &RunId) -> VerifyResult<()>;
}

/// How a provider lays out the transaction table on statement pages
///
/// Providers differ in the header vocabulary they print and in what they put
/// above the table on continuation pages. The structural detector asks the
/// convention instead of branching on provider codes.
pub trait PageLayoutConvention: Send + Sync {
    /// Short name recorded on the manipulation report
    fn name(&self) -> &str;

    /// Lowercase keywords that make up the table header vocabulary
    fn header_keywords(&self) -> &[String];

    /// Keyword hits needed before a line counts as a header
    fn min_keyword_hits(&self) -> usize {
        2
    }

    /// Page-number or continuation lines that may precede the header
    fn is_continuation_marker(&self, line: &str) -> bool;

    /// Whether a missing header on the first page deserves a warning
    fn expects_header_on_first_page(&self) -> bool {
        true
    }

    /// Case-insensitive header signature match
    fn is_header(&self, line: &str) -> bool {
        if self.is_continuation_marker(line) {
            return false;
        }
        let line = line.to_lowercase();
        let hits = self
            .header_keywords()
            .iter()
            .filter(|keyword| line.contains(keyword.as_str()))
            .count();
        hits >= self.min_keyword_hits()
    }
}
