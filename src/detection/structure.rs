//! Duplicate and displaced table-header detection
//!
//! Content spliced into a statement PDF tends to bring its own copy of the
//! table header. A page with more than one header, or a continuation page
//! whose only header sits below other content, is flagged.

use serde::{Deserialize, Serialize};

use crate::traits::PageLayoutConvention;
use crate::types::*;

/// Why a page was flagged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManipulationReason {
    /// More than one header line on the page
    DuplicateHeader,
    /// The only header on a continuation page is not at its top
    DisplacedHeader,
}

/// Scan result for one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageScan {
    /// 1-based page number
    pub page_number: usize,
    /// Line indices of header lines on the page
    pub header_positions: Vec<usize>,
    pub reason: Option<ManipulationReason>,
}

impl PageScan {
    pub fn is_flagged(&self) -> bool {
        self.reason.is_some()
    }
}

/// Document-level structural verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManipulationReport {
    /// Layout convention the pages were scanned with
    pub layout: String,
    pub pages: Vec<PageScan>,
    pub manipulated_pages_count: usize,
    pub total_pages: usize,
    pub is_manipulated: bool,
    pub warnings: Vec<String>,
}

/// Structural manipulation detector over per-page text lines
pub struct StructureDetector<'a> {
    layout: &'a dyn PageLayoutConvention,
}

impl<'a> StructureDetector<'a> {
    pub fn new(layout: &'a dyn PageLayoutConvention) -> Self {
        Self { layout }
    }

    /// Scan every page and summarise flagged ones
    pub fn scan<S: AsRef<str>>(&self, pages: &[Vec<S>]) -> VerifyResult<ManipulationReport> {
        if pages.is_empty() {
            return Err(VerifyError::InsufficientData(
                "no page text supplied".to_string(),
            ));
        }

        let mut warnings = Vec::new();
        let scans: Vec<PageScan> = pages
            .iter()
            .enumerate()
            .map(|(index, lines)| self.scan_page(index, lines, &mut warnings))
            .collect();

        let manipulated_pages_count = scans.iter().filter(|p| p.is_flagged()).count();
        if manipulated_pages_count > 0 {
            tracing::info!(
                layout = self.layout.name(),
                manipulated_pages_count,
                total_pages = scans.len(),
                "Structural manipulation detected"
            );
        }

        Ok(ManipulationReport {
            layout: self.layout.name().to_string(),
            total_pages: scans.len(),
            manipulated_pages_count,
            is_manipulated: manipulated_pages_count > 0,
            pages: scans,
            warnings,
        })
    }

    fn scan_page<S: AsRef<str>>(
        &self,
        index: usize,
        lines: &[S],
        warnings: &mut Vec<String>,
    ) -> PageScan {
        let page_number = index + 1;
        let header_positions: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, line)| self.layout.is_header(line.as_ref()))
            .map(|(position, _)| position)
            .collect();

        let reason = match header_positions.as_slice() {
            [] => {
                if index == 0 && self.layout.expects_header_on_first_page() {
                    tracing::warn!(layout = self.layout.name(), "No table header on first page");
                    warnings.push("no table header found on page 1".to_string());
                }
                None
            }
            [position] if index > 0 && !self.is_page_top(lines, *position) => {
                Some(ManipulationReason::DisplacedHeader)
            }
            [_] => None,
            _ => Some(ManipulationReason::DuplicateHeader),
        };

        if let Some(reason) = reason {
            tracing::debug!(
                page_number,
                reason = ?reason,
                positions = ?header_positions,
                "Page flagged"
            );
        }

        PageScan {
            page_number,
            header_positions,
            reason,
        }
    }

    /// Whether only blank lines and continuation markers precede `position`
    fn is_page_top<S: AsRef<str>>(&self, lines: &[S], position: usize) -> bool {
        lines[..position].iter().all(|line| {
            let line = line.as_ref();
            line.trim().is_empty() || self.layout.is_continuation_marker(line)
        })
    }
}
