//! Page layout conventions and the per-provider registry

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::traits::PageLayoutConvention;
use crate::types::*;

const STANDARD_KEYWORDS: &[&str] = &[
    "transaction id",
    "receipt no",
    "transaction type",
    "transaction status",
    "description",
    "details",
    "date",
    "time",
    "from account",
    "to account",
    "mobile number",
    "paid in",
    "withdrawn",
    "balance",
];

const STANDARD_MARKERS: &[&str] = &[
    r"^page\s*\d+(\s*(of|/)\s*\d+)?$",
    r"^-?\s*\d+\s*-?$",
    r"^\d+\s*/\s*\d+$",
    r"^\(?\s*continued\s*\)?$",
    r"^continued from previous page$",
];

/// Keyword-driven layout convention
#[derive(Debug, Clone)]
pub struct KeywordLayout {
    name: String,
    keywords: Vec<String>,
    markers: Vec<Regex>,
    min_hits: usize,
}

impl KeywordLayout {
    /// Build a convention from a keyword set and marker patterns
    ///
    /// Marker patterns are matched against the trimmed, lowercased line.
    pub fn new(
        name: impl Into<String>,
        keywords: &[&str],
        marker_patterns: &[&str],
    ) -> VerifyResult<Self> {
        let markers = marker_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    VerifyError::Configuration(format!(
                        "invalid continuation pattern '{}': {}",
                        pattern, e
                    ))
                })
            })
            .collect::<VerifyResult<Vec<_>>>()?;

        Ok(Self {
            name: name.into(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            markers,
            min_hits: 2,
        })
    }

    /// Generic table vocabulary with common page-number markers
    pub fn standard() -> Self {
        Self {
            name: "standard".to_string(),
            keywords: STANDARD_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            markers: STANDARD_MARKERS
                .iter()
                .filter_map(|pattern| Regex::new(pattern).ok())
                .collect(),
            min_hits: 2,
        }
    }

    pub fn with_min_hits(mut self, min_hits: usize) -> Self {
        self.min_hits = min_hits.max(1);
        self
    }
}

impl PageLayoutConvention for KeywordLayout {
    fn name(&self) -> &str {
        &self.name
    }

    fn header_keywords(&self) -> &[String] {
        &self.keywords
    }

    fn min_keyword_hits(&self) -> usize {
        self.min_hits
    }

    fn is_continuation_marker(&self, line: &str) -> bool {
        let line = line.trim().to_lowercase();
        !line.is_empty() && self.markers.iter().any(|marker| marker.is_match(&line))
    }
}

/// Layout conventions keyed by provider code
#[derive(Clone)]
pub struct LayoutRegistry {
    layouts: BTreeMap<String, Arc<dyn PageLayoutConvention>>,
    fallback: Arc<dyn PageLayoutConvention>,
}

impl LayoutRegistry {
    /// Registry that resolves every provider to the standard layout
    pub fn new() -> Self {
        Self::with_fallback(Arc::new(KeywordLayout::standard()))
    }

    pub fn with_fallback(fallback: Arc<dyn PageLayoutConvention>) -> Self {
        Self {
            layouts: BTreeMap::new(),
            fallback,
        }
    }

    /// Register the convention used for a provider code
    pub fn register(&mut self, provider_code: &str, layout: Arc<dyn PageLayoutConvention>) {
        self.layouts.insert(provider_code.to_lowercase(), layout);
    }

    /// Convention for a provider, falling back to the default
    pub fn resolve(&self, provider_code: Option<&str>) -> &dyn PageLayoutConvention {
        provider_code
            .and_then(|code| self.layouts.get(&code.to_lowercase()))
            .unwrap_or(&self.fallback)
            .as_ref()
    }
}

impl Default for LayoutRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LayoutRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutRegistry")
            .field("providers", &self.layouts.keys().collect::<Vec<_>>())
            .field("fallback", &self.fallback.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_header_signature() {
        let layout = KeywordLayout::standard();

        assert!(layout.is_header("Receipt No. | Completion Time | Details | Balance"));
        assert!(layout.is_header("TRANSACTION ID  DATE  DESCRIPTION"));
        assert!(!layout.is_header("Balance carried forward"));
        assert!(!layout.is_header("QX12AB  2024-01-02 10:00  Payment to shop  500.00"));
    }

    #[test]
    fn test_page_markers_are_never_headers() {
        let layout = KeywordLayout::standard();

        for marker in ["Page 2 of 7", "page 3", "- 4 -", "2/9", "(continued)", "12"] {
            assert!(layout.is_continuation_marker(marker), "{}", marker);
            assert!(!layout.is_header(marker));
        }
        assert!(!layout.is_continuation_marker(""));
    }

    #[test]
    fn test_custom_layout_and_registry() {
        let custom = KeywordLayout::new(
            "wallet",
            &["txn ref", "posted", "narration"],
            &[r"^statement continues$"],
        )
        .unwrap();
        assert!(custom.is_header("Txn Ref  Posted  Narration"));
        assert!(custom.is_continuation_marker("Statement continues"));

        let mut registry = LayoutRegistry::new();
        registry.register("WALLET", Arc::new(custom));

        assert_eq!(registry.resolve(Some("wallet")).name(), "wallet");
        assert_eq!(registry.resolve(Some("other")).name(), "standard");
        assert_eq!(registry.resolve(None).name(), "standard");
    }

    #[test]
    fn test_invalid_marker_pattern_is_configuration_error() {
        let err = KeywordLayout::new("broken", &["a", "b"], &["(unclosed"]).unwrap_err();
        assert!(matches!(err, VerifyError::Configuration(_)));
    }
}
