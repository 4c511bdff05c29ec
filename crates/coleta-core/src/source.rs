//! The pluggable per-source seam: page URLs in, records out.

use crate::record::Record;

/// Payload that did not have the shape the extractor expected.
///
/// Skips the page (logged by the orchestrator); never aborts the run.
#[derive(Debug)]
pub struct ExtractError {
    pub message: String,
}

impl ExtractError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unexpected payload shape: {}", self.message)
    }
}

impl std::error::Error for ExtractError {}

/// One remote catalog: how its pages are addressed and how a page's
/// raw payload maps to records.
///
/// Everything site-specific lives behind this trait: field mapping,
/// asset URL templates, payload format. Extraction must be a pure
/// function of one payload, no network I/O.
pub trait Source: Sync {
    /// Short name, used for output directories and log lines.
    fn name(&self) -> &str;

    /// URL of one page of the catalog for a language/category.
    fn page_url(&self, language: &str, page: u32) -> String;

    /// Map a raw page payload to zero or more records.
    fn extract(&self, payload: &str, language: &str) -> Result<Vec<Record>, ExtractError>;
}
