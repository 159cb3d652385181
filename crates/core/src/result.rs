use serde::{Deserialize, Serialize};

use crate::fields::ExtractedFields;

/// Which extraction/formatting implementation handled the request.
/// Resolved once per process lifetime, reported on every result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FormatterTier {
    /// Caller-supplied implementation.
    Personal,
    /// Bundled template implementation.
    Example,
    /// Built-in extractor suite.
    Basic,
}

impl std::fmt::Display for FormatterTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatterTier::Personal => write!(f, "personal"),
            FormatterTier::Example => write!(f, "example"),
            FormatterTier::Basic => write!(f, "basic"),
        }
    }
}

/// Output of one post-processing run. Built fresh per request,
/// immutable once returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingResult {
    /// OCR text with control characters and excess blank lines removed.
    pub cleaned_text: String,
    pub extracted: ExtractedFields,
    /// Human-readable synopsis assembled from the extracted fields.
    pub summary_text: String,
    /// Heuristic extraction reliability, 0–100. Not a probability.
    pub confidence: u8,
    pub formatter: FormatterTier,
}
