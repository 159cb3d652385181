use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse config TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Per-attempt scoring weights for the OCR fallback strategist.
///
/// A strategy's raw text is scored against the shapes a financial
/// document is expected to contain; `early_exit` is the threshold at
/// which the remaining strategy chain is skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Awarded when the text contains a currency marker (`$`).
    pub currency_marker: f32,
    /// Awarded when the text contains a run of 2+ digits.
    pub digit_run: f32,
    /// Awarded for the canonical amount shape: `$`, optional space, digit.
    pub amount_shape: f32,
    /// Length bonus is `min(len / length_divisor, length_cap)`.
    pub length_divisor: f32,
    pub length_cap: f32,
    /// Score at which later strategies are not tried.
    pub early_exit: f32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            currency_marker: 30.0,
            digit_run: 30.0,
            amount_shape: 40.0,
            length_divisor: 50.0,
            length_cap: 20.0,
            early_exit: 70.0,
        }
    }
}

/// Static OCR configuration, constructed once at startup and shared
/// read-only across requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Tesseract language pack identifier.
    pub lang: String,
    /// OCR engine mode (1 = LSTM only).
    pub engine_mode: u8,
    /// Segmentation strategy recorded when no attempt produced output.
    pub default_psm: u8,
    /// Ordered page-segmentation fallback chain.
    pub psm_fallback_chain: Vec<u8>,
    pub preserve_interword_spaces: bool,
    pub scoring: ScoringWeights,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            // Spanish + English for Colombian financial documents.
            lang: "spa+eng".to_string(),
            engine_mode: 1,
            default_psm: 4,
            // Single column, uniform block, automatic, sparse text.
            psm_fallback_chain: vec![4, 6, 3, 11],
            preserve_interword_spaces: true,
            scoring: ScoringWeights::default(),
        }
    }
}

impl OcrConfig {
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_content)?)
    }
}
