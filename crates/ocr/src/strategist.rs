//! Multi-PSM OCR execution.
//!
//! A single Tesseract call on a phone photo of a receipt is unreliable:
//! the page-segmentation mode that nails one layout reads another as
//! noise. The strategist runs an ordered chain of segmentation modes,
//! scores each raw-text result against the shapes a financial document
//! must contain, and stops as soon as one attempt looks good enough.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};

use regex::Regex;
use thiserror::Error;

use recibo_core::config::{OcrConfig, ScoringWeights};

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Image decode error: {0}")]
    ImageDecode(String),
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("Tesseract not available, build with the `tesseract` feature")]
    NotAvailable,
}

/// Per-call OCR engine settings. Everything but the segmentation mode
/// is held fixed across a fallback chain.
#[derive(Debug, Clone)]
pub struct RecognizeRequest {
    pub lang: String,
    pub engine_mode: u8,
    pub psm: u8,
    pub preserve_interword_spaces: bool,
}

impl RecognizeRequest {
    pub fn from_config(config: &OcrConfig, psm: u8) -> Self {
        Self {
            lang: config.lang.clone(),
            engine_mode: config.engine_mode,
            psm,
            preserve_interword_spaces: config.preserve_interword_spaces,
        }
    }
}

/// Abstraction over an OCR backend. Implementations accept
/// preprocessed image bytes plus per-call settings and return the
/// recognized text. Each call may fail independently.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &[u8], request: &RecognizeRequest) -> Result<String, OcrError>;
}

impl<E: OcrEngine + ?Sized> OcrEngine for Box<E> {
    fn recognize(&self, image: &[u8], request: &RecognizeRequest) -> Result<String, OcrError> {
        (**self).recognize(image, request)
    }
}

/// The winning attempt of a fallback chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackOutcome {
    pub raw_text: String,
    pub psm_used: u8,
    /// `min(score, 100)` of the winning attempt.
    pub confidence: u8,
}

fn re_digit_run() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"\d{2,}").expect("invalid regex"))
}

fn re_amount_shape() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"\$\s*\d").expect("invalid regex"))
}

/// Score one attempt's trimmed raw text: currency marker, digit run,
/// the canonical `$ <number>` shape, plus a capped length bonus.
pub fn score_text(trimmed: &str, weights: &ScoringWeights) -> f32 {
    let mut score = 0.0;
    if trimmed.contains('$') {
        score += weights.currency_marker;
    }
    if re_digit_run().is_match(trimmed) {
        score += weights.digit_run;
    }
    if re_amount_shape().is_match(trimmed) {
        score += weights.amount_shape;
    }
    score + (trimmed.len() as f32 / weights.length_divisor).min(weights.length_cap)
}

/// Run the engine once per strategy in `config.psm_fallback_chain`,
/// in order, keeping the best-scoring attempt and exiting early once a
/// score reaches the threshold. A failing strategy is logged and
/// skipped. Setting `cancel` aborts the remaining chain, returning the
/// best attempt so far. If nothing produced output, the outcome is
/// empty text under the default strategy with confidence 0.
pub fn recognize_with_fallback<E: OcrEngine + ?Sized>(
    engine: &E,
    image: &[u8],
    config: &OcrConfig,
    cancel: &AtomicBool,
) -> FallbackOutcome {
    let mut best_text = String::new();
    let mut best_score = -1.0f32;
    let mut best_psm = config.default_psm;

    for &psm in &config.psm_fallback_chain {
        if cancel.load(Ordering::Relaxed) {
            tracing::info!("OCR cancelled, keeping best attempt so far");
            break;
        }

        let request = RecognizeRequest::from_config(config, psm);
        let text = match engine.recognize(image, &request) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!("PSM {psm} failed: {e}");
                continue;
            }
        };
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }

        let score = score_text(trimmed, &config.scoring);
        tracing::debug!(psm, score, chars = trimmed.len(), "OCR attempt scored");

        if score > best_score {
            best_score = score;
            best_text = trimmed.to_string();
            best_psm = psm;
        }
        if score >= config.scoring.early_exit {
            tracing::debug!(psm, score, "early exit, expected shape found");
            break;
        }
    }

    if best_text.is_empty() {
        tracing::warn!("no readable text detected in image");
        return FallbackOutcome {
            raw_text: String::new(),
            psm_used: config.default_psm,
            confidence: 0,
        };
    }

    FallbackOutcome {
        raw_text: best_text,
        psm_used: best_psm,
        confidence: best_score.clamp(0.0, 100.0) as u8,
    }
}

// ── Engines ──────────────────────────────────────────────────────────────────

/// Placeholder engine for builds without the `tesseract` feature.
/// Every call fails, which the strategist degrades to an empty
/// zero-confidence outcome.
pub struct UnavailableEngine;

impl OcrEngine for UnavailableEngine {
    fn recognize(&self, _image: &[u8], _request: &RecognizeRequest) -> Result<String, OcrError> {
        Err(OcrError::NotAvailable)
    }
}

/// Scripted engine for testing the fallback strategy without
/// Tesseract: responds per PSM and records the call order.
pub struct MockEngine {
    responses: HashMap<u8, Result<String, String>>,
    calls: Mutex<Vec<u8>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self { responses: HashMap::new(), calls: Mutex::new(Vec::new()) }
    }

    pub fn with_text(mut self, psm: u8, text: impl Into<String>) -> Self {
        self.responses.insert(psm, Ok(text.into()));
        self
    }

    pub fn with_failure(mut self, psm: u8, message: impl Into<String>) -> Self {
        self.responses.insert(psm, Err(message.into()));
        self
    }

    /// PSMs in the order they were requested.
    pub fn calls(&self) -> Vec<u8> {
        self.calls.lock().expect("mock poisoned").clone()
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrEngine for MockEngine {
    fn recognize(&self, _image: &[u8], request: &RecognizeRequest) -> Result<String, OcrError> {
        self.calls.lock().expect("mock poisoned").push(request.psm);
        match self.responses.get(&request.psm) {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(message)) => Err(OcrError::Engine(message.clone())),
            None => Ok(String::new()),
        }
    }
}

// ── Tesseract backend (optional, gated behind `tesseract` feature) ────────────

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::{OcrEngine, OcrError, RecognizeRequest};
    use leptess::{LepTess, Variable};

    pub struct TesseractEngine {
        data_path: Option<String>,
    }

    impl TesseractEngine {
        pub fn new(data_path: Option<String>) -> Self {
            Self { data_path }
        }
    }

    impl OcrEngine for TesseractEngine {
        fn recognize(&self, image: &[u8], request: &RecognizeRequest) -> Result<String, OcrError> {
            let mut lt = LepTess::new(self.data_path.as_deref(), &request.lang)
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_variable(Variable::TesseditPagesegMode, &request.psm.to_string())
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_variable(
                Variable::PreserveInterwordSpaces,
                if request.preserve_interword_spaces { "1" } else { "0" },
            )
            .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_image_from_mem(image)
                .map_err(|e| OcrError::ImageDecode(e.to_string()))?;
            lt.get_utf8_text().map_err(|e| OcrError::Engine(e.to_string()))
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> OcrConfig {
        OcrConfig::default()
    }

    fn no_cancel() -> AtomicBool {
        AtomicBool::new(false)
    }

    // Long enough for a meaningful length bonus, shaped like a receipt.
    const GOOD_TEXT: &str = "RAPPI CARD\nSALDO DISPONIBLE\n$717.393,30\nFECHA DE CORTE\n2025-12-30";

    #[test]
    fn score_rewards_expected_shapes() {
        let w = ScoringWeights::default();
        // $ + digits + "$ <number>" + length bonus.
        let s = score_text(GOOD_TEXT, &w);
        assert!(s >= 100.0, "score was {s}");
        // Digits only.
        let s = score_text("12345", &w);
        assert!((30.0..40.0).contains(&s), "score was {s}");
        // Nothing useful.
        assert!(score_text("????", &w) < 1.0);
    }

    #[test]
    fn early_exit_skips_remaining_strategies() {
        let engine = MockEngine::new()
            .with_text(4, "noise")
            .with_text(6, GOOD_TEXT)
            .with_text(3, GOOD_TEXT)
            .with_text(11, GOOD_TEXT);

        let outcome = recognize_with_fallback(&engine, b"img", &config(), &no_cancel());

        assert_eq!(outcome.psm_used, 6);
        // Strategies 3 and 11 must not have been invoked.
        assert_eq!(engine.calls(), vec![4, 6]);
    }

    #[test]
    fn best_attempt_wins_when_no_early_exit() {
        // All below the 70 threshold: scores are digits-only (30+) with
        // varying length bonuses, so the longest digit run wins.
        let engine = MockEngine::new()
            .with_text(4, "77")
            .with_text(6, "12345 67890 12345 67890")
            .with_text(3, "901")
            .with_text(11, "55");

        let outcome = recognize_with_fallback(&engine, b"img", &config(), &no_cancel());

        assert_eq!(outcome.psm_used, 6);
        assert_eq!(outcome.raw_text, "12345 67890 12345 67890");
        assert_eq!(engine.calls(), vec![4, 6, 3, 11]);
    }

    #[test]
    fn engine_errors_are_isolated_per_strategy() {
        let engine = MockEngine::new()
            .with_failure(4, "segfault in layout analysis")
            .with_failure(6, "timeout")
            .with_text(3, GOOD_TEXT);

        let outcome = recognize_with_fallback(&engine, b"img", &config(), &no_cancel());

        assert_eq!(outcome.psm_used, 3);
        assert!(outcome.confidence >= 70);
    }

    #[test]
    fn all_failures_yield_empty_outcome_with_default_psm() {
        let engine = MockEngine::new()
            .with_failure(4, "boom")
            .with_failure(6, "boom")
            .with_failure(3, "boom")
            .with_failure(11, "boom");

        let outcome = recognize_with_fallback(&engine, b"img", &config(), &no_cancel());

        assert_eq!(outcome.raw_text, "");
        assert_eq!(outcome.psm_used, 4);
        assert_eq!(outcome.confidence, 0);
    }

    #[test]
    fn empty_outputs_are_not_kept() {
        let engine = MockEngine::new().with_text(4, "   \n  ");
        let outcome = recognize_with_fallback(&engine, b"img", &config(), &no_cancel());
        assert_eq!(outcome.raw_text, "");
        assert_eq!(outcome.confidence, 0);
    }

    #[test]
    fn confidence_caps_at_hundred() {
        let long = format!("$ {}", "1234567890 ".repeat(300));
        let engine = MockEngine::new().with_text(4, long);
        let outcome = recognize_with_fallback(&engine, b"img", &config(), &no_cancel());
        assert_eq!(outcome.confidence, 100);
    }

    #[test]
    fn cancellation_aborts_remaining_chain() {
        let engine = MockEngine::new().with_text(4, "12345").with_text(6, GOOD_TEXT);
        let cancel = AtomicBool::new(true);

        let outcome = recognize_with_fallback(&engine, b"img", &config(), &cancel);

        // Nothing was attempted.
        assert!(engine.calls().is_empty());
        assert_eq!(outcome.raw_text, "");
        assert_eq!(outcome.confidence, 0);
    }

    #[test]
    fn unavailable_engine_degrades_cleanly() {
        let outcome =
            recognize_with_fallback(&UnavailableEngine, b"img", &config(), &no_cancel());
        assert_eq!(outcome.raw_text, "");
        assert_eq!(outcome.confidence, 0);
    }

    #[test]
    fn chain_override_is_respected() {
        let mut cfg = config();
        cfg.psm_fallback_chain = vec![11, 3];
        let engine = MockEngine::new().with_text(11, "12".repeat(3)).with_text(3, "12");

        recognize_with_fallback(&engine, b"img", &cfg, &no_cancel());
        assert_eq!(engine.calls(), vec![11, 3]);
    }
}
