use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use thiserror::Error;

use recibo_core::config::OcrConfig;
use recibo_core::result::ProcessingResult;

use crate::postprocess::PostProcessor;
use crate::preprocess::{self, PreprocessError};
use crate::strategist::{self, OcrEngine};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Image preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),
}

/// The result of one full scan: optimize → multi-PSM OCR → post-process.
#[derive(Debug)]
pub struct ScanResult {
    /// Raw text of the winning OCR attempt.
    pub raw_text: String,
    /// Segmentation strategy that produced it.
    pub psm_used: u8,
    /// The strategist's score for that attempt, capped at 100.
    pub ocr_confidence: u8,
    /// Structured extraction over the raw text.
    pub result: ProcessingResult,
}

/// Sequences the per-request chain. Holds only read-only state, so one
/// instance serves concurrent requests; each request's attempt sequence
/// stays strictly in-order because every attempt's score decides
/// whether the next is needed.
pub struct ReceiptPipeline<E: OcrEngine> {
    engine: E,
    config: Arc<OcrConfig>,
    post: PostProcessor,
}

impl<E: OcrEngine> ReceiptPipeline<E> {
    pub fn new(engine: E, config: Arc<OcrConfig>, post: PostProcessor) -> Self {
        Self { engine, config, post }
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    /// Process raw image bytes end to end. Upstream OCR failures are
    /// absorbed by the strategist (a chain where every strategy fails
    /// still yields a well-formed zero-confidence result); only a
    /// malformed image is an error.
    pub fn process_bytes(
        &self,
        data: &[u8],
        cancel: &AtomicBool,
    ) -> Result<ScanResult, PipelineError> {
        let optimized = preprocess::optimize_for_ocr(data)?;

        let outcome =
            strategist::recognize_with_fallback(&self.engine, &optimized, &self.config, cancel);

        let result = self.post.process_text(&outcome.raw_text);

        Ok(ScanResult {
            raw_text: outcome.raw_text,
            psm_used: outcome.psm_used,
            ocr_confidence: outcome.confidence,
            result,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategist::{MockEngine, UnavailableEngine};
    use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
    use recibo_core::fields::DocumentStatus;
    use recibo_core::result::FormatterTier;
    use std::io::Cursor;

    fn tiny_png() -> Vec<u8> {
        let img: GrayImage = ImageBuffer::from_fn(4, 4, |_, _| Luma([200u8]));
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn pipeline(engine: MockEngine) -> ReceiptPipeline<MockEngine> {
        ReceiptPipeline::new(engine, Arc::new(OcrConfig::default()), PostProcessor::basic())
    }

    #[test]
    fn full_scan_extracts_structured_fields() {
        let engine = MockEngine::new()
            .with_text(4, "AMAZON STORE\n$24.900\nReferencia 991001\nEstado: Pendiente");
        let scan = pipeline(engine).process_bytes(&tiny_png(), &AtomicBool::new(false)).unwrap();

        assert_eq!(scan.psm_used, 4);
        assert!(scan.ocr_confidence >= 70);
        assert_eq!(scan.result.extracted.amounts, vec!["24900"]);
        assert_eq!(scan.result.extracted.merchant.as_deref(), Some("AMAZON STORE"));
        assert_eq!(scan.result.extracted.status, Some(DocumentStatus::Pendiente));
        assert_eq!(scan.result.formatter, FormatterTier::Basic);
    }

    #[test]
    fn unreadable_image_yields_zero_confidence_result() {
        let pipeline = ReceiptPipeline::new(
            UnavailableEngine,
            Arc::new(OcrConfig::default()),
            PostProcessor::basic(),
        );
        let scan = pipeline.process_bytes(&tiny_png(), &AtomicBool::new(false)).unwrap();

        assert_eq!(scan.raw_text, "");
        assert_eq!(scan.ocr_confidence, 0);
        assert_eq!(scan.result.confidence, 0);
        assert!(scan.result.extracted.is_empty());
    }

    #[test]
    fn malformed_image_is_an_error() {
        let engine = MockEngine::new().with_text(4, "irrelevant");
        let err = pipeline(engine).process_bytes(b"not an image", &AtomicBool::new(false));
        assert!(matches!(err, Err(PipelineError::Preprocess(_))));
    }

    #[test]
    fn fallback_engages_when_primary_strategy_fails() {
        let engine = MockEngine::new()
            .with_failure(4, "layout crash")
            .with_text(6, "NU BANK\n$20.000\nStatus: Completado");
        let scan = pipeline(engine).process_bytes(&tiny_png(), &AtomicBool::new(false)).unwrap();

        assert_eq!(scan.psm_used, 6);
        assert_eq!(scan.result.extracted.status, Some(DocumentStatus::Completado));
    }
}
