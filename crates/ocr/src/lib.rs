pub mod clean;
pub mod extract;
pub mod locale;
pub mod pipeline;
pub mod postprocess;
pub mod preprocess;
pub mod score;
pub mod strategist;

pub use clean::clean_text;
pub use extract::Extractor;
pub use pipeline::{PipelineError, ReceiptPipeline, ScanResult};
pub use postprocess::{BasicFormatter, ExampleFormatter, PostProcessor, ReceiptFormatter};
pub use preprocess::{optimize_for_ocr, PreprocessError};
pub use strategist::{
    recognize_with_fallback, score_text, FallbackOutcome, MockEngine, OcrEngine, OcrError,
    RecognizeRequest, UnavailableEngine,
};
