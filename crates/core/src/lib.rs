pub mod config;
pub mod fields;
pub mod result;

pub use config::{ConfigError, OcrConfig, ScoringWeights};
pub use fields::{DocumentStatus, ExtractedFields, PaymentMethod};
pub use result::{FormatterTier, ProcessingResult};
