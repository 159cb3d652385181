//! Post-processing orchestration: Clean → Extract → Summarize.
//!
//! Which extraction/formatting implementation runs is a static choice
//! made once at startup: a caller-supplied personal formatter wins
//! over the bundled example template, which wins over the built-in
//! basic suite. The resolved tier travels on every result as metadata
//! so unexpected output can be traced to the implementation that
//! produced it.

use std::sync::OnceLock;

use regex::Regex;

use recibo_core::fields::{DocumentStatus, ExtractedFields, MAX_REFERENCES};
use recibo_core::result::{FormatterTier, ProcessingResult};

use crate::clean::clean_text;
use crate::extract::Extractor;
use crate::locale;
use crate::score;

/// One extraction/formatting implementation. Narrow by design: text
/// in, typed candidates out, so patterns and tables can be swapped
/// without touching the orchestration.
pub trait ReceiptFormatter: Send + Sync {
    fn extract(&self, cleaned: &str, raw: &str) -> ExtractedFields;
    fn confidence(&self, cleaned: &str, extracted: &ExtractedFields) -> u8;
    fn summarize(&self, extracted: &ExtractedFields) -> String;
}

// ── Built-in basic formatter ─────────────────────────────────────────────────

/// The full built-in extractor suite with the weighted-presence
/// confidence formula.
pub struct BasicFormatter;

impl ReceiptFormatter for BasicFormatter {
    fn extract(&self, cleaned: &str, raw: &str) -> ExtractedFields {
        Extractor::extract(cleaned, raw)
    }

    fn confidence(&self, _cleaned: &str, extracted: &ExtractedFields) -> u8 {
        score::weighted_presence(extracted)
    }

    /// Line 1: merchant, first amount in display form, status.
    /// Line 2: first date, payment method, first reference.
    fn summarize(&self, extracted: &ExtractedFields) -> String {
        let mut first = Vec::new();
        if let Some(merchant) = &extracted.merchant {
            first.push(merchant.clone());
        }
        if let Some(amount) = extracted.amounts.first() {
            first.push(format!("${}", locale::format_display(amount)));
        }
        if let Some(status) = &extracted.status {
            first.push(status.to_string());
        }

        let mut second = Vec::new();
        if let Some(date) = extracted.dates.first() {
            second.push(locale::format_date_spanish(date));
        }
        if let Some(method) = &extracted.payment_method {
            second.push(method.to_string());
        }
        if let Some(reference) = extracted.references.first() {
            second.push(format!("Ref. {reference}"));
        }

        [first, second]
            .iter()
            .filter(|parts| !parts.is_empty())
            .map(|parts| parts.join(" · "))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ── Bundled example formatter ────────────────────────────────────────────────

fn re_masked_card() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"\*{4}\s?(\d{4})\b").expect("invalid regex"))
}

/// Known subscription merchants the example template recognizes.
const EXAMPLE_MERCHANTS: &[&str] = &["amazon", "spotify", "netflix", "github", "slack"];

/// The bundled template tier: a deliberately small ruleset meant as a
/// starting point for a personal formatter. Amounts via the shared
/// parser, references from masked card numbers, merchant from a fixed
/// list, English-only status keywords.
pub struct ExampleFormatter;

impl ReceiptFormatter for ExampleFormatter {
    fn extract(&self, cleaned: &str, _raw: &str) -> ExtractedFields {
        let amounts = Extractor::amounts(cleaned);

        let mut references = Vec::new();
        for caps in re_masked_card().captures_iter(cleaned) {
            if let Some(m) = caps.get(1) {
                references.push(m.as_str().to_string());
                if references.len() == MAX_REFERENCES {
                    break;
                }
            }
        }

        let lower = cleaned.to_lowercase();
        let status = if ["completed", "done", "finished"].iter().any(|k| lower.contains(k)) {
            Some(DocumentStatus::Completado)
        } else if ["pending", "waiting"].iter().any(|k| lower.contains(k)) {
            Some(DocumentStatus::Pendiente)
        } else if ["failed", "rejected", "error"].iter().any(|k| lower.contains(k)) {
            Some(DocumentStatus::Rechazado)
        } else {
            None
        };

        let merchant = EXAMPLE_MERCHANTS
            .iter()
            .find(|m| lower.contains(*m))
            .map(|m| m.to_string());

        ExtractedFields {
            amounts,
            dates: Vec::new(),
            references,
            status,
            merchant,
            payment_method: None,
        }
    }

    fn confidence(&self, _cleaned: &str, extracted: &ExtractedFields) -> u8 {
        score::weighted_presence(extracted)
    }

    fn summarize(&self, extracted: &ExtractedFields) -> String {
        let mut lines = Vec::new();
        lines.push(format!(
            "Item: {}",
            extracted.merchant.as_deref().unwrap_or("Unknown")
        ));
        if let Some(amount) = extracted.amounts.first() {
            lines.push(format!("Amount: ${amount}"));
        }
        if let Some(status) = &extracted.status {
            lines.push(format!("Status: {status}"));
        }
        lines.join("\n")
    }
}

// ── Orchestrator ─────────────────────────────────────────────────────────────

/// The single post-processing entry point the service layer calls.
pub struct PostProcessor {
    formatter: Box<dyn ReceiptFormatter>,
    tier: FormatterTier,
}

impl PostProcessor {
    /// Ranked resolution, evaluated once per process lifetime:
    /// personal > example > basic. First available wins.
    pub fn resolve(
        personal: Option<Box<dyn ReceiptFormatter>>,
        example: Option<Box<dyn ReceiptFormatter>>,
    ) -> Self {
        match (personal, example) {
            (Some(formatter), _) => Self { formatter, tier: FormatterTier::Personal },
            (None, Some(formatter)) => Self { formatter, tier: FormatterTier::Example },
            (None, None) => {
                Self { formatter: Box::new(BasicFormatter), tier: FormatterTier::Basic }
            }
        }
    }

    pub fn basic() -> Self {
        Self::resolve(None, None)
    }

    /// Which tier won the resolution.
    pub fn tier(&self) -> FormatterTier {
        self.tier
    }

    /// Clean → Extract → Summarize. Pure: identical input yields an
    /// identical result under a fixed configuration.
    pub fn process_text(&self, raw: &str) -> ProcessingResult {
        let cleaned = clean_text(raw);
        let extracted = self.formatter.extract(&cleaned, raw);
        let confidence = self.formatter.confidence(&cleaned, &extracted);
        let summary_text = self.formatter.summarize(&extracted);

        ProcessingResult {
            cleaned_text: cleaned,
            extracted,
            summary_text,
            confidence,
            formatter: self.tier,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
