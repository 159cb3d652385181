use std::collections::HashSet;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use recibo_core::fields::{
    DocumentStatus, ExtractedFields, PaymentMethod, MAX_AMOUNTS, MAX_DATES, MAX_REFERENCES,
};

use crate::locale;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_amount, r"\$\s*(\d+(?:[.,]\d{3})*(?:[.,]\d{1,2})?)");

// Both recognized date shapes in one pass: "12 Jan 2026 11:24" and
// "2026-01-12 11:24". English and Spanish month abbreviations.
re!(re_date,
    r"(?i)\b(?:\d{1,2}\s+(?:jan|ene|feb|mar|apr|abr|may|jun|jul|aug|ago|sep|oct|nov|dec|dic)\.?\s+\d{4}|\d{4}-\d{1,2}-\d{1,2})\s+\d{1,2}:\d{2}\b");

re!(re_reference, r"(?i)\b(?:referencia|reference|ref)\b[\s:.,#-]*(\d{4,8})\b");
re!(re_standalone_six, r"\b(\d{6})\b");

/// Status keyword table. Order is the tie-break: the first table entry
/// whose keyword appears anywhere in the text wins.
const STATUS_TABLE: &[(&[&str], DocumentStatus)] = &[
    (&["pendiente", "pending"], DocumentStatus::Pendiente),
    (&["aprobado", "approved"], DocumentStatus::Aprobado),
    (&["rechazado", "rejected"], DocumentStatus::Rechazado),
    (&["completado", "completed"], DocumentStatus::Completado),
];

const PAYMENT_TABLE: &[(&str, PaymentMethod)] = &[
    ("tarjeta virtual", PaymentMethod::TarjetaVirtual),
    ("virtual card", PaymentMethod::TarjetaVirtual),
    ("tarjeta física", PaymentMethod::TarjetaFisica),
    ("tarjeta fisica", PaymentMethod::TarjetaFisica),
    ("physical card", PaymentMethod::TarjetaFisica),
    ("transferencia", PaymentMethod::Transferencia),
    ("transfer", PaymentMethod::Transferencia),
    ("efectivo", PaymentMethod::Efectivo),
    ("cash", PaymentMethod::Efectivo),
];

/// Keywords that mark a line as a status row rather than a merchant name.
const STATUS_ISH: &[&str] = &[
    "pendiente",
    "aprobado",
    "rechazado",
    "completado",
    "pending",
    "approved",
    "rejected",
    "completed",
];

// ── Public extraction API ─────────────────────────────────────────────────────

/// Pattern-driven field detectors. Each takes text in and produces
/// typed candidates out. No state, no cross-field coupling beyond the
/// amounts/references disjointness rule.
pub struct Extractor;

impl Extractor {
    /// Run every detector against the cleaned text (dates read the raw
    /// text, where line-break noise carries no information).
    pub fn extract(cleaned: &str, raw: &str) -> ExtractedFields {
        let amounts = Self::amounts(cleaned);
        let dates = Self::dates(raw);
        let references = Self::references(cleaned, &amounts);
        let status = Self::status(cleaned);
        let merchant = Self::merchant(cleaned);
        let payment_method = Self::payment_method(cleaned);

        ExtractedFields { amounts, dates, references, status, merchant, payment_method }
    }

    /// All `$`-prefixed numeric substrings, line by line, normalized and
    /// deduplicated by rounded integer value. Insertion order, cap 3.
    pub fn amounts(cleaned: &str) -> Vec<String> {
        let mut seen: HashSet<i64> = HashSet::new();
        let mut amounts = Vec::new();

        for line in cleaned.lines() {
            for caps in re_amount().captures_iter(line) {
                let Some(m) = caps.get(1) else { continue };
                let Some(normalized) = locale::parse_amount(m.as_str()) else { continue };
                let Some(key) = rounded_key(&normalized) else { continue };
                if seen.insert(key) {
                    amounts.push(normalized);
                    if amounts.len() == MAX_AMOUNTS {
                        return amounts;
                    }
                }
            }
        }
        amounts
    }

    /// Date candidates from the raw text, normalized to
    /// `YYYY-MM-DD HH:MM`. Cap 2.
    pub fn dates(raw: &str) -> Vec<String> {
        let mut dates = Vec::new();
        for m in re_date().find_iter(raw) {
            let normalized = locale::normalize_datetime(m.as_str());
            if !dates.contains(&normalized) {
                dates.push(normalized);
                if dates.len() == MAX_DATES {
                    break;
                }
            }
        }
        dates
    }

    /// Reference identifiers. Primary: a reference keyword followed by a
    /// 4–8 digit number. Fallback (only when the primary finds nothing):
    /// standalone 6-digit numbers that are neither amounts nor year-range
    /// prefixes. Cap 2. A token already classified as an amount is never
    /// listed as a reference.
    pub fn references(cleaned: &str, amounts: &[String]) -> Vec<String> {
        let amount_ints: HashSet<&str> =
            amounts.iter().map(|a| a.split('.').next().unwrap_or(a)).collect();

        let mut references = Vec::new();
        for caps in re_reference().captures_iter(cleaned) {
            let Some(m) = caps.get(1) else { continue };
            let value = m.as_str();
            if amount_ints.contains(value) || is_year_like(value) {
                continue;
            }
            if !references.iter().any(|r| r == value) {
                references.push(value.to_string());
                if references.len() == MAX_REFERENCES {
                    return references;
                }
            }
        }
        if !references.is_empty() {
            return references;
        }

        for caps in re_standalone_six().captures_iter(cleaned) {
            let Some(m) = caps.get(1) else { continue };
            let value = m.as_str();
            // 202xxx is a year prefix (202601 and friends), not a reference.
            if amount_ints.contains(value) || value == "202601" || value.starts_with("202") {
                continue;
            }
            if !references.iter().any(|r| r == value) {
                references.push(value.to_string());
                if references.len() == MAX_REFERENCES {
                    break;
                }
            }
        }
        references
    }

    /// First plausible merchant line among the first 10 non-empty lines.
    pub fn merchant(cleaned: &str) -> Option<String> {
        for line in cleaned
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .take(10)
        {
            // Pure currency/number/punctuation rows carry no name.
            if !line.chars().any(char::is_alphabetic) {
                continue;
            }
            let chars = line.chars().count();
            if chars < 5 {
                continue;
            }
            let lower = line.to_lowercase();
            if lower == "listo" || lower == "ready" {
                continue;
            }
            if chars < 20 && STATUS_ISH.iter().any(|kw| lower.contains(kw)) {
                continue;
            }

            let has_upper = line.chars().any(char::is_uppercase);
            let has_lower = line.chars().any(char::is_lowercase);
            if (has_upper && has_lower) || chars > 10 {
                return Some(line.to_string());
            }
        }
        None
    }

    pub fn status(cleaned: &str) -> Option<DocumentStatus> {
        let lower = cleaned.to_lowercase();
        for (keywords, status) in STATUS_TABLE {
            if keywords.iter().any(|kw| lower.contains(kw)) {
                return Some(*status);
            }
        }
        None
    }

    pub fn payment_method(cleaned: &str) -> Option<PaymentMethod> {
        let lower = cleaned.to_lowercase();
        for (keyword, method) in PAYMENT_TABLE {
            if lower.contains(keyword) {
                return Some(*method);
            }
        }
        None
    }
}

/// Dedup key: the amount rounded to the nearest integer.
fn rounded_key(normalized: &str) -> Option<i64> {
    Decimal::from_str(normalized).ok()?.round().to_i64()
}

fn is_year_like(s: &str) -> bool {
    matches!(s.parse::<u32>(), Ok(y) if (2020..=2030).contains(&y))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
