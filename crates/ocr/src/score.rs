//! The two confidence formulas observed in production.
//!
//! They are deliberately not merged: which one runs is decided by the
//! formatter tier, and their outputs differ (the weighted form bottoms
//! out at 0 on empty extractions, the base form floors near 70 minus
//! noise penalties).

use recibo_core::fields::ExtractedFields;

/// Weighted presence score: amounts 35, dates 25, merchant 20,
/// status 15, references 5. Already on the 0–100 scale.
pub fn weighted_presence(extracted: &ExtractedFields) -> u8 {
    let mut score = 0u8;
    if !extracted.amounts.is_empty() {
        score += 35;
    }
    if !extracted.dates.is_empty() {
        score += 25;
    }
    if extracted.merchant.is_some() {
        score += 20;
    }
    if extracted.status.is_some() {
        score += 15;
    }
    if !extracted.references.is_empty() {
        score += 5;
    }
    score
}

/// Base-70 variant: +10 amounts, +10 dates, +10 merchant, +5 when the
/// text has 5+ non-empty lines, minus `min(0.5 × noise, 15)` where
/// noise counts characters outside the set a printed receipt uses.
/// Clamped to 0–100.
pub fn base_with_penalties(cleaned: &str, extracted: &ExtractedFields) -> u8 {
    let mut score = 70.0f32;
    if !extracted.amounts.is_empty() {
        score += 10.0;
    }
    if !extracted.dates.is_empty() {
        score += 10.0;
    }
    if extracted.merchant.is_some() {
        score += 10.0;
    }
    if cleaned.lines().filter(|l| !l.trim().is_empty()).count() >= 5 {
        score += 5.0;
    }
    score -= (0.5 * non_standard_count(cleaned) as f32).min(15.0);
    score.clamp(0.0, 100.0).round() as u8
}

/// Characters a printed financial document legitimately contains.
/// Everything else is treated as OCR noise.
fn non_standard_count(text: &str) -> usize {
    const PUNCT: &str = "$.,:;-_/()#%&+='\"¡!¿?*@°º";
    text.chars()
        .filter(|c| !(c.is_alphanumeric() || c.is_whitespace() || PUNCT.contains(*c)))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use recibo_core::fields::DocumentStatus;

    fn full_fields() -> ExtractedFields {
        ExtractedFields {
            amounts: vec!["24900".into()],
            dates: vec!["2026-01-29 11:24".into()],
            references: vec!["991001".into()],
            status: Some(DocumentStatus::Pendiente),
            merchant: Some("AMAZON STORE".into()),
            payment_method: None,
        }
    }

    #[test]
    fn weighted_all_fields_sum_to_hundred() {
        assert_eq!(weighted_presence(&full_fields()), 100);
    }

    #[test]
    fn weighted_empty_is_zero() {
        assert_eq!(weighted_presence(&ExtractedFields::default()), 0);
    }

    #[test]
    fn weighted_partial_sums() {
        let f = ExtractedFields {
            amounts: vec!["24900".into()],
            merchant: Some("AMAZON".into()),
            ..Default::default()
        };
        assert_eq!(weighted_presence(&f), 55);
    }

    #[test]
    fn base_starts_at_seventy() {
        assert_eq!(base_with_penalties("", &ExtractedFields::default()), 70);
    }

    #[test]
    fn base_bonuses_accumulate() {
        let text = "AMAZON\n$24.900\n2026-01-29 11:24\nReferencia 991001\nEstado: Pendiente";
        // amounts +10, dates +10, merchant +10, 5 lines +5, no noise.
        assert_eq!(base_with_penalties(text, &full_fields()), 100);
    }

    #[test]
    fn base_noise_penalty_capped_at_fifteen() {
        let noisy = "~".repeat(200);
        assert_eq!(base_with_penalties(&noisy, &ExtractedFields::default()), 55);
    }

    #[test]
    fn base_accented_spanish_is_not_noise() {
        let text = "Transacción aprobada — año 2026";
        // Only the em dash counts; the penalty rounds away.
        assert!(base_with_penalties(text, &ExtractedFields::default()) >= 69);
    }
}
