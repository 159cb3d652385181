use serde::{Deserialize, Serialize};

/// Maximum number of candidates retained per field.
pub const MAX_AMOUNTS: usize = 3;
pub const MAX_DATES: usize = 2;
pub const MAX_REFERENCES: usize = 2;

/// Transaction status detected in the document text.
/// Variants carry the Spanish label the documents themselves use.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Pendiente,
    Aprobado,
    Rechazado,
    Completado,
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentStatus::Pendiente => write!(f, "Pendiente"),
            DocumentStatus::Aprobado => write!(f, "Aprobado"),
            DocumentStatus::Rechazado => write!(f, "Rechazado"),
            DocumentStatus::Completado => write!(f, "Completado"),
        }
    }
}

impl std::str::FromStr for DocumentStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pendiente" => Ok(DocumentStatus::Pendiente),
            "aprobado" => Ok(DocumentStatus::Aprobado),
            "rechazado" => Ok(DocumentStatus::Rechazado),
            "completado" => Ok(DocumentStatus::Completado),
            other => Err(format!("Unknown document status: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    TarjetaVirtual,
    TarjetaFisica,
    Transferencia,
    Efectivo,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::TarjetaVirtual => write!(f, "Tarjeta virtual"),
            PaymentMethod::TarjetaFisica => write!(f, "Tarjeta física"),
            PaymentMethod::Transferencia => write!(f, "Transferencia"),
            PaymentMethod::Efectivo => write!(f, "Efectivo"),
        }
    }
}

/// Typed fields pulled from one document's OCR text.
///
/// Amounts are canonical decimal strings (no thousands separators,
/// `.` decimal point), most likely first. Dates are canonical
/// `YYYY-MM-DD HH:MM`. A numeric token classified as an amount never
/// also appears under `references`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtractedFields {
    pub amounts: Vec<String>,
    pub dates: Vec<String>,
    pub references: Vec<String>,
    pub status: Option<DocumentStatus>,
    pub merchant: Option<String>,
    pub payment_method: Option<PaymentMethod>,
}

impl ExtractedFields {
    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty()
            && self.dates.is_empty()
            && self.references.is_empty()
            && self.status.is_none()
            && self.merchant.is_none()
            && self.payment_method.is_none()
    }
}
