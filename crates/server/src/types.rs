use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use recibo_core::fields::ExtractedFields;
use recibo_core::result::FormatterTier;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub capabilities: Vec<&'static str>,
}

/// JSON body for `/process` when the image is not a multipart upload.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ProcessRequest {
    /// URL to fetch the image from.
    pub image_url: Option<String>,
    /// Inline image, base64-encoded; a `data:image/...;base64,` prefix
    /// is tolerated.
    pub image_base64: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub id: String,
    pub raw_text: String,
    pub cleaned_text: String,
    pub summary_text: String,
    pub extracted: ExtractedFields,
    pub confidence: u8,
    pub metadata: ProcessMetadata,
}

#[derive(Debug, Serialize)]
pub struct ProcessMetadata {
    pub processing_ms: u64,
    pub formatter: FormatterTier,
    pub ocr_psm: u8,
    pub ocr_confidence: u8,
    pub version: &'static str,
}

/// Structured failure response: the caller always gets JSON with an
/// `error` field, never a bare 500.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into() }
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_GATEWAY, message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, message: message.into() }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_carries_status() {
        assert_eq!(ApiError::bad_request("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::bad_gateway("x").status(), StatusCode::BAD_GATEWAY);
        assert_eq!(ApiError::internal("x").status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn process_request_accepts_partial_json() {
        let req: ProcessRequest = serde_json::from_str(r#"{"image_url":"http://x/y.jpg"}"#).unwrap();
        assert_eq!(req.image_url.as_deref(), Some("http://x/y.jpg"));
        assert!(req.image_base64.is_none());
    }

    #[test]
    fn process_response_serializes_metadata() {
        let r = ProcessResponse {
            id: "abc".into(),
            raw_text: String::new(),
            cleaned_text: String::new(),
            summary_text: String::new(),
            extracted: ExtractedFields::default(),
            confidence: 0,
            metadata: ProcessMetadata {
                processing_ms: 12,
                formatter: FormatterTier::Basic,
                ocr_psm: 4,
                ocr_confidence: 0,
                version: "0.4.0",
            },
        };
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["metadata"]["formatter"], "basic");
        assert_eq!(json["metadata"]["ocr_psm"], 4);
    }
}
