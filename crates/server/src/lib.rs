//! HTTP surface for the receipt OCR pipeline: `/health` plus
//! `/process`, which accepts an image by upload, URL, or inline base64
//! and returns the structured extraction as JSON.

mod handlers;
mod types;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use recibo_core::config::OcrConfig;
use recibo_ocr::{OcrEngine, PostProcessor, ReceiptPipeline};

pub use handlers::{health_check, process_document};
pub use types::*;

/// Matches the original service's 20 MB upload ceiling.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Shared across handlers. The pipeline holds only read-only state, so
/// concurrent requests need no locking.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ReceiptPipeline<Box<dyn OcrEngine>>>,
}

impl AppState {
    pub fn new(config: OcrConfig) -> Self {
        let pipeline =
            ReceiptPipeline::new(build_engine(), Arc::new(config), PostProcessor::basic());
        Self { pipeline: Arc::new(pipeline) }
    }
}

#[cfg(feature = "tesseract")]
fn build_engine() -> Box<dyn OcrEngine> {
    Box::new(recibo_ocr::strategist::tesseract_backend::TesseractEngine::new(
        std::env::var("TESSDATA_PREFIX").ok(),
    ))
}

#[cfg(not(feature = "tesseract"))]
fn build_engine() -> Box<dyn OcrEngine> {
    tracing::warn!("built without the `tesseract` feature; OCR requests will report no text");
    Box::new(recibo_ocr::UnavailableEngine)
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/process", post(process_document))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app() -> Router {
        build_router(AppState::new(OcrConfig::default()))
    }

    #[tokio::test]
    async fn health_route_responds_ok() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["service"], "recibo-server");
    }

    #[tokio::test]
    async fn process_without_image_is_structured_400() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/process")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(err.error.contains("No image provided"));
    }

    #[tokio::test]
    async fn process_rejects_malformed_image_bytes() {
        let body = serde_json::json!({ "image_base64": "bm90IGFuIGltYWdl" });
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/process")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(err.error.contains("unreadable image"));
    }
}
