use std::sync::atomic::AtomicBool;
use std::time::Instant;

use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::Json;
use base64::prelude::{Engine as _, BASE64_STANDARD};
use uuid::Uuid;

use crate::types::{ApiError, HealthResponse, ProcessMetadata, ProcessRequest, ProcessResponse};
use crate::AppState;

const NO_IMAGE: &str = "No image provided (multipart `image`, `image_url`, or `image_base64` required)";

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "recibo-server",
        version: env!("CARGO_PKG_VERSION"),
        capabilities: vec!["ocr", "image-optimization", "text-extraction", "multi-psm-strategy"],
    })
}

/// `POST /process`: accept an image by multipart upload, URL, or
/// inline base64, run the full scan, and return the structured result.
pub async fn process_document(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<ProcessResponse>, ApiError> {
    let started = Instant::now();
    let image = read_image(request).await?;

    let pipeline = state.pipeline.clone();
    let scan = tokio::task::spawn_blocking(move || {
        // Per-request token; dropping the connection does not currently
        // propagate here, the chain is short enough not to care.
        let cancel = AtomicBool::new(false);
        pipeline.process_bytes(&image, &cancel)
    })
    .await
    .map_err(|e| ApiError::internal(format!("processing task failed: {e}")))?
    .map_err(|e| ApiError::bad_request(format!("unreadable image: {e}")))?;

    let processing_ms = started.elapsed().as_millis() as u64;
    let formatter = scan.result.formatter;
    tracing::info!(
        psm = scan.psm_used,
        ocr_confidence = scan.ocr_confidence,
        confidence = scan.result.confidence,
        %formatter,
        processing_ms,
        "process complete"
    );

    Ok(Json(ProcessResponse {
        id: Uuid::new_v4().to_string(),
        raw_text: scan.raw_text,
        cleaned_text: scan.result.cleaned_text,
        summary_text: scan.result.summary_text,
        extracted: scan.result.extracted,
        confidence: scan.result.confidence,
        metadata: ProcessMetadata {
            processing_ms,
            formatter,
            ocr_psm: scan.psm_used,
            ocr_confidence: scan.ocr_confidence,
            version: env!("CARGO_PKG_VERSION"),
        },
    }))
}

/// Pull image bytes out of whichever source the request used.
async fn read_image(request: Request) -> Result<Vec<u8>, ApiError> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if content_type.starts_with("multipart/form-data") {
        let mut multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {e}")))?;
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {e}")))?
        {
            if field.name() == Some("image") {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("failed to read upload: {e}")))?;
                return Ok(bytes.to_vec());
            }
        }
        return Err(ApiError::bad_request(NO_IMAGE));
    }

    let Json(body): Json<ProcessRequest> = Json::from_request(request, &())
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid JSON body: {e}")))?;
    resolve_source(body).await
}

async fn resolve_source(body: ProcessRequest) -> Result<Vec<u8>, ApiError> {
    if let Some(encoded) = body.image_base64 {
        let encoded = encoded
            .split_once("base64,")
            .map(|(_, rest)| rest.to_string())
            .unwrap_or(encoded);
        return BASE64_STANDARD
            .decode(encoded.trim())
            .map_err(|e| ApiError::bad_request(format!("invalid base64 image: {e}")));
    }

    if let Some(url) = body.image_url {
        let response = reqwest::get(&url)
            .await
            .map_err(|e| ApiError::bad_gateway(format!("failed to fetch image: {e}")))?;
        if !response.status().is_success() {
            return Err(ApiError::bad_gateway(format!(
                "image fetch returned {}",
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::bad_gateway(format!("failed to read fetched image: {e}")))?;
        return Ok(bytes.to_vec());
    }

    Err(ApiError::bad_request(NO_IMAGE))
}
