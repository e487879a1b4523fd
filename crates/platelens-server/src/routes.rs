//! HTTP routes and handlers

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use serde::Serialize;
use serde_json::json;
use std::time::Instant;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{debug, error, info};

use crate::state::AppState;

/// Content types accepted for uploads, matched exactly against the
/// part's declared type
const ACCEPTED_CONTENT_TYPES: [&str; 2] = ["image/jpeg", "image/png"];

pub fn create_router(state: AppState) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/predict-ingredients", post(predict_ingredients))
        .fallback(fallback)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn metrics(State(state): State<AppState>) -> String {
    state.metrics_handle.render()
}

async fn fallback() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not found")
}

/// Successful prediction payload
#[derive(Debug, Serialize)]
struct PredictionResponse {
    ingredients: Vec<&'static str>,
}

/// Main prediction handler
///
/// Walks the multipart form for the `file` part, gates on its declared
/// content type before touching the payload, then decodes and classifies
/// off the async runtime.
async fn predict_ingredients(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PredictionResponse>, ApiError> {
    metrics::counter!("platelens_requests_total").increment(1);
    let start = Instant::now();

    let bytes = extract_file_field(&mut multipart).await?;
    debug!("Received upload of {} bytes", bytes.len());

    let detector = state.detector.clone();
    let joined = tokio::task::spawn_blocking(move || -> Result<Vec<&'static str>, ApiError> {
        let image = image::load_from_memory(&bytes).map_err(|e| {
            debug!("Upload failed to decode: {}", e);
            ApiError::InvalidImage
        })?;

        Ok(detector.detect(&image)?)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Inference task failed: {}", e)))?;
    let ingredients = joined?;

    let elapsed = start.elapsed();
    metrics::histogram!("platelens_predict_latency_us").record(elapsed.as_micros() as f64);
    metrics::histogram!("platelens_detected_ingredients").record(ingredients.len() as f64);
    info!(
        "Detected {} ingredients in {}ms",
        ingredients.len(),
        elapsed.as_millis()
    );

    Ok(Json(PredictionResponse { ingredients }))
}

/// Pull the `file` part out of the form, rejecting unsupported content
/// types before the part body is read
async fn extract_file_field(multipart: &mut Multipart) -> Result<Bytes, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidRequest(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        let accepted = content_type
            .as_deref()
            .is_some_and(|ct| ACCEPTED_CONTENT_TYPES.contains(&ct));
        if !accepted {
            debug!("Rejected upload with content type {:?}", content_type);
            return Err(ApiError::InvalidMediaType);
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to read upload: {}", e)))?;
        return Ok(bytes);
    }

    Err(ApiError::MissingFile)
}

/// Error handling
#[derive(Debug)]
enum ApiError {
    InvalidMediaType,
    InvalidImage,
    MissingFile,
    InvalidRequest(String),
    Internal(String),
}

impl From<platelens_core::Error> for ApiError {
    fn from(err: platelens_core::Error) -> Self {
        error!("Inference failed: {}", err);
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, detail) = match self {
            ApiError::InvalidMediaType => (
                StatusCode::BAD_REQUEST,
                "media_type",
                "Invalid image type. Upload JPEG or PNG.".to_string(),
            ),
            ApiError::InvalidImage => (
                StatusCode::BAD_REQUEST,
                "invalid_image",
                "Invalid image file.".to_string(),
            ),
            ApiError::MissingFile => (
                StatusCode::BAD_REQUEST,
                "missing_file",
                "No file field in multipart form.".to_string(),
            ),
            ApiError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg),
        };

        metrics::counter!("platelens_errors_total", "kind" => kind).increment(1);

        let body = json!({ "detail": detail });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use image::{DynamicImage, Rgb, RgbImage};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use serde_json::Value;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tower::ServiceExt;

    const BOUNDARY: &str = "platelens-test-boundary";

    /// Detector stub with a fixed answer and a call counter
    struct StubDetector {
        labels: Vec<&'static str>,
        fail: bool,
        calls: Arc<AtomicU32>,
    }

    impl StubDetector {
        fn returning(labels: Vec<&'static str>) -> (Arc<Self>, Arc<AtomicU32>) {
            let calls = Arc::new(AtomicU32::new(0));
            let stub = Arc::new(Self {
                labels,
                fail: false,
                calls: calls.clone(),
            });
            (stub, calls)
        }

        fn failing() -> (Arc<Self>, Arc<AtomicU32>) {
            let calls = Arc::new(AtomicU32::new(0));
            let stub = Arc::new(Self {
                labels: Vec::new(),
                fail: true,
                calls: calls.clone(),
            });
            (stub, calls)
        }
    }

    impl platelens_vision::IngredientDetector for StubDetector {
        fn detect(&self, _image: &DynamicImage) -> platelens_core::Result<Vec<&'static str>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(platelens_core::Error::model("stub failure"));
            }
            Ok(self.labels.clone())
        }
    }

    fn test_router(detector: Arc<StubDetector>) -> Router {
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let state = AppState::with_detector(ServerConfig::default(), detector, handle);
        create_router(state)
    }

    fn png_bytes() -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([200, 120, 40])));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn multipart_body(field_name: &str, content_type: &str, payload: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"plate.png\"\r\n",
                field_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        body.extend_from_slice(payload);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn predict_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/predict-ingredients")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn response_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_predict_returns_detected_ingredients() {
        let (stub, calls) = StubDetector::returning(vec!["matooke", "beans"]);
        let app = test_router(stub);

        let body = multipart_body("file", "image/png", &png_bytes());
        let response = app.oneshot(predict_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["ingredients"], json!(["matooke", "beans"]));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_predict_accepts_jpeg_content_type() {
        let (stub, _) = StubDetector::returning(vec!["rice"]);
        let app = test_router(stub);

        // The gate checks the declared part type; decode sniffs the bytes.
        let body = multipart_body("file", "image/jpeg", &png_bytes());
        let response = app.oneshot(predict_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_predict_with_no_hits_returns_empty_array() {
        let (stub, _) = StubDetector::returning(Vec::new());
        let app = test_router(stub);

        let body = multipart_body("file", "image/png", &png_bytes());
        let response = app.oneshot(predict_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["ingredients"], json!([]));
    }

    #[tokio::test]
    async fn test_predict_rejects_unsupported_media_type() {
        let (stub, calls) = StubDetector::returning(vec!["rice"]);
        let app = test_router(stub);

        let body = multipart_body("file", "image/gif", &png_bytes());
        let response = app.oneshot(predict_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(json["detail"], "Invalid image type. Upload JPEG or PNG.");
        assert_eq!(calls.load(Ordering::SeqCst), 0, "no inference on rejection");
    }

    #[tokio::test]
    async fn test_predict_rejects_undecodable_payload() {
        let (stub, calls) = StubDetector::returning(vec!["rice"]);
        let app = test_router(stub);

        let body = multipart_body("file", "image/png", b"definitely not a png");
        let response = app.oneshot(predict_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(json["detail"], "Invalid image file.");
        assert_eq!(calls.load(Ordering::SeqCst), 0, "no inference on bad bytes");
    }

    #[tokio::test]
    async fn test_predict_requires_file_field() {
        let (stub, calls) = StubDetector::returning(vec!["rice"]);
        let app = test_router(stub);

        let body = multipart_body("photo", "image/png", &png_bytes());
        let response = app.oneshot(predict_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(json["detail"], "No file field in multipart form.");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_predict_surfaces_inference_failures() {
        let (stub, calls) = StubDetector::failing();
        let app = test_router(stub);

        let body = multipart_body("file", "image/png", &png_bytes());
        let response = app.oneshot(predict_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = response_json(response).await;
        assert_eq!(json["detail"], "model error: stub failure");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_health_check() {
        let (stub, _) = StubDetector::returning(Vec::new());
        let app = test_router(stub);

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"OK");
    }

    #[tokio::test]
    async fn test_metrics_endpoint_renders() {
        let (stub, _) = StubDetector::returning(Vec::new());
        let app = test_router(stub);

        let request = Request::builder()
            .uri("/metrics")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let (stub, _) = StubDetector::returning(Vec::new());
        let app = test_router(stub);

        let request = Request::builder()
            .uri("/predict")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
