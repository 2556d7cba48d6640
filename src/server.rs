//! HTTP surface: the axum router, its handlers, and the error → response
//! mapping.

use crate::error::OcrServiceError;
use crate::extract::OcrService;
use crate::output::OcrResponse;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub const SERVICE_NAME: &str = "pdf-ocr-service";

/// Build the service router.
///
/// ```text
/// POST /ocr?url=<document-url>   → {"pages": [...]}
/// GET  /health                   → {"status": "healthy", ...}
/// ```
pub fn router(service: Arc<OcrService>) -> Router {
    Router::new()
        .route("/ocr", post(ocr))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub struct OcrParams {
    pub url: String,
}

async fn ocr(
    State(service): State<Arc<OcrService>>,
    Query(params): Query<OcrParams>,
) -> Result<Json<OcrResponse>, OcrServiceError> {
    service.extract(&params.url).await.map(Json)
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub service: &'static str,
    pub engine: String,
}

async fn health_check(State(service): State<Arc<OcrService>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        service: SERVICE_NAME,
        engine: service.recognizer_name().to_string(),
    })
}

/// Error response body
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: &'static str,
    detail: String,
}

impl IntoResponse for OcrServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::info!("Rejected request: {}", self);
        }

        let body = Json(ErrorResponse {
            error: self.code(),
            detail: self.to_string(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use crate::pipeline::recognize::{share, RawLine, RecognitionError, TextRecognizer};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use std::path::Path;
    use tower::ServiceExt;

    struct Silent;

    impl TextRecognizer for Silent {
        fn name(&self) -> &str {
            "silent"
        }

        fn recognize(&mut self, _image: &Path) -> Result<Vec<RawLine>, RecognitionError> {
            Ok(vec![])
        }
    }

    fn app() -> Router {
        router(Arc::new(OcrService::new(ServiceConfig::default(), share(Silent))))
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_engine_name() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], SERVICE_NAME);
        assert_eq!(body["engine"], "silent");
    }

    #[tokio::test]
    async fn missing_url_is_rejected() {
        let response = app()
            .oneshot(Request::post("/ocr").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn non_http_url_is_a_download_error() {
        let response = app()
            .oneshot(
                Request::post("/ocr?url=ftp%3A%2F%2Fexample.com%2Fa.pdf")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], "download_failed");
        assert!(body["detail"].as_str().unwrap().contains("ftp://example.com/a.pdf"));
    }

    #[tokio::test]
    async fn server_errors_map_to_500() {
        let response = OcrServiceError::RecognitionFailed {
            page: 2,
            detail: "engine exited before replying".into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["error"], "recognition_failed");
        assert!(body["detail"].as_str().unwrap().contains("page 2"));
    }

    #[tokio::test]
    async fn invalid_document_maps_to_400() {
        let response = OcrServiceError::NotAPdf {
            magic: b"<!DO".to_vec(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "invalid_document");
    }
}
