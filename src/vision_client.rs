// src/vision_client.rs
use async_trait::async_trait;
use base64::prelude::*;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::services::analysis::DishRecognizer;

pub const UNKNOWN_DISH: &str = "Unknown";
const WEB_DETECTION_MAX_RESULTS: u32 = 3;

#[derive(Error, Debug)]
pub enum RecognitionError {
    #[error("Vision API call failed: {0}")]
    ServiceUnavailable(String),
    #[error("Vision API response malformed: {0}")]
    Malformed(String),
    #[error("No web entity with a description")]
    NoEntity,
}

impl From<reqwest::Error> for RecognitionError {
    fn from(err: reqwest::Error) -> Self {
        RecognitionError::ServiceUnavailable(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct VisionClient {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct AnnotateRequest {
    requests: Vec<AnnotateImageRequest>,
}

#[derive(Debug, Serialize)]
struct AnnotateImageRequest {
    image: ImageContent,
    features: Vec<Feature>,
}

#[derive(Debug, Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Feature {
    #[serde(rename = "type")]
    feature_type: String,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    responses: Option<Vec<AnnotateImageResponse>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    web_detection: Option<WebDetection>,
    error: Option<ApiStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebDetection {
    web_entities: Option<Vec<WebEntity>>,
}

#[derive(Debug, Deserialize)]
struct WebEntity {
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    message: String,
}

impl VisionClient {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Run web detection on the image and return the first entity description.
    pub async fn recognize(&self, image: &[u8]) -> Result<String, RecognitionError> {
        let request = AnnotateRequest {
            requests: vec![AnnotateImageRequest {
                image: ImageContent {
                    content: BASE64_STANDARD.encode(image),
                },
                features: vec![Feature {
                    feature_type: "WEB_DETECTION".to_string(),
                    max_results: WEB_DETECTION_MAX_RESULTS,
                }],
            }],
        };

        info!("🔍 Sending {} byte image to Vision web detection", image.len());

        let response = self
            .client
            .post(format!("{}/v1/images:annotate", self.base_url))
            .query(&[("key", &self.api_key)])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(RecognitionError::ServiceUnavailable(format!(
                "status {}: {}",
                status, body
            )));
        }

        best_guess_label(&body)
    }
}

/// Pull the first described web entity out of a raw annotate response body.
fn best_guess_label(body: &str) -> Result<String, RecognitionError> {
    let parsed: AnnotateResponse =
        serde_json::from_str(body).map_err(|e| RecognitionError::Malformed(e.to_string()))?;

    let first = parsed
        .responses
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| RecognitionError::Malformed("missing responses[0]".to_string()))?;

    if let Some(err) = first.error {
        return Err(RecognitionError::ServiceUnavailable(err.message));
    }

    let entities = first
        .web_detection
        .ok_or_else(|| RecognitionError::Malformed("missing webDetection".to_string()))?
        .web_entities
        .ok_or_else(|| RecognitionError::Malformed("missing webEntities".to_string()))?;

    entities
        .into_iter()
        .find_map(|e| e.description)
        .ok_or(RecognitionError::NoEntity)
}

#[async_trait]
impl DishRecognizer for VisionClient {
    async fn recognize_or_unknown(&self, image: &[u8]) -> String {
        match self.recognize(image).await {
            Ok(label) => {
                info!("✅ Recognized dish: '{}'", label);
                label
            }
            Err(e) => {
                warn!("Dish recognition fell back to '{}': {}", UNKNOWN_DISH, e);
                UNKNOWN_DISH.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    async fn spawn_vision_mock(status: StatusCode, body: Value) -> String {
        let app = Router::new().route(
            "/v1/images:annotate",
            post(move |Query(params): Query<HashMap<String, String>>, Json(req): Json<Value>| {
                let body = body.clone();
                async move {
                    assert_eq!(params.get("key").map(String::as_str), Some("test-key"));
                    assert_eq!(req["requests"][0]["features"][0]["type"], "WEB_DETECTION");
                    assert_eq!(req["requests"][0]["features"][0]["maxResults"], 3);
                    assert_eq!(req["requests"][0]["image"]["content"], "aW1hZ2U=");
                    (status, Json(body))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_recognize_returns_first_description() {
        let base = spawn_vision_mock(
            StatusCode::OK,
            json!({
                "responses": [{
                    "webDetection": {
                        "webEntities": [
                            {"entityId": "/m/0h3d7qb", "score": 1.2, "description": "Margherita Pizza"},
                            {"entityId": "/m/0663v", "score": 0.9, "description": "Pizza"}
                        ]
                    }
                }]
            }),
        )
        .await;

        let client = VisionClient::new("test-key".to_string(), base);
        assert_eq!(client.recognize(b"image").await.unwrap(), "Margherita Pizza");
        assert_eq!(client.recognize_or_unknown(b"image").await, "Margherita Pizza");
    }

    #[tokio::test]
    async fn test_error_status_falls_back_to_unknown() {
        let base = spawn_vision_mock(
            StatusCode::FORBIDDEN,
            json!({"error": {"code": 403, "message": "API key not valid"}}),
        )
        .await;

        let client = VisionClient::new("test-key".to_string(), base);
        assert!(matches!(
            client.recognize(b"image").await,
            Err(RecognitionError::ServiceUnavailable(_))
        ));
        assert_eq!(client.recognize_or_unknown(b"image").await, UNKNOWN_DISH);
    }

    #[tokio::test]
    async fn test_unreachable_service_falls_back_to_unknown() {
        let client = VisionClient::new("test-key".to_string(), "http://127.0.0.1:1".to_string());
        assert_eq!(client.recognize_or_unknown(b"image").await, UNKNOWN_DISH);
    }

    #[test]
    fn test_skips_entities_without_description() {
        let body = json!({
            "responses": [{
                "webDetection": {
                    "webEntities": [
                        {"entityId": "/g/11b6"},
                        {"entityId": "/m/0hz4q", "description": "Pad thai"}
                    ]
                }
            }]
        })
        .to_string();

        assert_eq!(best_guess_label(&body).unwrap(), "Pad thai");
    }

    #[test]
    fn test_failure_kinds_are_distinguished() {
        assert!(matches!(
            best_guess_label("not json"),
            Err(RecognitionError::Malformed(_))
        ));
        assert!(matches!(
            best_guess_label(r#"{"responses": []}"#),
            Err(RecognitionError::Malformed(_))
        ));
        assert!(matches!(
            best_guess_label(r#"{"responses": [{}]}"#),
            Err(RecognitionError::Malformed(_))
        ));
        assert!(matches!(
            best_guess_label(r#"{"responses": [{"webDetection": {"webEntities": [{"score": 0.4}]}}]}"#),
            Err(RecognitionError::NoEntity)
        ));
        assert!(matches!(
            best_guess_label(r#"{"responses": [{"error": {"code": 3, "message": "Bad image data."}}]}"#),
            Err(RecognitionError::ServiceUnavailable(_))
        ));
    }
}
