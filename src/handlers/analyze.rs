// src/handlers/analyze.rs
use axum::{
    extract::{multipart::Multipart, DefaultBodyLimit, Extension, FromRequest, Request},
    http::{header, HeaderMap},
    response::Json,
    routing::post,
    Form, Router,
};
use std::sync::Arc;

use crate::error::{AppError, DISH_NOT_FOUND_MESSAGE};
use crate::models::analysis::{AnalyzeForm, AnalyzeResponse};
use crate::AppState;

const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024; // 10MB

pub fn analyze_routes() -> Router {
    Router::new()
        .route("/analyze", post(analyze))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE))
}

/// Fields collected from either a multipart upload or an url-encoded form.
#[derive(Debug, Default)]
struct AnalyzeInput {
    image: Option<Vec<u8>>,
    dish_name: Option<String>,
}

pub async fn analyze(
    Extension(state): Extension<Arc<AppState>>,
    request: Request,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let headers = request.headers().clone();
    let input = read_input(request).await?;

    tracing::debug!(
        has_image = input.image.is_some(),
        dish_name = ?input.dish_name,
        "analyze request"
    );

    let outcome = state
        .analyzer
        .analyze(input.image.as_deref(), input.dish_name.as_deref())
        .await?;

    let chart_url = chart_url(
        state.config.public_base_url.as_deref(),
        &headers,
        &outcome.chart.file_name,
    );

    Ok(Json(AnalyzeResponse {
        dish: outcome.dish,
        calories: outcome.calories,
        chart_url,
    }))
}

async fn read_input(request: Request) -> Result<AnalyzeInput, AppError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| unreadable_body("multipart body", e))?;
        read_multipart(multipart).await
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(form) = Form::<AnalyzeForm>::from_request(request, &())
            .await
            .map_err(|e| unreadable_body("form body", e))?;
        Ok(AnalyzeInput {
            image: None,
            dish_name: form.dish_name,
        })
    } else {
        Ok(AnalyzeInput::default())
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<AnalyzeInput, AppError> {
    let mut input = AnalyzeInput::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| unreadable_body("multipart field", e))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "image" => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| unreadable_body("image", e))?;
                input.image = Some(data.to_vec());
            }
            "dish_name" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| unreadable_body("dish_name", e))?;
                input.dish_name = Some(value);
            }
            _ => {}
        }
    }

    Ok(input)
}

/// Parser details stay in the log; the client gets the generic message.
fn unreadable_body(part: &str, err: impl std::fmt::Display) -> AppError {
    tracing::warn!("Failed to read {}: {}", part, err);
    AppError::BadRequest(DISH_NOT_FOUND_MESSAGE.to_string())
}

/// Absolute link to a chart under /static, based on the configured public URL or the Host header.
pub fn chart_url(public_base_url: Option<&str>, headers: &HeaderMap, file_name: &str) -> String {
    let base = match public_base_url {
        Some(base) => base.to_string(),
        None => headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(|host| format!("http://{}", host))
            .unwrap_or_default(),
    };
    format!("{}/static/{}", base, file_name)
}
