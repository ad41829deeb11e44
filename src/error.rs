// src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use uuid::Uuid;

use crate::models::analysis::ErrorResponse;
use crate::services::analysis::AnalysisError;

/// Message returned for every client-side failure of /analyze.
pub const DISH_NOT_FOUND_MESSAGE: &str = "Dish not found or nutrition data unavailable.";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Not found")]
    NotFound,
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::NoDish | AnalysisError::NoNutrition(_) => {
                tracing::info!(reason = %err, "analysis rejected");
                AppError::BadRequest(DISH_NOT_FOUND_MESSAGE.to_string())
            }
            AnalysisError::Chart(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            AppError::Internal(detail) => {
                let error_id = Uuid::new_v4();
                tracing::error!(error_id = %error_id, error = %detail, "unhandled error occurred");

                let message = if cfg!(debug_assertions) {
                    format!("Internal server error: {} (ID: {})", detail, error_id)
                } else {
                    format!("Internal server error (ID: {})", error_id)
                };
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
