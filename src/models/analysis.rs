// src/models/analysis.rs
use serde::{Deserialize, Serialize};
use serde_json::Number;

/// Url-encoded form body accepted by /analyze when no file is uploaded.
#[derive(Debug, Deserialize, Default)]
pub struct AnalyzeForm {
    pub dish_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub dish: String,
    pub calories: Number,
    pub chart_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
