// src/services/analysis.rs
use async_trait::async_trait;
use serde_json::Number;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use super::chart::{ChartArtifact, ChartError, ChartRenderer};
use crate::models::nutrition::NutritionRecord;

/// Turns an uploaded photo into a dish label. Never fails: unrecognizable images become "Unknown".
#[async_trait]
pub trait DishRecognizer: Send + Sync {
    async fn recognize_or_unknown(&self, image: &[u8]) -> String;
}

/// Finds the nutrition detail record for a dish label.
#[async_trait]
pub trait NutritionSource: Send + Sync {
    async fn nutrition_for(&self, dish_name: &str) -> Option<NutritionRecord>;
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("No image or dish name supplied")]
    NoDish,
    #[error("No nutrition data for '{0}'")]
    NoNutrition(String),
    #[error(transparent)]
    Chart(#[from] ChartError),
}

#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub dish: String,
    pub calories: Number,
    pub chart: ChartArtifact,
}

pub struct NutritionAnalyzer {
    recognizer: Arc<dyn DishRecognizer>,
    nutrition: Arc<dyn NutritionSource>,
    charts: ChartRenderer,
}

impl NutritionAnalyzer {
    pub fn new(
        recognizer: Arc<dyn DishRecognizer>,
        nutrition: Arc<dyn NutritionSource>,
        charts: ChartRenderer,
    ) -> Self {
        Self {
            recognizer,
            nutrition,
            charts,
        }
    }

    /// An uploaded image wins over a typed dish name.
    pub async fn resolve_dish(
        &self,
        image: Option<&[u8]>,
        dish_name: Option<&str>,
    ) -> Option<String> {
        if let Some(bytes) = image.filter(|b| !b.is_empty()) {
            return Some(self.recognizer.recognize_or_unknown(bytes).await);
        }

        dish_name
            .filter(|name| !name.trim().is_empty())
            .map(str::to_string)
    }

    pub async fn analyze(
        &self,
        image: Option<&[u8]>,
        dish_name: Option<&str>,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let dish = self
            .resolve_dish(image, dish_name)
            .await
            .ok_or(AnalysisError::NoDish)?;

        let Some(record) = self.nutrition.nutrition_for(&dish).await else {
            warn!("No nutrition data available for '{}'", dish);
            return Err(AnalysisError::NoNutrition(dish));
        };

        let chart = self.charts.render(&record).await?;
        let calories = record.calories();

        info!(
            "✅ Analyzed '{}': {} kcal, chart {}",
            dish, calories, chart.file_name
        );

        Ok(AnalysisOutcome {
            dish,
            calories,
            chart,
        })
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;
    use std::sync::Mutex;

    /// Recognizer returning a fixed label and remembering how many times it ran.
    pub struct FixedRecognizer {
        pub label: String,
        pub calls: Mutex<usize>,
    }

    impl FixedRecognizer {
        pub fn new(label: &str) -> Self {
            Self {
                label: label.to_string(),
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl DishRecognizer for FixedRecognizer {
        async fn recognize_or_unknown(&self, _image: &[u8]) -> String {
            *self.calls.lock().unwrap() += 1;
            self.label.clone()
        }
    }

    /// Nutrition source answering from a fixed record, recording the queried names.
    pub struct StaticNutrition {
        pub record: Option<NutritionRecord>,
        pub queries: Mutex<Vec<String>>,
    }

    impl StaticNutrition {
        pub fn with_nutrients(nutrients: serde_json::Value) -> Self {
            let record = serde_json::from_value(serde_json::json!({
                "nutrition": { "nutrients": nutrients }
            }))
            .unwrap();
            Self {
                record: Some(record),
                queries: Mutex::new(Vec::new()),
            }
        }

        pub fn empty() -> Self {
            Self {
                record: None,
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl NutritionSource for StaticNutrition {
        async fn nutrition_for(&self, dish_name: &str) -> Option<NutritionRecord> {
            self.queries.lock().unwrap().push(dish_name.to_string());
            self.record.clone()
        }
    }
}
