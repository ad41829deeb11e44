// src/spoonacular_client.rs
use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::models::nutrition::{MenuItemSearchResponse, NutritionRecord};
use crate::services::analysis::NutritionSource;

#[derive(Error, Debug)]
pub enum NutritionError {
    #[error("Spoonacular request failed: {0}")]
    Request(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct SpoonacularClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl SpoonacularClient {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Search menu items by free text. `None` when the service answers with a non-success status.
    pub async fn search_menu_items(
        &self,
        query: &str,
    ) -> Result<Option<MenuItemSearchResponse>, NutritionError> {
        let response = self
            .client
            .get(format!("{}/food/menuItems/search", self.base_url))
            .query(&[("query", query), ("apiKey", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Spoonacular search error ({}): {}", status, error_text);
            return Ok(None);
        }

        Ok(Some(response.json::<MenuItemSearchResponse>().await?))
    }

    pub async fn get_menu_item(&self, id: i64) -> Result<Option<NutritionRecord>, NutritionError> {
        let response = self
            .client
            .get(format!("{}/food/menuItems/{}", self.base_url, id))
            .query(&[("apiKey", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Spoonacular menu item {} error ({}): {}", id, status, error_text);
            return Ok(None);
        }

        Ok(Some(response.json::<NutritionRecord>().await?))
    }

    /// Search, take the first hit as authoritative, then fetch its detail record.
    pub async fn lookup_nutrition(
        &self,
        dish_name: &str,
    ) -> Result<Option<NutritionRecord>, NutritionError> {
        info!("🥗 Looking up nutrition for '{}'", dish_name);

        let Some(search) = self.search_menu_items(dish_name).await? else {
            return Ok(None);
        };

        let Some(first) = search.menu_items.first() else {
            warn!("No menu items found for '{}'", dish_name);
            return Ok(None);
        };

        info!(
            "Using menu item {} ({}) for '{}'",
            first.id,
            first.title.as_deref().unwrap_or("untitled"),
            dish_name
        );

        self.get_menu_item(first.id).await
    }
}

#[async_trait]
impl NutritionSource for SpoonacularClient {
    async fn nutrition_for(&self, dish_name: &str) -> Option<NutritionRecord> {
        match self.lookup_nutrition(dish_name).await {
            Ok(record) => record,
            Err(e) => {
                error!("Nutrition lookup for '{}' failed: {}", dish_name, e);
                None
            }
        }
    }
}
