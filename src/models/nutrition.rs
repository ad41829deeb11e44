// src/models/nutrition.rs
use serde::{Deserialize, Serialize};
use serde_json::Number;

/// Nutrients plotted on the chart, matched by exact name.
pub const CHART_NUTRIENTS: [&str; 6] = [
    "Protein",
    "Fat",
    "Total Carbohydrates",
    "Sugar",
    "Cholesterol",
    "Fiber",
];

pub const CALORIES: &str = "Calories";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemSearchResponse {
    #[serde(default)]
    pub menu_items: Vec<MenuItemSummary>,
    #[serde(default)]
    pub total_menu_items: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemSummary {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub restaurant_chain: Option<String>,
}

/// Detail record for one menu item, kept as the service sent it.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NutritionRecord {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub restaurant_chain: Option<String>,
    pub nutrition: NutritionFacts,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct NutritionFacts {
    #[serde(default)]
    pub nutrients: Vec<Nutrient>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Nutrient {
    pub name: String,
    pub amount: Number,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl Nutrient {
    pub fn amount_f64(&self) -> f64 {
        self.amount.as_f64().unwrap_or(0.0)
    }
}

impl NutritionRecord {
    /// Amount of the first "Calories" entry, zero when the service didn't report one.
    pub fn calories(&self) -> Number {
        self.nutrition
            .nutrients
            .iter()
            .find(|n| n.name == CALORIES)
            .map(|n| n.amount.clone())
            .unwrap_or_else(|| Number::from(0))
    }

    /// Nutrients that belong on the chart, in the order the service listed them.
    pub fn chart_nutrients(&self) -> Vec<&Nutrient> {
        self.nutrition
            .nutrients
            .iter()
            .filter(|n| CHART_NUTRIENTS.contains(&n.name.as_str()))
            .collect()
    }
}
