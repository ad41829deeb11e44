// src/services/mod.rs
pub mod analysis;
pub mod chart;
mod glyphs;

pub use analysis::NutritionAnalyzer;
pub use chart::ChartRenderer;
