// src/services/chart.rs
use image::{ImageFormat, Rgb, RgbImage};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use super::glyphs::{glyph, text_width, GLYPH_HEIGHT, GLYPH_SPACING, GLYPH_WIDTH};
use crate::models::nutrition::NutritionRecord;

pub const CHART_WIDTH: u32 = 800;
pub const CHART_HEIGHT: u32 = 500;
pub const CHART_FILE_SUFFIX: &str = "_chart.png";

const PLOT_LEFT: u32 = 70;
const PLOT_RIGHT: u32 = 770;
const PLOT_TOP: u32 = 60;
const PLOT_BOTTOM: u32 = 410;
const Y_TICKS: u32 = 5;
const MAX_TICKS: u32 = 20;
const BAR_FILL_RATIO: f64 = 0.6;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const GRID: Rgb<u8> = Rgb([225, 225, 225]);
pub const SKY_BLUE: Rgb<u8> = Rgb([135, 206, 235]);

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Failed to prepare chart directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode chart: {0}")]
    Image(#[from] image::ImageError),
    #[error("Chart rendering task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// A rendered chart file living in the static directory.
#[derive(Debug, Clone)]
pub struct ChartArtifact {
    pub file_name: String,
    pub path: PathBuf,
    /// Nutrient names plotted, left to right.
    pub labels: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ChartRenderer {
    static_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ChartRenderer {
    pub fn new(static_dir: PathBuf) -> Self {
        Self { static_dir }
    }

    /// Plot the chart nutrients of `record` into a fresh file. Each call gets its own file name.
    pub async fn render(&self, record: &NutritionRecord) -> Result<ChartArtifact, ChartError> {
        let bars: Vec<(String, f64)> = record
            .chart_nutrients()
            .into_iter()
            .map(|n| (n.name.clone(), n.amount_f64()))
            .collect();
        let labels: Vec<String> = bars.iter().map(|(name, _)| name.clone()).collect();

        tokio::fs::create_dir_all(&self.static_dir).await?;

        let file_name = format!("{}{}", Uuid::new_v4(), CHART_FILE_SUFFIX);
        let path = self.static_dir.join(&file_name);

        let target = path.clone();
        tokio::task::spawn_blocking(move || {
            draw_chart(&bars).save_with_format(&target, ImageFormat::Png)
        })
        .await??;

        info!("📊 Chart generated at {} ({} bars)", path.display(), labels.len());

        Ok(ChartArtifact {
            file_name,
            path,
            labels,
        })
    }
}

/// Rounded axis maximum and tick step for the tallest bar.
fn axis_scale(max_value: f64) -> (f64, f64) {
    if !max_value.is_finite() || max_value <= 0.0 {
        return (Y_TICKS as f64, 1.0);
    }

    let raw_step = max_value / Y_TICKS as f64;
    let magnitude = 10f64.powf(raw_step.log10().floor());
    let normalized = raw_step / magnitude;
    let nice = if normalized <= 1.0 {
        1.0
    } else if normalized <= 2.0 {
        2.0
    } else if normalized <= 5.0 {
        5.0
    } else {
        10.0
    };
    let step = nice * magnitude;
    let top = (max_value / step).ceil() * step;
    if top.is_finite() {
        (top, step)
    } else {
        // Rounding up overflowed; plot against the raw maximum.
        (max_value, max_value / Y_TICKS as f64)
    }
}

/// Number of tick intervals between zero and `top`.
fn tick_count(top: f64, step: f64) -> u32 {
    let ticks = (top / step).round();
    if ticks.is_finite() && ticks >= 1.0 {
        (ticks as u32).min(MAX_TICKS)
    } else {
        Y_TICKS
    }
}

fn format_tick(value: f64) -> String {
    if value.abs() >= 1e7 {
        format!("{:.1e}", value).to_ascii_uppercase()
    } else if (value - value.round()).abs() < 1e-9 {
        format!("{:.0}", value)
    } else {
        let text = format!("{:.2}", value);
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

pub fn bar_rects(values: &[f64]) -> Vec<BarRect> {
    if values.is_empty() {
        return Vec::new();
    }

    let max_value = values.iter().cloned().fold(0.0_f64, f64::max);
    let (top, _) = axis_scale(max_value);
    let plot_height = (PLOT_BOTTOM - PLOT_TOP) as f64;
    let slot = (PLOT_RIGHT - PLOT_LEFT) as f64 / values.len() as f64;
    let width = (slot * BAR_FILL_RATIO).round().max(1.0);

    values
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let value = if value.is_finite() { value.max(0.0) } else { 0.0 };
            let height = ((value / top) * plot_height).round().min(plot_height);
            let x = PLOT_LEFT as f64 + slot * i as f64 + (slot - width) / 2.0;
            BarRect {
                x: x.round() as u32,
                y: PLOT_BOTTOM - height as u32,
                width: width as u32,
                height: height as u32,
            }
        })
        .collect()
}

pub fn draw_chart(bars: &[(String, f64)]) -> RgbImage {
    let mut img = RgbImage::from_pixel(CHART_WIDTH, CHART_HEIGHT, WHITE);
    let values: Vec<f64> = bars.iter().map(|(_, v)| *v).collect();
    let max_value = values.iter().cloned().fold(0.0_f64, f64::max);
    let (top, step) = axis_scale(max_value);
    let plot_height = (PLOT_BOTTOM - PLOT_TOP) as f64;

    // Grid and y tick labels
    let ticks = tick_count(top, step);
    for i in 0..=ticks {
        let tick = top * i as f64 / ticks as f64;
        let y = PLOT_BOTTOM - ((i as f64 / ticks as f64) * plot_height).round() as u32;
        fill_rect(&mut img, PLOT_LEFT, y, PLOT_RIGHT - PLOT_LEFT, 1, GRID);
        let label = format_tick(tick);
        let label_x = PLOT_LEFT.saturating_sub(8 + text_width(&label, 1));
        draw_text(&mut img, &label, label_x, y.saturating_sub(GLYPH_HEIGHT / 2), 1, BLACK);
    }

    let rects = bar_rects(&values);
    let slot = if bars.is_empty() {
        0
    } else {
        (PLOT_RIGHT - PLOT_LEFT) / bars.len() as u32
    };

    for ((name, _), rect) in bars.iter().zip(rects.iter()) {
        fill_rect(&mut img, rect.x, rect.y, rect.width, rect.height, SKY_BLUE);

        let center = rect.x + rect.width / 2;
        let lines: Vec<&str> = if text_width(name, 1) <= slot {
            vec![name.as_str()]
        } else {
            name.split_whitespace().collect()
        };
        for (i, line) in lines.iter().enumerate() {
            let x = center.saturating_sub(text_width(line, 1) / 2);
            let y = PLOT_BOTTOM + 10 + i as u32 * (GLYPH_HEIGHT + 3);
            draw_text(&mut img, line, x, y, 1, BLACK);
        }
    }

    // Axes
    fill_rect(&mut img, PLOT_LEFT, PLOT_TOP, 1, PLOT_BOTTOM - PLOT_TOP + 1, BLACK);
    fill_rect(&mut img, PLOT_LEFT, PLOT_BOTTOM, PLOT_RIGHT - PLOT_LEFT, 1, BLACK);

    draw_centered(&mut img, "NUTRITION BREAKDOWN", 20, 2);
    draw_centered(&mut img, "NUTRIENTS", CHART_HEIGHT - 30, 1);
    draw_text(&mut img, "AMOUNT", 10, PLOT_TOP - 20, 1, BLACK);

    debug!("Drew chart with {} bars, axis max {}", bars.len(), top);
    img
}

fn fill_rect(img: &mut RgbImage, x: u32, y: u32, width: u32, height: u32, color: Rgb<u8>) {
    let x_end = (x + width).min(img.width());
    let y_end = (y + height).min(img.height());
    for py in y..y_end {
        for px in x..x_end {
            img.put_pixel(px, py, color);
        }
    }
}

fn draw_text(img: &mut RgbImage, text: &str, x: u32, y: u32, scale: u32, color: Rgb<u8>) {
    let advance = (GLYPH_WIDTH + GLYPH_SPACING) * scale;
    for (i, c) in text.chars().enumerate() {
        let origin_x = x + i as u32 * advance;
        for (row, bits) in glyph(c).iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) != 0 {
                    fill_rect(
                        img,
                        origin_x + col * scale,
                        y + row as u32 * scale,
                        scale,
                        scale,
                        color,
                    );
                }
            }
        }
    }
}

fn draw_centered(img: &mut RgbImage, text: &str, y: u32, scale: u32) {
    let x = (CHART_WIDTH.saturating_sub(text_width(text, scale))) / 2;
    draw_text(img, text, x, y, scale, BLACK);
}
