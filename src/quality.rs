use crate::error::Result;
use crate::image_loader::load_image;
use crate::ocr::preprocess::to_luma;
use image::{DynamicImage, GrayImage};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use tracing::debug;

const HIGH_BLUR: f64 = 300.0;
const HIGH_CONTRAST: f64 = 50.0;
const MEDIUM_BLUR: f64 = 100.0;
const MEDIUM_CONTRAST: f64 = 30.0;
const MEDIUM_MIN_DIMENSION: u32 = 800;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QualityLevel {
    High,
    Medium,
    Low,
}

impl fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            QualityLevel::High => "High",
            QualityLevel::Medium => "Medium",
            QualityLevel::Low => "Low",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityMetrics {
    /// Variance of the Laplacian over luminance; higher is sharper.
    pub blur_score: f64,
    /// Standard deviation of luminance.
    pub contrast: f64,
    /// Mean luminance.
    pub brightness: f64,
    pub width: u32,
    pub height: u32,
    pub quality_level: QualityLevel,
}

impl QualityMetrics {
    pub fn max_dimension(&self) -> u32 {
        self.width.max(self.height)
    }

    pub fn total_pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn summary(&self) -> String {
        format!(
            "quality={} blur={:.2} contrast={:.2} brightness={:.2} size={}x{}",
            self.quality_level, self.blur_score, self.contrast, self.brightness, self.width, self.height
        )
    }
}

pub struct QualityAnalyzer;

impl QualityAnalyzer {
    pub fn analyze(path: &Path) -> Result<QualityMetrics> {
        let image = load_image(path)?;
        let metrics = Self::analyze_image(&image);
        debug!("{}: {}", path.display(), metrics.summary());
        Ok(metrics)
    }

    pub fn analyze_image(image: &DynamicImage) -> QualityMetrics {
        let gray = to_luma(image);
        let (brightness, contrast) = mean_and_std_dev(gray.as_raw().iter().map(|&v| v as f64));
        let blur_score = laplacian_variance(&gray);
        let (width, height) = gray.dimensions();
        QualityMetrics {
            blur_score,
            contrast,
            brightness,
            width,
            height,
            quality_level: Self::determine_level(blur_score, contrast, width.max(height)),
        }
    }

    /// First match wins: High, then Medium, otherwise Low.
    pub fn determine_level(blur_score: f64, contrast: f64, max_dimension: u32) -> QualityLevel {
        if blur_score >= HIGH_BLUR && contrast >= HIGH_CONTRAST {
            QualityLevel::High
        } else if blur_score >= MEDIUM_BLUR
            && contrast >= MEDIUM_CONTRAST
            && max_dimension >= MEDIUM_MIN_DIMENSION
        {
            QualityLevel::Medium
        } else {
            QualityLevel::Low
        }
    }
}

fn mean_and_std_dev(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let mut count = 0usize;
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for value in values {
        count += 1;
        sum += value;
        sum_sq += value * value;
    }
    if count == 0 {
        return (0.0, 0.0);
    }
    let mean = sum / count as f64;
    let variance = (sum_sq / count as f64 - mean * mean).max(0.0);
    (mean, variance.sqrt())
}

/// 4-neighbour Laplacian with reflected borders (the edge pixel itself is
/// not repeated).
fn laplacian_variance(gray: &GrayImage) -> f64 {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return 0.0;
    }
    let (w, h) = (width as i64, height as i64);
    let at = |x: i64, y: i64| gray.get_pixel(reflect(x, w) as u32, reflect(y, h) as u32)[0] as f64;

    let responses = (0..h).flat_map(|y| {
        (0..w).map(move |x| at(x, y - 1) + at(x - 1, y) + at(x + 1, y) + at(x, y + 1) - 4.0 * at(x, y))
    });
    mean_and_std_dev(responses).1.powi(2)
}

fn reflect(index: i64, len: i64) -> i64 {
    if len == 1 {
        return 0;
    }
    let mut index = index;
    if index < 0 {
        index = -index;
    }
    if index >= len {
        index = 2 * (len - 1) - index;
    }
    index
}
