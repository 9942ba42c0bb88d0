pub mod annotate;
pub mod engine;
mod geom;
pub mod layout;
pub mod postprocess;
pub(crate) mod preprocess;

use serde::Serialize;

pub use engine::{
    list_tesseract_languages, tesseract_factory, EngineFactory, EngineRegion, OcrEngine, Quad,
    Recognition, TesseractEngine,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned bound of a (possibly rotated) detection quadrilateral.
///
/// `corners` keeps the quadrilateral as the engine returned it; `x`, `y`,
/// `width` and `height` are the tight bound of those corners.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub corners: Vec<Point>,
}

impl BoundingBox {
    pub fn from_corners(corners: Vec<Point>) -> Self {
        if corners.is_empty() {
            return Self::default();
        }
        let min_x = corners.iter().map(|p| p.x).min().unwrap_or(0);
        let min_y = corners.iter().map(|p| p.y).min().unwrap_or(0);
        let max_x = corners.iter().map(|p| p.x).max().unwrap_or(0);
        let max_y = corners.iter().map(|p| p.y).max().unwrap_or(0);
        Self {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
            corners,
        }
    }

    pub fn from_rect(x: i32, y: i32, width: i32, height: i32) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        Self {
            x,
            y,
            width,
            height,
            corners: vec![
                Point::new(x, y),
                Point::new(x + width, y),
                Point::new(x + width, y + height),
                Point::new(x, y + height),
            ],
        }
    }

    pub fn center_x(&self) -> i32 {
        self.x + self.width / 2
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TextRegion {
    pub text: String,
    /// Engine score in `[0, 1]`; NaN when the region was never recognized.
    pub confidence: f32,
    pub bounding_box: BoundingBox,
}

impl TextRegion {
    pub fn new(text: impl Into<String>, confidence: f32, bounding_box: BoundingBox) -> Self {
        Self {
            text: text.into(),
            confidence,
            bounding_box,
        }
    }

    /// Detection-only region: coordinates without text or score.
    pub fn detected(bounding_box: BoundingBox) -> Self {
        Self::new(String::new(), f32::NAN, bounding_box)
    }

    pub fn is_scored(&self) -> bool {
        !self.confidence.is_nan()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OcrResult {
    pub success: bool,
    pub text_regions: Vec<TextRegion>,
    pub elapsed_ms: i64,
    pub error_message: Option<String>,
}

impl OcrResult {
    pub fn success(text_regions: Vec<TextRegion>, elapsed_ms: i64) -> Self {
        Self {
            success: true,
            text_regions,
            elapsed_ms,
            error_message: None,
        }
    }

    pub fn failure(message: impl Into<String>, elapsed_ms: i64) -> Self {
        Self {
            success: false,
            text_regions: Vec::new(),
            elapsed_ms,
            error_message: Some(message.into()),
        }
    }

    /// Same result metadata carrying a different region list.
    pub fn with_regions(&self, text_regions: Vec<TextRegion>) -> Self {
        Self {
            success: self.success,
            text_regions,
            elapsed_ms: self.elapsed_ms,
            error_message: self.error_message.clone(),
        }
    }

    pub fn full_text(&self) -> String {
        self.text_regions
            .iter()
            .map(|region| region.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
