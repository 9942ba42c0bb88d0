mod parse;
mod tesseract;
mod text;

use anyhow::Result;
use image::DynamicImage;
use std::sync::Arc;

use crate::ocr::{BoundingBox, Point, TextRegion};
use crate::settings::RecognitionSettings;

pub use tesseract::{list_tesseract_languages, TesseractEngine};

/// Rotated quadrilateral returned by detection, clockwise from top-left.
pub type Quad = [Point; 4];

#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub text: String,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineRegion {
    pub quad: Quad,
    pub text: String,
    pub score: f32,
}

/// Detector/recognizer capability the pipeline is built around.
///
/// Implementations receive decoded pixels so callers can preprocess before
/// invocation. A single instance is shared across batch workers, hence
/// `Send + Sync`.
pub trait OcrEngine: Send + Sync {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Quad>>;
    /// Treats the whole image as one tight text region.
    fn recognize(&self, image: &DynamicImage) -> Result<Recognition>;
    fn run_full(&self, image: &DynamicImage) -> Result<Vec<EngineRegion>>;
}

pub type EngineFactory =
    Arc<dyn Fn(&RecognitionSettings) -> Result<Arc<dyn OcrEngine>> + Send + Sync>;

pub fn tesseract_factory() -> EngineFactory {
    Arc::new(|settings: &RecognitionSettings| {
        let engine: Arc<dyn OcrEngine> = Arc::new(TesseractEngine::new(settings)?);
        Ok(engine)
    })
}

pub(crate) fn quad_to_box(quad: &Quad) -> BoundingBox {
    BoundingBox::from_corners(quad.to_vec())
}

pub(crate) fn region_from_engine(region: EngineRegion) -> TextRegion {
    TextRegion::new(region.text, region.score, quad_to_box(&region.quad))
}

pub(crate) fn rect_quad(x: i32, y: i32, width: i32, height: i32) -> Quad {
    [
        Point::new(x, y),
        Point::new(x + width, y),
        Point::new(x + width, y + height),
        Point::new(x, y + height),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_region_converts_to_text_region() {
        let region = region_from_engine(EngineRegion {
            quad: rect_quad(10, 20, 30, 40),
            text: "ドン".to_string(),
            score: 0.75,
        });
        assert_eq!(region.text, "ドン");
        assert_eq!(region.confidence, 0.75);
        assert_eq!(
            (
                region.bounding_box.x,
                region.bounding_box.y,
                region.bounding_box.width,
                region.bounding_box.height
            ),
            (10, 20, 30, 40)
        );
    }
}
