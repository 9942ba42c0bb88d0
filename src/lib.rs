pub mod batch;
pub mod error;
pub mod events;
pub mod image_loader;
pub mod logging;
pub mod ocr;
pub mod quality;
pub mod recommend;
pub mod service;
pub mod settings;
#[cfg(test)]
mod test_util;

pub use batch::BatchOptions;
pub use error::{ErrorKind, OcrError, Result};
pub use events::{LogEvent, LogLevel, ProgressEvent};
pub use ocr::annotate::{annotate_confidence, annotate_reading_order};
pub use ocr::layout::{
    analyze_original_order, assign_reading_order, detect_pages, diagnose_page_detection,
    sort_by_reading_order, OrderedRegion, PageLayoutInfo, ReadingDirection,
};
pub use ocr::postprocess::ResultProcessor;
pub use ocr::{
    list_tesseract_languages, tesseract_factory, BoundingBox, EngineFactory, EngineRegion,
    OcrEngine, OcrResult, Point, Quad, Recognition, TesseractEngine, TextRegion,
};
pub use quality::{QualityAnalyzer, QualityLevel, QualityMetrics};
pub use recommend::ParameterRecommender;
pub use service::{MangaOcrService, OcrMode};
pub use settings::{load_settings, BatchSettings, OcrProvider, RecognitionSettings, Settings};
