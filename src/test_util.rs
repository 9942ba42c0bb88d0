use crate::ocr::{EngineFactory, EngineRegion, OcrEngine, Quad, Recognition};
use crate::settings::RecognitionSettings;
use anyhow::{anyhow, Result};
use image::{DynamicImage, Rgb, RgbImage};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Scripted engine: returns canned output and counts calls.
pub(crate) struct FakeEngine {
    regions: Vec<EngineRegion>,
    recognition: Recognition,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self {
            regions: Vec::new(),
            recognition: Recognition {
                text: "テスト".to_string(),
                score: 0.9,
            },
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }
}

impl FakeEngine {
    pub(crate) fn with_regions(regions: Vec<EngineRegion>) -> Self {
        Self {
            regions,
            ..Self::default()
        }
    }

    pub(crate) fn with_recognition(recognition: Recognition) -> Self {
        Self {
            recognition,
            ..Self::default()
        }
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn tick(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(anyhow!(message.clone())),
            None => Ok(()),
        }
    }
}

impl OcrEngine for FakeEngine {
    fn detect(&self, _image: &DynamicImage) -> Result<Vec<Quad>> {
        self.tick()?;
        Ok(self.regions.iter().map(|region| region.quad).collect())
    }

    fn recognize(&self, _image: &DynamicImage) -> Result<Recognition> {
        self.tick()?;
        Ok(self.recognition.clone())
    }

    fn run_full(&self, _image: &DynamicImage) -> Result<Vec<EngineRegion>> {
        self.tick()?;
        Ok(self.regions.clone())
    }
}

/// Factory that always hands out `engine` and records the settings it was
/// asked to build with.
pub(crate) fn fake_factory(
    engine: Arc<FakeEngine>,
) -> (EngineFactory, Arc<Mutex<Vec<RecognitionSettings>>>) {
    let built = Arc::new(Mutex::new(Vec::new()));
    let record = Arc::clone(&built);
    let factory: EngineFactory = Arc::new(move |settings: &RecognitionSettings| {
        record.lock().push(settings.clone());
        let engine: Arc<dyn OcrEngine> = engine.clone();
        Ok(engine)
    });
    (factory, built)
}

/// Low-contrast grey page, enough to decode and analyze.
pub(crate) fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_fn(width, height, |x, _| {
        let shade = 200 + (x % 8) as u8;
        Rgb([shade, shade, shade])
    })
    .save(&path)
    .expect("write test png");
    path
}
