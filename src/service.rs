use crate::batch::{run_batch, BatchOptions};
use crate::error::{OcrError, Result};
use crate::events::{EventHub, LogEvent, LogLevel, ProgressEvent};
use crate::image_loader::{ensure_readable_path, load_image};
use crate::ocr::engine::{quad_to_box, region_from_engine};
use crate::ocr::postprocess::ResultProcessor;
use crate::ocr::preprocess::preprocess_for_ocr;
use crate::ocr::{BoundingBox, EngineFactory, OcrEngine, OcrResult, TextRegion};
use crate::quality::QualityMetrics;
use crate::recommend::ParameterRecommender;
use crate::settings::RecognitionSettings;
use anyhow::Context;
use crossbeam_channel::Receiver;
use image::DynamicImage;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrMode {
    /// Per-image parameters picked from measured image quality.
    Adaptive,
    /// One engine built from the base settings, reused for every call.
    Standard,
}

/// Entry point for single-image and batch recognition.
///
/// Cloning is cheap and clones share the engine, the event streams and the
/// disposed flag.
#[derive(Clone)]
pub struct MangaOcrService {
    inner: Arc<ServiceInner>,
}

struct ServiceInner {
    mode: OcrMode,
    settings: RecognitionSettings,
    factory: EngineFactory,
    standard_engine: Mutex<Option<Arc<dyn OcrEngine>>>,
    events: Arc<EventHub>,
    disposed: AtomicBool,
}

impl MangaOcrService {
    pub fn create(settings: RecognitionSettings, factory: EngineFactory) -> Self {
        Self::create_adaptive(settings, factory)
    }

    pub fn create_adaptive(settings: RecognitionSettings, factory: EngineFactory) -> Self {
        Self::with_mode(OcrMode::Adaptive, settings, factory)
    }

    pub fn create_standard(settings: RecognitionSettings, factory: EngineFactory) -> Self {
        Self::with_mode(OcrMode::Standard, settings, factory)
    }

    pub fn create_default(factory: EngineFactory) -> Self {
        Self::create_adaptive(RecognitionSettings::default(), factory)
    }

    fn with_mode(mode: OcrMode, settings: RecognitionSettings, factory: EngineFactory) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                mode,
                settings,
                factory,
                standard_engine: Mutex::new(None),
                events: Arc::new(EventHub::default()),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    pub fn mode(&self) -> OcrMode {
        self.inner.mode
    }

    pub fn settings(&self) -> &RecognitionSettings {
        &self.inner.settings
    }

    pub fn subscribe_logs(&self) -> Receiver<LogEvent> {
        self.inner.events.subscribe_logs()
    }

    pub fn subscribe_progress(&self) -> Receiver<ProgressEvent> {
        self.inner.events.subscribe_progress()
    }

    /// Releases the shared engine. Every later call fails with
    /// `InvalidArgument`.
    pub fn dispose(&self) {
        if !self.inner.disposed.swap(true, Ordering::SeqCst) {
            self.inner.standard_engine.lock().take();
            self.log(LogLevel::Debug, "service disposed");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Full pipeline: engine run, then cleanup with the effective
    /// `min_confidence`. Decode and engine problems come back as a failed
    /// result; a missing file or an unusable service is an error.
    pub fn recognize_text(&self, path: &Path, verbose: bool) -> Result<OcrResult> {
        self.ensure_open()?;
        ensure_readable_path(path)?;
        let started = Instant::now();
        let outcome = match self.inner.mode {
            OcrMode::Adaptive => self.recognize_adaptive(path, verbose, started),
            OcrMode::Standard => self
                .standard_engine()
                .and_then(|engine| self.run_pipeline(engine.as_ref(), &self.inner.settings, path, started)),
        };
        let result = self.recover(path, started, outcome)?;
        if verbose && result.success {
            self.log(
                LogLevel::Information,
                format!(
                    "recognized {} regions in {}ms",
                    result.text_regions.len(),
                    result.elapsed_ms
                ),
            );
        }
        Ok(result)
    }

    pub async fn recognize_text_async(&self, path: &Path, verbose: bool) -> Result<OcrResult> {
        let service = self.clone();
        let path = path.to_path_buf();
        run_blocking(move || service.recognize_text(&path, verbose)).await
    }

    fn recognize_adaptive(&self, path: &Path, verbose: bool, started: Instant) -> Result<OcrResult> {
        let (settings, metrics) = ParameterRecommender::recommend(path, &self.inner.settings)?;
        if verbose {
            self.log(
                LogLevel::Information,
                ParameterRecommender::explain(&metrics, &settings),
            );
        } else {
            self.log(LogLevel::Debug, format!("{}: {}", path.display(), metrics.summary()));
        }
        let engine = (self.inner.factory)(&settings)
            .with_context(|| "failed to create OCR engine for recommended settings")?;
        self.run_pipeline(engine.as_ref(), &settings, path, started)
    }

    fn run_pipeline(
        &self,
        engine: &dyn OcrEngine,
        settings: &RecognitionSettings,
        path: &Path,
        started: Instant,
    ) -> Result<OcrResult> {
        let image = prepared_image(path, settings)?;
        let regions = engine
            .run_full(&image)
            .with_context(|| format!("text recognition failed for {}", path.display()))?
            .into_iter()
            .map(region_from_engine)
            .collect();
        let raw = OcrResult::success(regions, elapsed_ms(started));
        Ok(ResultProcessor::process(&raw, settings.min_confidence))
    }

    /// Detection only: coordinates with empty text and no score. Every
    /// failure is raised, including decode and engine errors.
    pub fn detect_regions_only(&self, path: &Path) -> Result<Vec<TextRegion>> {
        self.ensure_open()?;
        let engine = self.standard_engine()?;
        let image = prepared_image(path, &self.inner.settings)?;
        let quads = engine
            .detect(&image)
            .with_context(|| format!("text detection failed for {}", path.display()))?;
        Ok(quads
            .iter()
            .map(|quad| TextRegion::detected(quad_to_box(quad)))
            .collect())
    }

    pub async fn detect_regions_only_async(&self, path: &Path) -> Result<Vec<TextRegion>> {
        let service = self.clone();
        let path = path.to_path_buf();
        run_blocking(move || service.detect_regions_only(&path)).await
    }

    /// Recognition only: the whole image is treated as one text region.
    pub fn recognize_region_only(&self, path: &Path) -> Result<OcrResult> {
        self.ensure_open()?;
        ensure_readable_path(path)?;
        let started = Instant::now();
        let outcome = self.standard_engine().and_then(|engine| {
            let image = prepared_image(path, &self.inner.settings)?;
            let recognition = engine
                .recognize(&image)
                .with_context(|| format!("text recognition failed for {}", path.display()))?;
            let bounds = BoundingBox::from_rect(0, 0, image.width() as i32, image.height() as i32);
            Ok(OcrResult::success(
                vec![TextRegion::new(recognition.text, recognition.score, bounds)],
                elapsed_ms(started),
            ))
        });
        self.recover(path, started, outcome)
    }

    pub async fn recognize_region_only_async(&self, path: &Path) -> Result<OcrResult> {
        let service = self.clone();
        let path = path.to_path_buf();
        run_blocking(move || service.recognize_region_only(&path)).await
    }

    /// Sequential region-only recognition; one failed image never stops the
    /// rest.
    pub fn recognize_batch(&self, paths: &[PathBuf]) -> Result<Vec<OcrResult>> {
        self.ensure_open()?;
        if paths.is_empty() {
            return Err(OcrError::invalid("image path list is empty"));
        }
        Ok(paths
            .iter()
            .map(|path| {
                self.recognize_region_only(path).unwrap_or_else(|err| {
                    self.log(
                        LogLevel::Error,
                        format!("failed: {} - {err}", path.display()),
                    );
                    OcrResult::failure(format!("failed to process {}: {err}", path.display()), 0)
                })
            })
            .collect())
    }

    pub async fn recognize_batch_async(&self, paths: &[PathBuf]) -> Result<Vec<OcrResult>> {
        let service = self.clone();
        let paths = paths.to_vec();
        run_blocking(move || service.recognize_batch(&paths)).await
    }

    /// Region-only recognition over a worker pool; see [`run_batch`].
    pub async fn recognize_batch_parallel(
        &self,
        paths: &[PathBuf],
        options: &BatchOptions,
    ) -> Result<Vec<OcrResult>> {
        self.ensure_open()?;
        let service = self.clone();
        run_batch(paths, options, Arc::clone(&self.inner.events), move |path| {
            service.recognize_region_only(path)
        })
        .await
    }

    /// Quality report and the parameters adaptive mode would use.
    pub fn explain_recommendation(&self, path: &Path) -> Result<String> {
        self.ensure_open()?;
        if self.inner.mode != OcrMode::Adaptive {
            return Ok("Recommendations are only available in adaptive mode.".to_string());
        }
        let (settings, metrics) = ParameterRecommender::recommend(path, &self.inner.settings)?;
        Ok(ParameterRecommender::explain(&metrics, &settings))
    }

    pub fn analyze_and_recommend(&self, path: &Path) -> Result<(RecognitionSettings, QualityMetrics)> {
        self.ensure_open()?;
        ParameterRecommender::recommend(path, &self.inner.settings)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(OcrError::invalid("service has been disposed"));
        }
        Ok(())
    }

    fn standard_engine(&self) -> Result<Arc<dyn OcrEngine>> {
        let mut slot = self.inner.standard_engine.lock();
        if let Some(engine) = slot.as_ref() {
            return Ok(Arc::clone(engine));
        }
        let engine = (self.inner.factory)(&self.inner.settings)
            .with_context(|| "failed to create OCR engine")?;
        *slot = Some(Arc::clone(&engine));
        Ok(engine)
    }

    fn recover(&self, path: &Path, started: Instant, outcome: Result<OcrResult>) -> Result<OcrResult> {
        match outcome {
            Ok(result) => Ok(result),
            Err(err) if err.is_recoverable() => {
                self.log(
                    LogLevel::Error,
                    format!("recognition failed for {}: {err}", path.display()),
                );
                Ok(OcrResult::failure(err.to_string(), elapsed_ms(started)))
            }
            Err(err) => Err(err),
        }
    }

    fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.inner.events.log(level, message);
    }
}

fn prepared_image(path: &Path, settings: &RecognitionSettings) -> Result<DynamicImage> {
    let image = load_image(path)?;
    if settings.use_preprocessing {
        Ok(preprocess_for_ocr(&image))
    } else {
        Ok(image)
    }
}

fn elapsed_ms(started: Instant) -> i64 {
    started.elapsed().as_millis() as i64
}

async fn run_blocking<T, F>(task: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| OcrError::Engine(format!("worker task failed: {err}")))?
}
