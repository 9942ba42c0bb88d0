use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrProvider {
    #[default]
    Tesseract,
}

/// Detection and recognition parameters for one OCR run.
///
/// A plain value: cloning is a full copy, so a recommendation derived from a
/// base value never writes back into it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionSettings {
    pub provider: OcrProvider,
    pub language: String,
    pub model_path: Option<String>,
    pub min_confidence: f32,
    pub use_preprocessing: bool,
    pub allow_rotate_detection: bool,
    pub enable_180_classification: bool,
    pub unclip_ratio: f32,
    pub max_size: u32,
    pub box_score_threshold: f32,
    pub threshold: f32,
}

impl Default for RecognitionSettings {
    fn default() -> Self {
        Self {
            provider: OcrProvider::Tesseract,
            language: "Japanese".to_string(),
            model_path: None,
            min_confidence: 0.5,
            use_preprocessing: false,
            allow_rotate_detection: true,
            enable_180_classification: true,
            unclip_ratio: 1.5,
            max_size: 1024,
            box_score_threshold: 0.6,
            threshold: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchSettings {
    /// `None` means half the available cores.
    pub max_parallelism: Option<NonZeroUsize>,
    pub smart_scheduling: bool,
    pub large_file_threshold: u64,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            max_parallelism: None,
            smart_scheduling: true,
            large_file_threshold: 1_000_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub recognition: RecognitionSettings,
    pub batch: BatchSettings,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    ocr: Option<OcrSection>,
    detection: Option<DetectionSection>,
    batch: Option<BatchSection>,
}

#[derive(Debug, Default, Deserialize)]
struct OcrSection {
    provider: Option<OcrProvider>,
    language: Option<String>,
    model_path: Option<String>,
    min_confidence: Option<f32>,
    use_preprocessing: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct DetectionSection {
    allow_rotate_detection: Option<bool>,
    enable_180_classification: Option<bool>,
    unclip_ratio: Option<f32>,
    max_size: Option<u32>,
    box_score_threshold: Option<f32>,
    threshold: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct BatchSection {
    max_parallelism: Option<usize>,
    smart_scheduling: Option<bool>,
    large_file_threshold: Option<u64>,
}

/// Layers the embedded defaults, `./settings.toml`, `./settings.local.toml`
/// and finally `extra_path`, later files overriding earlier ones.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    let defaults: SettingsFile =
        toml::from_str(DEFAULT_SETTINGS_TOML).with_context(|| "failed to parse built-in settings")?;
    settings.merge(defaults);

    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
    ];
    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        let rec = &mut self.recognition;
        if let Some(ocr) = incoming.ocr {
            if let Some(provider) = ocr.provider {
                rec.provider = provider;
            }
            if let Some(language) = ocr.language {
                if !language.trim().is_empty() {
                    rec.language = language;
                }
            }
            if let Some(path) = ocr.model_path {
                if !path.trim().is_empty() {
                    rec.model_path = Some(path);
                }
            }
            if let Some(value) = ocr.min_confidence {
                if (0.0..=1.0).contains(&value) {
                    rec.min_confidence = value;
                }
            }
            if let Some(value) = ocr.use_preprocessing {
                rec.use_preprocessing = value;
            }
        }
        if let Some(detection) = incoming.detection {
            if let Some(value) = detection.allow_rotate_detection {
                rec.allow_rotate_detection = value;
            }
            if let Some(value) = detection.enable_180_classification {
                rec.enable_180_classification = value;
            }
            if let Some(value) = detection.unclip_ratio {
                if value > 0.0 {
                    rec.unclip_ratio = value;
                }
            }
            if let Some(value) = detection.max_size {
                if value > 0 {
                    rec.max_size = value;
                }
            }
            if let Some(value) = detection.box_score_threshold {
                rec.box_score_threshold = value;
            }
            if let Some(value) = detection.threshold {
                rec.threshold = value;
            }
        }
        if let Some(batch) = incoming.batch {
            if let Some(value) = batch.max_parallelism {
                self.batch.max_parallelism = NonZeroUsize::new(value);
            }
            if let Some(value) = batch.smart_scheduling {
                self.batch.smart_scheduling = value;
            }
            if let Some(value) = batch.large_file_threshold {
                self.batch.large_file_threshold = value;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn embedded_defaults_match_code_defaults() {
        let parsed: SettingsFile = toml::from_str(DEFAULT_SETTINGS_TOML).expect("parse defaults");
        let mut settings = Settings::default();
        settings.merge(parsed);
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn extra_file_overrides_selected_values() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("custom.toml");
        fs::write(
            &path,
            "[ocr]\nlanguage = \"English\"\nmin_confidence = 0.7\n\n[detection]\nmax_size = 1600\n\n[batch]\nmax_parallelism = 3\n",
        )
        .expect("write settings");

        let settings = load_settings(Some(&path)).expect("load settings");
        assert_eq!(settings.recognition.language, "English");
        assert_eq!(settings.recognition.min_confidence, 0.7);
        assert_eq!(settings.recognition.max_size, 1600);
        assert_eq!(settings.recognition.unclip_ratio, 1.5);
        assert_eq!(settings.batch.max_parallelism, NonZeroUsize::new(3));
        assert!(settings.batch.smart_scheduling);
    }

    #[test]
    fn blank_or_out_of_range_values_keep_previous_layer() {
        let mut settings = Settings::default();
        let parsed: SettingsFile = toml::from_str(
            "[ocr]\nlanguage = \"  \"\nmin_confidence = 3.0\n\n[detection]\nmax_size = 0\n",
        )
        .expect("parse");
        settings.merge(parsed);
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn zero_parallelism_resets_to_default() {
        let mut settings = Settings::default();
        let explicit: SettingsFile = toml::from_str("[batch]\nmax_parallelism = 4\n").expect("parse");
        settings.merge(explicit);
        assert_eq!(settings.batch.max_parallelism, NonZeroUsize::new(4));

        let zero: SettingsFile = toml::from_str("[batch]\nmax_parallelism = 0\n").expect("parse");
        settings.merge(zero);
        assert_eq!(settings.batch.max_parallelism, None);
    }

    #[test]
    fn missing_extra_file_is_an_error() {
        let err = load_settings(Some(Path::new("/definitely/not/here.toml")))
            .expect_err("missing file");
        assert!(err.to_string().contains("settings file not found"));
    }
}
