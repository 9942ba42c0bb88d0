use crate::error::Result;
use crate::quality::{QualityAnalyzer, QualityLevel, QualityMetrics};
use crate::settings::RecognitionSettings;
use std::path::Path;

pub struct ParameterRecommender;

impl ParameterRecommender {
    pub fn recommend(
        path: &Path,
        base: &RecognitionSettings,
    ) -> Result<(RecognitionSettings, QualityMetrics)> {
        let metrics = QualityAnalyzer::analyze(path)?;
        let settings = Self::recommend_for(&metrics, base);
        Ok((settings, metrics))
    }

    /// Returns a copy of `base` with the detection fields tuned for the
    /// measured quality. Language, provider and model fields are untouched.
    pub fn recommend_for(metrics: &QualityMetrics, base: &RecognitionSettings) -> RecognitionSettings {
        let mut settings = base.clone();
        match metrics.quality_level {
            QualityLevel::High => {
                settings.max_size = if metrics.max_dimension() >= 2000 { 1280 } else { 1024 };
                settings.unclip_ratio = 1.5;
                settings.box_score_threshold = 0.6;
                settings.threshold = 0.3;
            }
            QualityLevel::Medium => {
                let very_blurry = metrics.blur_score < 150.0;
                settings.max_size = 1280;
                settings.unclip_ratio = if very_blurry { 2.0 } else { 1.8 };
                settings.box_score_threshold = if very_blurry { 0.5 } else { 0.55 };
                settings.threshold = 0.3;
            }
            QualityLevel::Low => {
                settings.max_size = 1920;
                settings.unclip_ratio = 2.0;
                settings.box_score_threshold = 0.5;
                settings.threshold = 0.25;
                if metrics.contrast < 30.0 {
                    settings.use_preprocessing = true;
                }
            }
        }
        settings
    }

    pub fn explain(metrics: &QualityMetrics, settings: &RecognitionSettings) -> String {
        format!(
            "[Image quality]\n\
             Resolution: {}x{} ({}px)\n\
             Blur score: {:.1} ({})\n\
             Contrast: {:.1} ({})\n\
             Brightness: {:.1}\n\
             Quality level: {}\n\
             \n\
             [Recommended parameters]\n\
             MaxSize: {}\n\
             UnclipRatio: {}\n\
             BoxScoreThreshold: {}\n\
             Threshold: {}\n\
             UsePreprocessing: {}\n\
             \n\
             [Reason]\n\
             {}",
            metrics.width,
            metrics.height,
            metrics.max_dimension(),
            metrics.blur_score,
            blur_description(metrics.blur_score),
            metrics.contrast,
            contrast_description(metrics.contrast),
            metrics.brightness,
            metrics.quality_level,
            settings.max_size,
            settings.unclip_ratio,
            settings.box_score_threshold,
            settings.threshold,
            settings.use_preprocessing,
            reasoning(metrics.quality_level),
        )
    }
}

fn blur_description(blur_score: f64) -> &'static str {
    if blur_score >= 300.0 {
        "sharp"
    } else if blur_score >= 100.0 {
        "moderate"
    } else {
        "blurry"
    }
}

fn contrast_description(contrast: f64) -> &'static str {
    if contrast >= 50.0 {
        "high contrast"
    } else if contrast >= 30.0 {
        "medium contrast"
    } else {
        "low contrast"
    }
}

fn reasoning(level: QualityLevel) -> &'static str {
    match level {
        QualityLevel::High => {
            "The image is clean, so standard parameters give the best result while keeping processing fast."
        }
        QualityLevel::Medium => {
            "The image is average, so MaxSize and UnclipRatio are raised to make up for blur or weak contrast."
        }
        QualityLevel::Low => {
            "The image is poor, so the most aggressive parameters are used to recover as much text as possible."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(blur_score: f64, contrast: f64, width: u32, height: u32) -> QualityMetrics {
        QualityMetrics {
            blur_score,
            contrast,
            brightness: 128.0,
            width,
            height,
            quality_level: QualityAnalyzer::determine_level(blur_score, contrast, width.max(height)),
        }
    }

    fn detection(s: &RecognitionSettings) -> (u32, f32, f32, f32, bool) {
        (s.max_size, s.unclip_ratio, s.box_score_threshold, s.threshold, s.use_preprocessing)
    }

    #[test]
    fn high_quality_boundary_and_boost() {
        let base = RecognitionSettings::default();
        let high = ParameterRecommender::recommend_for(&metrics(300.0, 50.0, 1000, 700), &base);
        assert_eq!(detection(&high), (1024, 1.5, 0.6, 0.3, false));

        let boosted = ParameterRecommender::recommend_for(&metrics(400.0, 60.0, 2000, 1500), &base);
        assert_eq!(boosted.max_size, 1280);
    }

    #[test]
    fn just_below_high_falls_to_medium() {
        let base = RecognitionSettings::default();
        let m = metrics(299.9, 50.0, 1200, 900);
        assert_eq!(m.quality_level, QualityLevel::Medium);
        let s = ParameterRecommender::recommend_for(&m, &base);
        assert_eq!(detection(&s), (1280, 1.8, 0.55, 0.3, false));

        let blurry = ParameterRecommender::recommend_for(&metrics(149.9, 40.0, 1200, 900), &base);
        assert_eq!(detection(&blurry), (1280, 2.0, 0.5, 0.3, false));

        let edge = ParameterRecommender::recommend_for(&metrics(150.0, 40.0, 1200, 900), &base);
        assert_eq!(detection(&edge), (1280, 1.8, 0.55, 0.3, false));
    }

    #[test]
    fn low_quality_enables_preprocessing_only_for_flat_contrast() {
        let base = RecognitionSettings::default();
        let flat = ParameterRecommender::recommend_for(&metrics(50.0, 29.9, 600, 400), &base);
        assert_eq!(detection(&flat), (1920, 2.0, 0.5, 0.25, true));

        let small = ParameterRecommender::recommend_for(&metrics(500.0, 40.0, 600, 400), &base);
        assert!(!small.use_preprocessing);
        assert_eq!(small.max_size, 1920);
    }

    #[test]
    fn base_settings_are_copied_not_shared() {
        let base = RecognitionSettings {
            language: "English".to_string(),
            model_path: Some("/models/en".to_string()),
            min_confidence: 0.8,
            ..RecognitionSettings::default()
        };
        let snapshot = base.clone();
        let s = ParameterRecommender::recommend_for(&metrics(10.0, 5.0, 100, 100), &base);
        assert_eq!(base, snapshot);
        assert_eq!(s.language, "English");
        assert_eq!(s.model_path.as_deref(), Some("/models/en"));
        assert_eq!(s.min_confidence, 0.8);
        assert!(s.use_preprocessing);
    }

    #[test]
    fn explanation_text() {
        let m = metrics(400.0, 60.0, 2000, 1500);
        let s = ParameterRecommender::recommend_for(&m, &RecognitionSettings::default());
        insta::assert_snapshot!(ParameterRecommender::explain(&m, &s), @r"
        [Image quality]
        Resolution: 2000x1500 (2000px)
        Blur score: 400.0 (sharp)
        Contrast: 60.0 (high contrast)
        Brightness: 128.0
        Quality level: High

        [Recommended parameters]
        MaxSize: 1280
        UnclipRatio: 1.5
        BoxScoreThreshold: 0.6
        Threshold: 0.3
        UsePreprocessing: false

        [Reason]
        The image is clean, so standard parameters give the best result while keeping processing fast.
        ");
    }
}
