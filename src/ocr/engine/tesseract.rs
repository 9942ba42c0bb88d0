use anyhow::{anyhow, Context, Result};
use image::{DynamicImage, GenericImageView};
use std::io::Write;
use std::path::Path;
use std::process::Command;
use tracing::debug;

use super::parse::{parse_tsv_lines, TsvLine};
use super::text::LineText;
use super::{rect_quad, EngineRegion, OcrEngine, Quad, Recognition};
use crate::settings::RecognitionSettings;

/// Auto page segmentation with orientation and script detection.
const PSM_AUTO_OSD: u32 = 1;
const PSM_AUTO: u32 = 3;
const PSM_SINGLE_BLOCK: u32 = 6;

/// `OcrEngine` backed by the `tesseract` command line tool.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    languages: String,
    max_size: u32,
    page_psm: u32,
}

impl TesseractEngine {
    pub fn new(settings: &RecognitionSettings) -> Result<Self> {
        if settings.max_size == 0 {
            return Err(anyhow!("max_size must be greater than zero"));
        }
        Ok(Self {
            languages: tesseract_language(&settings.language).to_string(),
            max_size: settings.max_size,
            page_psm: if settings.allow_rotate_detection {
                PSM_AUTO_OSD
            } else {
                PSM_AUTO
            },
        })
    }

    pub fn languages(&self) -> &str {
        &self.languages
    }

    fn run_lines(&self, image: &DynamicImage, psm: u32) -> Result<(Vec<TsvLine>, f32)> {
        let (width, height) = image.dimensions();
        let scale = downscale_factor(width, height, self.max_size);
        let input = if scale < 1.0 {
            let target_w = ((width as f32 * scale).round() as u32).max(1);
            let target_h = ((height as f32 * scale).round() as u32).max(1);
            image.resize_exact(target_w, target_h, image::imageops::FilterType::Lanczos3)
        } else {
            image.clone()
        };

        let mut tmp = tempfile::Builder::new()
            .prefix("manga-ocr-")
            .suffix(".png")
            .tempfile()
            .with_context(|| "failed to create temp file for OCR")?;
        input
            .write_to(&mut tmp, image::ImageFormat::Png)
            .with_context(|| "failed to write temp image for OCR")?;
        tmp.flush().ok();

        let tsv = run_tesseract_tsv(tmp.path(), &self.languages, psm)?;
        let lines = parse_tsv_lines(&tsv)?;
        debug!(
            "tesseract: {} line(s) at psm {} (scale {:.3})",
            lines.len(),
            psm,
            scale
        );
        Ok((lines, scale))
    }
}

impl OcrEngine for TesseractEngine {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Quad>> {
        let (lines, scale) = self.run_lines(image, self.page_psm)?;
        Ok(lines.iter().map(|line| line_quad(line, scale)).collect())
    }

    fn recognize(&self, image: &DynamicImage) -> Result<Recognition> {
        let (lines, _) = self.run_lines(image, PSM_SINGLE_BLOCK)?;
        let mut joined = LineText::default();
        for line in &lines {
            joined.push(&line.text, line.conf);
        }
        let score = normalize_conf(joined.confidence());
        Ok(Recognition {
            text: joined.into_text(),
            score,
        })
    }

    fn run_full(&self, image: &DynamicImage) -> Result<Vec<EngineRegion>> {
        let (lines, scale) = self.run_lines(image, self.page_psm)?;
        Ok(lines
            .into_iter()
            .map(|line| EngineRegion {
                quad: line_quad(&line, scale),
                score: normalize_conf(line.conf),
                text: line.text,
            })
            .collect())
    }
}

fn downscale_factor(width: u32, height: u32, max_size: u32) -> f32 {
    let longest = width.max(height);
    if longest <= max_size || longest == 0 {
        1.0
    } else {
        max_size as f32 / longest as f32
    }
}

fn line_quad(line: &TsvLine, scale: f32) -> Quad {
    let restore = |value: u32| (value as f32 / scale).round() as i32;
    rect_quad(
        restore(line.left),
        restore(line.top),
        restore(line.width),
        restore(line.height),
    )
}

fn normalize_conf(conf: f32) -> f32 {
    (conf / 100.0).clamp(0.0, 1.0)
}

fn tesseract_language(language: &str) -> &'static str {
    match language.trim().to_lowercase().as_str() {
        "japanese" | "ja" | "日文" => "jpn",
        "chinese" | "zh" | "中文" | "chinesetraditional" | "zh-tw" | "繁體中文" => "chi_tra",
        "chinesesimplified" | "zh-cn" | "簡體中文" => "chi_sim",
        "english" | "en" | "英文" => "eng",
        "korean" | "ko" | "韓文" => "kor",
        _ => "jpn",
    }
}

pub fn list_tesseract_languages() -> Result<Vec<String>> {
    let output = Command::new("tesseract")
        .arg("--list-langs")
        .output()
        .with_context(|| "failed to run tesseract --list-langs")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("tesseract --list-langs failed: {}", stderr.trim()));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout
        .lines()
        .skip(1)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect())
}

fn run_tesseract_tsv(path: &Path, languages: &str, psm: u32) -> Result<String> {
    let output = Command::new("tesseract")
        .arg(path)
        .arg("stdout")
        .arg("-l")
        .arg(languages)
        .arg("--oem")
        .arg("1")
        .arg("--psm")
        .arg(psm.to_string())
        .arg("tsv")
        .output()
        .with_context(|| "failed to run tesseract (is it installed?)")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("tesseract failed: {}", stderr.trim()));
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_language_names_to_tesseract_codes() {
        assert_eq!(tesseract_language("Japanese"), "jpn");
        assert_eq!(tesseract_language(" zh-CN "), "chi_sim");
        assert_eq!(tesseract_language("zh-tw"), "chi_tra");
        assert_eq!(tesseract_language("English"), "eng");
        assert_eq!(tesseract_language("klingon"), "jpn");
    }

    #[test]
    fn downscales_only_when_longest_side_exceeds_max_size() {
        assert_eq!(downscale_factor(800, 600, 1024), 1.0);
        assert!((downscale_factor(2048, 1000, 1024) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn line_boxes_are_restored_to_source_pixels() {
        let line = TsvLine {
            left: 50,
            top: 10,
            width: 100,
            height: 20,
            text: "x".to_string(),
            conf: 90.0,
        };
        let quad = line_quad(&line, 0.5);
        assert_eq!(quad[0].x, 100);
        assert_eq!(quad[2].x, 300);
        assert_eq!(quad[2].y, 60);
    }

    #[test]
    fn rejects_zero_max_size() {
        let settings = RecognitionSettings {
            max_size: 0,
            ..RecognitionSettings::default()
        };
        assert!(TesseractEngine::new(&settings).is_err());
    }
}
