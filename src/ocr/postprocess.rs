use crate::ocr::geom::overlap_over_smaller;
use crate::ocr::{OcrResult, TextRegion};
use std::cmp::Ordering;

pub const DEFAULT_OVERLAP_THRESHOLD: f32 = 0.95;

/// Post-recognition cleanup. Every stage returns a new `OcrResult` and
/// leaves failed results untouched.
pub struct ResultProcessor;

impl ResultProcessor {
    /// Empty removal, confidence filter, duplicate suppression and text
    /// cleaning, always in that order.
    pub fn process(result: &OcrResult, min_confidence: f32) -> OcrResult {
        let result = Self::remove_empty_regions(result);
        let result = Self::filter_by_confidence(&result, min_confidence);
        let result = Self::remove_duplicates(&result, DEFAULT_OVERLAP_THRESHOLD);
        Self::clean_text(&result)
    }

    pub fn remove_empty_regions(result: &OcrResult) -> OcrResult {
        if !result.success {
            return result.clone();
        }
        let regions = result
            .text_regions
            .iter()
            .filter(|region| !region.text.trim().is_empty())
            .cloned()
            .collect();
        result.with_regions(regions)
    }

    pub fn filter_by_confidence(result: &OcrResult, min_confidence: f32) -> OcrResult {
        if !result.success {
            return result.clone();
        }
        let regions = result
            .text_regions
            .iter()
            .filter(|region| region.is_scored() && region.confidence >= min_confidence)
            .cloned()
            .collect();
        result.with_regions(regions)
    }

    /// Greedy suppression by descending confidence. Output is re-sorted by
    /// `(y, x)`.
    pub fn remove_duplicates(result: &OcrResult, overlap_threshold: f32) -> OcrResult {
        if !result.success {
            return result.clone();
        }
        let mut sorted: Vec<&TextRegion> = result.text_regions.iter().collect();
        sorted.sort_by(|a, b| confidence_key(b).total_cmp(&confidence_key(a)));

        let mut kept: Vec<TextRegion> = Vec::with_capacity(sorted.len());
        'outer: for region in sorted {
            for existing in &kept {
                if overlap_over_smaller(&existing.bounding_box, &region.bounding_box)
                    >= overlap_threshold
                {
                    continue 'outer;
                }
            }
            kept.push(region.clone());
        }
        kept.sort_by(|a, b| compare_position(a, b));
        result.with_regions(kept)
    }

    pub fn clean_text(result: &OcrResult) -> OcrResult {
        if !result.success {
            return result.clone();
        }
        let regions = result
            .text_regions
            .iter()
            .map(|region| {
                let mut region = region.clone();
                region.text = clean(&region.text);
                region
            })
            .collect();
        result.with_regions(regions)
    }
}

fn confidence_key(region: &TextRegion) -> f32 {
    if region.confidence.is_nan() {
        f32::NEG_INFINITY
    } else {
        region.confidence
    }
}

fn compare_position(a: &TextRegion, b: &TextRegion) -> Ordering {
    (a.bounding_box.y, a.bounding_box.x).cmp(&(b.bounding_box.y, b.bounding_box.x))
}

fn is_stripped_control(ch: char) -> bool {
    matches!(ch, '\u{00}'..='\u{08}' | '\u{0B}' | '\u{0C}' | '\u{0E}'..='\u{1F}' | '\u{7F}')
}

/// Drops control characters, collapses whitespace runs to one space and
/// trims.
pub(crate) fn clean(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for ch in text.chars().filter(|ch| !is_stripped_control(*ch)) {
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(ch);
    }
    out
}
