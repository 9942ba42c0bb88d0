use anyhow::{anyhow, Result};
use std::collections::BTreeMap;

use super::text::LineText;

/// One recognized line from tesseract TSV output, in pixels of the image
/// that was handed to tesseract. `conf` stays on tesseract's 0-100 scale.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct TsvLine {
    pub(super) left: u32,
    pub(super) top: u32,
    pub(super) width: u32,
    pub(super) height: u32,
    pub(super) text: String,
    pub(super) conf: f32,
}

struct WordToken {
    text: String,
    left: u32,
    top: u32,
    width: u32,
    height: u32,
    conf: f32,
}

const WORD_LEVEL: i32 = 5;
const TSV_COLUMNS: usize = 12;

pub(super) fn parse_tsv_lines(tsv: &str) -> Result<Vec<TsvLine>> {
    let mut rows = tsv.lines();
    let header = rows.next().ok_or_else(|| anyhow!("tesseract returned empty tsv"))?;
    if !header.starts_with("level") {
        return Err(anyhow!("unexpected tesseract tsv header: {}", header));
    }

    let mut word_map: BTreeMap<(i32, i32, i32, i32), Vec<WordToken>> = BTreeMap::new();
    for row in rows {
        let cols = row.split('\t').collect::<Vec<_>>();
        if cols.len() < TSV_COLUMNS {
            continue;
        }
        let level: i32 = cols[0].parse().unwrap_or(0);
        if level != WORD_LEVEL {
            continue;
        }
        let conf: f32 = cols[10].parse().unwrap_or(-1.0);
        let text = cols[11].trim();
        if text.is_empty() || conf < 0.0 {
            continue;
        }
        let key = (
            cols[1].parse().unwrap_or(0),
            cols[2].parse().unwrap_or(0),
            cols[3].parse().unwrap_or(0),
            cols[4].parse().unwrap_or(0),
        );
        word_map.entry(key).or_default().push(WordToken {
            text: text.to_string(),
            left: cols[6].parse().unwrap_or(0),
            top: cols[7].parse().unwrap_or(0),
            width: cols[8].parse().unwrap_or(0),
            height: cols[9].parse().unwrap_or(0),
            conf,
        });
    }

    Ok(word_map.into_values().filter_map(build_line).collect())
}

fn build_line(mut words: Vec<WordToken>) -> Option<TsvLine> {
    words.sort_by_key(|word| (word.left, word.top));
    let left = words.iter().map(|word| word.left).min()?;
    let top = words.iter().map(|word| word.top).min()?;
    let right = words.iter().map(|word| word.left + word.width).max()?;
    let bottom = words.iter().map(|word| word.top + word.height).max()?;

    let mut text = LineText::default();
    for word in &words {
        text.push(&word.text, word.conf);
    }
    if text.is_empty() {
        return None;
    }
    Some(TsvLine {
        left,
        top,
        width: right - left,
        height: bottom - top,
        conf: text.confidence(),
        text: text.into_text(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    #[test]
    fn groups_words_into_lines() {
        let tsv = format!(
            "{HEADER}\n\
             1\t1\t0\t0\t0\t0\t0\t0\t800\t600\t-1\t\n\
             5\t1\t1\t1\t1\t1\t100\t50\t40\t20\t90\tHello\n\
             5\t1\t1\t1\t1\t2\t150\t52\t50\t20\t80\tworld\n\
             5\t1\t2\t1\t1\t1\t300\t200\t30\t60\t70\t漫画\n"
        );
        let lines = parse_tsv_lines(&tsv).expect("parse tsv");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "Hello world");
        assert_eq!((lines[0].left, lines[0].top), (100, 50));
        assert_eq!((lines[0].width, lines[0].height), (100, 22));
        assert!((lines[0].conf - 85.0).abs() < 1e-3);
        assert_eq!(lines[1].text, "漫画");
    }

    #[test]
    fn skips_blank_and_unscored_words() {
        let tsv = format!(
            "{HEADER}\n5\t1\t1\t1\t1\t1\t0\t0\t10\t10\t-1\tghost\n5\t1\t1\t1\t1\t2\t0\t0\t10\t10\t50\t \n"
        );
        assert!(parse_tsv_lines(&tsv).expect("parse tsv").is_empty());
    }

    #[test]
    fn rejects_output_without_header() {
        assert!(parse_tsv_lines("").is_err());
        assert!(parse_tsv_lines("garbage").is_err());
    }
}
