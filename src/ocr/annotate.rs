use crate::image_loader::load_image;
use crate::ocr::layout::OrderedRegion;
use crate::ocr::{BoundingBox, TextRegion};
use anyhow::{anyhow, Context, Result};
use image::{DynamicImage, RgbaImage};
use resvg::render;
use std::path::Path;
use std::sync::Arc;
use tiny_skia::Pixmap;
use usvg::{fontdb, Options, Tree};

const BOX_COLOR: &str = "#00ff00";
const LABEL_COLOR: &str = "#ff0000";
const CENTER_COLOR: &str = "#0000ff";
const FAILED_COLOR: &str = "#808080";
const LABEL_FONT_SIZE: i32 = 20;
const LEGEND_TOP: i32 = 60;
const LEGEND_STEP: i32 = 30;

/// Confidence bands used by [`annotate_confidence`], best first.
const CONFIDENCE_BANDS: [(&str, &str); 4] = [
    ("High (>=70%)", "#00ff00"),
    ("Medium (50-70%)", "#ffff00"),
    ("Low (<50%)", "#ff0000"),
    ("Failed", FAILED_COLOR),
];

/// Draws every region's box with its reading-order number on a copy of the
/// page at `path` and writes it to `output`.
pub fn annotate_reading_order(path: &Path, regions: &[OrderedRegion], output: &Path) -> Result<()> {
    let page = load_image(path)?;
    let mut svg = open_svg(page.width(), page.height());

    for ordered in regions {
        let bbox = &ordered.region.bounding_box;
        push_rect(&mut svg, bbox, BOX_COLOR);

        let label = ordered.reading_order.to_string();
        let mut baseline = bbox.y - 5;
        if baseline < 20 {
            baseline = bbox.y + 20;
        }
        let label_width = label.chars().count() as i32 * (LABEL_FONT_SIZE * 3 / 5) + 4;
        svg.push_str(&format!(
            r##"<rect x="{x}" y="{y}" width="{w}" height="{h}" fill="#ffffff"/>"##,
            x = bbox.x - 2,
            y = baseline - LABEL_FONT_SIZE - 2,
            w = label_width,
            h = LABEL_FONT_SIZE + 6
        ));
        push_text(&mut svg, bbox.x, baseline, LABEL_FONT_SIZE, LABEL_COLOR, &label, true);

        svg.push_str(&format!(
            r#"<circle cx="{cx}" cy="{cy}" r="3" fill="{color}"/>"#,
            cx = bbox.center_x(),
            cy = bbox.y + bbox.height / 2,
            color = CENTER_COLOR
        ));
    }

    push_text(&mut svg, 10, 30, 18, "#000000", "Reading order", true);
    svg.push_str("</svg>");
    write_annotated(page, &svg, output)
}

/// Draws every region's box colored by its confidence band, plus a legend.
pub fn annotate_confidence(path: &Path, regions: &[TextRegion], output: &Path) -> Result<()> {
    let page = load_image(path)?;
    let mut svg = open_svg(page.width(), page.height());

    for region in regions {
        push_rect(&mut svg, &region.bounding_box, confidence_color(region));
    }

    for (index, (label, color)) in CONFIDENCE_BANDS.iter().enumerate() {
        let y = LEGEND_TOP + index as i32 * LEGEND_STEP;
        svg.push_str(&format!(
            r##"<rect x="10" y="{y}" width="20" height="20" fill="{color}" stroke="#000000" stroke-width="1"/>"##
        ));
        push_text(&mut svg, 35, y + 15, 13, "#000000", label, false);
    }

    svg.push_str("</svg>");
    write_annotated(page, &svg, output)
}

fn confidence_color(region: &TextRegion) -> &'static str {
    if !region.is_scored() || region.text.trim().is_empty() {
        FAILED_COLOR
    } else if region.confidence >= 0.7 {
        CONFIDENCE_BANDS[0].1
    } else if region.confidence >= 0.5 {
        CONFIDENCE_BANDS[1].1
    } else {
        CONFIDENCE_BANDS[2].1
    }
}

fn open_svg(width: u32, height: u32) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    )
}

fn push_rect(svg: &mut String, bbox: &BoundingBox, color: &str) {
    svg.push_str(&format!(
        r#"<rect x="{x}" y="{y}" width="{w}" height="{h}" fill="none" stroke="{color}" stroke-width="2"/>"#,
        x = bbox.x,
        y = bbox.y,
        w = bbox.width,
        h = bbox.height
    ));
}

fn push_text(svg: &mut String, x: i32, y: i32, size: i32, color: &str, text: &str, bold: bool) {
    let weight = if bold { "bold" } else { "normal" };
    svg.push_str(&format!(
        r#"<text x="{x}" y="{y}" font-family="sans-serif" font-size="{size}" font-weight="{weight}" fill="{color}">{text}</text>"#,
        text = escape_xml(text)
    ));
}

/// Renders the overlay on a transparent canvas and composites it onto the
/// page.
fn write_annotated(page: DynamicImage, svg: &str, output: &Path) -> Result<()> {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    let options = Options {
        fontdb: Arc::new(db),
        ..Options::default()
    };
    let tree = Tree::from_str(svg, &options).with_context(|| "failed to parse annotation SVG")?;
    let size = tree.size().to_int_size();
    let mut pixmap =
        Pixmap::new(size.width(), size.height()).ok_or_else(|| anyhow!("empty annotation size"))?;
    render(&tree, tiny_skia::Transform::identity(), &mut pixmap.as_mut());

    let straight: Vec<u8> = pixmap
        .pixels()
        .iter()
        .flat_map(|pixel| {
            let color = pixel.demultiply();
            [color.red(), color.green(), color.blue(), color.alpha()]
        })
        .collect();
    let overlay = RgbaImage::from_raw(size.width(), size.height(), straight)
        .ok_or_else(|| anyhow!("failed to build overlay buffer"))?;

    let mut canvas = page.to_rgba8();
    image::imageops::overlay(&mut canvas, &overlay, 0, 0);
    DynamicImage::ImageRgba8(canvas)
        .to_rgb8()
        .save(output)
        .with_context(|| format!("failed to write annotated image: {}", output.display()))?;
    tracing::debug!("annotated image written to {}", output.display());
    Ok(())
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
