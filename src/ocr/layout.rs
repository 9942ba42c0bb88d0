use crate::ocr::TextRegion;
use serde::Serialize;
use std::fmt::Write as _;

const BAND_HEIGHT: i32 = 50;
const WIDE_ASPECT_RATIO: f64 = 2.0;
const DIRECTION_SAMPLE: usize = 10;
const MIN_HORIZONTAL_STEP: i32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadingDirection {
    #[default]
    Auto,
    LeftToRightTopToBottom,
    RightToLeftTopToBottom,
    TopToBottomRightToLeft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageLayoutInfo {
    pub is_two_page: bool,
    pub middle_x: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderedRegion {
    pub region: TextRegion,
    /// 1-based rank in reading order.
    pub reading_order: usize,
}

/// Decides whether the regions form a two-page spread and where the pages
/// split.
///
/// The gap search is a heuristic tuned on scanned spreads; it does not
/// hold for every layout.
pub fn detect_pages(regions: &[TextRegion]) -> PageLayoutInfo {
    if regions.len() < 4 {
        return PageLayoutInfo::default();
    }

    let mut centers: Vec<i32> = regions.iter().map(|r| r.bounding_box.center_x()).collect();
    centers.sort_unstable();

    let min_x = regions.iter().map(|r| r.bounding_box.x).min().unwrap_or(0);
    let max_x = regions.iter().map(|r| r.bounding_box.right()).max().unwrap_or(0);
    let width = max_x - min_x;
    let mut middle_x = min_x + width / 2;

    let (left, right) = split_counts(&centers, middle_x);
    let is_two_page = left >= 3 && right >= 3 && balance(left, right) >= 0.4;

    if is_two_page {
        let low = min_x as f64 + width as f64 * 0.3;
        let high = min_x as f64 + width as f64 * 0.7;
        let mut max_gap = 0;
        let mut gap_position = middle_x;
        for pair in centers.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            let gap = next - prev;
            if gap > max_gap && (next as f64) > low && (next as f64) < high {
                max_gap = gap;
                gap_position = (next + prev) / 2;
            }
        }

        if max_gap as f64 > width as f64 * 0.05 {
            let (left, right) = split_counts(&centers, gap_position);
            if balance(left, right) >= 0.3 {
                middle_x = gap_position;
            }
        }
    }

    PageLayoutInfo {
        is_two_page,
        middle_x,
    }
}

fn split_counts(centers: &[i32], middle_x: i32) -> (usize, usize) {
    let left = centers.iter().filter(|&&c| c < middle_x).count();
    (left, centers.len() - left)
}

fn balance(left: usize, right: usize) -> f64 {
    let max = left.max(right);
    if max == 0 {
        return 0.0;
    }
    left.min(right) as f64 / max as f64
}

/// Resolves `Auto` from region geometry. Fewer than three regions, or a
/// tie in horizontal steps, reads right-to-left.
pub fn detect_reading_direction(regions: &[TextRegion]) -> ReadingDirection {
    if regions.len() < 3 {
        return ReadingDirection::RightToLeftTopToBottom;
    }

    let mean_aspect = regions
        .iter()
        .map(|r| r.bounding_box.width as f64 / r.bounding_box.height.max(1) as f64)
        .sum::<f64>()
        / regions.len() as f64;

    if mean_aspect <= WIDE_ASPECT_RATIO {
        return ReadingDirection::TopToBottomRightToLeft;
    }

    let mut left_to_right = 0;
    let mut right_to_left = 0;
    let sample = &regions[..regions.len().min(DIRECTION_SAMPLE)];
    for pair in sample.windows(2) {
        let delta = pair[1].bounding_box.x - pair[0].bounding_box.x;
        if delta.abs() > MIN_HORIZONTAL_STEP {
            if delta > 0 {
                left_to_right += 1;
            } else {
                right_to_left += 1;
            }
        }
    }

    if left_to_right > right_to_left {
        ReadingDirection::LeftToRightTopToBottom
    } else {
        ReadingDirection::RightToLeftTopToBottom
    }
}

pub fn sort_by_reading_order(regions: &[TextRegion], direction: ReadingDirection) -> Vec<TextRegion> {
    let direction = match direction {
        ReadingDirection::Auto => detect_reading_direction(regions),
        other => other,
    };

    let mut sorted = regions.to_vec();
    match direction {
        ReadingDirection::LeftToRightTopToBottom => {
            sorted.sort_by_key(|r| (r.bounding_box.y / BAND_HEIGHT, r.bounding_box.x));
        }
        ReadingDirection::RightToLeftTopToBottom => {
            let layout = detect_pages(regions);
            if layout.is_two_page {
                let (mut right, mut left): (Vec<_>, Vec<_>) = sorted
                    .into_iter()
                    .partition(|r| r.bounding_box.x >= layout.middle_x);
                sort_row_right_to_left(&mut right);
                sort_row_right_to_left(&mut left);
                right.extend(left);
                sorted = right;
            } else {
                sort_row_right_to_left(&mut sorted);
            }
        }
        ReadingDirection::TopToBottomRightToLeft => {
            sorted.sort_by_key(|r| {
                (
                    std::cmp::Reverse(r.bounding_box.x / BAND_HEIGHT),
                    r.bounding_box.y,
                )
            });
        }
        ReadingDirection::Auto => {}
    }
    sorted
}

fn sort_row_right_to_left(regions: &mut [TextRegion]) {
    regions.sort_by_key(|r| {
        (
            r.bounding_box.y / BAND_HEIGHT,
            std::cmp::Reverse(r.bounding_box.x),
        )
    });
}

pub fn assign_reading_order(regions: &[TextRegion], direction: ReadingDirection) -> Vec<OrderedRegion> {
    sort_by_reading_order(regions, direction)
        .into_iter()
        .enumerate()
        .map(|(index, region)| OrderedRegion {
            region,
            reading_order: index + 1,
        })
        .collect()
}

/// Human-readable dump of the engine's own ordering for the first ten
/// regions.
pub fn analyze_original_order(regions: &[TextRegion]) -> String {
    if regions.len() < 2 {
        return "Not enough regions to analyze order.".to_string();
    }

    let mut out = String::from("Original engine order:\n\n");
    for (index, region) in regions.iter().take(DIRECTION_SAMPLE).enumerate() {
        let bbox = &region.bounding_box;
        let _ = writeln!(out, "[{}] {}", index + 1, region.text);
        let _ = writeln!(out, "    position: x={}, y={}", bbox.x, bbox.y);
        if index > 0 {
            let prev = &regions[index - 1].bounding_box;
            let _ = writeln!(
                out,
                "    step from previous: dx={}, dy={}",
                signed(bbox.x - prev.x),
                signed(bbox.y - prev.y)
            );
        }
        out.push('\n');
    }
    out
}

fn signed(value: i32) -> String {
    if value > 0 {
        format!("+{value}")
    } else {
        value.to_string()
    }
}

pub fn diagnose_page_detection(regions: &[TextRegion]) -> String {
    let layout = detect_pages(regions);
    let mut out = String::from("=== page detection ===\n");
    let verdict = if layout.is_two_page {
        "two-page spread"
    } else {
        "single page"
    };
    let _ = writeln!(out, "layout: {verdict}");

    if layout.is_two_page {
        let mut left: Vec<&TextRegion> = Vec::new();
        let mut right: Vec<&TextRegion> = Vec::new();
        for region in regions {
            if region.bounding_box.center_x() < layout.middle_x {
                left.push(region);
            } else {
                right.push(region);
            }
        }
        left.sort_by_key(|r| r.bounding_box.x);
        right.sort_by_key(|r| r.bounding_box.x);

        let _ = writeln!(out, "split at x = {}", layout.middle_x);
        let _ = writeln!(out, "right page regions: {}", right.len());
        let _ = writeln!(out, "left page regions: {}", left.len());
        out.push_str("reading order: right page, then left page\n\n");
        let _ = writeln!(out, "left page first 5: {}", first_xs(&left));
        let _ = writeln!(out, "right page first 5: {}", first_xs(&right));
    }
    out
}

fn first_xs(regions: &[&TextRegion]) -> String {
    regions
        .iter()
        .take(5)
        .map(|r| format!("x={}", r.bounding_box.x))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::BoundingBox;

    fn region(text: &str, x: i32, y: i32, w: i32, h: i32) -> TextRegion {
        TextRegion::new(text, 0.9, BoundingBox::from_rect(x, y, w, h))
    }

    fn texts(regions: &[TextRegion]) -> Vec<&str> {
        regions.iter().map(|r| r.text.as_str()).collect()
    }

    fn spread() -> Vec<TextRegion> {
        vec![
            region("L1", 50, 10, 40, 100),
            region("R1", 600, 10, 40, 100),
            region("L2", 150, 10, 40, 100),
            region("R2", 700, 10, 40, 100),
            region("L3", 250, 10, 40, 100),
            region("R3", 800, 10, 40, 100),
            region("L4", 350, 10, 40, 100),
            region("R4", 900, 10, 40, 100),
        ]
    }

    // Small deterministic generator so permutation checks need no extra crate.
    fn scattered(count: usize) -> Vec<TextRegion> {
        let mut seed: u32 = 0x2545_f491;
        let mut next = move |bound: u32| {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            ((seed >> 8) % bound) as i32
        };
        (0..count)
            .map(|i| {
                let w = 10 + next(200);
                let h = 10 + next(200);
                region(&format!("r{i}"), next(2000), next(3000), w, h)
            })
            .collect()
    }

    #[test]
    fn fewer_than_four_regions_is_single_page() {
        let regions = &spread()[..3];
        assert_eq!(detect_pages(regions), PageLayoutInfo::default());
    }

    #[test]
    fn balanced_spread_splits_in_gutter() {
        let layout = detect_pages(&spread());
        assert!(layout.is_two_page);
        assert_eq!(layout.middle_x, 495);
    }

    fn boxes_at(xs: &[i32], w: i32) -> Vec<TextRegion> {
        xs.iter().map(|&x| region("b", x, 10, w, 100)).collect()
    }

    #[test]
    fn off_centre_gutter_moves_the_split() {
        // Extent 0..900 puts the geometric middle at 450; the widest gap
        // between centres 440 and 580 is further right.
        let regions = boxes_at(&[0, 100, 200, 300, 420, 560, 700, 860], 40);
        let layout = detect_pages(&regions);
        assert!(layout.is_two_page);
        assert_eq!(layout.middle_x, 510);
    }

    #[test]
    fn evenly_spaced_regions_keep_geometric_middle() {
        // Every gap is 40px, under 5% of the 940px extent.
        let xs: Vec<i32> = (0..24).map(|i| i * 40).collect();
        let layout = detect_pages(&boxes_at(&xs, 20));
        assert!(layout.is_two_page);
        assert_eq!(layout.middle_x, 470);
    }

    #[test]
    fn lopsided_gap_keeps_geometric_middle() {
        // The widest gap sits after the first centre, which would leave one
        // region on the left page against seven on the right.
        let regions = boxes_at(&[0, 310, 320, 330, 590, 600, 610, 980], 20);
        let layout = detect_pages(&regions);
        assert!(layout.is_two_page);
        assert_eq!(layout.middle_x, 500);
    }

    #[test]
    fn one_sided_clusters_are_single_page() {
        let column: Vec<TextRegion> = (0..10).map(|i| region("c", 300, i * 60, 40, 50)).collect();
        assert!(!detect_pages(&column).is_two_page);

        let mut skewed: Vec<TextRegion> = (0..9).map(|i| region("s", i * 5, i * 60, 40, 50)).collect();
        skewed.push(region("far", 900, 0, 40, 50));
        assert!(!detect_pages(&skewed).is_two_page);
    }

    #[test]
    fn right_to_left_reads_right_page_first() {
        let sorted = sort_by_reading_order(&spread(), ReadingDirection::RightToLeftTopToBottom);
        assert_eq!(
            texts(&sorted),
            vec!["R4", "R3", "R2", "R1", "L4", "L3", "L2", "L1"]
        );
    }

    #[test]
    fn right_to_left_single_page_uses_row_bands() {
        let regions = vec![
            region("a", 10, 120, 30, 30),
            region("b", 200, 5, 30, 30),
            region("c", 100, 30, 30, 30),
        ];
        let sorted = sort_by_reading_order(&regions, ReadingDirection::RightToLeftTopToBottom);
        assert_eq!(texts(&sorted), vec!["b", "c", "a"]);
    }

    #[test]
    fn left_to_right_groups_rows_by_band() {
        let regions = vec![
            region("second", 100, 40, 30, 10),
            region("first", 10, 49, 30, 10),
            region("next-row", 0, 50, 30, 10),
        ];
        let sorted = sort_by_reading_order(&regions, ReadingDirection::LeftToRightTopToBottom);
        assert_eq!(texts(&sorted), vec!["first", "second", "next-row"]);
    }

    #[test]
    fn vertical_columns_read_right_to_left() {
        let regions = vec![
            region("left-top", 10, 0, 20, 100),
            region("right-bottom", 210, 200, 20, 100),
            region("right-top", 220, 0, 20, 100),
        ];
        let sorted = sort_by_reading_order(&regions, ReadingDirection::TopToBottomRightToLeft);
        assert_eq!(texts(&sorted), vec!["right-top", "right-bottom", "left-top"]);
    }

    #[test]
    fn auto_direction_follows_geometry() {
        let tall = vec![
            region("a", 0, 0, 20, 100),
            region("b", 50, 0, 20, 100),
            region("c", 100, 0, 20, 100),
        ];
        assert_eq!(
            detect_reading_direction(&tall),
            ReadingDirection::TopToBottomRightToLeft
        );

        let wide_ltr = vec![
            region("a", 0, 0, 300, 20),
            region("b", 400, 0, 300, 20),
            region("c", 800, 0, 300, 20),
        ];
        assert_eq!(
            detect_reading_direction(&wide_ltr),
            ReadingDirection::LeftToRightTopToBottom
        );

        let wide_tie = vec![
            region("a", 0, 0, 300, 20),
            region("b", 400, 0, 300, 20),
            region("c", 0, 40, 300, 20),
        ];
        assert_eq!(
            detect_reading_direction(&wide_tie),
            ReadingDirection::RightToLeftTopToBottom
        );

        assert_eq!(
            detect_reading_direction(&tall[..2]),
            ReadingDirection::RightToLeftTopToBottom
        );
    }

    #[test]
    fn reading_order_is_a_permutation_for_every_direction() {
        let directions = [
            ReadingDirection::Auto,
            ReadingDirection::LeftToRightTopToBottom,
            ReadingDirection::RightToLeftTopToBottom,
            ReadingDirection::TopToBottomRightToLeft,
        ];
        for count in [0usize, 1, 2, 50] {
            let regions = scattered(count);
            for direction in directions {
                let ordered = assign_reading_order(&regions, direction);
                let mut orders: Vec<usize> = ordered.iter().map(|o| o.reading_order).collect();
                orders.sort_unstable();
                let expected: Vec<usize> = (1..=count).collect();
                assert_eq!(orders, expected, "count {count}, {direction:?}");

                let mut names: Vec<&str> = ordered.iter().map(|o| o.region.text.as_str()).collect();
                names.sort_unstable();
                let mut original = texts(&regions);
                original.sort_unstable();
                assert_eq!(names, original);
            }
        }
    }

    #[test]
    fn original_order_report_lists_deltas() {
        assert_eq!(
            analyze_original_order(&spread()[..1]),
            "Not enough regions to analyze order."
        );
        let report = analyze_original_order(&spread()[..2]);
        assert!(report.contains("[1] L1"));
        assert!(report.contains("[2] R1"));
        assert!(report.contains("dx=+550, dy=0"));
    }

    #[test]
    fn diagnosis_reports_split_for_spread() {
        let report = diagnose_page_detection(&spread());
        assert!(report.contains("layout: two-page spread"));
        assert!(report.contains("split at x = 495"));
        assert!(report.contains("left page first 5: x=50, x=150, x=250, x=350"));

        let single = diagnose_page_detection(&spread()[..2]);
        assert!(single.contains("layout: single page"));
        assert!(!single.contains("split at"));
    }
}
