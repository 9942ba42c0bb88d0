use crate::ocr::BoundingBox;

/// Intersection area divided by the smaller of the two box areas.
pub(super) fn overlap_over_smaller(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let ix1 = a.x.max(b.x);
    let iy1 = a.y.max(b.y);
    let ix2 = a.right().min(b.right());
    let iy2 = a.bottom().min(b.bottom());

    if ix2 <= ix1 || iy2 <= iy1 {
        return 0.0;
    }
    let inter = (ix2 - ix1) as i64 * (iy2 - iy1) as i64;
    let min_area = a.area().min(b.area());
    if min_area <= 0 {
        return 0.0;
    }
    inter as f32 / min_area as f32
}
