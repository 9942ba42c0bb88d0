use image::{DynamicImage, GrayImage, Luma};

const BINARIZE_THRESHOLD: u8 = 165;
const UNSHARP_SIGMA: f32 = 3.0;

/// Single-channel luminance with BT.601 weights; transparent pixels are
/// composited onto white first.
pub(crate) fn to_luma(image: &DynamicImage) -> GrayImage {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut luma = GrayImage::new(width, height);

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as f32 / 255.0;
        let r = r as f32 * alpha + 255.0 * (1.0 - alpha);
        let g = g as f32 * alpha + 255.0 * (1.0 - alpha);
        let b = b as f32 * alpha + 255.0 * (1.0 - alpha);
        let value = (0.299 * r + 0.587 * g + 0.114 * b).round().clamp(0.0, 255.0) as u8;
        luma.put_pixel(x, y, Luma([value]));
    }
    luma
}

pub(crate) fn preprocess_for_ocr(image: &DynamicImage) -> DynamicImage {
    let luma = to_luma(image);
    let stretched = contrast_stretch(&luma);
    let sharpened = image::imageops::unsharpen(&stretched, UNSHARP_SIGMA, 0);
    DynamicImage::ImageLuma8(binarize(&sharpened, BINARIZE_THRESHOLD))
}

fn contrast_stretch(image: &GrayImage) -> GrayImage {
    let mut min = 255u8;
    let mut max = 0u8;
    for pixel in image.pixels() {
        let value = pixel[0];
        min = min.min(value);
        max = max.max(value);
    }

    if max <= min {
        return image.clone();
    }

    let scale = 255.0 / (max as f32 - min as f32);
    let mut output = image.clone();
    for pixel in output.pixels_mut() {
        let value = pixel[0];
        pixel[0] = ((value.saturating_sub(min)) as f32 * scale).round() as u8;
    }
    output
}

fn binarize(image: &GrayImage, threshold: u8) -> GrayImage {
    let mut output = image.clone();
    for pixel in output.pixels_mut() {
        pixel[0] = if pixel[0] > threshold { 255 } else { 0 };
    }
    output
}
