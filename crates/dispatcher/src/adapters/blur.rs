use image::{GenericImageView, GrayImage};
use wm_domain::error::{Error, Result};

use crate::traits::{BlurAnalyzer, BlurVerdict};

/// Variance-of-Laplacian blur detector over the `image` crate's decoded
/// grayscale buffer. A divided-into-quadrants pass also yields the spatial
/// ratio (fraction of quadrants whose local variance falls below the global
/// threshold), catching partially-blurred screenshots (e.g. a lazy-loaded
/// hero image) that a single whole-image variance would miss.
#[derive(Default)]
pub struct ImageBlurAnalyzer;

const VARIANCE_FLOOR: f64 = 100.0;

impl BlurAnalyzer for ImageBlurAnalyzer {
    fn analyze(&self, image_bytes: &[u8]) -> Result<BlurVerdict> {
        let img = image::load_from_memory(image_bytes)
            .map_err(|e| Error::other(format!("decoding screenshot: {e}")))?;
        let gray = img.to_luma8();

        let variance = laplacian_variance(&gray);
        let spatial_blur_ratio = quadrant_blur_ratio(&gray);

        Ok(BlurVerdict { variance, spatial_blur_ratio })
    }
}

fn laplacian_variance(img: &GrayImage) -> f64 {
    let (w, h) = img.dimensions();
    if w < 3 || h < 3 {
        return VARIANCE_FLOOR;
    }

    let responses = laplacian_responses(img, 0, 0, w, h);
    variance_of(&responses)
}

/// Laplacian kernel response at every interior pixel of the `x0..x1, y0..y1`
/// window, used both for the whole-image and per-quadrant passes.
fn laplacian_responses(img: &GrayImage, x0: u32, y0: u32, x1: u32, y1: u32) -> Vec<f64> {
    let mut out = Vec::new();
    for y in (y0 + 1)..y1.saturating_sub(1).max(y0 + 1) {
        for x in (x0 + 1)..x1.saturating_sub(1).max(x0 + 1) {
            let center = img.get_pixel(x, y).0[0] as f64;
            let up = img.get_pixel(x, y - 1).0[0] as f64;
            let down = img.get_pixel(x, y + 1).0[0] as f64;
            let left = img.get_pixel(x - 1, y).0[0] as f64;
            let right = img.get_pixel(x + 1, y).0[0] as f64;
            out.push(4.0 * center - up - down - left - right);
        }
    }
    out
}

fn variance_of(values: &[f64]) -> f64 {
    if values.is_empty() {
        return VARIANCE_FLOOR;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

fn quadrant_blur_ratio(img: &GrayImage) -> f64 {
    let (w, h) = img.dimensions();
    if w < 4 || h < 4 {
        return 0.0;
    }
    let half_w = w / 2;
    let half_h = h / 2;
    let quadrants = [
        (0, 0, half_w, half_h),
        (half_w, 0, w, half_h),
        (0, half_h, half_w, h),
        (half_w, half_h, w, h),
    ];

    let blurry_count = quadrants
        .iter()
        .filter(|&&(x0, y0, x1, y1)| variance_of(&laplacian_responses(img, x0, y0, x1, y1)) < VARIANCE_FLOOR)
        .count();

    blurry_count as f64 / quadrants.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma, Rgb};

    fn encode_png(img: image::DynamicImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn flat_image_is_blurry() {
        let flat: GrayImage = ImageBuffer::from_fn(64, 64, |_, _| Luma([128u8]));
        let bytes = encode_png(image::DynamicImage::ImageLuma8(flat));
        let verdict = ImageBlurAnalyzer.analyze(&bytes).unwrap();
        assert!(verdict.is_blurry());
    }

    #[test]
    fn checkerboard_image_is_sharp() {
        let checker = ImageBuffer::from_fn(64, 64, |x, y| {
            let v = if (x / 2 + y / 2) % 2 == 0 { 0u8 } else { 255u8 };
            Rgb([v, v, v])
        });
        let bytes = encode_png(image::DynamicImage::ImageRgb8(checker));
        let verdict = ImageBlurAnalyzer.analyze(&bytes).unwrap();
        assert!(!verdict.is_blurry());
    }
}
