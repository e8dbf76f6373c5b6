use async_trait::async_trait;
use image::{ImageBuffer, Rgb};
use wm_domain::error::{Error, Result};

use crate::traits::ScreenshotCapture;

/// The real screenshot pipeline (headless browser rendering) is out of
/// scope. This adapter returns a deterministic 1280x720 placeholder so the
/// visual phase and baseline machinery stay exercisable end-to-end. Swap in
/// a real `ScreenshotCapture` backed by a headless-Chrome tool for
/// production use — the Dispatcher does not need to change.
#[derive(Default)]
pub struct NullScreenshotCapture;

const PLACEHOLDER_WIDTH: u32 = 1280;
const PLACEHOLDER_HEIGHT: u32 = 720;

#[async_trait]
impl ScreenshotCapture for NullScreenshotCapture {
    async fn capture(&self, url: &str, _render_delay_seconds: u32) -> Result<Vec<u8>> {
        let shade = stable_shade(url);
        let img = ImageBuffer::from_fn(PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT, |_, _| {
            Rgb([shade, shade, shade])
        });

        let mut bytes: Vec<u8> = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
            .map_err(|e| Error::other(format!("encoding placeholder screenshot: {e}")))?;
        Ok(bytes)
    }
}

/// Derive a stable greyscale shade from the URL so repeated captures of the
/// same page produce visually identical placeholders (useful for the visual
/// diff phase's "no change" boundary behavior in tests).
fn stable_shade(url: &str) -> u8 {
    let sum: u32 = url.bytes().map(u32::from).sum();
    (sum % 200 + 30) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn capture_is_deterministic_for_same_url() {
        let cap = NullScreenshotCapture;
        let a = cap.capture("https://example.com/", 0).await.unwrap();
        let b = cap.capture("https://example.com/", 0).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn capture_differs_for_different_urls() {
        let cap = NullScreenshotCapture;
        let a = cap.capture("https://example.com/a", 0).await.unwrap();
        let b = cap.capture("https://example.com/b", 0).await.unwrap();
        assert_ne!(a, b);
    }
}
