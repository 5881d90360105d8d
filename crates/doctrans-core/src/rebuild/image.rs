//! Caption-band rendering for translated images.
//!
//! The original pixels are preserved; the translated text is drawn as a
//! centered caption over a semi-opaque band in the lower portion of the
//! image, then the result is re-encoded in the original format.

use ab_glyph::{FontRef, PxScale};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use tracing::debug;

use super::font::SystemFont;
use crate::error::{Error, Result};

/// Caption text size as a fraction of image height.
const FONT_HEIGHT_FRACTION: f32 = 0.05;

/// Minimum caption text size in pixels.
const MIN_FONT_PX: f32 = 12.0;

/// Band bottom offset as a fraction of image height.
const BAND_BOTTOM_FRACTION: u32 = 10;

/// Band background opacity (0 = transparent, 255 = opaque white).
const BAND_ALPHA: u32 = 128;

/// Horizontal and vertical padding inside the band, in pixels.
const BAND_PADDING: i32 = 10;

/// Draw `text` as a caption band onto `original` and re-encode it.
///
/// Returns `Error::Ocr`-free output even for empty captions (the band is
/// simply omitted); undecodable input is `Error::Rebuild`.
pub fn caption_image(original: &[u8], text: &str, font: &SystemFont) -> Result<Vec<u8>> {
    let format = image::guess_format(original)
        .map_err(|e| Error::Rebuild(format!("unrecognized image format: {e}")))?;
    let mut img = image::load_from_memory(original)
        .map_err(|e| Error::Rebuild(format!("image decode failed: {e}")))?
        .to_rgb8();

    let caption: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    if !caption.is_empty() {
        draw_caption(&mut img, &caption, font)?;
    }

    let mut out = Cursor::new(Vec::new());
    // JPEG has no alpha channel, so the whole pipeline stays in RGB
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, format)
        .map_err(|e| Error::Rebuild(format!("image encode failed: {e}")))?;

    debug!(format = ?format, bytes = out.get_ref().len(), "captioned image rebuilt");
    Ok(out.into_inner())
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_possible_wrap
)]
fn draw_caption(img: &mut RgbImage, lines: &[&str], font: &SystemFont) -> Result<()> {
    let font_ref = FontRef::try_from_slice(font.data()).map_err(|_| Error::FontUnavailable)?;

    let font_px = (img.height() as f32 * FONT_HEIGHT_FRACTION).max(MIN_FONT_PX);
    let scale = PxScale::from(font_px);
    let line_height = (font_px * 1.25) as i32;

    let (width, height) = (img.width() as i32, img.height() as i32);
    let text_height = line_height * lines.len() as i32;
    let text_width = lines
        .iter()
        .map(|line| imageproc::drawing::text_size(scale, &font_ref, line).0 as i32)
        .max()
        .unwrap_or(0);

    // Band sits above the bottom margin, centered horizontally
    let band_height = text_height + 2 * BAND_PADDING;
    let band_width = (text_width + 2 * BAND_PADDING).min(width);
    let band_y = (height - height / BAND_BOTTOM_FRACTION as i32 - band_height).max(0);
    let band_x = ((width - band_width) / 2).max(0);

    // Semi-opaque white band, blended by hand to stay in RGB
    for y in band_y..(band_y + band_height).min(height) {
        for x in band_x..(band_x + band_width).min(width) {
            let pixel = img.get_pixel_mut(x as u32, y as u32);
            for channel in &mut pixel.0 {
                let blended =
                    (u32::from(*channel) * (255 - BAND_ALPHA) + 255 * BAND_ALPHA) / 255;
                *channel = blended as u8;
            }
        }
    }

    let mut y = band_y + BAND_PADDING;
    for line in lines {
        let line_width = imageproc::drawing::text_size(scale, &font_ref, line).0 as i32;
        let x = ((width - line_width) / 2).max(0);
        imageproc::drawing::draw_text_mut(img, Rgb([0u8, 0, 0]), x, y, scale, &font_ref, line);
        y += line_height;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn font() -> Option<SystemFont> {
        match SystemFont::discover() {
            Ok(font) => Some(font),
            Err(_) => {
                eprintln!("no system font available, skipping");
                None
            }
        }
    }

    fn png_fixture(width: u32, height: u32) -> Vec<u8> {
        let img = image::GrayImage::from_pixel(width, height, Luma([90u8]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn captioned_image_keeps_format_and_size() {
        let Some(font) = font() else { return };
        let original = png_fixture(320, 240);

        let rebuilt = caption_image(&original, "Bonjour", &font).unwrap();
        assert_eq!(image::guess_format(&rebuilt).unwrap(), ImageFormat::Png);

        let img = image::load_from_memory(&rebuilt).unwrap();
        assert_eq!((img.width(), img.height()), (320, 240));
    }

    #[test]
    fn caption_changes_lower_region_only() {
        let Some(font) = font() else { return };
        let original = png_fixture(200, 200);

        let rebuilt = caption_image(&original, "text", &font).unwrap();
        let before = image::load_from_memory(&original).unwrap().to_rgb8();
        let after = image::load_from_memory(&rebuilt).unwrap().to_rgb8();

        // Top rows untouched
        for x in 0..200 {
            assert_eq!(before.get_pixel(x, 0), after.get_pixel(x, 0));
        }
        // Something in the lower half changed
        assert_ne!(before, after);
    }

    #[test]
    fn empty_caption_is_a_pixel_identical_no_op() {
        let Some(font) = font() else { return };
        let original = png_fixture(64, 64);
        let rebuilt = caption_image(&original, "  \n ", &font).unwrap();
        assert_eq!(
            image::load_from_memory(&original).unwrap().to_rgb8(),
            image::load_from_memory(&rebuilt).unwrap().to_rgb8()
        );
    }

    #[test]
    fn garbage_bytes_fail_to_rebuild() {
        let Some(font) = font() else { return };
        assert!(matches!(
            caption_image(b"nope", "text", &font),
            Err(Error::Rebuild(_))
        ));
    }
}
