//! `image`-crate encoder for thumbnails and error placeholders
//!
//! Placeholders carry their message twice: drawn into the image with an 8x8
//! bitmap font, and as metadata (a PNG `tEXt` chunk or a JPEG `COM` segment)
//! for clients that inspect the bytes.

use std::io::Cursor;
use std::str::FromStr;

use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{DynamicImage, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use super::{EncodeError, ImageEncoder, PageGeometry, Raster};

/// Placeholders are capped well below full rasters; they only carry a hint.
const MAX_PLACEHOLDER_SIDE: u32 = 2048;

const PAPER: Rgba<u8> = Rgba([242, 242, 242, 255]);
const WARNING: Rgba<u8> = Rgba([200, 40, 40, 255]);
const INK: Rgba<u8> = Rgba([30, 30, 30, 255]);

/// PNG `tEXt` keyword holding the placeholder message
pub const PLACEHOLDER_TEXT_KEYWORD: &str = "Description";

const GLYPH_SIDE: u32 = 8;
const MAX_GLYPH_SCALE: u32 = 6;

/// Output format for encoded page images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThumbnailFormat {
    #[default]
    Png,
    Jpeg,
}

impl ThumbnailFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ThumbnailFormat::Png => "image/png",
            ThumbnailFormat::Jpeg => "image/jpeg",
        }
    }
}

impl FromStr for ThumbnailFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ThumbnailFormat::Png),
            "jpg" | "jpeg" => Ok(ThumbnailFormat::Jpeg),
            other => Err(format!("unsupported thumbnail format '{}'", other)),
        }
    }
}

/// Encoder backed by the `image` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateEncoder {
    format: ThumbnailFormat,
}

impl ImageCrateEncoder {
    pub fn new(format: ThumbnailFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> ThumbnailFormat {
        self.format
    }

    fn write(&self, image: DynamicImage) -> Result<Vec<u8>, EncodeError> {
        let mut output = Vec::new();
        match self.format {
            ThumbnailFormat::Png => {
                image.write_to(&mut Cursor::new(&mut output), image::ImageFormat::Png)?;
            }
            ThumbnailFormat::Jpeg => {
                // JPEG has no alpha channel
                DynamicImage::ImageRgb8(image.to_rgb8())
                    .write_to(&mut Cursor::new(&mut output), image::ImageFormat::Jpeg)?;
            }
        }
        Ok(output)
    }
}

impl ImageEncoder for ImageCrateEncoder {
    fn content_type(&self) -> &'static str {
        self.format.content_type()
    }

    fn encode_raster(&self, raster: &Raster) -> Result<Vec<u8>, EncodeError> {
        if raster.width() == 0 || raster.height() == 0 {
            return Err(EncodeError::InvalidRaster("zero-sized raster".into()));
        }
        self.write(DynamicImage::ImageRgba8(raster.clone()))
    }

    fn encode_error_placeholder(
        &self,
        message: &str,
        geometry: PageGeometry,
        dpi: f32,
    ) -> Result<Vec<u8>, EncodeError> {
        let (width, height) = geometry.or_fallback().pixels_at(dpi);
        let mut image = draw_placeholder(
            width.min(MAX_PLACEHOLDER_SIDE),
            height.min(MAX_PLACEHOLDER_SIDE),
        );
        draw_message(&mut image, message);
        tracing::trace!(reason = message, width, height, "Encoding error placeholder");

        match self.format {
            ThumbnailFormat::Png => encode_png_with_text(&image, message),
            ThumbnailFormat::Jpeg => {
                let bytes = self.write(DynamicImage::ImageRgba8(image))?;
                Ok(insert_jpeg_comment(bytes, message))
            }
        }
    }
}

/// PNG with `message` stored under [`PLACEHOLDER_TEXT_KEYWORD`]
fn encode_png_with_text(image: &RgbaImage, message: &str) -> Result<Vec<u8>, EncodeError> {
    let mut output = Vec::new();
    let mut encoder = png::Encoder::new(&mut output, image.width(), image.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.add_text_chunk(PLACEHOLDER_TEXT_KEYWORD.to_string(), latin1(message))?;

    let mut writer = encoder.write_header()?;
    writer.write_image_data(image.as_raw())?;
    writer.finish()?;
    Ok(output)
}

/// `tEXt` is Latin-1 only
fn latin1(message: &str) -> String {
    message
        .chars()
        .map(|c| if (c as u32) < 256 { c } else { '?' })
        .collect()
}

/// Insert a `COM` segment right after the SOI marker
fn insert_jpeg_comment(mut jpeg: Vec<u8>, message: &str) -> Vec<u8> {
    if !jpeg.starts_with(&[0xFF, 0xD8]) {
        return jpeg;
    }
    // Segment length counts its own two bytes
    let text = &message.as_bytes()[..message.len().min(u16::MAX as usize - 2)];
    let length = (text.len() + 2) as u16;

    let mut segment = Vec::with_capacity(text.len() + 4);
    segment.extend_from_slice(&[0xFF, 0xFE]);
    segment.extend_from_slice(&length.to_be_bytes());
    segment.extend_from_slice(text);
    jpeg.splice(2..2, segment);
    jpeg
}

/// Centered message on a paper band, scaled to fit the width. Glyphs that
/// would fall outside the image are clipped.
fn draw_message(image: &mut RgbaImage, message: &str) {
    let chars = message.chars().count() as u32;
    if chars == 0 {
        return;
    }
    let (width, height) = image.dimensions();
    let scale = (width * 4 / 5 / (chars * GLYPH_SIDE)).clamp(1, MAX_GLYPH_SCALE);
    let glyph = GLYPH_SIDE * scale;
    let text_width = chars * glyph;
    let left = width.saturating_sub(text_width) / 2;
    let top = height.saturating_sub(glyph) / 2;

    let pad = scale * 2;
    for y in top.saturating_sub(pad)..(top + glyph + pad).min(height) {
        for x in left.saturating_sub(pad)..(left + text_width + pad).min(width) {
            image.put_pixel(x, y, PAPER);
        }
    }

    for (i, c) in message.chars().enumerate() {
        let Some(rows) = BASIC_FONTS.get(c).or_else(|| BASIC_FONTS.get('?')) else {
            continue;
        };
        let origin_x = left + i as u32 * glyph;
        for (row, bits) in rows.into_iter().enumerate() {
            for col in 0..GLYPH_SIDE {
                // Bit 0 is the leftmost pixel
                if bits & (1u8 << col) == 0 {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        let x = origin_x + col * scale + dx;
                        let y = top + row as u32 * scale + dy;
                        if x < width && y < height {
                            image.put_pixel(x, y, INK);
                        }
                    }
                }
            }
        }
    }
}

/// Light page with a red frame and a red cross
fn draw_placeholder(width: u32, height: u32) -> RgbaImage {
    let mut image = RgbaImage::from_pixel(width, height, PAPER);
    let border = (width.min(height) / 40).max(1);

    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let on_frame = x < border
            || y < border
            || x >= width.saturating_sub(border)
            || y >= height.saturating_sub(border);

        // Distance from each diagonal, in the unit square
        let u = x as f32 / width as f32;
        let v = y as f32 / height as f32;
        let thickness = border as f32 / width.min(height) as f32;
        let on_cross = (u - v).abs() < thickness || (u + v - 1.0).abs() < thickness;

        if on_frame || on_cross {
            *pixel = WARNING;
        }
    }

    image
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thumbnail_format_parsing() {
        assert_eq!("PNG".parse::<ThumbnailFormat>(), Ok(ThumbnailFormat::Png));
        assert_eq!("jpg".parse::<ThumbnailFormat>(), Ok(ThumbnailFormat::Jpeg));
        assert!("webp".parse::<ThumbnailFormat>().is_err());
    }

    #[test]
    fn test_encode_raster_png_signature() {
        let encoder = ImageCrateEncoder::new(ThumbnailFormat::Png);
        let raster = Raster::from_pixel(4, 6, Rgba([0, 0, 0, 255]));
        let bytes = encoder.encode_raster(&raster).unwrap();
        assert!(bytes.starts_with(b"\x89PNG"));
        assert_eq!(encoder.content_type(), "image/png");
    }

    #[test]
    fn test_encode_raster_jpeg_drops_alpha() {
        let encoder = ImageCrateEncoder::new(ThumbnailFormat::Jpeg);
        let raster = Raster::from_pixel(8, 8, Rgba([10, 20, 30, 128]));
        let bytes = encoder.encode_raster(&raster).unwrap();
        assert!(bytes.starts_with(&[0xFF, 0xD8]));
    }

    #[test]
    fn test_zero_sized_raster_rejected() {
        let encoder = ImageCrateEncoder::default();
        let raster = Raster::new(0, 0);
        assert!(matches!(
            encoder.encode_raster(&raster),
            Err(EncodeError::InvalidRaster(_))
        ));
    }

    #[test]
    fn test_placeholder_uses_page_size() {
        let encoder = ImageCrateEncoder::new(ThumbnailFormat::Png);
        let bytes = encoder
            .encode_error_placeholder("Error: Render Failed", PageGeometry::new(144.0, 72.0), 36.0)
            .unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (72, 36));
    }

    fn ink_pixels(bytes: &[u8]) -> usize {
        image::load_from_memory(bytes)
            .unwrap()
            .to_rgba8()
            .pixels()
            .filter(|p| **p == INK)
            .count()
    }

    #[test]
    fn test_placeholder_draws_message() {
        let encoder = ImageCrateEncoder::new(ThumbnailFormat::Png);
        let geometry = PageGeometry::FALLBACK;
        let with_text = encoder
            .encode_error_placeholder("Error: Out of Memory", geometry, 72.0)
            .unwrap();
        let blank = encoder.encode_error_placeholder("", geometry, 72.0).unwrap();

        assert!(ink_pixels(&with_text) > 100);
        assert_eq!(ink_pixels(&blank), 0);
    }

    #[test]
    fn test_placeholder_png_carries_text_chunk() {
        let encoder = ImageCrateEncoder::new(ThumbnailFormat::Png);
        let bytes = encoder
            .encode_error_placeholder("Error: Page Not Found", PageGeometry::FALLBACK, 50.0)
            .unwrap();

        let decoder = png::Decoder::new(Cursor::new(&bytes));
        let reader = decoder.read_info().unwrap();
        let chunk = reader
            .info()
            .uncompressed_latin1_text
            .iter()
            .find(|chunk| chunk.keyword == PLACEHOLDER_TEXT_KEYWORD)
            .expect("placeholder text chunk");
        assert_eq!(chunk.text, "Error: Page Not Found");
    }

    #[test]
    fn test_placeholder_jpeg_carries_comment() {
        let encoder = ImageCrateEncoder::new(ThumbnailFormat::Jpeg);
        let bytes = encoder
            .encode_error_placeholder("Error: Render Failed", PageGeometry::FALLBACK, 50.0)
            .unwrap();

        assert_eq!(&bytes[..4], &[0xFF, 0xD8, 0xFF, 0xFE]);
        let length = u16::from_be_bytes([bytes[4], bytes[5]]) as usize;
        assert_eq!(&bytes[6..4 + length], b"Error: Render Failed");
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (425, 550));
    }

    #[test]
    fn test_message_clipped_on_tiny_placeholder() {
        let mut image = RgbaImage::from_pixel(10, 4, PAPER);
        draw_message(&mut image, "Error: Rendering Failed");
        assert_eq!(image.dimensions(), (10, 4));
    }

    #[test]
    fn test_placeholder_falls_back_to_letter() {
        let encoder = ImageCrateEncoder::new(ThumbnailFormat::Png);
        let bytes = encoder
            .encode_error_placeholder("Error: Page Not Found", PageGeometry::new(0.0, 0.0), 72.0)
            .unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (612, 792));
    }
}
