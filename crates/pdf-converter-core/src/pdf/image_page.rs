//! Single-image pages.

use image::DynamicImage;

use super::writer::{EmbeddedImage, ImageData, PageSize, PdfWriter};
use crate::error::{Error, Result};

/// Largest page side most viewers accept, in points.
const MAX_PAGE_SIDE: f32 = 14_400.0;

/// Dimensions and component count from a JPEG frame header.
fn jpeg_frame(bytes: &[u8]) -> Option<(u32, u32, u8)> {
    if bytes.get(..2)? != [0xFF, 0xD8] {
        return None;
    }
    let mut pos = 2;
    while pos + 4 <= bytes.len() {
        if bytes[pos] != 0xFF {
            return None;
        }
        let marker = bytes[pos + 1];
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        let len = usize::from(u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]));
        let is_frame = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_frame {
            let frame = bytes.get(pos + 4..pos + 10)?;
            let height = u32::from(u16::from_be_bytes([frame[1], frame[2]]));
            let width = u32::from(u16::from_be_bytes([frame[3], frame[4]]));
            return Some((width, height, frame[5]));
        }
        pos += 2 + len;
    }
    None
}

/// Prepare a JPEG for embedding.
///
/// Gray and RGB streams are embedded unchanged; CMYK or unreadable headers
/// go through a full decode instead.
pub fn jpeg_image(bytes: &[u8]) -> Result<EmbeddedImage> {
    match jpeg_frame(bytes) {
        Some((width, height, components @ (1 | 3))) if width > 0 && height > 0 => {
            Ok(EmbeddedImage {
                width,
                height,
                data: ImageData::Jpeg {
                    bytes: bytes.to_vec(),
                    gray: components == 1,
                },
            })
        }
        _ => decoded_image(bytes),
    }
}

/// Decode any raster format the `image` crate understands.
pub fn decoded_image(bytes: &[u8]) -> Result<EmbeddedImage> {
    let decoded = image::load_from_memory(bytes)?;
    Ok(from_dynamic(&decoded))
}

pub fn from_dynamic(img: &DynamicImage) -> EmbeddedImage {
    let (width, height) = (img.width(), img.height());
    let data = if img.color().has_alpha() {
        let rgba = img.to_rgba8();
        let pixels = rgba.pixels().len();
        let mut rgb = Vec::with_capacity(pixels * 3);
        let mut alpha = Vec::with_capacity(pixels);
        for p in rgba.pixels() {
            rgb.extend_from_slice(&p.0[..3]);
            alpha.push(p.0[3]);
        }
        let alpha = alpha.iter().any(|&a| a != u8::MAX).then_some(alpha);
        ImageData::Rgb { rgb, alpha }
    } else {
        ImageData::Rgb {
            rgb: img.to_rgb8().into_raw(),
            alpha: None,
        }
    };
    EmbeddedImage {
        width,
        height,
        data,
    }
}

/// One page sized to the image, one point per pixel.
pub fn image_document(image: &EmbeddedImage) -> Result<Vec<u8>> {
    if image.width == 0 || image.height == 0 {
        return Err(Error::RenderFault("image has no pixels".to_string()));
    }

    #[allow(clippy::cast_precision_loss)]
    let (mut width, mut height) = (image.width as f32, image.height as f32);
    let longest = width.max(height);
    if longest > MAX_PAGE_SIDE {
        let scale = MAX_PAGE_SIDE / longest;
        width *= scale;
        height *= scale;
    }

    let mut writer = PdfWriter::new();
    let image_id = writer.add_image(image);
    writer.add_page(
        PageSize { width, height },
        format!("q {width} 0 0 {height} 0 0 cm /Im1 Do Q\n"),
        &[("Im1", image_id)],
    );
    writer.finish()
}
