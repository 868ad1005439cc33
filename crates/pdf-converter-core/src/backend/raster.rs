//! Raster transcoding: any supported image or SVG to a canonical PNG.
//!
//! Multi-frame inputs (animated GIF, multi-page TIFF) contribute their
//! first frame only. Everything here is CPU-bound and meant to run on the
//! blocking pool.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat};
use resvg::{tiny_skia, usvg};

use crate::error::{Error, Result};

/// CSS pixels per inch; SVG user units are rasterized relative to this.
const SVG_BASE_DPI: f32 = 96.0;

/// Largest raster side produced from an SVG, in pixels.
const MAX_SVG_SIDE: f32 = 10_000.0;

/// Map a declared image MIME type to a decoder format.
pub fn image_format(mime: &str) -> Option<ImageFormat> {
    let format = match mime {
        "image/jpeg" => ImageFormat::Jpeg,
        "image/png" => ImageFormat::Png,
        "image/gif" => ImageFormat::Gif,
        "image/bmp" => ImageFormat::Bmp,
        "image/tiff" => ImageFormat::Tiff,
        "image/webp" => ImageFormat::WebP,
        _ => return None,
    };
    Some(format)
}

/// Decode raster bytes, trusting the declared type first and sniffing the
/// content when that fails.
pub fn decode(bytes: &[u8], mime: &str) -> Result<DynamicImage> {
    if let Some(format) = image_format(mime)
        && let Ok(img) = image::load_from_memory_with_format(bytes, format)
    {
        return Ok(img);
    }
    Ok(image::load_from_memory(bytes)?)
}

/// Transcode raster bytes of any supported format to PNG.
pub fn transcode_to_png(bytes: &[u8], mime: &str) -> Result<Vec<u8>> {
    encode_png(&decode(bytes, mime)?)
}

pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// Rasterize an SVG document at `dpi` and return PNG bytes.
pub fn rasterize_svg(bytes: &[u8], dpi: u32) -> Result<Vec<u8>> {
    let tree = usvg::Tree::from_data(bytes, &usvg::Options::default())
        .map_err(|e| Error::Image(format!("invalid SVG: {e}")))?;

    let size = tree.size();
    #[allow(clippy::cast_precision_loss)]
    let mut scale = dpi as f32 / SVG_BASE_DPI;
    let longest = size.width().max(size.height()) * scale;
    if longest > MAX_SVG_SIDE {
        scale *= MAX_SVG_SIDE / longest;
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (width, height) = (
        (size.width() * scale).ceil().max(1.0) as u32,
        (size.height() * scale).ceil().max(1.0) as u32,
    );

    let mut pixmap = tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| Error::Image(format!("cannot allocate {width}x{height} canvas")))?;
    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );

    pixmap
        .encode_png()
        .map_err(|e| Error::Image(format!("PNG encoding failed: {e}")))
}
