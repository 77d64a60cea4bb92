//! Still-image IO sharing the frame buffer layout of the video readers (row-major, interleaved,
//! 8 bits per channel).

use std::path::Path;

use anyhow::Context as _;

use crate::foundation::core::{PixelFormat, ensure_exists, frame_size};
use crate::foundation::error::{VidError, VidResult};

/// Decoded RGBA8 image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// `width * height * 4` bytes.
    pub data: Vec<u8>,
}

impl Image {
    /// Bytes per pixel (always 4).
    pub fn depth(&self) -> usize {
        PixelFormat::Rgba.depth()
    }
}

/// Decode `path` (any format the `image` crate recognises) into RGBA8.
pub fn read_image(path: impl AsRef<Path>) -> VidResult<Image> {
    let path = path.as_ref();
    let rgba = open_rgba(path)?;
    let (width, height) = rgba.dimensions();
    Ok(Image {
        width,
        height,
        data: rgba.into_raw(),
    })
}

/// Decode `path` into the front of `buf`, returning the image dimensions.
pub fn read_image_into(path: impl AsRef<Path>, buf: &mut [u8]) -> VidResult<(u32, u32)> {
    let path = path.as_ref();
    let rgba = open_rgba(path)?;
    let (width, height) = rgba.dimensions();
    let size = frame_size(width, height, PixelFormat::Rgba.depth());
    if buf.len() < size {
        return Err(VidError::buffer_too_small(format!(
            "image '{}' needs {size} bytes, buffer holds {}",
            path.display(),
            buf.len()
        )));
    }
    buf[..size].copy_from_slice(rgba.as_raw());
    Ok((width, height))
}

/// Encode an RGBA (`w*h*4` bytes) or RGB (`w*h*3` bytes) buffer; the format follows the file
/// extension (PNG, JPEG, ...).
pub fn write_image(path: impl AsRef<Path>, width: u32, height: u32, data: &[u8]) -> VidResult<()> {
    let path = path.as_ref();
    if width == 0 || height == 0 {
        return Err(VidError::validation("image width/height must be non-zero"));
    }
    let format = image::ImageFormat::from_path(path).map_err(|e| {
        VidError::validation(format!(
            "cannot pick an image format for '{}': {e}",
            path.display()
        ))
    })?;

    let pixels = frame_size(width, height, 1);
    let color = if data.len() == pixels * PixelFormat::Rgba.depth() {
        image::ExtendedColorType::Rgba8
    } else if data.len() == pixels * PixelFormat::Rgb24.depth() {
        image::ExtendedColorType::Rgb8
    } else {
        return Err(VidError::validation(format!(
            "{width}x{height} image needs {} (RGB) or {} (RGBA) bytes, got {}",
            pixels * 3,
            pixels * 4,
            data.len()
        )));
    };

    // JPEG has no alpha channel.
    if format == image::ImageFormat::Jpeg && color == image::ExtendedColorType::Rgba8 {
        let rgb = drop_alpha(data);
        return save(path, &rgb, width, height, image::ExtendedColorType::Rgb8, format);
    }
    save(path, data, width, height, color, format)
}

fn save(
    path: &Path,
    data: &[u8],
    width: u32,
    height: u32,
    color: image::ExtendedColorType,
    format: image::ImageFormat,
) -> VidResult<()> {
    image::save_buffer_with_format(path, data, width, height, color, format)
        .with_context(|| format!("failed to write image '{}'", path.display()))?;
    Ok(())
}

fn open_rgba(path: &Path) -> VidResult<image::RgbaImage> {
    ensure_exists(path)?;
    let img = image::open(path).with_context(|| format!("decode image '{}'", path.display()))?;
    Ok(img.to_rgba8())
}

fn drop_alpha(rgba: &[u8]) -> Vec<u8> {
    rgba.chunks_exact(4).flat_map(|px| [px[0], px[1], px[2]]).collect()
}

#[cfg(test)]
#[path = "../tests/unit/still/still.rs"]
mod tests;
