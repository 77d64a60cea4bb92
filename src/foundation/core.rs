use std::path::Path;

use crate::foundation::error::{VidError, VidResult};

/// Interleaved 8-bit pixel layout exchanged with the engine over a pipe.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// `RGBRGB...`, 3 bytes per pixel.
    Rgb24,
    /// `RGBARGBA...`, 4 bytes per pixel.
    #[default]
    Rgba,
}

impl PixelFormat {
    /// Bytes per pixel.
    pub fn depth(self) -> usize {
        match self {
            Self::Rgb24 => 3,
            Self::Rgba => 4,
        }
    }

    /// Name understood by the engine's `-pix_fmt` flag.
    pub fn ffmpeg_name(self) -> &'static str {
        match self {
            Self::Rgb24 => "rgb24",
            Self::Rgba => "rgba",
        }
    }

    /// Pixel format with the given number of interleaved channels.
    pub fn from_depth(depth: usize) -> VidResult<Self> {
        match depth {
            3 => Ok(Self::Rgb24),
            4 => Ok(Self::Rgba),
            other => Err(VidError::validation(format!(
                "unsupported pixel depth {other} (expected 3 or 4)"
            ))),
        }
    }
}

/// Stream filter passed to the probe tool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StreamType {
    /// `v`
    Video,
    /// `a`
    Audio,
    /// `s`
    Subtitle,
    /// `d`
    Data,
    /// `t`
    Attachment,
    /// No filter, every stream in the container.
    All,
}

impl StreamType {
    /// Specifier for `-select_streams`, `None` for [`StreamType::All`].
    pub fn specifier(self) -> Option<&'static str> {
        match self {
            Self::Video => Some("v"),
            Self::Audio => Some("a"),
            Self::Subtitle => Some("s"),
            Self::Data => Some("d"),
            Self::Attachment => Some("t"),
            Self::All => None,
        }
    }
}

/// Bytes in one raw frame of `width x height` at `depth` bytes per pixel.
pub fn frame_size(width: u32, height: u32, depth: usize) -> usize {
    width as usize * height as usize * depth
}

/// Whether `path` exists on disk.
pub fn exists(path: &Path) -> bool {
    std::fs::metadata(path).is_ok()
}

/// Case-insensitive extension check (`ext` without the dot).
pub fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

pub(crate) fn ensure_exists(path: &Path) -> VidResult<()> {
    if exists(path) {
        Ok(())
    } else {
        Err(VidError::not_found(format!(
            "file '{}' does not exist",
            path.display()
        )))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
