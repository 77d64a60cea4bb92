use std::path::Path;

use crate::decode::video::Video;
use crate::foundation::core::ensure_exists;
use crate::foundation::error::{VidError, VidResult};
use crate::foundation::tools::Toolchain;

/// Decode frame `n` (zero-based) of the first video stream of `path` as RGBA into `buf`.
///
/// `buf` must hold at least `width * height * 4` bytes.
pub fn get_video_frame(path: impl AsRef<Path>, n: u64, buf: &mut [u8]) -> VidResult<()> {
    get_video_frame_with(&Toolchain::from_env(), path, n, buf)
}

/// [`get_video_frame`] with an explicit toolchain.
pub fn get_video_frame_with(
    tools: &Toolchain,
    path: impl AsRef<Path>,
    n: u64,
    buf: &mut [u8],
) -> VidResult<()> {
    let path = path.as_ref();
    ensure_exists(path)?;
    if buf.is_empty() {
        return Err(VidError::buffer_too_small("no frame buffer given"));
    }
    let video = Video::open_with(tools, path)?;
    if buf.len() < video.frame_size() {
        return Err(VidError::buffer_too_small(format!(
            "frame buffer holds {} bytes, a {}x{} RGBA frame needs {}",
            buf.len(),
            video.width(),
            video.height(),
            video.frame_size()
        )));
    }
    video.read_frame_into(n, buf)
}
