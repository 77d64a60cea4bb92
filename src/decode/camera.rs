use tracing::debug;

use crate::decode::sequential::SequentialStream;
use crate::foundation::core::{PixelFormat, frame_size};
use crate::foundation::error::{VidError, VidResult};
use crate::foundation::tools::Toolchain;
use crate::probe::devices::{CameraInfo, capture_format, probe_camera, resolve_device};
use crate::process::cancel::CancelToken;
use crate::process::pipeline::{DecodePipeline, PipelineState};

/// Frame reader for a live capture device. Frames are RGB24.
///
/// A capture never ends on its own; [`Camera::close`] stops the engine.
pub struct Camera {
    tools: Toolchain,
    name: String,
    format: &'static str,
    info: CameraInfo,
    seq: SequentialStream,
}

impl Camera {
    /// Open the capture device with zero-based index `stream`.
    pub fn open(stream: usize) -> VidResult<Self> {
        Self::open_with(&Toolchain::from_env(), stream)
    }

    /// [`Camera::open`] with an explicit toolchain.
    pub fn open_with(tools: &Toolchain, stream: usize) -> VidResult<Self> {
        tools.ensure_ffmpeg()?;
        let device = resolve_device(tools, stream)?;
        Self::open_device_with(tools, &device)
    }

    /// Open a device by its engine identifier (`/dev/video0`, `0`, `video=Integrated Camera`).
    pub fn open_device_with(tools: &Toolchain, device: &str) -> VidResult<Self> {
        tools.ensure_ffmpeg()?;
        let format = capture_format().ok_or_else(|| {
            VidError::validation(format!(
                "camera capture is not supported on {}",
                std::env::consts::OS
            ))
        })?;
        let info = probe_camera(tools, device)?;
        if info.width == 0 || info.height == 0 {
            return Err(VidError::probe(format!(
                "could not determine the capture size of '{device}'"
            )));
        }
        debug!(device, ?info, "camera opened");
        Ok(Self {
            tools: tools.clone(),
            name: device.to_string(),
            format,
            info,
            seq: SequentialStream::new(),
        })
    }

    /// Supply the buffer reads fill; must hold at least [`Camera::frame_size`] bytes.
    pub fn set_frame_buffer(&mut self, buffer: Vec<u8>) -> VidResult<()> {
        let size = self.frame_size();
        self.seq.set_frame_buffer(buffer, size)
    }

    /// Capture the next frame into [`Camera::frame_buffer`]; `false` once the capture stops.
    pub fn read(&mut self) -> bool {
        self.try_read().unwrap_or_else(|e| {
            debug!(device = %self.name, "capture stopped: {e}");
            false
        })
    }

    /// Capture the next frame into [`Camera::frame_buffer`].
    pub fn try_read(&mut self) -> VidResult<bool> {
        let size = self.frame_size();
        let args = capture_args(self.format, &self.name);
        let program = &self.tools.ffmpeg;
        self.seq
            .read(size, |cancel| DecodePipeline::open(program, &args, cancel))
    }

    /// Capture the next frame into a caller-owned buffer.
    pub fn try_read_into(&mut self, buf: &mut [u8]) -> VidResult<bool> {
        let size = self.frame_size();
        let args = capture_args(self.format, &self.name);
        let program = &self.tools.ffmpeg;
        self.seq
            .read_into(buf, size, |cancel| DecodePipeline::open(program, &args, cancel))
    }

    /// Stop the capture process. Idempotent.
    pub fn close(&mut self) -> VidResult<()> {
        self.seq.close()
    }

    /// Engine device identifier.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.info.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.info.height
    }

    /// Bytes per pixel (always 3).
    pub fn depth(&self) -> usize {
        PixelFormat::Rgb24.depth()
    }

    /// Bytes in one captured frame.
    pub fn frame_size(&self) -> usize {
        frame_size(self.info.width, self.info.height, self.depth())
    }

    /// Capture rate reported by the device.
    pub fn fps(&self) -> f64 {
        self.info.fps
    }

    /// Device codec reported by the engine.
    pub fn codec(&self) -> &str {
        &self.info.codec
    }

    /// Most recently captured frame (empty before the first read).
    pub fn frame_buffer(&self) -> &[u8] {
        self.seq.frame_buffer()
    }

    /// Lifecycle of the capture pipeline.
    pub fn state(&self) -> PipelineState {
        self.seq.state()
    }

    /// Token that cancels in-flight and future reads.
    pub fn cancel_token(&self) -> CancelToken {
        self.seq.cancel_token()
    }
}

pub(crate) fn capture_args(format: &str, device: &str) -> Vec<String> {
    [
        "-hide_banner",
        "-loglevel",
        "quiet",
        "-f",
        format,
        "-i",
        device,
        "-f",
        "image2pipe",
        "-pix_fmt",
        PixelFormat::Rgb24.ffmpeg_name(),
        "-vcodec",
        "rawvideo",
        "-",
    ]
    .map(String::from)
    .to_vec()
}
