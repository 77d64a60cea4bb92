use tracing::debug;

use crate::foundation::error::{VidError, VidResult};
use crate::process::cancel::CancelToken;
use crate::process::pipeline::{DecodePipeline, FillOutcome, PipelineState};

enum Stream {
    Unopened,
    Running(DecodePipeline),
    Closed,
}

/// Lazily started, frame-at-a-time decode stream shared by [`crate::Video`] and
/// [`crate::Camera`].
pub(crate) struct SequentialStream {
    stream: Stream,
    framebuffer: Vec<u8>,
    // Frames land here first so a truncated read never touches the caller's buffer.
    scratch: Vec<u8>,
    cancel: CancelToken,
}

impl SequentialStream {
    pub(crate) fn new() -> Self {
        Self {
            stream: Stream::Unopened,
            framebuffer: Vec::new(),
            scratch: Vec::new(),
            cancel: CancelToken::new(),
        }
    }

    pub(crate) fn state(&self) -> PipelineState {
        match self.stream {
            Stream::Unopened => PipelineState::Unopened,
            Stream::Running(_) => PipelineState::Running,
            Stream::Closed => PipelineState::Closed,
        }
    }

    pub(crate) fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub(crate) fn frame_buffer(&self) -> &[u8] {
        &self.framebuffer
    }

    pub(crate) fn frame_buffer_mut(&mut self) -> &mut Vec<u8> {
        &mut self.framebuffer
    }

    pub(crate) fn set_frame_buffer(&mut self, buffer: Vec<u8>, frame_size: usize) -> VidResult<()> {
        if buffer.len() < frame_size {
            return Err(VidError::buffer_too_small(format!(
                "frame buffer holds {} bytes, a frame needs {frame_size}",
                buffer.len()
            )));
        }
        self.framebuffer = buffer;
        Ok(())
    }

    /// Read the next frame into the owned buffer, allocating it on first use.
    pub(crate) fn read(
        &mut self,
        frame_size: usize,
        open: impl FnOnce(CancelToken) -> VidResult<DecodePipeline>,
    ) -> VidResult<bool> {
        let mut buf = std::mem::take(&mut self.framebuffer);
        if buf.is_empty() {
            buf = vec![0u8; frame_size];
        }
        let res = self.read_into(&mut buf, frame_size, open);
        self.framebuffer = buf;
        res
    }

    /// Read the next frame into `buf[..frame_size]`.
    ///
    /// End of input, including a truncated final frame, closes the stream and yields `false`;
    /// `buf` is only written when a whole frame arrived.
    pub(crate) fn read_into(
        &mut self,
        buf: &mut [u8],
        frame_size: usize,
        open: impl FnOnce(CancelToken) -> VidResult<DecodePipeline>,
    ) -> VidResult<bool> {
        if buf.len() < frame_size {
            return Err(VidError::buffer_too_small(format!(
                "frame buffer holds {} bytes, a frame needs {frame_size}",
                buf.len()
            )));
        }

        if matches!(self.stream, Stream::Unopened) {
            match open(self.cancel.clone()) {
                Ok(pipe) => self.stream = Stream::Running(pipe),
                Err(e) => {
                    self.stream = Stream::Closed;
                    return Err(e);
                }
            }
        }

        let Stream::Running(pipe) = &mut self.stream else {
            return Ok(false);
        };

        self.scratch.resize(frame_size, 0);
        match pipe.fill(&mut self.scratch) {
            Ok(FillOutcome::Full) => {
                buf[..frame_size].copy_from_slice(&self.scratch);
                Ok(true)
            }
            Ok(FillOutcome::Eof { filled }) => {
                if filled > 0 {
                    debug!(filled, frame_size, "discarding truncated final frame");
                }
                self.finish();
                Ok(false)
            }
            Err(e) => {
                self.finish();
                Err(e)
            }
        }
    }

    fn finish(&mut self) {
        if let Stream::Running(pipe) = std::mem::replace(&mut self.stream, Stream::Closed)
            && let Err(e) = pipe.close()
        {
            debug!("decode stream ended with engine error: {e}");
        }
    }

    /// Close the pipe and wait for the engine. Safe to call repeatedly.
    pub(crate) fn close(&mut self) -> VidResult<()> {
        match std::mem::replace(&mut self.stream, Stream::Closed) {
            Stream::Running(pipe) => pipe.close(),
            Stream::Unopened | Stream::Closed => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/decode/sequential.rs"]
mod tests;
