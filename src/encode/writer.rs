use std::path::{Path, PathBuf};

use anyhow::Context as _;
use tracing::{debug, warn};

use crate::encode::options::{EncodeOptions, ResolvedEncode};
use crate::foundation::core::frame_size;
use crate::foundation::error::{VidError, VidResult};
use crate::foundation::tools::Toolchain;
use crate::process::cancel::CancelToken;
use crate::process::pipeline::{EncodePipeline, PipelineState};

enum Sink {
    Unopened,
    Running(EncodePipeline),
    Closed,
}

/// Encodes raw frames into a video or GIF file.
///
/// Frames are [`VideoWriter::width`] x [`VideoWriter::height`], the requested size rounded up
/// to the macroblock. The engine starts on the first [`VideoWriter::write`]. Always [`VideoWriter::close`] to
/// surface encoder errors; dropping an open writer finalizes the file and only logs failures.
pub struct VideoWriter {
    tools: Toolchain,
    cfg: ResolvedEncode,
    sink: Sink,
    cancel: CancelToken,
    frames_written: u64,
}

impl VideoWriter {
    /// Writer into `path` for a `width x height` video, padded up to the macroblock size.
    pub fn new(
        path: impl AsRef<Path>,
        width: u32,
        height: u32,
        options: &EncodeOptions,
    ) -> VidResult<Self> {
        Self::new_with(&Toolchain::from_env(), path, width, height, options)
    }

    /// [`VideoWriter::new`] with an explicit toolchain.
    pub fn new_with(
        tools: &Toolchain,
        path: impl AsRef<Path>,
        width: u32,
        height: u32,
        options: &EncodeOptions,
    ) -> VidResult<Self> {
        tools.ensure_ffmpeg()?;
        let cfg = ResolvedEncode::resolve(path.as_ref(), width, height, options)?;
        if cfg.is_padded() {
            debug!(
                output = %cfg.output.display(),
                from = %format!("{}x{}", cfg.input_width, cfg.input_height),
                to = %format!("{}x{}", cfg.width, cfg.height),
                "output padded to macroblock"
            );
        }
        Ok(Self {
            tools: tools.clone(),
            cfg,
            sink: Sink::Unopened,
            cancel: CancelToken::new(),
            frames_written: 0,
        })
    }

    /// Append one raw frame of exactly [`VideoWriter::frame_size`] bytes. Starts the encoder on
    /// first use.
    pub fn write(&mut self, frame: &[u8]) -> VidResult<()> {
        if frame.is_empty() {
            return Err(VidError::validation("cannot write an empty frame"));
        }
        let size = self.frame_size();
        if frame.len() != size {
            return Err(VidError::validation(format!(
                "{}x{} frame needs {size} bytes, got {}",
                self.cfg.width,
                self.cfg.height,
                frame.len()
            )));
        }
        if matches!(self.sink, Sink::Unopened) {
            self.start()?;
        }
        let Sink::Running(pipe) = &mut self.sink else {
            return Err(VidError::pipe_io(format!(
                "writer for '{}' is closed",
                self.cfg.output.display()
            )));
        };

        match pipe.write_all(frame) {
            Ok(()) => {
                self.frames_written += 1;
                Ok(())
            }
            Err(write_err) => {
                // The engine's exit status and stderr usually say more than the broken pipe.
                let Sink::Running(pipe) = std::mem::replace(&mut self.sink, Sink::Closed) else {
                    return Err(write_err);
                };
                match pipe.close() {
                    Err(close_err @ VidError::PipeIo(_)) => Err(close_err),
                    _ => Err(write_err),
                }
            }
        }
    }

    /// Finish the file and wait for the encoder. Idempotent; a writer that never received a
    /// frame produces no output.
    pub fn close(&mut self) -> VidResult<()> {
        match std::mem::replace(&mut self.sink, Sink::Closed) {
            Sink::Running(pipe) => {
                pipe.close()?;
                debug!(
                    output = %self.cfg.output.display(),
                    frames = self.frames_written,
                    "video written"
                );
                Ok(())
            }
            Sink::Unopened | Sink::Closed => Ok(()),
        }
    }

    fn start(&mut self) -> VidResult<()> {
        ensure_parent_dir(&self.cfg.output)?;
        let args = self.cfg.args();
        let pipe = EncodePipeline::open(&self.tools.ffmpeg, &args, self.cancel.clone())?;
        self.sink = Sink::Running(pipe);
        Ok(())
    }

    /// Output path.
    pub fn file_name(&self) -> &Path {
        &self.cfg.output
    }

    /// Encoded width, after macroblock padding.
    pub fn width(&self) -> u32 {
        self.cfg.width
    }

    /// Encoded height, after macroblock padding.
    pub fn height(&self) -> u32 {
        self.cfg.height
    }

    /// Width requested at construction, before padding.
    pub fn input_width(&self) -> u32 {
        self.cfg.input_width
    }

    /// Height requested at construction, before padding.
    pub fn input_height(&self) -> u32 {
        self.cfg.input_height
    }

    /// Bytes per input pixel.
    pub fn depth(&self) -> usize {
        self.cfg.pixel_format.depth()
    }

    /// Bytes in one frame at the padded size.
    pub fn frame_size(&self) -> usize {
        frame_size(self.cfg.width, self.cfg.height, self.depth())
    }

    /// Explicit bitrate, if one was given.
    pub fn bitrate(&self) -> Option<u64> {
        self.cfg.bitrate
    }

    /// GIF loop count.
    pub fn loop_count(&self) -> i32 {
        self.cfg.loop_count
    }

    /// GIF final-frame delay.
    pub fn delay(&self) -> i32 {
        self.cfg.delay
    }

    /// Macroblock alignment.
    pub fn macroblock(&self) -> u32 {
        self.cfg.macroblock
    }

    /// Output frame rate.
    pub fn fps(&self) -> f64 {
        self.cfg.fps
    }

    /// Quality in `[0, 1]`.
    pub fn quality(&self) -> f64 {
        self.cfg.quality
    }

    /// Video encoder name.
    pub fn codec(&self) -> &str {
        &self.cfg.codec
    }

    /// Audio re-encode codec, if requested.
    pub fn audio_codec(&self) -> Option<&str> {
        self.cfg.audio_codec.as_deref()
    }

    /// Auxiliary stream source.
    pub fn stream_file(&self) -> Option<&Path> {
        self.cfg.stream_file.as_deref()
    }

    /// Frames accepted so far.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Resolved settings, including the engine arguments via [`ResolvedEncode::args`].
    pub fn settings(&self) -> &ResolvedEncode {
        &self.cfg
    }

    /// Lifecycle of the encode pipeline.
    pub fn state(&self) -> PipelineState {
        match self.sink {
            Sink::Unopened => PipelineState::Unopened,
            Sink::Running(_) => PipelineState::Running,
            Sink::Closed => PipelineState::Closed,
        }
    }

    /// Token that aborts in-flight and future writes.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }
}

impl Drop for VideoWriter {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(output = %self.cfg.output.display(), "closing writer on drop failed: {e}");
        }
    }
}

fn ensure_parent_dir(path: &Path) -> VidResult<()> {
    let parent: PathBuf = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => return Ok(()),
    };
    std::fs::create_dir_all(&parent)
        .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/writer.rs"]
mod tests;
