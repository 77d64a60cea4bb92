use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::decode::select::build_select_expression;
use crate::decode::sequential::SequentialStream;
use crate::foundation::core::{PixelFormat, StreamType, ensure_exists, frame_size};
use crate::foundation::error::{VidError, VidResult};
use crate::foundation::tools::Toolchain;
use crate::probe::ffprobe::{StreamMetadata, probe_with};
use crate::process::cancel::CancelToken;
use crate::process::pipeline::{DecodePipeline, FillOutcome, PipelineState};

const AUXILIARY_CODEC_TYPES: [&str; 4] = ["audio", "subtitle", "data", "attachment"];

/// Frame reader for one video stream of a media file.
///
/// Construction probes the file; no engine process runs until the first read. Sequential reads
/// ([`Video::read`]) stream every frame in order through one long-lived pipeline, while
/// [`Video::read_frame`] / [`Video::read_frames`] run independent one-shot pipelines and do not
/// consume sequential progress.
pub struct Video {
    tools: Toolchain,
    path: PathBuf,
    stream: usize,
    format: PixelFormat,
    meta: StreamMetadata,
    has_streams: bool,
    audio_codec: Option<String>,
    seq: SequentialStream,
}

impl Video {
    /// Open the first video stream of `path`, decoding to RGBA.
    pub fn open(path: impl AsRef<Path>) -> VidResult<Self> {
        Self::open_with(&Toolchain::from_env(), path)
    }

    /// [`Video::open`] with an explicit toolchain.
    pub fn open_with(tools: &Toolchain, path: impl AsRef<Path>) -> VidResult<Self> {
        let mut streams = Self::probe_streams(tools, path.as_ref(), Some(0))?;
        streams
            .pop()
            .ok_or_else(|| VidError::probe("no video stream found"))
    }

    /// One reader per video stream in `path`, in container order.
    pub fn open_streams(path: impl AsRef<Path>) -> VidResult<Vec<Self>> {
        Self::open_streams_with(&Toolchain::from_env(), path)
    }

    /// [`Video::open_streams`] with an explicit toolchain.
    pub fn open_streams_with(tools: &Toolchain, path: impl AsRef<Path>) -> VidResult<Vec<Self>> {
        Self::probe_streams(tools, path.as_ref(), None)
    }

    fn probe_streams(tools: &Toolchain, path: &Path, only: Option<usize>) -> VidResult<Vec<Self>> {
        ensure_exists(path)?;
        tools.ensure_ffmpeg()?;
        tools.ensure_ffprobe()?;

        let video = probe_with(tools, path, StreamType::Video)?;
        if video.is_empty() {
            return Err(VidError::probe(format!(
                "no video streams found in '{}'",
                path.display()
            )));
        }

        let all: Vec<StreamMetadata> = probe_with(tools, path, StreamType::All)?
            .iter()
            .map(StreamMetadata::from_record)
            .collect();
        let has_streams = all
            .iter()
            .any(|s| AUXILIARY_CODEC_TYPES.contains(&s.codec_type.as_str()));
        let audio_codec = all
            .iter()
            .find(|s| s.codec_type == "audio" && !s.codec.is_empty())
            .map(|s| s.codec.clone());

        let mut readers = Vec::with_capacity(video.len());
        for (stream, record) in video.iter().enumerate() {
            if only.is_some_and(|i| i != stream) {
                continue;
            }
            let meta = StreamMetadata::from_record(record);
            if meta.width == 0 || meta.height == 0 {
                return Err(VidError::probe(format!(
                    "video stream {stream} of '{}' reports no frame size",
                    path.display()
                )));
            }
            readers.push(Self {
                tools: tools.clone(),
                path: path.to_path_buf(),
                stream,
                format: PixelFormat::Rgba,
                meta,
                has_streams,
                audio_codec: audio_codec.clone(),
                seq: SequentialStream::new(),
            });
        }
        Ok(readers)
    }

    /// Decode to `format` instead of RGBA. Only allowed before the first sequential read.
    pub fn set_pixel_format(&mut self, format: PixelFormat) -> VidResult<()> {
        if self.seq.state() != PipelineState::Unopened {
            return Err(VidError::validation(
                "pixel format can only change before the first read",
            ));
        }
        self.format = format;
        // A supplied buffer survives the switch while it still holds a whole frame.
        let size = self.frame_size();
        if self.seq.frame_buffer().len() < size {
            self.seq.frame_buffer_mut().clear();
        }
        Ok(())
    }

    /// Supply the buffer sequential reads fill, e.g. to reuse memory across readers.
    ///
    /// Only the first [`Video::frame_size`] bytes are written by each read.
    pub fn set_frame_buffer(&mut self, buffer: Vec<u8>) -> VidResult<()> {
        let size = self.frame_size();
        self.seq.set_frame_buffer(buffer, size)
    }

    /// Read the next frame into [`Video::frame_buffer`]. `false` at end of stream or on any
    /// failure; use [`Video::try_read`] to see the failure.
    pub fn read(&mut self) -> bool {
        self.try_read().unwrap_or_else(|e| {
            debug!(source = %self.path.display(), "sequential read stopped: {e}");
            false
        })
    }

    /// Read the next frame into [`Video::frame_buffer`]; `Ok(false)` at end of stream.
    pub fn try_read(&mut self) -> VidResult<bool> {
        let size = self.frame_size();
        let args = self.decode_args(None);
        let program = &self.tools.ffmpeg;
        self.seq
            .read(size, |cancel| DecodePipeline::open(program, &args, cancel))
    }

    /// Read the next frame into a caller-owned buffer of at least [`Video::frame_size`] bytes.
    pub fn try_read_into(&mut self, buf: &mut [u8]) -> VidResult<bool> {
        let size = self.frame_size();
        let args = self.decode_args(None);
        let program = &self.tools.ffmpeg;
        self.seq
            .read_into(buf, size, |cancel| DecodePipeline::open(program, &args, cancel))
    }

    /// Decode frame `n` (zero-based) into [`Video::frame_buffer`].
    #[tracing::instrument(skip(self), fields(source = %self.path.display()))]
    pub fn read_frame(&mut self, n: u64) -> VidResult<()> {
        let frame = self.decode_one(n)?;
        let buf = self.seq.frame_buffer_mut();
        if buf.len() < frame.len() {
            *buf = frame;
        } else {
            buf[..frame.len()].copy_from_slice(&frame);
        }
        Ok(())
    }

    /// Decode frame `n` (zero-based) into `buf[..frame_size]`. `buf` is left untouched on error.
    pub fn read_frame_into(&self, n: u64, buf: &mut [u8]) -> VidResult<()> {
        self.check_index(n)?;
        let size = self.frame_size();
        if buf.len() < size {
            return Err(VidError::buffer_too_small(format!(
                "frame buffer holds {} bytes, a frame needs {size}",
                buf.len()
            )));
        }
        let frame = self.decode_one(n)?;
        buf[..size].copy_from_slice(&frame);
        Ok(())
    }

    fn decode_one(&self, n: u64) -> VidResult<Vec<u8>> {
        self.check_index(n)?;
        let mut frame = vec![0u8; self.frame_size()];
        let mut pipe = self.open_selection(&[n])?;
        fill_selected(&mut pipe, &mut frame, n)?;
        pipe.close()?;
        Ok(frame)
    }

    /// Decode the given frames, returned in the order requested.
    ///
    /// The engine emits selected frames in stream order, so each distinct index is decoded once
    /// in ascending order and the results are arranged back into the caller's order.
    #[tracing::instrument(skip(self), fields(source = %self.path.display()))]
    pub fn read_frames(&self, indices: &[u64]) -> VidResult<Vec<Vec<u8>>> {
        if indices.is_empty() {
            return Err(VidError::out_of_range("no frame indices given"));
        }
        for &n in indices {
            self.check_index(n)?;
        }

        let mut unique = indices.to_vec();
        unique.sort_unstable();
        unique.dedup();

        let size = self.frame_size();
        let mut pipe = self.open_selection(&unique)?;
        let mut decoded = BTreeMap::new();
        for &n in &unique {
            let mut buf = vec![0u8; size];
            fill_selected(&mut pipe, &mut buf, n)?;
            decoded.insert(n, buf);
        }
        pipe.close()?;

        indices
            .iter()
            .map(|n| {
                decoded
                    .get(n)
                    .cloned()
                    .ok_or_else(|| VidError::pipe_io(format!("frame {n} was not decoded")))
            })
            .collect()
    }

    /// Close the sequential pipeline and wait for the engine. Idempotent.
    pub fn close(&mut self) -> VidResult<()> {
        self.seq.close()
    }

    fn check_index(&self, n: u64) -> VidResult<()> {
        if n >= self.meta.frames {
            return Err(VidError::out_of_range(format!(
                "frame {n} requested but '{}' has {} frames",
                self.path.display(),
                self.meta.frames
            )));
        }
        Ok(())
    }

    fn open_selection(&self, indices: &[u64]) -> VidResult<DecodePipeline> {
        let select = build_select_expression(indices);
        DecodePipeline::open(
            &self.tools.ffmpeg,
            &self.decode_args(Some(&select)),
            self.seq.cancel_token(),
        )
    }

    fn decode_args(&self, select: Option<&str>) -> Vec<String> {
        decode_args(&self.path, self.stream, self.format, select)
    }

    /// Source file path.
    pub fn file_name(&self) -> &Path {
        &self.path
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.meta.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.meta.height
    }

    /// Bytes per pixel of decoded frames.
    pub fn depth(&self) -> usize {
        self.format.depth()
    }

    /// Decoded pixel format.
    pub fn pixel_format(&self) -> PixelFormat {
        self.format
    }

    /// Bytes in one decoded frame.
    pub fn frame_size(&self) -> usize {
        frame_size(self.meta.width, self.meta.height, self.format.depth())
    }

    /// Stream bitrate in bits/sec (0 when unknown).
    pub fn bitrate(&self) -> u64 {
        self.meta.bitrate
    }

    /// Total frame count reported by the probe (0 when unknown).
    pub fn frames(&self) -> u64 {
        self.meta.frames
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.meta.duration
    }

    /// Frames per second.
    pub fn fps(&self) -> f64 {
        self.meta.fps
    }

    /// Video codec name.
    pub fn codec(&self) -> &str {
        &self.meta.codec
    }

    /// Codec of the first audio stream, if the container has one.
    pub fn audio_codec(&self) -> Option<&str> {
        self.audio_codec.as_deref()
    }

    /// Zero-based index among the container's video streams.
    pub fn stream(&self) -> usize {
        self.stream
    }

    /// Whether the container also carries audio, subtitle, data or attachment streams.
    pub fn has_streams(&self) -> bool {
        self.has_streams
    }

    /// Full probe metadata for this stream.
    pub fn metadata(&self) -> &StreamMetadata {
        &self.meta
    }

    /// Most recently read frame (empty before the first read).
    pub fn frame_buffer(&self) -> &[u8] {
        self.seq.frame_buffer()
    }

    /// Lifecycle of the sequential pipeline.
    pub fn state(&self) -> PipelineState {
        self.seq.state()
    }

    /// Token that cancels in-flight and future reads of this reader.
    pub fn cancel_token(&self) -> CancelToken {
        self.seq.cancel_token()
    }
}

fn fill_selected(pipe: &mut DecodePipeline, buf: &mut [u8], n: u64) -> VidResult<()> {
    match pipe.fill(buf)? {
        FillOutcome::Full => Ok(()),
        FillOutcome::Eof { filled } => Err(VidError::pipe_io(format!(
            "engine output ended after {filled} of {} bytes of frame {n}",
            buf.len()
        ))),
    }
}

/// Engine arguments that decode video stream `stream` of `path` to raw frames on stdout,
/// optionally restricted by a select filter.
pub(crate) fn decode_args(
    path: &Path,
    stream: usize,
    format: PixelFormat,
    select: Option<&str>,
) -> Vec<String> {
    let mut args: Vec<String> = [
        "-i",
        &path.to_string_lossy(),
        "-f",
        "image2pipe",
        "-loglevel",
        "quiet",
        "-pix_fmt",
        format.ffmpeg_name(),
        "-vcodec",
        "rawvideo",
        "-map",
        &format!("0:v:{stream}"),
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    if let Some(select) = select {
        // Without passthrough sync the engine pads/drops to the average rate and the output
        // frame count stops matching the selection.
        args.extend(["-vf", select, "-vsync", "0"].map(String::from));
    }
    args.push("-".to_string());
    args
}

#[cfg(test)]
#[path = "../../tests/unit/decode/video.rs"]
mod tests;
