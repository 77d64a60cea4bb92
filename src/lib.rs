//! vidpipe reads and writes video by driving the system `ffmpeg` / `ffprobe` binaries over pipes.
//!
//! Every frame crosses the process boundary as raw, row-major, interleaved 8-bit pixels
//! (`rgb24` or `rgba`), so frames from [`Video`] and [`Camera`] can be handed straight to
//! [`VideoWriter`] or to the still-image helpers.
//!
//! # Overview
//!
//! - [`probe`] runs `ffprobe` and returns one key/value record per stream.
//! - [`Video`] streams frames sequentially ([`Video::read`]) or decodes arbitrary frames by index
//!   ([`Video::read_frame`], [`Video::read_frames`]) using a frame-select filter.
//! - [`Camera`] streams frames from a capture device.
//! - [`VideoWriter`] encodes frames, resolving [`EncodeOptions`] against fixed defaults.
//! - [`read_image`] / [`write_image`] handle PNG/JPEG stills.
//!
//! Engine processes are started lazily on first use and are always killed and reaped when their
//! owner is closed or dropped. A process-wide interrupt handler tears down every live engine
//! process and exits; call [`disable_signal_teardown`] before opening anything to handle
//! interrupts yourself with [`CancelToken`]s.
//!
//! The binaries are located through `PATH`, or through `VIDPIPE_FFMPEG` / `VIDPIPE_FFPROBE`
//! (see [`Toolchain`]).
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod decode;
mod encode;
mod foundation;
mod probe;
mod process;
mod still;

pub use decode::camera::Camera;
pub use decode::frame::{get_video_frame, get_video_frame_with};
pub use decode::select::build_select_expression;
pub use decode::video::Video;
pub use encode::options::{EncodeOptions, RateControl, ResolvedEncode, pad_to_macroblock};
pub use encode::writer::VideoWriter;
pub use foundation::core::{PixelFormat, StreamType, exists, frame_size, has_extension};
pub use foundation::error::{VidError, VidResult};
pub use foundation::tools::{FFMPEG_ENV, FFPROBE_ENV, Toolchain, is_installed};
pub use probe::devices::{
    CameraInfo, list_devices, parse_camera_header, parse_devices, probe_camera,
};
pub use probe::ffprobe::{ProbeRecord, StreamMetadata, parse_compact, probe, probe_with};
pub use process::{
    CancelToken, DecodePipeline, EncodePipeline, FillOutcome, PipelineState,
    disable_signal_teardown, live_processes, teardown_all,
};
pub use still::{Image, read_image, read_image_into, write_image};
