//! Sequential Media Readers (file and capture device) and frame selection.

/// Capture-device reader.
pub mod camera;
/// One-shot single-frame decode.
pub mod frame;
/// Frame-select filter expressions.
pub mod select;
/// Lazily started sequential decode stream.
pub mod sequential;
/// File reader with sequential and random access.
pub mod video;
