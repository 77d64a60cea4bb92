//! Metadata Prober and capture-device discovery.

/// Capture-device listing and webcam header parsing.
pub mod devices;
/// `ffprobe` invocation and compact-output parsing.
pub mod ffprobe;
