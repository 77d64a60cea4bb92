//! Encode Pipeline Writer.

/// Encode settings and their resolution into an engine invocation.
pub mod options;
/// Lazily started frame writer.
pub mod writer;
