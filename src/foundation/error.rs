/// Convenience result type used across vidpipe.
pub type VidResult<T> = Result<T, VidError>;

/// Error taxonomy surfaced by readers, writers and the prober.
#[derive(thiserror::Error, Debug)]
pub enum VidError {
    /// A source file or capture device does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The engine or probe executable is not installed (or cannot be started).
    #[error("tool missing: {0}")]
    ToolMissing(String),

    /// The probe process failed to start, exited abnormally or reported unusable metadata.
    #[error("probe failure: {0}")]
    Probe(String),

    /// A frame index past the known frame count, or an empty frame selection.
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// A caller-supplied buffer cannot hold the requested data.
    #[error("buffer too small: {0}")]
    BufferTooSmall(String),

    /// Short read/write, broken pipe or non-zero engine exit.
    #[error("pipe i/o error: {0}")]
    PipeIo(String),

    /// Invalid user-provided options.
    #[error("validation error: {0}")]
    Validation(String),

    /// The operation observed a cancelled [`crate::CancelToken`].
    #[error("cancelled")]
    Cancelled,

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VidError {
    /// Build a [`VidError::NotFound`] value.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Build a [`VidError::ToolMissing`] value.
    pub fn tool_missing(msg: impl Into<String>) -> Self {
        Self::ToolMissing(msg.into())
    }

    /// Build a [`VidError::Probe`] value.
    pub fn probe(msg: impl Into<String>) -> Self {
        Self::Probe(msg.into())
    }

    /// Build a [`VidError::OutOfRange`] value.
    pub fn out_of_range(msg: impl Into<String>) -> Self {
        Self::OutOfRange(msg.into())
    }

    /// Build a [`VidError::BufferTooSmall`] value.
    pub fn buffer_too_small(msg: impl Into<String>) -> Self {
        Self::BufferTooSmall(msg.into())
    }

    /// Build a [`VidError::PipeIo`] value.
    pub fn pipe_io(msg: impl Into<String>) -> Self {
        Self::PipeIo(msg.into())
    }

    /// Build a [`VidError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
