use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::foundation::error::{VidError, VidResult};

/// Environment variable overriding the engine executable.
pub const FFMPEG_ENV: &str = "VIDPIPE_FFMPEG";
/// Environment variable overriding the probe executable.
pub const FFPROBE_ENV: &str = "VIDPIPE_FFPROBE";

/// Locations of the external engine (`ffmpeg`) and probe tool (`ffprobe`).
///
/// Bare names are resolved through `PATH` when a process is spawned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toolchain {
    /// Engine used for decode, encode and device listing.
    pub ffmpeg: PathBuf,
    /// Probe tool used for stream metadata.
    pub ffprobe: PathBuf,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

impl Toolchain {
    /// Defaults, overridden by `VIDPIPE_FFMPEG` / `VIDPIPE_FFPROBE` when set and non-empty.
    pub fn from_env() -> Self {
        let mut tools = Self::default();
        if let Some(p) = std::env::var_os(FFMPEG_ENV).filter(|v| !v.is_empty()) {
            tools.ffmpeg = PathBuf::from(p);
        }
        if let Some(p) = std::env::var_os(FFPROBE_ENV).filter(|v| !v.is_empty()) {
            tools.ffprobe = PathBuf::from(p);
        }
        tools
    }

    /// Replace the engine executable.
    pub fn with_ffmpeg(mut self, ffmpeg: impl Into<PathBuf>) -> Self {
        self.ffmpeg = ffmpeg.into();
        self
    }

    /// Replace the probe executable.
    pub fn with_ffprobe(mut self, ffprobe: impl Into<PathBuf>) -> Self {
        self.ffprobe = ffprobe.into();
        self
    }

    /// Fails with [`VidError::ToolMissing`] unless the engine runs.
    pub fn ensure_ffmpeg(&self) -> VidResult<()> {
        ensure_installed(&self.ffmpeg)
    }

    /// Fails with [`VidError::ToolMissing`] unless the probe tool runs.
    pub fn ensure_ffprobe(&self) -> VidResult<()> {
        ensure_installed(&self.ffprobe)
    }
}

/// Whether `program -version` starts and exits successfully.
pub fn is_installed(program: &Path) -> bool {
    Command::new(program)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn ensure_installed(program: &Path) -> VidResult<()> {
    if is_installed(program) {
        Ok(())
    } else {
        Err(VidError::tool_missing(format!(
            "'{}' is not installed or not on PATH",
            program.display()
        )))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/tools.rs"]
mod tests;
