use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::foundation::core::{StreamType, ensure_exists};
use crate::foundation::error::{VidError, VidResult};
use crate::foundation::tools::Toolchain;

/// One stream's `key -> value` pairs as reported by the probe tool.
pub type ProbeRecord = BTreeMap<String, String>;

/// Probe `source` for streams of `stream_type` using the environment's toolchain.
pub fn probe(source: &Path, stream_type: StreamType) -> VidResult<Vec<ProbeRecord>> {
    probe_with(&Toolchain::from_env(), source, stream_type)
}

/// Probe `source` for streams of `stream_type`, one record per matching stream in the order the
/// probe tool reports them. No matching stream yields an empty list, not an error.
#[tracing::instrument(skip(tools, source), fields(source = %source.display()))]
pub fn probe_with(
    tools: &Toolchain,
    source: &Path,
    stream_type: StreamType,
) -> VidResult<Vec<ProbeRecord>> {
    ensure_exists(source)?;

    let mut args: Vec<&str> = vec!["-show_streams"];
    if let Some(spec) = stream_type.specifier() {
        args.extend(["-select_streams", spec]);
    }
    args.extend(["-print_format", "compact", "-loglevel", "quiet"]);

    debug!(program = %tools.ffprobe.display(), argv = ?args, "spawning probe");
    let out = Command::new(&tools.ffprobe)
        .args(&args)
        .arg(source)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                VidError::tool_missing(format!(
                    "'{}' is not installed or not on PATH",
                    tools.ffprobe.display()
                ))
            } else {
                VidError::probe(format!("failed to run '{}': {e}", tools.ffprobe.display()))
            }
        })?;

    if !out.status.success() {
        return Err(VidError::probe(format!(
            "'{}' failed for '{}' with status {}: {}",
            tools.ffprobe.display(),
            source.display(),
            out.status,
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    Ok(parse_compact(&String::from_utf8_lossy(&out.stdout)))
}

/// Parse `compact` probe output: one stream per non-blank line, fields separated by `|`,
/// each field split on its first `=`. The first occurrence of a repeated key wins.
pub fn parse_compact(text: &str) -> Vec<ProbeRecord> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse_record)
        .collect()
}

fn parse_record(line: &str) -> ProbeRecord {
    let mut record = ProbeRecord::new();
    for field in line.trim().split('|') {
        if let Some((key, value)) = field.split_once('=') {
            record
                .entry(key.to_string())
                .or_insert_with(|| value.to_string());
        }
    }
    record
}

/// Typed view over a [`ProbeRecord`]; missing or unparsable fields take the documented default.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct StreamMetadata {
    /// `width`, 0 when absent.
    pub width: u32,
    /// `height`, 0 when absent.
    pub height: u32,
    /// `duration` in seconds, 0 when absent or `N/A`.
    pub duration: f64,
    /// `bit_rate` in bits/sec, 0 when absent or `N/A`.
    pub bitrate: u64,
    /// `nb_frames`, 0 when unknown (e.g. live devices, some containers).
    pub frames: u64,
    /// `r_frame_rate` evaluated as `num/den`; 0 when either part is missing or `den` is 0.
    pub fps: f64,
    /// `codec_name`, empty when absent.
    pub codec: String,
    /// `codec_type` (`video`, `audio`, ...), empty when absent.
    pub codec_type: String,
    /// `pix_fmt`, empty when absent.
    pub pix_fmt: String,
}

impl StreamMetadata {
    /// Extract the fields this crate relies on.
    pub fn from_record(record: &ProbeRecord) -> Self {
        let field = |key: &str| record.get(key).map(String::as_str);
        Self {
            width: parse_number(field("width")) as u32,
            height: parse_number(field("height")) as u32,
            duration: parse_number(field("duration")),
            bitrate: parse_number(field("bit_rate")) as u64,
            frames: parse_number(field("nb_frames")) as u64,
            fps: parse_rate(field("r_frame_rate")),
            codec: field("codec_name").unwrap_or_default().to_string(),
            codec_type: field("codec_type").unwrap_or_default().to_string(),
            pix_fmt: field("pix_fmt").unwrap_or_default().to_string(),
        }
    }
}

fn parse_number(value: Option<&str>) -> f64 {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

fn parse_rate(value: Option<&str>) -> f64 {
    let Some((num, den)) = value.and_then(|v| v.split_once('/')) else {
        return 0.0;
    };
    if num.is_empty() || den.is_empty() {
        return 0.0;
    }
    let den = parse_number(Some(den));
    if den == 0.0 {
        return 0.0;
    }
    parse_number(Some(num)) / den
}

#[cfg(test)]
#[path = "../../tests/unit/probe/ffprobe.rs"]
mod tests;
