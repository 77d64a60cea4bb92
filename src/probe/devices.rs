use std::io::ErrorKind;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::foundation::error::{VidError, VidResult};
use crate::foundation::tools::Toolchain;

/// Capture metadata scraped from the engine's diagnostic header for a device.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct CameraInfo {
    /// Frame width, 0 when not reported.
    pub width: u32,
    /// Frame height, 0 when not reported.
    pub height: u32,
    /// Frames per second, 0 when not reported.
    pub fps: f64,
    /// Codec name following `Video: `, empty when not reported.
    pub codec: String,
}

/// Capture input format for the current platform.
pub fn capture_format() -> Option<&'static str> {
    if cfg!(target_os = "linux") {
        Some("v4l2")
    } else if cfg!(target_os = "macos") {
        Some("avfoundation")
    } else if cfg!(target_os = "windows") {
        Some("dshow")
    } else {
        None
    }
}

/// Map a zero-based camera index to the engine's device identifier for this platform.
pub fn resolve_device(tools: &Toolchain, index: usize) -> VidResult<String> {
    if cfg!(target_os = "linux") {
        let device = format!("/dev/video{index}");
        if !Path::new(&device).exists() {
            return Err(VidError::not_found(format!("capture device '{device}' does not exist")));
        }
        Ok(device)
    } else if cfg!(target_os = "macos") {
        Ok(index.to_string())
    } else if cfg!(target_os = "windows") {
        let devices = list_devices(tools)?;
        let name = devices.get(index).ok_or_else(|| {
            VidError::not_found(format!(
                "no capture device with index {index} ({} video devices listed)",
                devices.len()
            ))
        })?;
        Ok(format!("video={name}"))
    } else {
        Err(VidError::validation(format!(
            "camera capture is not supported on {}",
            std::env::consts::OS
        )))
    }
}

/// Run the engine's DirectShow device enumeration and return the video device names.
pub fn list_devices(tools: &Toolchain) -> VidResult<Vec<String>> {
    let text = engine_diagnostics(
        tools,
        &["-hide_banner", "-list_devices", "true", "-f", "dshow", "-i", "dummy"],
    )?;
    Ok(parse_devices(&text))
}

/// Run the engine against `device` once and parse the stream header it prints.
pub fn probe_camera(tools: &Toolchain, device: &str) -> VidResult<CameraInfo> {
    let format = capture_format().ok_or_else(|| {
        VidError::validation(format!(
            "camera capture is not supported on {}",
            std::env::consts::OS
        ))
    })?;
    let text = engine_diagnostics(tools, &["-hide_banner", "-f", format, "-i", device])?;
    Ok(parse_camera_header(&text))
}

/// Run the engine without an output and collect its stderr. The engine exits non-zero in
/// these modes ("at least one output file must be specified"), so the status is ignored.
fn engine_diagnostics(tools: &Toolchain, args: &[&str]) -> VidResult<String> {
    debug!(program = %tools.ffmpeg.display(), argv = ?args, "spawning engine for diagnostics");
    let out = Command::new(&tools.ffmpeg)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                VidError::tool_missing(format!(
                    "'{}' is not installed or not on PATH",
                    tools.ffmpeg.display()
                ))
            } else {
                VidError::pipe_io(format!("failed to run '{}': {e}", tools.ffmpeg.display()))
            }
        })?;
    Ok(String::from_utf8_lossy(&out.stderr).replace("\r\n", "\n"))
}

/// Extract video device names from DirectShow device-listing text.
///
/// Only quoted names between the "video devices" and "audio devices" section headers are
/// considered. Listings without headers tag each device with `(video)` / `(audio)`; audio-tagged
/// lines are skipped. When a device repeats a display name already listed, its "Alternative name"
/// is used instead so both stay addressable.
pub fn parse_devices(text: &str) -> Vec<String> {
    let lower = text.to_ascii_lowercase();
    let mut section = text;
    let mut section_lower = lower.as_str();
    let mut body_start = 0;
    if let Some(start) = section_lower.find("video devices") {
        section = &section[start..];
        section_lower = &section_lower[start..];
        // The video header itself may mention audio devices ("some may be both ...").
        body_start = section_lower.find('\n').map_or(section_lower.len(), |i| i + 1);
    }
    if let Some(end) = section_lower[body_start..].find("audio devices") {
        section = &section[..body_start + end];
    }

    struct Listed<'a> {
        name: &'a str,
        alt: Option<&'a str>,
    }

    let mut listed: Vec<Listed<'_>> = Vec::new();
    let mut in_audio_entry = false;
    for line in section.lines() {
        let Some(quoted) = first_quoted(line) else {
            continue;
        };
        if line.contains("Alternative name") {
            if !in_audio_entry && let Some(last) = listed.last_mut() {
                last.alt = Some(quoted);
            }
        } else if line.trim_end().ends_with("(audio)") {
            in_audio_entry = true;
        } else {
            in_audio_entry = false;
            listed.push(Listed {
                name: quoted,
                alt: None,
            });
        }
    }

    let mut devices: Vec<String> = Vec::with_capacity(listed.len());
    for dev in &listed {
        let repeated = devices.iter().any(|d| d == dev.name);
        let name = match (repeated, dev.alt) {
            (true, Some(alt)) => alt,
            _ => dev.name,
        };
        devices.push(name.to_string());
    }
    devices
}

fn first_quoted(line: &str) -> Option<&str> {
    let start = line.find('"')? + 1;
    let len = line[start..].find('"')?;
    let name = &line[start..start + len];
    (!name.is_empty()).then_some(name)
}

/// Parse width/height, fps and codec from the engine's input header for a capture device.
pub fn parse_camera_header(text: &str) -> CameraInfo {
    let header = text.find("Stream #").map_or(text, |i| &text[i..]);
    let mut info = CameraInfo::default();

    if let Some((w, h)) = find_dimensions(header) {
        info.width = w;
        info.height = h;
    }
    if let Some(fps) = find_fps(header) {
        info.fps = fps;
    }
    if let Some(i) = header.find("Video: ") {
        let rest = &header[i + "Video: ".len()..];
        let end = rest
            .find(|c: char| c.is_whitespace() || c == ',' || c == '|')
            .unwrap_or(rest.len());
        info.codec = rest[..end].to_string();
    }
    info
}

/// First `<digits>x<digits>` token with at least two digits on each side.
fn find_dimensions(text: &str) -> Option<(u32, u32)> {
    let bytes = text.as_bytes();
    for (i, _) in text.match_indices('x') {
        let before = bytes[..i]
            .iter()
            .rev()
            .take_while(|b| b.is_ascii_digit())
            .count();
        let after = bytes[i + 1..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if before >= 2 && after >= 2 {
            let w = text[i - before..i].parse().ok()?;
            let h = text[i + 1..i + 1 + after].parse().ok()?;
            return Some((w, h));
        }
    }
    None
}

/// Number immediately preceding the first ` fps`.
fn find_fps(text: &str) -> Option<f64> {
    for (i, _) in text.match_indices(" fps") {
        let start = text[..i]
            .rfind(|c: char| !(c.is_ascii_digit() || c == '.'))
            .map_or(0, |p| p + 1);
        if let Ok(fps) = text[start..i].parse::<f64>() {
            return Some(fps);
        }
    }
    None
}

#[cfg(test)]
#[path = "../../tests/unit/probe/devices.rs"]
mod tests;
