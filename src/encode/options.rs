use std::path::{Path, PathBuf};

use tracing::warn;

use crate::foundation::core::{PixelFormat, ensure_exists, has_extension};
use crate::foundation::error::{VidError, VidResult};

const DEFAULT_QUALITY: f64 = 0.5;
const DEFAULT_MACROBLOCK: u32 = 16;
const DEFAULT_FPS: f64 = 25.0;
const REUSE_PREVIOUS_DELAY: i32 = -1;
const H264_CODEC: &str = "libx264";

/// Caller-facing encode settings. Every field is optional; `None` takes the documented default
/// while an explicit value (including zero) is honoured.
///
/// Loadable from JSON, e.g. `{"fps": 30, "quality": 0.2, "loop": -1}`.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodeOptions {
    /// Target bitrate in bits/s. Takes precedence over `quality`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u64>,
    /// 0 = best, 1 = worst. Default 0.5, clamped to `[0, 1]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<f64>,
    /// Dimension alignment; frames are scaled up to a multiple of it. Default 16, `<= 1` disables.
    #[serde(rename = "macro", skip_serializing_if = "Option::is_none")]
    pub macroblock: Option<u32>,
    /// Output frame rate. Default 25.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fps: Option<f64>,
    /// Encoder name. Default chosen from the output extension.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
    /// GIF only: -1 = play once, 0 = forever (default), n = n extra loops.
    #[serde(rename = "loop", skip_serializing_if = "Option::is_none")]
    pub loop_count: Option<i32>,
    /// GIF only: final-frame delay in centiseconds. `None`/0 reuses the previous frame's delay.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<i32>,
    /// File whose audio/subtitle/data/attachment streams are copied into the output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_file: Option<PathBuf>,
    /// Re-encode the copied audio with this codec instead of stream-copying it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_codec: Option<String>,
    /// Layout of the frames passed to `write`. Default RGBA.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pixel_format: Option<PixelFormat>,
}

impl EncodeOptions {
    /// Parse options from a JSON object.
    pub fn from_json_str(json: &str) -> VidResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| VidError::validation(format!("invalid encode options: {e}")))
    }
}

/// How the encoder is told what quality to hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateControl {
    /// `-b:v <bits/s>`
    Bitrate(u64),
    /// `-crf <0..=51>`, H.264 only.
    ConstantRateFactor(u32),
    /// `-q:v <1..=31>`
    QualityScale(u32),
}

/// [`EncodeOptions`] with every default applied, ready to become an engine invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedEncode {
    /// Output file.
    pub output: PathBuf,
    /// Width requested at construction, before padding.
    pub input_width: u32,
    /// Height requested at construction, before padding.
    pub input_height: u32,
    /// Width after macroblock padding; raw input frames and the encoded output share it.
    pub width: u32,
    /// Height after macroblock padding.
    pub height: u32,
    /// Input frame layout.
    pub pixel_format: PixelFormat,
    /// Explicit bitrate, if any.
    pub bitrate: Option<u64>,
    /// Clamped quality in `[0, 1]`.
    pub quality: f64,
    /// Alignment used for padding.
    pub macroblock: u32,
    /// Output frame rate.
    pub fps: f64,
    /// Video encoder.
    pub codec: String,
    /// GIF loop count.
    pub loop_count: i32,
    /// GIF final-frame delay.
    pub delay: i32,
    /// Auxiliary stream source, known to exist.
    pub stream_file: Option<PathBuf>,
    /// Audio re-encode codec.
    pub audio_codec: Option<String>,
}

impl ResolvedEncode {
    /// Apply defaults and validate. Fails with `Validation` on zero dimensions or a bad frame
    /// rate, and `NotFound` when `stream_file` is given but missing.
    pub fn resolve(
        output: &Path,
        width: u32,
        height: u32,
        opts: &EncodeOptions,
    ) -> VidResult<Self> {
        if width == 0 || height == 0 {
            return Err(VidError::validation(
                "writer width/height must be non-zero",
            ));
        }

        let fps = opts.fps.unwrap_or(DEFAULT_FPS);
        if !fps.is_finite() || fps <= 0.0 {
            return Err(VidError::validation(format!(
                "writer fps must be positive, got {fps}"
            )));
        }

        let quality = opts.quality.unwrap_or(DEFAULT_QUALITY);
        if quality.is_nan() {
            return Err(VidError::validation("writer quality must be a number"));
        }
        let quality = quality.clamp(0.0, 1.0);

        if opts.bitrate.is_some() && opts.quality.is_some() {
            warn!(
                output = %output.display(),
                "both bitrate and quality supplied; bitrate wins"
            );
        }

        let stream_file = match &opts.stream_file {
            Some(path) => {
                ensure_exists(path)?;
                Some(path.clone())
            }
            None => None,
        };

        let macroblock = opts.macroblock.unwrap_or(DEFAULT_MACROBLOCK);
        let (padded_width, padded_height) = pad_to_macroblock(width, height, macroblock);

        Ok(Self {
            output: output.to_path_buf(),
            input_width: width,
            input_height: height,
            width: padded_width,
            height: padded_height,
            pixel_format: opts.pixel_format.unwrap_or_default(),
            bitrate: opts.bitrate,
            quality,
            macroblock,
            fps,
            codec: opts
                .codec
                .clone()
                .unwrap_or_else(|| default_codec(output).to_string()),
            loop_count: opts.loop_count.unwrap_or(0),
            delay: match opts.delay {
                None | Some(0) => REUSE_PREVIOUS_DELAY,
                Some(d) => d,
            },
            stream_file,
            audio_codec: opts.audio_codec.clone(),
        })
    }

    /// Whether the output is a GIF (decided by extension, not codec).
    pub fn is_gif(&self) -> bool {
        has_extension(&self.output, "gif")
    }

    /// Whether padding changed the requested size.
    pub fn is_padded(&self) -> bool {
        self.width != self.input_width || self.height != self.input_height
    }

    /// Rate parameter derived from bitrate, quality and codec.
    pub fn rate_control(&self) -> RateControl {
        if let Some(bitrate) = self.bitrate {
            RateControl::Bitrate(bitrate)
        } else if self.codec == H264_CODEC {
            RateControl::ConstantRateFactor((self.quality * 51.0) as u32)
        } else {
            RateControl::QualityScale((self.quality * 30.0) as u32 + 1)
        }
    }

    /// Full `ffmpeg` argument vector, without the program name.
    pub fn args(&self) -> Vec<String> {
        let mut args: Vec<String> = [
            "-y",
            "-loglevel",
            "quiet",
            "-f",
            "rawvideo",
            "-vcodec",
            "rawvideo",
            "-s",
        ]
        .map(String::from)
        .to_vec();
        args.push(format!("{}x{}", self.width, self.height));
        args.extend([
            "-pix_fmt".to_string(),
            self.pixel_format.ffmpeg_name().to_string(),
            "-r".to_string(),
            format!("{:.2}", self.fps),
            "-i".to_string(),
            "-".to_string(),
        ]);

        let aux = self.stream_file.as_ref().filter(|_| !self.is_gif());
        if let Some(aux) = aux {
            args.push("-i".to_string());
            args.push(aux.display().to_string());
            args.extend(
                [
                    "-map", "0:v:0", "-map", "1:a?", "-map", "1:s?", "-map", "1:d?", "-map",
                    "1:t?", "-c:a", "copy", "-c:s", "copy", "-c:d", "copy", "-c:t", "copy",
                    "-shortest",
                ]
                .map(String::from),
            );
        }

        args.extend([
            "-vcodec".to_string(),
            self.codec.clone(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
        ]);

        match self.rate_control() {
            RateControl::Bitrate(b) => args.extend(["-b:v".to_string(), b.to_string()]),
            RateControl::ConstantRateFactor(crf) => {
                args.extend(["-crf".to_string(), crf.to_string()])
            }
            RateControl::QualityScale(q) => args.extend(["-q:v".to_string(), q.to_string()]),
        }

        if self.is_gif() {
            args.extend([
                "-loop".to_string(),
                self.loop_count.to_string(),
                "-final_delay".to_string(),
                self.delay.to_string(),
            ]);
        }

        if self.is_padded() {
            args.push("-vf".to_string());
            args.push(format!("scale={}:{}", self.width, self.height));
        }

        // Streams are already mapped above; mapping `0:v:0` again would add a second video stream.
        if let (Some(_), Some(codec)) = (aux, &self.audio_codec) {
            args.push("-acodec".to_string());
            args.push(codec.clone());
        }

        args.push(self.output.display().to_string());
        args
    }
}

/// Round each dimension up to the next multiple of `macroblock`; `macroblock <= 1` is a no-op.
pub fn pad_to_macroblock(width: u32, height: u32, macroblock: u32) -> (u32, u32) {
    if macroblock <= 1 {
        return (width, height);
    }
    let pad = |d: u32| match d % macroblock {
        0 => d,
        r => d + (macroblock - r),
    };
    (pad(width), pad(height))
}

fn default_codec(output: &Path) -> &'static str {
    if has_extension(output, "wmv") {
        "msmpeg4"
    } else if has_extension(output, "gif") {
        "gif"
    } else {
        H264_CODEC
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/options.rs"]
mod tests;
