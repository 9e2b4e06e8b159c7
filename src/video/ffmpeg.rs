//! ffprobe / ffmpeg subprocess video I/O.
//!
//! Decoding pipes raw `rgb24` frames out of ffmpeg's stdout; encoding pipes
//! them into ffmpeg's stdin and lets libx264 write the container.

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use serde::Deserialize;
use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use super::{FrameSink, FrameSource, VideoInfo};
use crate::config::VideoConfig;
use crate::log;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
}

/// Parses an ffprobe rate such as `30000/1001` or `25`. `0/0` and garbage give `None`.
pub fn parse_frame_rate(rate: &str) -> Option<f64> {
    let value = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.trim().parse().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Extracts stream properties from `ffprobe -of json` output.
pub fn parse_probe_json(json: &str) -> Result<VideoInfo> {
    let probe: ProbeOutput = serde_json::from_str(json).context("Invalid ffprobe output")?;
    let stream = probe
        .streams
        .into_iter()
        .find(|s| s.width.is_some() && s.height.is_some())
        .ok_or_else(|| anyhow!("No video stream found"))?;

    let fps = stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_frame_rate))
        .unwrap_or(0.0);

    Ok(VideoInfo {
        width: stream.width.unwrap_or(0),
        height: stream.height.unwrap_or(0),
        fps,
        frame_count: stream.nb_frames.and_then(|n| n.parse().ok()),
    })
}

/// Reads stream properties of the first video stream.
pub fn probe(path: &Path, config: &VideoConfig) -> Result<VideoInfo> {
    let output = Command::new(&config.ffprobe_path)
        .args(["-v", "error", "-select_streams", "v:0"])
        .args([
            "-show_entries",
            "stream=width,height,avg_frame_rate,r_frame_rate,nb_frames",
        ])
        .args(["-of", "json"])
        .arg(path)
        .output()
        .with_context(|| format!("Failed to run {}", config.ffprobe_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!(
            "ffprobe could not open {}: {}",
            path.display(),
            stderr.trim()
        ));
    }

    let info = parse_probe_json(&String::from_utf8_lossy(&output.stdout))
        .with_context(|| format!("Failed to probe {}", path.display()))?;

    if info.width == 0 || info.height == 0 {
        return Err(anyhow!("{} reports an empty frame size", path.display()));
    }
    Ok(info)
}

/// Decodes a video into RGB frames through an ffmpeg pipe.
pub struct FfmpegReader {
    info: VideoInfo,
    child: Child,
    stdout: ChildStdout,
    frame_len: usize,
}

impl FfmpegReader {
    pub fn open(path: &Path, config: &VideoConfig) -> Result<Self> {
        let info = probe(path, config)?;

        let mut child = Command::new(&config.ffmpeg_path)
            .args(["-v", "error", "-i"])
            .arg(path)
            .args(["-an", "-sn", "-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to start {}", config.ffmpeg_path.display()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("ffmpeg stdout was not captured"))?;

        let frame_len = info.width as usize * info.height as usize * 3;
        log(&format!(
            "Opened {} ({}x{} @ {:.3} fps, {} frames)",
            path.display(),
            info.width,
            info.height,
            info.fps,
            info.frame_count
                .map(|n| n.to_string())
                .unwrap_or_else(|| "?".to_string())
        ));

        Ok(Self {
            info,
            child,
            stdout,
            frame_len,
        })
    }
}

impl FrameSource for FfmpegReader {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        let mut buf = vec![0u8; self.frame_len];
        match self.stdout.read_exact(&mut buf) {
            Ok(()) => {}
            // End of stream; a trailing partial frame is dropped
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e).context("Failed to read frame from ffmpeg"),
        }
        RgbImage::from_raw(self.info.width, self.info.height, buf)
            .map(Some)
            .ok_or_else(|| anyhow!("Decoded frame has the wrong size"))
    }
}

impl Drop for FfmpegReader {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Encodes RGB frames to H.264 (yuv420p) through an ffmpeg pipe.
pub struct FfmpegWriter {
    child: Child,
    stdin: Option<ChildStdin>,
    width: u32,
    height: u32,
}

impl FfmpegWriter {
    pub fn create(
        path: &Path,
        width: u32,
        height: u32,
        fps: f64,
        config: &VideoConfig,
    ) -> Result<Self> {
        let fps = if fps > 0.0 { fps } else { 30.0 };

        let mut child = Command::new(&config.ffmpeg_path)
            .args(["-y", "-v", "error"])
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24"])
            .args(["-s", &format!("{}x{}", width, height)])
            .args(["-r", &format!("{}", fps)])
            .args(["-i", "-"])
            // yuv420p needs even dimensions
            .args(["-vf", "pad=ceil(iw/2)*2:ceil(ih/2)*2"])
            .args(["-c:v", "libx264", "-pix_fmt", "yuv420p"])
            .args(["-crf", &config.crf.to_string()])
            .args(["-movflags", "+faststart"])
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to start {}", config.ffmpeg_path.display()))?;

        let stdin = child.stdin.take();
        Ok(Self {
            child,
            stdin,
            width,
            height,
        })
    }
}

impl FrameSink for FfmpegWriter {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(anyhow!(
                "Frame is {}x{}, writer expects {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            ));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| anyhow!("Video writer already finished"))?;
        stdin
            .write_all(frame.as_raw())
            .context("Failed to write frame to ffmpeg")
    }

    fn finish(&mut self) -> Result<()> {
        // Closing stdin signals end of input
        if self.stdin.take().is_none() {
            return Ok(());
        }
        let status = self.child.wait().context("Failed to wait for ffmpeg")?;
        if !status.success() {
            return Err(anyhow!("ffmpeg exited with {}", status));
        }
        Ok(())
    }
}

impl Drop for FfmpegWriter {
    fn drop(&mut self) {
        if self.stdin.take().is_some() {
            let _ = self.child.wait();
        }
    }
}
