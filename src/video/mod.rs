//! Frame-level video input and output.
//!
//! The pipeline reads decoded RGB frames from a `FrameSource` and writes
//! annotated frames to a `FrameSink`. The ffmpeg-backed implementations live
//! in `ffmpeg`; tests drive the pipeline with in-memory frames.

pub mod ffmpeg;

pub use ffmpeg::{FfmpegReader, FfmpegWriter};

use anyhow::Result;
use image::RgbImage;

/// Stream properties of an opened video.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Frames per second; 0.0 if the container does not say
    pub fps: f64,
    /// Frame count reported by the container, if any
    pub frame_count: Option<u64>,
}

/// Sequential decoded frames.
pub trait FrameSource {
    fn info(&self) -> &VideoInfo;

    /// Next frame, or `None` at the end of the stream.
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;
}

/// Receives frames in order and finalizes the output when done.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;
    fn finish(&mut self) -> Result<()>;
}

/// Discards frames; used when no annotated video is requested.
pub struct NullSink;

impl FrameSink for NullSink {
    fn write_frame(&mut self, _frame: &RgbImage) -> Result<()> {
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}
