//! Camera frames and capture sources

use image::{GrayImage, Luma, RgbImage};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

use crate::{Result, ShootOffError};

/// A captured RGB frame
#[derive(Debug, Clone)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    /// Build a frame from packed RGB8 bytes.
    /// Returns `None` if the buffer is too small for the dimensions.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        RgbImage::from_raw(width, height, data).map(Self::new)
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Single channel brightness using BT.601 luma weights
    pub fn to_gray(&self) -> GrayImage {
        GrayImage::from_fn(self.width(), self.height(), |x, y| {
            let [r, g, b] = self.image.get_pixel(x, y).0;
            Luma([luma(r, g, b)])
        })
    }
}

/// `0.299 R + 0.587 G + 0.114 B`, rounded
fn luma(r: u8, g: u8, b: u8) -> u8 {
    let sum = 299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b);
    ((sum + 500) / 1000) as u8
}

/// Camera boundary
pub trait FrameSource: Send {
    /// Whether the device could be opened at all
    fn is_opened(&self) -> bool {
        true
    }

    /// Read the next frame
    fn read(&mut self) -> Result<Frame>;

    /// Current capture resolution
    fn resolution(&self) -> (u32, u32);

    /// Ask for a different capture resolution; drivers may ignore it
    fn set_resolution(&mut self, width: u32, height: u32) -> Result<()>;

    /// Reported frame rate, or 0.0 if unknown
    fn frame_rate(&self) -> f64 {
        0.0
    }
}

/// Scripted capture source that replays frames from memory.
///
/// `None` entries replay as capture failures, which makes camera dropouts
/// reproducible.
pub struct FrameSequence {
    frames: Vec<Option<Frame>>,
    pending: VecDeque<Option<Frame>>,
    loop_playback: bool,
    resolution: (u32, u32),
    frame_rate: f64,
}

impl FrameSequence {
    pub fn new(frames: Vec<Frame>, loop_playback: bool) -> Self {
        Self::with_failures(frames.into_iter().map(Some).collect(), loop_playback)
    }

    /// Sequence where `None` entries are failed reads
    pub fn with_failures(frames: Vec<Option<Frame>>, loop_playback: bool) -> Self {
        let resolution = frames
            .iter()
            .flatten()
            .next()
            .map(|f| (f.width(), f.height()))
            .unwrap_or((0, 0));
        Self {
            pending: frames.iter().cloned().collect(),
            frames,
            loop_playback,
            resolution,
            frame_rate: 0.0,
        }
    }

    /// Load every image in a directory, sorted by file name
    pub fn from_directory(dir: impl AsRef<Path>, loop_playback: bool) -> Result<Self> {
        let mut paths: Vec<_> = std::fs::read_dir(dir.as_ref())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| matches!(ext.to_lowercase().as_str(), "png" | "jpg" | "jpeg" | "bmp"))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        let mut frames = Vec::with_capacity(paths.len());
        for path in &paths {
            let image = image::open(path)
                .map_err(|e| ShootOffError::CaptureFailed(format!("{}: {}", path.display(), e)))?;
            frames.push(Frame::new(image.to_rgb8()));
        }

        log::info!(
            "Loaded {} frames from {}",
            frames.len(),
            dir.as_ref().display()
        );
        Ok(Self::new(frames, loop_playback))
    }

    /// Report a frame rate, as a real camera would
    pub fn with_frame_rate(mut self, fps: f64) -> Self {
        self.frame_rate = fps;
        self
    }

    /// Report a resolution different from the frames themselves
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.resolution = (width, height);
        self
    }

    /// Reads left before the sequence ends or loops
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl FrameSource for FrameSequence {
    fn is_opened(&self) -> bool {
        !self.frames.is_empty()
    }

    fn read(&mut self) -> Result<Frame> {
        if self.pending.is_empty() && self.loop_playback {
            self.pending = self.frames.iter().cloned().collect();
        }

        match self.pending.pop_front() {
            Some(Some(frame)) => Ok(frame),
            Some(None) => Err(ShootOffError::CaptureFailed("dropped frame".to_string())),
            None => Err(ShootOffError::CaptureFailed("end of sequence".to_string())),
        }
    }

    fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    fn set_resolution(&mut self, width: u32, height: u32) -> Result<()> {
        log::debug!(
            "Frame sequence ignores resolution change to {}x{}",
            width,
            height
        );
        Ok(())
    }

    fn frame_rate(&self) -> f64 {
        self.frame_rate
    }
}

/// Hands the newest frame from the refresh cycle to the detection cycle
#[derive(Default)]
pub struct FrameCell {
    latest: Mutex<Option<Arc<Frame>>>,
}

impl FrameCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the latest frame
    pub fn publish(&self, frame: Frame) -> Arc<Frame> {
        let frame = Arc::new(frame);
        *self.latest.lock() = Some(frame.clone());
        frame
    }

    /// Newest frame, if any has been captured yet
    pub fn latest(&self) -> Option<Arc<Frame>> {
        self.latest.lock().clone()
    }

    pub fn clear(&self) {
        *self.latest.lock() = None;
    }
}
