//! Laser shot sensing
//!
//! This module turns camera frames into shot candidates:
//! - `capture` - frames, the camera boundary and the latest-frame handoff
//! - `detector` - thresholding, brightest spot search and color classification
//! - `interference` - one-time glare detection and the interference view

pub mod capture;
pub mod detector;
pub mod interference;

pub use capture::{Frame, FrameCell, FrameSequence, FrameSource};
pub use detector::{classify_color, min_max_loc, LaserColor, MinMaxLoc, ShotCandidate, ShotDetector};
pub use interference::{InterferenceMonitor, DARK_FRACTION_LIMIT};
