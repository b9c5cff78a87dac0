//! Laser shot detection
//!
//! A frame is reduced to brightness, thresholded into a binary mask and
//! searched for its brightest point. The average color of the original frame
//! around that point decides whether it was a red laser, a green laser or
//! something else entirely.

use image::{GrayImage, Luma};
use imageproc::contrast::{threshold, ThresholdType};
use imageproc::drawing::draw_filled_circle_mut;
use serde::{Deserialize, Serialize};

use super::capture::Frame;
use crate::config::{IgnoreColor, Preferences};
use crate::surface::Point;

/// Classified laser color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaserColor {
    Red,
    Green,
}

impl LaserColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            LaserColor::Red => "red",
            LaserColor::Green => "green",
        }
    }
}

impl std::fmt::Display for LaserColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected bright spot with a laser color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotCandidate {
    pub point: Point,
    pub color: LaserColor,
}

/// Extremes of a single channel image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinMaxLoc {
    pub min: u8,
    pub max: u8,
    pub min_loc: (u32, u32),
    pub max_loc: (u32, u32),
}

/// Global minimum and maximum with the first location of each in row-major
/// order. Returns `None` for an empty image.
pub fn min_max_loc(image: &GrayImage) -> Option<MinMaxLoc> {
    let mut pixels = image.enumerate_pixels();
    let (x, y, first) = pixels.next()?;

    let mut result = MinMaxLoc {
        min: first[0],
        max: first[0],
        min_loc: (x, y),
        max_loc: (x, y),
    };

    for (x, y, pixel) in pixels {
        let value = pixel[0];
        if value < result.min {
            result.min = value;
            result.min_loc = (x, y);
        }
        if value > result.max {
            result.max = value;
            result.max_loc = (x, y);
        }
    }

    Some(result)
}

/// Classify a mean RGB color. A channel must strictly dominate both others.
pub fn classify_color(mean: [f64; 3]) -> Option<LaserColor> {
    let [r, g, b] = mean;
    if r > g && r > b {
        Some(LaserColor::Red)
    } else if g > r && g > b {
        Some(LaserColor::Green)
    } else {
        None
    }
}

/// Finds at most one laser shot per frame
#[derive(Debug, Clone)]
pub struct ShotDetector {
    /// Brightness cutoff for the binary mask
    intensity: u8,
    /// Radius of the color sampling circle
    sample_radius: u32,
    ignore: IgnoreColor,
}

impl ShotDetector {
    pub fn new(intensity: u8, sample_radius: u32) -> Self {
        Self {
            intensity,
            sample_radius,
            ignore: IgnoreColor::None,
        }
    }

    pub fn from_preferences(prefs: &Preferences) -> Self {
        Self::new(prefs.laser_intensity, prefs.marker_radius).with_ignore(prefs.ignore_laser_color)
    }

    pub fn with_ignore(mut self, ignore: IgnoreColor) -> Self {
        self.ignore = ignore;
        self
    }

    /// Binary mask: 255 where brightness exceeds the cutoff, 0 elsewhere
    pub fn threshold(&self, frame: &Frame) -> GrayImage {
        threshold(&frame.to_gray(), self.intensity, ThresholdType::Binary)
    }

    /// Run detection on a frame and its precomputed mask
    pub fn detect_in_mask(&self, frame: &Frame, mask: &GrayImage) -> Option<ShotCandidate> {
        let extremes = min_max_loc(mask)?;

        // Nothing bright in the frame
        if extremes.min == extremes.max {
            return None;
        }

        let (x, y) = extremes.max_loc;
        let mean = self.sample_color(frame, x, y)?;

        let Some(color) = classify_color(mean) else {
            log::trace!(
                "Bright spot at ({}, {}) is not a laser: mean rgb {:.1}/{:.1}/{:.1}",
                x,
                y,
                mean[0],
                mean[1],
                mean[2]
            );
            return None;
        };

        if self.ignore.ignores(color) {
            log::trace!("Ignoring {} laser at ({}, {})", color, x, y);
            return None;
        }

        Some(ShotCandidate {
            point: Point::from((x, y)),
            color,
        })
    }

    /// Threshold a frame and run detection on it
    pub fn detect(&self, frame: &Frame) -> Option<ShotCandidate> {
        let mask = self.threshold(frame);
        self.detect_in_mask(frame, &mask)
    }

    /// Mean color of the frame inside a filled circle around (x, y)
    pub fn sample_color(&self, frame: &Frame, x: u32, y: u32) -> Option<[f64; 3]> {
        let image = frame.image();
        let mut mask = GrayImage::new(image.width(), image.height());
        draw_filled_circle_mut(
            &mut mask,
            (x as i32, y as i32),
            self.sample_radius as i32,
            Luma([255u8]),
        );

        let mut sum = [0.0f64; 3];
        let mut count = 0u64;
        for (pixel, covered) in image.pixels().zip(mask.pixels()) {
            if covered[0] == 0 {
                continue;
            }
            sum[0] += pixel[0] as f64;
            sum[1] += pixel[1] as f64;
            sum[2] += pixel[2] as f64;
            count += 1;
        }

        if count == 0 {
            return None;
        }
        let n = count as f64;
        Some([sum[0] / n, sum[1] / n, sum[2] / n])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn frame_with_spot(color: [u8; 3], center: (i32, i32), radius: i32) -> Frame {
        let mut image = RgbImage::new(64, 48);
        draw_filled_circle_mut(&mut image, center, radius, Rgb(color));
        Frame::new(image)
    }

    fn detector() -> ShotDetector {
        ShotDetector::new(50, 10)
    }

    #[test]
    fn test_min_max_first_occurrence() {
        let mut mask = GrayImage::new(4, 3);
        mask.put_pixel(2, 1, Luma([255]));
        mask.put_pixel(1, 2, Luma([255]));

        let loc = min_max_loc(&mask).unwrap();
        assert_eq!(loc.min, 0);
        assert_eq!(loc.max, 255);
        assert_eq!(loc.min_loc, (0, 0));
        assert_eq!(loc.max_loc, (2, 1));

        assert!(min_max_loc(&GrayImage::new(0, 0)).is_none());
    }

    #[test]
    fn test_uniform_frames_yield_nothing() {
        let black = Frame::new(RgbImage::new(32, 32));
        assert!(detector().detect(&black).is_none());

        let white = Frame::new(RgbImage::from_pixel(32, 32, Rgb([255, 255, 255])));
        assert!(detector().detect(&white).is_none());
    }

    #[test]
    fn test_red_spot() {
        let frame = frame_with_spot([255, 60, 60], (30, 20), 4);
        let shot = detector().detect(&frame).unwrap();
        assert_eq!(shot.color, LaserColor::Red);
        // Topmost-leftmost bright pixel of the spot
        assert_eq!(shot.point.y, 16.0);
    }

    #[test]
    fn test_green_spot() {
        let frame = frame_with_spot([60, 255, 60], (10, 10), 3);
        let shot = detector().detect(&frame).unwrap();
        assert_eq!(shot.color, LaserColor::Green);
    }

    #[test]
    fn test_ambiguous_spot_is_dropped() {
        // White: no channel dominates
        let frame = frame_with_spot([220, 220, 220], (30, 20), 4);
        assert!(detector().detect(&frame).is_none());

        // Yellow: red ties with green
        let frame = frame_with_spot([255, 255, 0], (30, 20), 4);
        assert!(detector().detect(&frame).is_none());
    }

    #[test]
    fn test_ignored_color_is_dropped() {
        let frame = frame_with_spot([255, 60, 60], (30, 20), 4);
        let detector = detector().with_ignore(IgnoreColor::Red);
        assert!(detector.detect(&frame).is_none());

        let frame = frame_with_spot([60, 255, 60], (30, 20), 4);
        assert!(detector.detect(&frame).is_some());
    }

    #[test]
    fn test_pure_red_spot_clears_low_cutoff() {
        let frame = frame_with_spot([255, 0, 0], (30, 20), 4);
        let shot = ShotDetector::new(60, 10).detect(&frame).unwrap();
        assert_eq!(shot.color, LaserColor::Red);
    }

    #[test]
    fn test_dim_spot_below_cutoff() {
        let frame = frame_with_spot([255, 60, 60], (30, 20), 4);
        let detector = ShotDetector::new(250, 10);
        assert!(detector.detect(&frame).is_none());
    }

    #[test]
    fn test_classify_requires_strict_dominance() {
        assert_eq!(classify_color([10.0, 5.0, 5.0]), Some(LaserColor::Red));
        assert_eq!(classify_color([5.0, 10.0, 9.0]), Some(LaserColor::Green));
        assert_eq!(classify_color([10.0, 10.0, 5.0]), None);
        assert_eq!(classify_color([5.0, 5.0, 10.0]), None);
    }

    #[test]
    fn test_sample_color_at_edge() {
        let frame = Frame::new(RgbImage::from_pixel(8, 8, Rgb([0, 200, 0])));
        let mean = detector().sample_color(&frame, 0, 0).unwrap();
        assert_eq!(mean, [0.0, 200.0, 0.0]);
    }
}
