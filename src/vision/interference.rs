//! Glare and ambient light detection
//!
//! A clean thresholded mask is almost entirely black. When a lamp, a window or
//! a reflection pushes too much of the image over the laser cutoff, shots will
//! be misdetected. The monitor checks for this once per session and offers the
//! user a short look at the mask so the source can be found.

use image::GrayImage;
use imageproc::stats::histogram;

use crate::session::UserPrompt;

/// Masks with a smaller dark fraction than this are contaminated
pub const DARK_FRACTION_LIMIT: f64 = 0.99;

/// One-shot interference detector and interference view countdown
#[derive(Debug, Clone)]
pub struct InterferenceMonitor {
    /// Latched after the first contamination in a session
    seen: bool,
    /// Refresh ticks left showing the mask
    view_ticks: u32,
    /// Refresh ticks to show the mask once accepted
    ticks_per_view: u32,
}

impl InterferenceMonitor {
    pub fn new(ticks_per_view: u32) -> Self {
        Self {
            seen: false,
            view_ticks: 0,
            ticks_per_view,
        }
    }

    /// Fraction of mask pixels that are fully dark
    pub fn dark_fraction(mask: &GrayImage) -> f64 {
        let total = mask.width() as u64 * mask.height() as u64;
        if total == 0 {
            return 1.0;
        }
        let dark = histogram(mask).channels[0][0] as u64;
        dark as f64 / total as f64
    }

    /// Whether interference has been declared this session
    pub fn has_seen(&self) -> bool {
        self.seen
    }

    /// Examine a thresholded mask. Only the first call per session that finds
    /// contamination prompts the user; every later call is a no-op.
    ///
    /// Returns true when interference was declared by this call.
    pub fn observe(&mut self, mask: &GrayImage, prompt: &dyn UserPrompt) -> bool {
        if self.seen {
            return false;
        }

        let dark = Self::dark_fraction(mask);
        if dark >= DARK_FRACTION_LIMIT {
            return false;
        }

        self.seen = true;
        log::warn!(
            "Glare or light source detected. {:.3} of the image is dark.",
            dark
        );

        let accepted = prompt.ask_yes_no(
            "Interference Detected",
            "Bright glare or a light source has been detected on the webcam feed, which will \
             interfere with shot detection. Do you want to see a feed where the interference \
             will be white and everything else will be black for a short period of time?",
        );

        if accepted {
            self.view_ticks = self.ticks_per_view;
            log::info!("Showing interference view for {} frames", self.view_ticks);
        }
        true
    }

    /// Whether the refresh cycle is still showing the mask
    pub fn is_showing(&self) -> bool {
        self.view_ticks > 0
    }

    /// Consume one refresh tick of the interference view.
    /// Returns true if this frame should show the mask.
    pub fn take_view_tick(&mut self) -> bool {
        if self.view_ticks == 0 {
            return false;
        }
        self.view_ticks -= 1;
        true
    }

    pub fn remaining_view_ticks(&self) -> u32 {
        self.view_ticks
    }

    /// Start a new session: allow one more warning
    pub fn reset(&mut self) {
        self.seen = false;
        self.view_ticks = 0;
    }
}
