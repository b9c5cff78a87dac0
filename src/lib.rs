//! ShootOFF Core
//!
//! Shot detection and hit resolution for camera-based laser shooting practice.
//!
//! A camera watches a projected or printed target. Every detection tick the
//! newest frame is thresholded, the brightest spot is color classified, and a
//! red or green laser dot becomes a [`Shot`]. The shot is timed against the
//! session clock, tested against the target regions drawn on the rendering
//! surface, and the outcome is handed to the active training protocol.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use shootoff_core::protocols::NullAudio;
//! use shootoff_core::session::HeadlessPrompt;
//! use shootoff_core::vision::FrameSequence;
//! use shootoff_core::{
//!     FeedRunner, MemoryCanvas, Preferences, ProtocolRegistry, RunnerConfig, SessionContext,
//! };
//!
//! # fn main() -> shootoff_core::Result<()> {
//! let preferences = Preferences::load("shootoff.toml")?;
//! let canvas = MemoryCanvas::shared(640, 480);
//! let mut session = SessionContext::new(preferences, canvas, Arc::new(NullAudio));
//!
//! let mut registry = ProtocolRegistry::new();
//! registry.register_builtin();
//! session.load_protocol_by_name(&registry, "Score Tracker")?;
//!
//! let camera = FrameSequence::from_directory("frames", true)?;
//! let mut runner = FeedRunner::new(RunnerConfig::default(), session, Arc::new(HeadlessPrompt));
//! runner.start(Box::new(camera))?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod session;
pub mod protocols;
pub mod surface;
pub mod vision;

pub use crate::config::{IgnoreColor, Preferences, RunnerConfig};
pub use crate::session::{
    Command, FeedRunner, HitOutcome, PeriodicTask, SessionContext, Shot, ShotEntryId,
    ShotRegistry, ShutdownLatch, TargetRegion, UserPrompt,
};
pub use crate::protocols::{
    AudioSink, ProtocolDispatcher, ProtocolFactory, ProtocolInfo, ProtocolOperations,
    ProtocolRegistry, TargetSnapshot, TrainingProtocol,
};
pub use crate::surface::{
    FeedImage, MemoryCanvas, Point, RegionId, RegionTags, RenderingSurface, Shape,
};
pub use crate::vision::{
    Frame, FrameSequence, FrameSource, InterferenceMonitor, LaserColor, ShotCandidate,
    ShotDetector,
};

/// Errors produced by the shot pipeline
#[derive(Debug, thiserror::Error)]
pub enum ShootOffError {
    /// Preferences file could not be parsed
    #[error("invalid preferences: {0}")]
    Config(#[from] toml::de::Error),

    /// Preferences could not be written
    #[error("failed to serialize preferences: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    /// A preference value is out of range
    #[error("invalid preference {key}: {reason}")]
    InvalidPreference { key: &'static str, reason: String },

    /// Filesystem or thread spawn failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A single frame could not be read
    #[error("frame capture failed: {0}")]
    CaptureFailed(String),

    /// The camera could not be opened at all
    #[error("capture source unavailable")]
    CaptureUnavailable,

    /// No training protocol is registered under this name
    #[error("training protocol not found: {0}")]
    ProtocolNotFound(String),

    /// The feed runner was started twice
    #[error("feed runner already running")]
    AlreadyRunning,

    /// The runner's shutdown latch is set; build a new runner to resume
    #[error("feed runner has shut down")]
    ShutDown,
}

/// Result type for shot pipeline operations
pub type Result<T> = std::result::Result<T, ShootOffError>;
