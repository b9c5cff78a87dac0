//! Training protocols
//!
//! A training protocol is a pluggable drill: it is told about every shot and
//! every hit, may draw on the feed, play sounds and add columns to the shot
//! list. Protocols are registered by name in a [`ProtocolRegistry`] at start-up
//! and at most one is active at a time, owned by the [`ProtocolDispatcher`].
//!
//! # Example
//!
//! ```ignore
//! let mut registry = ProtocolRegistry::new();
//! registry.register_builtin();
//! session.load_protocol_by_name(&registry, "Score Tracker")?;
//! ```

mod dispatcher;
mod operations;
mod registry;
pub mod score_tracker;

pub use dispatcher::ProtocolDispatcher;
pub use operations::{AudioSink, NullAudio, ProtocolOperations, PROTOCOL_TEXT_TAG};
pub use registry::ProtocolRegistry;
pub use score_tracker::{ScoreTracker, ScoreTrackerFactory};

use serde::{Deserialize, Serialize};

use crate::session::{Shot, ShotEntryId};
use crate::surface::{RegionId, RegionTags};

/// Everything a protocol can shoot at: one entry per target
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TargetSnapshot {
    /// Group tag of the target, e.g. `_internal_name:target0`
    pub name: String,
    /// Parsed tags of each region in the target
    pub regions: Vec<RegionTags>,
}

/// Descriptive information shown when choosing a protocol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolInfo {
    pub name: String,
    pub version: String,
    pub creator: String,
    pub description: String,
}

/// An active training protocol instance
pub trait TrainingProtocol: Send {
    /// The topmost interactive region under a shot was hit
    fn hit_listener(
        &mut self,
        region: RegionId,
        tags: &RegionTags,
        shot: &Shot,
        entry: ShotEntryId,
    );

    /// A shot was processed; called exactly once per shot after any hit
    fn shot_listener(&mut self, shot: &Shot, entry: ShotEntryId, is_hit: bool);

    /// Shots were cleared
    fn reset(&mut self, targets: &[TargetSnapshot]);

    /// The protocol is being unloaded
    fn destroy(&mut self) {}
}

/// Creates protocol instances
pub trait ProtocolFactory: Send + Sync {
    fn info(&self) -> ProtocolInfo;

    /// Build a fresh instance bound to the given operations
    fn load(
        &self,
        operations: ProtocolOperations,
        targets: &[TargetSnapshot],
    ) -> Box<dyn TrainingProtocol>;
}
