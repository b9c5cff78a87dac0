//! Owner of the single active training protocol

use super::{ProtocolFactory, ProtocolOperations, TargetSnapshot, TrainingProtocol};
use crate::session::{Shot, ShotEntryId};
use crate::surface::{RegionId, RegionTags};

struct ActiveProtocol {
    name: String,
    protocol: Box<dyn TrainingProtocol>,
    operations: ProtocolOperations,
}

/// Forwards shot events to the active protocol.
///
/// Every forwarder is a no-op while no protocol is loaded.
#[derive(Default)]
pub struct ProtocolDispatcher {
    active: Option<ActiveProtocol>,
}

impl ProtocolDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the active protocol with a fresh instance from `factory`
    pub fn load(
        &mut self,
        factory: &dyn ProtocolFactory,
        operations: ProtocolOperations,
        targets: &[TargetSnapshot],
    ) {
        self.cancel();

        let name = factory.info().name;
        log::info!("Loading training protocol '{}' with {} targets", name, targets.len());

        let protocol = factory.load(operations.clone(), targets);
        self.active = Some(ActiveProtocol {
            name,
            protocol,
            operations,
        });
    }

    /// Destroy the active protocol and its operations
    pub fn cancel(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };

        log::info!("Unloading training protocol '{}'", active.name);
        active.protocol.destroy();
        active.operations.destroy();
    }

    pub fn hit_listener(
        &mut self,
        region: RegionId,
        tags: &RegionTags,
        shot: &Shot,
        entry: ShotEntryId,
    ) {
        if let Some(active) = self.active.as_mut() {
            active.protocol.hit_listener(region, tags, shot, entry);
        }
    }

    pub fn shot_listener(&mut self, shot: &Shot, entry: ShotEntryId, is_hit: bool) {
        if let Some(active) = self.active.as_mut() {
            active.protocol.shot_listener(shot, entry, is_hit);
        }
    }

    pub fn reset(&mut self, targets: &[TargetSnapshot]) {
        if let Some(active) = self.active.as_mut() {
            log::debug!("Resetting training protocol '{}'", active.name);
            active.protocol.reset(targets);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Name of the active protocol
    pub fn active_name(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.name.as_str())
    }
}

impl Drop for ProtocolDispatcher {
    fn drop(&mut self) {
        self.cancel();
    }
}
