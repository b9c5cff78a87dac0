//! Score Tracker
//!
//! Adds up the `points` tag of every region hit and shows the running total
//! on the feed. Each shot gets its score in a `Score` column of the shot list.

use super::{ProtocolFactory, ProtocolInfo, ProtocolOperations, TargetSnapshot, TrainingProtocol};
use crate::session::{Shot, ShotEntryId};
use crate::surface::{RegionId, RegionTags};

/// Key holding the integer score of a region
pub const POINTS_TAG: &str = "points";

const SCORE_COLUMN: &str = "Score";

pub struct ScoreTracker {
    operations: ProtocolOperations,
    total: i64,
    /// Points of the region hit by the shot being processed
    pending: Option<i64>,
}

impl ScoreTracker {
    pub fn new(operations: ProtocolOperations) -> Self {
        operations.add_shot_list_columns(&[SCORE_COLUMN]);
        let tracker = Self {
            operations,
            total: 0,
            pending: None,
        };
        tracker.show_total();
        tracker
    }

    pub fn total(&self) -> i64 {
        self.total
    }

    fn show_total(&self) {
        self.operations
            .show_text_on_feed(&format!("Score: {}", self.total));
    }
}

impl TrainingProtocol for ScoreTracker {
    fn hit_listener(
        &mut self,
        region: RegionId,
        tags: &RegionTags,
        _shot: &Shot,
        _entry: ShotEntryId,
    ) {
        let points = match tags.first(POINTS_TAG).map(|p| p.trim().parse::<i64>()) {
            Some(Ok(points)) => points,
            Some(Err(_)) => {
                log::warn!("Region {} has a non-numeric points tag", region);
                0
            }
            None => 0,
        };
        self.pending = Some(points);
    }

    fn shot_listener(&mut self, _shot: &Shot, entry: ShotEntryId, is_hit: bool) {
        let points = self.pending.take().filter(|_| is_hit).unwrap_or(0);
        self.total += points;

        self.operations
            .append_shot_list_column_data(entry, &[points.to_string()]);
        self.show_total();
    }

    fn reset(&mut self, _targets: &[TargetSnapshot]) {
        self.total = 0;
        self.pending = None;
        self.show_total();
    }

    fn destroy(&mut self) {
        self.operations.clear_text();
    }
}

pub struct ScoreTrackerFactory;

impl ProtocolFactory for ScoreTrackerFactory {
    fn info(&self) -> ProtocolInfo {
        ProtocolInfo {
            name: "Score Tracker".to_string(),
            version: "1.0".to_string(),
            creator: "ShootOFF Contributors".to_string(),
            description: "Adds up the points of every region you hit and shows the \
                          running score on the feed."
                .to_string(),
        }
    }

    fn load(
        &self,
        operations: ProtocolOperations,
        _targets: &[TargetSnapshot],
    ) -> Box<dyn TrainingProtocol> {
        Box::new(ScoreTracker::new(operations))
    }
}
