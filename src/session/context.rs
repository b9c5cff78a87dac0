//! Session state: shots, targets, selection and the active protocol
//!
//! Everything one shooting session owns lives in a [`SessionContext`]. The
//! feed runner keeps it behind a single mutex, so a shot is fully resolved
//! (marker drawn, commands run, protocol notified) before the next one starts.

use std::sync::Arc;
use std::time::Instant;

use super::command::{Command, RegionCommand};
use super::hit::{HitOutcome, RegionHitResolver};
use super::shot::{SharedShotList, Shot, ShotRegistry};
use crate::config::Preferences;
use crate::protocols::{
    AudioSink, ProtocolDispatcher, ProtocolFactory, ProtocolOperations, ProtocolRegistry,
    TargetSnapshot,
};
use crate::surface::{
    tag, FeedImage, Point, RegionTags, Shape, SharedSurface, TagParser, BACKGROUND_TAG,
    INTERNAL_NAME_TAG, SHOT_MARKER_TAG,
};
use crate::vision::{LaserColor, ShotCandidate};
use crate::{Result, ShootOffError};

/// One region of a target about to be placed on the surface
#[derive(Debug, Clone, PartialEq)]
pub struct TargetRegion {
    pub shape: Shape,
    /// Raw tags, e.g. `points:10` or `command:play_sound(beep.wav)`
    pub tags: Vec<String>,
}

impl TargetRegion {
    pub fn new(shape: Shape, tags: &[&str]) -> Self {
        Self {
            shape,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }
}

pub struct SessionContext {
    preferences: Preferences,
    surface: SharedSurface,
    audio: Arc<dyn AudioSink>,
    registry: ShotRegistry,
    dispatcher: ProtocolDispatcher,
    /// Group tags of the live targets, in placement order
    targets: Vec<String>,
    /// Only prevents name collisions; never decremented
    target_count: u64,
    selected_target: Option<String>,
    show_targets: bool,
}

impl SessionContext {
    pub fn new(
        preferences: Preferences,
        surface: SharedSurface,
        audio: Arc<dyn AudioSink>,
    ) -> Self {
        Self {
            preferences,
            surface,
            audio,
            registry: ShotRegistry::new(),
            dispatcher: ProtocolDispatcher::new(),
            targets: Vec::new(),
            target_count: 0,
            selected_target: None,
            show_targets: true,
        }
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn set_preferences(&mut self, preferences: Preferences) {
        log::debug!("Preferences updated: {:?}", preferences);
        self.preferences = preferences;
    }

    pub fn surface(&self) -> &SharedSurface {
        &self.surface
    }

    pub fn shots(&self) -> &[Shot] {
        self.registry.shots()
    }

    pub fn shot_list(&self) -> SharedShotList {
        self.registry.shot_list()
    }

    /// Record a detected shot now and resolve what it hit
    pub fn handle_shot(&mut self, candidate: ShotCandidate) -> HitOutcome {
        self.handle_shot_at(candidate.point, candidate.color, Instant::now())
    }

    /// Record a shot observed at `now`, draw its marker and resolve what it hit
    pub fn handle_shot_at(&mut self, point: Point, color: LaserColor, now: Instant) -> HitOutcome {
        let mut shot = self.registry.record_at(point, color, now);

        let marker = self.surface.lock().draw_shot_marker(
            point,
            self.preferences.marker_radius,
            color.as_str(),
        );
        self.registry.set_marker(shot.entry, marker);
        shot.marker = Some(marker);

        log::debug!(
            "{} shot at ({:.0}, {:.0}) after {:.2}s",
            color,
            point.x,
            point.y,
            shot.timestamp.as_secs_f64()
        );

        self.process_hit(&shot)
    }

    /// Synthetic shot from a click on the feed; ignored unless debug is on
    pub fn inject_shot(&mut self, color: LaserColor, point: Point) -> Option<HitOutcome> {
        if !self.preferences.debug {
            log::debug!("Ignoring injected {} shot, debug mode is off", color);
            return None;
        }
        Some(self.handle_shot_at(point, color, Instant::now()))
    }

    /// Test a recorded shot against the surface. Commands of the struck
    /// region run before the protocol hears about the hit, and the protocol
    /// hears about the shot exactly once.
    pub fn process_hit(&mut self, shot: &Shot) -> HitOutcome {
        let outcome = {
            let surface = self.surface.lock();
            RegionHitResolver::resolve(&*surface, shot.point)
        };

        if let HitOutcome::Hit { region, tags } = &outcome {
            log::debug!("Shot {:?} hit region {}", shot.entry, region);
            self.execute_region_commands(tags);
            self.dispatcher.hit_listener(*region, tags, shot, shot.entry);
        }

        self.dispatcher
            .shot_listener(shot, shot.entry, outcome.is_hit());
        outcome
    }

    /// Run every `command` tag of a region, in order
    pub fn execute_region_commands(&mut self, tags: &RegionTags) {
        for raw in tags.commands() {
            let command = Command::parse(raw);
            match command.action() {
                Some(RegionCommand::ClearShots) => self.clear_shots(),
                Some(RegionCommand::PlaySound(sound)) => self.audio.play_sound(&sound),
                None => {}
            }
        }
    }

    /// Remove every shot and marker, restart the session clock and reset the
    /// active protocol
    pub fn clear_shots(&mut self) {
        self.surface.lock().delete_tag(SHOT_MARKER_TAG);
        let cleared = self.registry.len();
        self.registry.clear();

        let targets = self.aggregate_targets();
        self.dispatcher.reset(&targets);

        log::info!("Cleared {} shots", cleared);
    }

    /// Toggle selection of the shot at `index` and update marker fills
    pub fn select_shot(&mut self, index: usize) {
        let changed = self.registry.toggle_selection(index);
        if changed.is_empty() {
            return;
        }

        let mut surface = self.surface.lock();
        for i in changed {
            let shot = &self.registry.shots()[i];
            if let Some(marker) = shot.marker {
                surface.set_marker_selected(marker, shot.selected, shot.color.as_str());
            }
        }
    }

    pub fn selected_shot(&self) -> Option<&Shot> {
        self.registry.selected()
    }

    /// Place a target on the surface under a fresh group tag and return it
    pub fn add_target(&mut self, regions: Vec<TargetRegion>) -> String {
        let group = tag(INTERNAL_NAME_TAG, &format!("target{}", self.target_count));
        self.target_count += 1;

        {
            let mut surface = self.surface.lock();
            for region in regions {
                let mut tags: Vec<String> = region
                    .tags
                    .into_iter()
                    .filter(|t| TagParser::parse_tags(&[t.as_str()]).target_tag().is_none())
                    .collect();
                tags.push(group.clone());
                surface.create_region(region.shape, tags);
            }
        }

        log::info!("Added target {}", group);
        self.targets.push(group.clone());
        group
    }

    /// Remove a target and all of its regions
    pub fn delete_target(&mut self, group: &str) -> bool {
        let Some(pos) = self.targets.iter().position(|t| t == group) else {
            return false;
        };

        self.targets.remove(pos);
        self.surface.lock().delete_tag(group);
        if self.selected_target.as_deref() == Some(group) {
            self.selected_target = None;
        }

        log::info!("Deleted target {}", group);
        true
    }

    /// Select the target owning the topmost region at a point. Clicking
    /// outside every target clears the selection.
    pub fn select_target_at(&mut self, point: Point) -> Option<&str> {
        let group = {
            let surface = self.surface.lock();
            surface
                .find_overlapping(point)
                .into_iter()
                .rev()
                .find_map(|region| TagParser::parse_tags(&surface.tags(region)).target_tag())
        };

        if group != self.selected_target {
            log::debug!("Target selection {:?} -> {:?}", self.selected_target, group);
            self.selected_target = group;
        }
        self.selected_target.as_deref()
    }

    pub fn selected_target(&self) -> Option<&str> {
        self.selected_target.as_deref()
    }

    pub fn delete_selected_target(&mut self) -> bool {
        match self.selected_target.clone() {
            Some(group) => self.delete_target(&group),
            None => false,
        }
    }

    /// Group tags of the live targets
    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn toggle_target_visibility(&mut self) -> bool {
        self.show_targets = !self.show_targets;
        log::debug!("Targets {}", if self.show_targets { "shown" } else { "hidden" });
        self.show_targets
    }

    pub fn targets_visible(&self) -> bool {
        self.show_targets
    }

    /// Replace the feed background and restore the stacking order
    pub fn show_feed(&mut self, image: FeedImage<'_>) {
        let mut surface = self.surface.lock();
        surface.show_feed(image);

        // Hidden targets go under the feed so protocol drawings stay visible
        if self.show_targets {
            for target in &self.targets {
                surface.raise_tag(target);
            }
            surface.raise_tag(SHOT_MARKER_TAG);
            surface.lower_tag(BACKGROUND_TAG);
        } else {
            surface.raise_tag(SHOT_MARKER_TAG);
            surface.lower_tag(BACKGROUND_TAG);
            for target in &self.targets {
                surface.lower_tag(target);
            }
        }
    }

    /// Every target with the parsed tags of each of its regions
    pub fn aggregate_targets(&self) -> Vec<TargetSnapshot> {
        let surface = self.surface.lock();
        self.targets
            .iter()
            .map(|name| TargetSnapshot {
                name: name.clone(),
                regions: surface
                    .find_with_tag(name)
                    .into_iter()
                    .map(|region| TagParser::parse_tags(&surface.tags(region)))
                    .collect(),
            })
            .collect()
    }

    /// Load a training protocol, replacing the active one
    pub fn load_protocol(&mut self, factory: &dyn ProtocolFactory) {
        let targets = self.aggregate_targets();
        let operations =
            ProtocolOperations::new(self.surface.clone(), self.shot_list(), self.audio.clone());
        self.dispatcher.load(factory, operations, &targets);
    }

    pub fn load_protocol_by_name(&mut self, registry: &ProtocolRegistry, name: &str) -> Result<()> {
        let factory = registry
            .get(name)
            .ok_or_else(|| ShootOffError::ProtocolNotFound(name.to_string()))?;
        self.load_protocol(factory);
        Ok(())
    }

    pub fn cancel_protocol(&mut self) {
        self.dispatcher.cancel();
    }

    /// Name of the active training protocol
    pub fn active_protocol(&self) -> Option<&str> {
        self.dispatcher.active_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::NullAudio;
    use crate::surface::{MemoryCanvas, RenderingSurface, SELECTED_MARKER_FILL};
    use parking_lot::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Sounds(Mutex<Vec<String>>);

    impl AudioSink for Sounds {
        fn play_sound(&self, name: &str) {
            self.0.lock().push(name.to_string());
        }
    }

    fn square(x: f64, y: f64, size: f64) -> Shape {
        Shape::Rectangle {
            from: Point::new(x, y),
            to: Point::new(x + size, y + size),
        }
    }

    fn session(canvas: &Arc<Mutex<MemoryCanvas>>) -> SessionContext {
        SessionContext::new(Preferences::default(), canvas.clone(), Arc::new(NullAudio))
    }

    #[test]
    fn test_target_names_never_reused() {
        let canvas = MemoryCanvas::shared(100, 100);
        let mut session = session(&canvas);

        let first = session.add_target(vec![TargetRegion::new(square(0.0, 0.0, 10.0), &[])]);
        assert_eq!(first, "_internal_name:target0");
        assert!(session.delete_target(&first));
        assert!(!session.delete_target(&first));

        let second = session.add_target(vec![TargetRegion::new(
            square(0.0, 0.0, 10.0),
            &["_internal_name:stale", "points:5"],
        )]);
        assert_eq!(second, "_internal_name:target1");

        let snapshot = session.aggregate_targets();
        assert_eq!(snapshot.len(), 1);
        let region = &snapshot[0].regions[0];
        assert_eq!(region.first(INTERNAL_NAME_TAG), Some("target1"));
        assert_eq!(region.get(INTERNAL_NAME_TAG).map(|v| v.len()), Some(1));
        assert_eq!(region.first("points"), Some("5"));
    }

    #[test]
    fn test_shot_draws_marker_and_hits() {
        let canvas = MemoryCanvas::shared(100, 100);
        let mut session = session(&canvas);
        session.add_target(vec![TargetRegion::new(square(0.0, 0.0, 50.0), &["points:5"])]);

        let t0 = Instant::now();
        let hit = session.handle_shot_at(Point::new(10.0, 10.0), LaserColor::Red, t0);
        let miss = session.handle_shot_at(Point::new(80.0, 80.0), LaserColor::Green, t0);

        assert!(hit.is_hit());
        assert!(!miss.is_hit());
        assert_eq!(session.shots().len(), 2);

        let marker = session.shots()[0].marker.unwrap();
        let canvas = canvas.lock();
        assert_eq!(canvas.fill(marker), Some("red"));
        assert_eq!(canvas.find_with_tag(SHOT_MARKER_TAG).len(), 2);
    }

    #[test]
    fn test_commands_run_on_hit() {
        let canvas = MemoryCanvas::shared(100, 100);
        let sounds = Arc::new(Sounds::default());
        let mut session =
            SessionContext::new(Preferences::default(), canvas.clone(), sounds.clone());
        session.add_target(vec![
            TargetRegion::new(square(0.0, 0.0, 20.0), &["command:play_sound(beep.wav)"]),
            TargetRegion::new(square(50.0, 50.0, 20.0), &["command:clear_shots()"]),
        ]);

        let t0 = Instant::now();
        session.handle_shot_at(Point::new(5.0, 5.0), LaserColor::Red, t0);
        assert_eq!(*sounds.0.lock(), vec!["beep.wav".to_string()]);
        assert_eq!(session.shots().len(), 1);

        session.handle_shot_at(Point::new(55.0, 55.0), LaserColor::Red, t0 + Duration::from_secs(2));
        assert!(session.shots().is_empty());
        assert!(canvas.lock().find_with_tag(SHOT_MARKER_TAG).is_empty());
        assert!(session.shot_list().lock().rows().is_empty());
    }

    #[test]
    fn test_inject_requires_debug() {
        let canvas = MemoryCanvas::shared(100, 100);
        let mut session = session(&canvas);

        assert!(session.inject_shot(LaserColor::Red, Point::new(1.0, 1.0)).is_none());
        assert!(session.shots().is_empty());

        session.set_preferences(Preferences::default().with_debug(true));
        assert!(session.inject_shot(LaserColor::Green, Point::new(1.0, 1.0)).is_some());
        assert_eq!(session.shots()[0].color, LaserColor::Green);
    }

    #[test]
    fn test_select_shot_highlights_marker() {
        let canvas = MemoryCanvas::shared(100, 100);
        let mut session = session(&canvas);
        let t0 = Instant::now();
        session.handle_shot_at(Point::new(10.0, 10.0), LaserColor::Red, t0);
        session.handle_shot_at(Point::new(30.0, 30.0), LaserColor::Green, t0);
        let first = session.shots()[0].marker.unwrap();
        let second = session.shots()[1].marker.unwrap();

        session.select_shot(0);
        assert_eq!(canvas.lock().fill(first), Some(SELECTED_MARKER_FILL));

        session.select_shot(1);
        assert_eq!(canvas.lock().fill(first), Some("red"));
        assert_eq!(canvas.lock().fill(second), Some(SELECTED_MARKER_FILL));
        assert_eq!(session.selected_shot().map(|s| s.color), Some(LaserColor::Green));

        session.select_shot(1);
        assert_eq!(canvas.lock().fill(second), Some("green"));
        assert!(session.selected_shot().is_none());
    }

    #[test]
    fn test_select_and_delete_target() {
        let canvas = MemoryCanvas::shared(100, 100);
        let mut session = session(&canvas);
        let lower = session.add_target(vec![TargetRegion::new(square(0.0, 0.0, 50.0), &[])]);
        let upper = session.add_target(vec![TargetRegion::new(square(10.0, 10.0, 10.0), &[])]);

        assert_eq!(session.select_target_at(Point::new(15.0, 15.0)), Some(upper.as_str()));
        assert_eq!(session.select_target_at(Point::new(40.0, 40.0)), Some(lower.as_str()));
        assert_eq!(session.select_target_at(Point::new(90.0, 90.0)), None);

        session.select_target_at(Point::new(15.0, 15.0));
        assert!(session.delete_selected_target());
        assert_eq!(session.targets(), &[lower]);
        assert!(session.selected_target().is_none());
        assert!(!session.delete_selected_target());
    }

    #[test]
    fn test_show_feed_restacks() {
        let canvas = MemoryCanvas::shared(4, 4);
        let mut session = session(&canvas);
        let group = session.add_target(vec![TargetRegion::new(square(0.0, 0.0, 2.0), &[])]);
        session.handle_shot_at(Point::new(1.0, 1.0), LaserColor::Red, Instant::now());
        let frame = image::RgbImage::new(4, 4);

        session.show_feed(FeedImage::Color(&frame));
        {
            let canvas = canvas.lock();
            let order = canvas.stacking_order();
            assert_eq!(canvas.tags(order[0]), vec![BACKGROUND_TAG.to_string()]);
            assert_eq!(canvas.tags(order[2]), vec![SHOT_MARKER_TAG.to_string()]);
        }
        // The target still receives hits under the marker
        assert!(session.handle_shot_at(Point::new(1.5, 1.5), LaserColor::Red, Instant::now()).is_hit());

        assert!(!session.toggle_target_visibility());
        session.show_feed(FeedImage::Color(&frame));
        let canvas = canvas.lock();
        let order = canvas.stacking_order();
        assert_eq!(canvas.tags(order[0]), vec![group]);
        assert!(canvas.tags(*order.last().unwrap()).contains(&SHOT_MARKER_TAG.to_string()));
    }

    #[test]
    fn test_unknown_protocol_name() {
        let canvas = MemoryCanvas::shared(10, 10);
        let mut session = session(&canvas);
        let registry = ProtocolRegistry::new();

        let err = session.load_protocol_by_name(&registry, "Nope").unwrap_err();
        assert!(matches!(err, ShootOffError::ProtocolNotFound(name) if name == "Nope"));
        assert!(session.active_protocol().is_none());
    }
}
