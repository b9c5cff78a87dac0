//! Operations a training protocol may perform on the session

use std::sync::Arc;

use crate::session::{SharedShotList, ShotEntryId};
use crate::surface::{Point, RegionId, SharedSurface};

/// Tag carried by text a protocol shows on the feed
pub const PROTOCOL_TEXT_TAG: &str = "protocol_text";

/// Plays sound assets
pub trait AudioSink: Send + Sync {
    fn play_sound(&self, name: &str);
}

/// Audio sink for hosts without sound output
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn play_sound(&self, name: &str) {
        log::debug!("No audio output, skipping sound {}", name);
    }
}

/// Handle given to a protocol when it is loaded.
///
/// Every method takes its own short lock, so operations are safe to call from
/// inside protocol callbacks.
#[derive(Clone)]
pub struct ProtocolOperations {
    surface: SharedSurface,
    shot_list: SharedShotList,
    audio: Arc<dyn AudioSink>,
}

impl ProtocolOperations {
    pub fn new(
        surface: SharedSurface,
        shot_list: SharedShotList,
        audio: Arc<dyn AudioSink>,
    ) -> Self {
        Self {
            surface,
            shot_list,
            audio,
        }
    }

    pub fn play_sound(&self, name: &str) {
        self.audio.play_sound(name);
    }

    /// Show a line of text in the top-left corner of the feed, replacing any
    /// text shown before
    pub fn show_text_on_feed(&self, text: &str) -> RegionId {
        let mut surface = self.surface.lock();
        surface.delete_tag(PROTOCOL_TEXT_TAG);
        surface.draw_text(
            Point::new(10.0, 10.0),
            text,
            vec![PROTOCOL_TEXT_TAG.to_string()],
        )
    }

    pub fn clear_text(&self) {
        self.surface.lock().delete_tag(PROTOCOL_TEXT_TAG);
    }

    pub fn add_shot_list_columns<S: AsRef<str>>(&self, names: &[S]) {
        self.shot_list.lock().add_columns(names);
    }

    pub fn append_shot_list_column_data<S: AsRef<str>>(&self, entry: ShotEntryId, values: &[S]) {
        if !self.shot_list.lock().append_row_data(entry, values) {
            log::debug!("Shot list entry {:?} no longer exists", entry);
        }
    }

    pub fn revert_shot_list_columns(&self) {
        self.shot_list.lock().revert_columns();
    }

    /// Surface for protocols that draw their own items
    pub fn surface(&self) -> &SharedSurface {
        &self.surface
    }

    /// Remove everything this protocol put on the feed and the shot list
    pub fn destroy(&self) {
        self.clear_text();
        self.revert_shot_list_columns();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ShotList;
    use crate::surface::{MemoryCanvas, RenderingSurface, Shape};
    use parking_lot::Mutex;

    #[test]
    fn test_text_replaces_previous() {
        let canvas = MemoryCanvas::shared(100, 100);
        let ops = ProtocolOperations::new(
            canvas.clone(),
            Arc::new(Mutex::new(ShotList::new())),
            Arc::new(NullAudio),
        );

        ops.show_text_on_feed("Score: 5");
        let second = ops.show_text_on_feed("Score: 10");

        let found = canvas.lock().find_with_tag(PROTOCOL_TEXT_TAG);
        assert_eq!(found, vec![second]);
        match canvas.lock().shape(second) {
            Some(Shape::Text { text, .. }) => assert_eq!(text, "Score: 10"),
            other => panic!("unexpected shape {:?}", other),
        };
    }

    #[test]
    fn test_destroy_cleans_up() {
        let canvas = MemoryCanvas::shared(100, 100);
        let list = Arc::new(Mutex::new(ShotList::new()));
        list.lock().push_row(ShotEntryId(1), vec!["0.00".into(), "red".into()]);

        let ops = ProtocolOperations::new(canvas.clone(), list.clone(), Arc::new(NullAudio));
        ops.add_shot_list_columns(&["Score"]);
        ops.append_shot_list_column_data(ShotEntryId(1), &["5"]);
        ops.show_text_on_feed("hello");

        ops.destroy();

        assert!(canvas.lock().find_with_tag(PROTOCOL_TEXT_TAG).is_empty());
        assert_eq!(list.lock().columns().len(), 2);
        assert_eq!(list.lock().rows()[0].values.len(), 2);
    }
}
