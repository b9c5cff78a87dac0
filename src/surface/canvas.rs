//! In-memory rendering surface

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use super::{FeedImage, Point, RegionId, RenderingSurface, Shape, BACKGROUND_TAG};

/// A drawn item
#[derive(Debug, Clone)]
struct Item {
    shape: Shape,
    tags: Vec<String>,
    fill: Option<String>,
}

/// Which kind of image the feed background currently shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    Color,
    Mask,
}

/// Surface that keeps items and stacking order in memory.
///
/// Hit testing uses exact shape geometry rather than bounding boxes.
pub struct MemoryCanvas {
    width: u32,
    height: u32,
    items: HashMap<RegionId, Item>,
    /// Bottommost first
    order: Vec<RegionId>,
    next_id: u64,
    feed_kind: Option<FeedKind>,
}

impl MemoryCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            items: HashMap::new(),
            order: Vec::new(),
            next_id: 1,
            feed_kind: None,
        }
    }

    /// Create a canvas ready to be shared with a session
    pub fn shared(width: u32, height: u32) -> Arc<Mutex<MemoryCanvas>> {
        Arc::new(Mutex::new(Self::new(width, height)))
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of live items
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Current stacking order, bottommost first
    pub fn stacking_order(&self) -> &[RegionId] {
        &self.order
    }

    pub fn shape(&self, region: RegionId) -> Option<&Shape> {
        self.items.get(&region).map(|item| &item.shape)
    }

    pub fn fill(&self, region: RegionId) -> Option<&str> {
        self.items.get(&region).and_then(|item| item.fill.as_deref())
    }

    /// Kind of image last shown as the feed background
    pub fn feed_kind(&self) -> Option<FeedKind> {
        self.feed_kind
    }

    fn has_tag(&self, region: RegionId, tag: &str) -> bool {
        self.items
            .get(&region)
            .map(|item| item.tags.iter().any(|t| t == tag))
            .unwrap_or(false)
    }

    /// Split the stack into (tagged, untagged), both keeping relative order
    fn partition_by_tag(&self, tag: &str) -> (Vec<RegionId>, Vec<RegionId>) {
        self.order
            .iter()
            .copied()
            .partition(|id| self.has_tag(*id, tag))
    }
}

impl RenderingSurface for MemoryCanvas {
    fn create_region(&mut self, shape: Shape, tags: Vec<String>) -> RegionId {
        let id = RegionId(self.next_id);
        self.next_id += 1;
        self.items.insert(
            id,
            Item {
                shape,
                tags,
                fill: None,
            },
        );
        self.order.push(id);
        id
    }

    fn find_overlapping(&self, point: Point) -> Vec<RegionId> {
        self.order
            .iter()
            .copied()
            .filter(|id| {
                self.items
                    .get(id)
                    .map(|item| item.shape.contains(point))
                    .unwrap_or(false)
            })
            .collect()
    }

    fn find_with_tag(&self, tag: &str) -> Vec<RegionId> {
        self.order
            .iter()
            .copied()
            .filter(|id| self.has_tag(*id, tag))
            .collect()
    }

    fn tags(&self, region: RegionId) -> Vec<String> {
        self.items
            .get(&region)
            .map(|item| item.tags.clone())
            .unwrap_or_default()
    }

    fn set_fill(&mut self, region: RegionId, fill: &str) {
        if let Some(item) = self.items.get_mut(&region) {
            item.fill = Some(fill.to_string());
        }
    }

    fn raise(&mut self, region: RegionId) {
        if let Some(pos) = self.order.iter().position(|id| *id == region) {
            let id = self.order.remove(pos);
            self.order.push(id);
        }
    }

    fn lower(&mut self, region: RegionId) {
        if let Some(pos) = self.order.iter().position(|id| *id == region) {
            let id = self.order.remove(pos);
            self.order.insert(0, id);
        }
    }

    fn raise_tag(&mut self, tag: &str) {
        let (tagged, mut rest) = self.partition_by_tag(tag);
        rest.extend(tagged);
        self.order = rest;
    }

    fn lower_tag(&mut self, tag: &str) {
        let (mut tagged, rest) = self.partition_by_tag(tag);
        tagged.extend(rest);
        self.order = tagged;
    }

    fn delete(&mut self, region: RegionId) {
        if self.items.remove(&region).is_some() {
            self.order.retain(|id| *id != region);
        }
    }

    fn delete_tag(&mut self, tag: &str) {
        let (tagged, rest) = self.partition_by_tag(tag);
        for id in tagged {
            self.items.remove(&id);
        }
        self.order = rest;
    }

    fn show_feed(&mut self, image: FeedImage<'_>) -> RegionId {
        self.delete_tag(BACKGROUND_TAG);

        let (width, height) = image.dimensions();
        self.feed_kind = Some(match image {
            FeedImage::Color(_) => FeedKind::Color,
            FeedImage::Mask(_) => FeedKind::Mask,
        });
        self.create_region(
            Shape::Image { width, height },
            vec![BACKGROUND_TAG.to_string()],
        )
    }
}
