//! Rendering surface boundary
//!
//! The shot pipeline never draws pixels itself. It talks to a
//! [`RenderingSurface`] that stores tagged items in a stacking order and
//! answers geometric queries about them. Targets are groups of regions on the
//! surface; the feed image and shot markers live there too.
//!
//! - `RenderingSurface` - the query and stacking operations the core consumes
//! - `RegionTags` - parsed attribute multimap of a region
//! - `MemoryCanvas` - in-memory surface with exact hit geometry

mod canvas;
mod tags;

pub use canvas::{FeedKind, MemoryCanvas};
pub use tags::{RegionTags, TagParser};

use image::{GrayImage, RgbImage};
use parking_lot::Mutex;
use std::sync::Arc;

/// Reserved key marking a region as part of an interactive target
pub const INTERNAL_NAME_TAG: &str = "_internal_name";
/// Key holding command strings executed when a region is hit
pub const COMMAND_TAG: &str = "command";
/// Tag carried by every drawn shot marker
pub const SHOT_MARKER_TAG: &str = "shot_marker";
/// Tag carried by the feed image item
pub const BACKGROUND_TAG: &str = "background";
/// Fill of a selected shot marker
pub const SELECTED_MARKER_FILL: &str = "yellow";

/// Handle to an item on the rendering surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(pub u64);

impl std::fmt::Display for RegionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A surface coordinate
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(u32, u32)> for Point {
    fn from((x, y): (u32, u32)) -> Self {
        Self::new(x as f64, y as f64)
    }
}

/// Geometry of a surface item
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Axis aligned rectangle between two corners
    Rectangle { from: Point, to: Point },
    /// Ellipse inscribed in the box between two corners
    Oval { from: Point, to: Point },
    /// Closed polygon
    Polygon(Vec<Point>),
    /// Text label anchored at a point; never hit by shots
    Text { at: Point, text: String },
    /// Full feed image anchored at the origin
    Image { width: u32, height: u32 },
}

impl Shape {
    /// Circle centered on a point, drawn as an oval
    pub fn circle(center: Point, radius: f64) -> Self {
        Shape::Oval {
            from: Point::new(center.x - radius, center.y - radius),
            to: Point::new(center.x + radius, center.y + radius),
        }
    }

    /// Check whether a point lies on or inside this shape
    pub fn contains(&self, p: Point) -> bool {
        match self {
            Shape::Rectangle { from, to } => {
                let (x0, x1) = (from.x.min(to.x), from.x.max(to.x));
                let (y0, y1) = (from.y.min(to.y), from.y.max(to.y));
                p.x >= x0 && p.x <= x1 && p.y >= y0 && p.y <= y1
            }
            Shape::Oval { from, to } => {
                let rx = (to.x - from.x).abs() / 2.0;
                let ry = (to.y - from.y).abs() / 2.0;
                if rx == 0.0 || ry == 0.0 {
                    return false;
                }
                let cx = (from.x + to.x) / 2.0;
                let cy = (from.y + to.y) / 2.0;
                let dx = (p.x - cx) / rx;
                let dy = (p.y - cy) / ry;
                dx * dx + dy * dy <= 1.0
            }
            Shape::Polygon(points) => polygon_contains(points, p),
            Shape::Text { .. } => false,
            Shape::Image { width, height } => {
                p.x >= 0.0 && p.y >= 0.0 && p.x < *width as f64 && p.y < *height as f64
            }
        }
    }
}

/// Even-odd ray casting
fn polygon_contains(points: &[Point], p: Point) -> bool {
    if points.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = points.len() - 1;
    for i in 0..points.len() {
        let (a, b) = (points[i], points[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let cross_x = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < cross_x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Image shown as the feed background
#[derive(Debug, Clone, Copy)]
pub enum FeedImage<'a> {
    /// Passthrough camera image
    Color(&'a RgbImage),
    /// Thresholded laser mask, shown while interference is displayed
    Mask(&'a GrayImage),
}

impl FeedImage<'_> {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            FeedImage::Color(img) => img.dimensions(),
            FeedImage::Mask(img) => img.dimensions(),
        }
    }
}

/// Operations the shot pipeline needs from the drawing surface.
///
/// Overlap queries return regions in stacking order, bottommost first and
/// topmost last.
pub trait RenderingSurface: Send {
    /// Create an item on top of the stack
    fn create_region(&mut self, shape: Shape, tags: Vec<String>) -> RegionId;

    /// All items whose geometry covers the point, bottommost first
    fn find_overlapping(&self, point: Point) -> Vec<RegionId>;

    /// All items carrying the raw tag, bottommost first
    fn find_with_tag(&self, tag: &str) -> Vec<RegionId>;

    /// Raw tag strings of an item; empty if the item does not exist
    fn tags(&self, region: RegionId) -> Vec<String>;

    /// Change the fill color of an item
    fn set_fill(&mut self, region: RegionId, fill: &str);

    /// Move a single item to the top
    fn raise(&mut self, region: RegionId);

    /// Move a single item to the bottom
    fn lower(&mut self, region: RegionId);

    /// Move every item carrying the tag to the top, keeping their relative order
    fn raise_tag(&mut self, tag: &str);

    /// Move every item carrying the tag to the bottom, keeping their relative order
    fn lower_tag(&mut self, tag: &str);

    /// Delete a single item
    fn delete(&mut self, region: RegionId);

    /// Delete every item carrying the tag
    fn delete_tag(&mut self, tag: &str);

    /// Replace the feed background with a new image and return its item
    fn show_feed(&mut self, image: FeedImage<'_>) -> RegionId;

    /// Draw a filled circle marking a shot, filled with the laser color
    fn draw_shot_marker(&mut self, center: Point, radius: u32, color: &str) -> RegionId {
        let marker = self.create_region(
            Shape::circle(center, radius as f64),
            vec![SHOT_MARKER_TAG.to_string()],
        );
        self.set_fill(marker, color);
        marker
    }

    /// Highlight or restore a shot marker
    fn set_marker_selected(&mut self, marker: RegionId, selected: bool, color: &str) {
        let fill = if selected { SELECTED_MARKER_FILL } else { color };
        self.set_fill(marker, fill);
    }

    /// Draw a text label on top of the stack
    fn draw_text(&mut self, at: Point, text: &str, tags: Vec<String>) -> RegionId {
        self.create_region(
            Shape::Text {
                at,
                text: text.to_string(),
            },
            tags,
        )
    }
}

/// Surface shared between the session and protocol operations
pub type SharedSurface = Arc<Mutex<dyn RenderingSurface>>;

/// Tag string for a `key:value` pair
pub fn tag(key: &str, value: &str) -> String {
    format!("{}:{}", key, value)
}
