//! Region hit testing

use crate::surface::{Point, RegionId, RegionTags, RenderingSurface, TagParser};

/// Result of testing a shot against the surface
#[derive(Debug, Clone, PartialEq)]
pub enum HitOutcome {
    /// The topmost interactive region under the shot
    Hit { region: RegionId, tags: RegionTags },
    Miss,
}

impl HitOutcome {
    pub fn is_hit(&self) -> bool {
        matches!(self, HitOutcome::Hit { .. })
    }

    pub fn region(&self) -> Option<RegionId> {
        match self {
            HitOutcome::Hit { region, .. } => Some(*region),
            HitOutcome::Miss => None,
        }
    }
}

/// Finds the region a shot struck
pub struct RegionHitResolver;

impl RegionHitResolver {
    /// Walk the regions under the point from the top of the stack down and
    /// return the first interactive one. Decorative regions, shot markers and
    /// the feed image are passed over.
    pub fn resolve(surface: &dyn RenderingSurface, point: Point) -> HitOutcome {
        for region in surface.find_overlapping(point).into_iter().rev() {
            let tags = TagParser::parse_tags(&surface.tags(region));
            if tags.is_interactive() {
                return HitOutcome::Hit { region, tags };
            }
        }
        HitOutcome::Miss
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{MemoryCanvas, Shape};

    fn rect(size: f64) -> Shape {
        Shape::Rectangle {
            from: Point::new(0.0, 0.0),
            to: Point::new(size, size),
        }
    }

    #[test]
    fn test_topmost_interactive_wins() {
        let mut canvas = MemoryCanvas::new(100, 100);
        canvas.create_region(rect(50.0), vec!["_internal_name:target0".into(), "points:5".into()]);
        let top = canvas.create_region(rect(20.0), vec!["_internal_name:target0".into(), "points:10".into()]);
        // Decorative region above both
        canvas.create_region(rect(30.0), vec!["label".into()]);

        let outcome = RegionHitResolver::resolve(&canvas, Point::new(5.0, 5.0));
        assert_eq!(outcome.region(), Some(top));
        match outcome {
            HitOutcome::Hit { tags, .. } => assert_eq!(tags.first("points"), Some("10")),
            HitOutcome::Miss => panic!("expected a hit"),
        }
    }

    #[test]
    fn test_only_decorative_is_miss() {
        let mut canvas = MemoryCanvas::new(100, 100);
        canvas.create_region(rect(50.0), vec!["shot_marker".into()]);

        assert_eq!(RegionHitResolver::resolve(&canvas, Point::new(5.0, 5.0)), HitOutcome::Miss);
        assert!(!RegionHitResolver::resolve(&canvas, Point::new(90.0, 90.0)).is_hit());
    }
}
