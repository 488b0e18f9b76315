// crates/cdcom-core/src/point.rs
use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Anchor along one axis of a component body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointAnchor {
    Start,
    Middle,
    End,
}

impl Default for PointAnchor {
    fn default() -> Self {
        PointAnchor::Start
    }
}

/// A point on a component body, expressed as an anchor per axis plus a
/// fixed offset. Resolution against a concrete instance turns it into
/// absolute coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentPoint {
    pub relative_to_x: PointAnchor,
    pub relative_to_y: PointAnchor,
    pub offset: DVec2,
}

impl ComponentPoint {
    pub fn new(relative_to_x: PointAnchor, relative_to_y: PointAnchor, offset: DVec2) -> Self {
        Self {
            relative_to_x,
            relative_to_y,
            offset,
        }
    }

    /// Resolve against an instance of the given size. The instance's
    /// extent lies along the x axis when `horizontal`, along the y axis
    /// otherwise; anchors on the other axis resolve against a zero
    /// extent, so there `Start`, `Middle` and `End` coincide.
    pub fn resolve(&self, size: f64, horizontal: bool) -> DVec2 {
        let x = if horizontal {
            anchor_offset(self.relative_to_x, size)
        } else {
            0.0
        };
        let y = if horizontal {
            0.0
        } else {
            anchor_offset(self.relative_to_y, size)
        };
        DVec2::new(x, y) + self.offset
    }
}

impl Default for ComponentPoint {
    fn default() -> Self {
        Self {
            relative_to_x: PointAnchor::Start,
            relative_to_y: PointAnchor::Start,
            offset: DVec2::ZERO,
        }
    }
}

fn anchor_offset(anchor: PointAnchor, size: f64) -> f64 {
    match anchor {
        PointAnchor::Start => 0.0,
        PointAnchor::Middle => size / 2.0,
        PointAnchor::End => size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_horizontal() {
        let point = ComponentPoint::new(
            PointAnchor::Middle,
            PointAnchor::Start,
            DVec2::new(2.0, -3.0),
        );
        assert_eq!(point.resolve(60.0, true), DVec2::new(32.0, -3.0));

        let end = ComponentPoint::new(PointAnchor::End, PointAnchor::Start, DVec2::ZERO);
        assert_eq!(end.resolve(60.0, true), DVec2::new(60.0, 0.0));
    }

    #[test]
    fn test_resolve_vertical_swaps_axes() {
        let point = ComponentPoint::new(
            PointAnchor::Middle,
            PointAnchor::Middle,
            DVec2::new(2.0, -3.0),
        );
        // Extent now lies along y; the x anchor collapses to zero.
        assert_eq!(point.resolve(60.0, false), DVec2::new(2.0, 27.0));
    }

    #[test]
    fn test_cross_axis_anchors_coincide() {
        let size = 40.0;
        for anchor in [PointAnchor::Start, PointAnchor::Middle, PointAnchor::End] {
            let point = ComponentPoint::new(PointAnchor::Start, anchor, DVec2::new(0.0, 5.0));
            assert_eq!(point.resolve(size, true), DVec2::new(0.0, 5.0));
        }
    }
}
