//! Cursor ownership and viewport geometry.
//!
//! Exactly one input source owns the virtual cursor at any time.  The cursor
//! itself is a point in host viewport coordinates (CSS pixels in a browser)
//! that is always kept inside `[0, width] × [0, height]`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which input source currently drives the virtual cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Ownership {
    /// The pointing device (mouse, trackpad, pen) owns the cursor.
    #[default]
    PointerOwned,
    /// The secondary controller owns the cursor.
    SecondaryOwned,
}

impl Ownership {
    pub fn is_secondary(self) -> bool {
        self == Ownership::SecondaryOwned
    }
}

impl fmt::Display for Ownership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ownership::PointerOwned => f.write_str("PointerOwned"),
            Ownership::SecondaryOwned => f.write_str("SecondaryOwned"),
        }
    }
}

/// A position in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns this point moved by `(dx, dy)`.
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

/// Size of the host's visible area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Returns the centre of the viewport.
    pub fn center(&self) -> Point {
        Point::new(self.max_x() / 2.0, self.max_y() / 2.0)
    }

    /// Clamps `point` into `[0, width] × [0, height]`.
    ///
    /// Negative or non-finite dimensions collapse to zero so the result is
    /// always a finite point inside the viewport.
    pub fn clamp(&self, point: Point) -> Point {
        Point::new(
            clamp_axis(point.x, self.max_x()),
            clamp_axis(point.y, self.max_y()),
        )
    }

    /// Returns `true` if `point` lies inside the viewport, edges included.
    pub fn contains(&self, point: Point) -> bool {
        (0.0..=self.max_x()).contains(&point.x) && (0.0..=self.max_y()).contains(&point.y)
    }

    fn max_x(&self) -> f64 {
        sanitize_extent(self.width)
    }

    fn max_y(&self) -> f64 {
        sanitize_extent(self.height)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1920.0, 1080.0)
    }
}

fn sanitize_extent(extent: f64) -> f64 {
    if extent.is_finite() {
        extent.max(0.0)
    } else {
        0.0
    }
}

fn clamp_axis(value: f64, max: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, max)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ownership_is_pointer() {
        assert_eq!(Ownership::default(), Ownership::PointerOwned);
        assert!(!Ownership::default().is_secondary());
    }

    #[test]
    fn test_ownership_serializes_as_variant_name() {
        let json = serde_json::to_string(&Ownership::SecondaryOwned).unwrap();
        assert_eq!(json, "\"SecondaryOwned\"");
    }

    #[test]
    fn test_center_is_half_of_each_dimension() {
        let vp = Viewport::new(800.0, 600.0);
        assert_eq!(vp.center(), Point::new(400.0, 300.0));
    }

    #[test]
    fn test_clamp_leaves_inside_point_unchanged() {
        let vp = Viewport::new(800.0, 600.0);
        assert_eq!(vp.clamp(Point::new(10.0, 20.0)), Point::new(10.0, 20.0));
    }

    #[test]
    fn test_clamp_pins_point_to_far_edges() {
        // Arrange
        let vp = Viewport::new(800.0, 600.0);

        // Act
        let clamped = vp.clamp(Point::new(5000.0, 9000.0));

        // Assert – the far edges are inclusive
        assert_eq!(clamped, Point::new(800.0, 600.0));
    }

    #[test]
    fn test_clamp_pins_negative_point_to_origin() {
        let vp = Viewport::new(800.0, 600.0);
        assert_eq!(vp.clamp(Point::new(-3.0, -0.5)), Point::new(0.0, 0.0));
    }

    #[test]
    fn test_clamp_with_degenerate_viewport_returns_origin() {
        let vp = Viewport::new(-10.0, f64::NAN);
        assert_eq!(vp.clamp(Point::new(50.0, 50.0)), Point::new(0.0, 0.0));
    }

    #[test]
    fn test_clamp_maps_nan_coordinate_to_zero() {
        let vp = Viewport::new(100.0, 100.0);
        assert_eq!(vp.clamp(Point::new(f64::NAN, 40.0)), Point::new(0.0, 40.0));
    }

    #[test]
    fn test_contains_includes_edges() {
        let vp = Viewport::new(100.0, 50.0);
        assert!(vp.contains(Point::new(0.0, 0.0)));
        assert!(vp.contains(Point::new(100.0, 50.0)));
        assert!(!vp.contains(Point::new(100.5, 10.0)));
    }

    #[test]
    fn test_offset_adds_deltas() {
        assert_eq!(Point::new(1.0, 2.0).offset(3.0, -1.0), Point::new(4.0, 1.0));
    }
}
