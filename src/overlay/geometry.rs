//! Geometry constraints
//!
//! Pure saturation functions. Nothing here rejects input: out-of-range
//! values are pulled to the nearest valid value, and non-finite values fall
//! back to the lower bound.

use crate::constants::{
    MAX_FONT_SIZE, MAX_HEIGHT, MAX_WIDTH, MIN_FONT_SIZE, MIN_HEIGHT, MIN_WIDTH,
};
use crate::overlay::model::{OverlayStyle, Position, Size};

/// Resize handle location on an overlay's bounding box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Corner {
    Nw,
    Ne,
    Sw,
    Se,
}

impl Corner {
    pub const ALL: [Corner; 4] = [Corner::Nw, Corner::Ne, Corner::Sw, Corner::Se];

    fn moves_left_edge(self) -> bool {
        matches!(self, Corner::Nw | Corner::Sw)
    }

    fn moves_top_edge(self) -> bool {
        matches!(self, Corner::Nw | Corner::Ne)
    }
}

/// Saturate `value` into `[min, max]`
fn saturate(value: f64, min: f64, max: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        min
    }
}

/// Clamp an overlay size to `[50,800] × [30,600]`
pub fn clamp_size(size: Size) -> Size {
    Size::new(
        saturate(size.width, MIN_WIDTH, MAX_WIDTH),
        saturate(size.height, MIN_HEIGHT, MAX_HEIGHT),
    )
}

/// Clamp a position so the bounding box stays inside the container.
///
/// When the overlay is larger than the container on an axis, the position on
/// that axis pins to zero.
pub fn clamp_position(position: Position, size: Size, container: Size) -> Position {
    let max_x = (container.width - size.width).max(0.0);
    let max_y = (container.height - size.height).max(0.0);
    Position::new(
        saturate(position.x, 0.0, max_x),
        saturate(position.y, 0.0, max_y),
    )
}

pub fn clamp_font_size(font_size: f64) -> f64 {
    saturate(font_size, MIN_FONT_SIZE, MAX_FONT_SIZE)
}

pub fn clamp_opacity(opacity: f64) -> f64 {
    saturate(opacity, 0.0, 1.0)
}

/// Apply the numeric style invariants in place
pub fn clamp_style(style: &mut OverlayStyle) {
    style.font_size = clamp_font_size(style.font_size);
    style.opacity = clamp_opacity(style.opacity);
}

/// Geometry after dragging `corner` by `(dx, dy)` from the gesture's start.
///
/// The corner opposite the handle stays anchored, so west and north handles
/// shift the position by however much the clamped size actually changed.
/// A moving west or north edge stops at the container origin.
pub fn resize_from_corner(
    start_position: Position,
    start_size: Size,
    corner: Corner,
    dx: f64,
    dy: f64,
) -> (Position, Size) {
    let right = start_position.x + start_size.width;
    let bottom = start_position.y + start_size.height;

    let raw_width = if corner.moves_left_edge() {
        (start_size.width - dx).min(right)
    } else {
        start_size.width + dx
    };
    let raw_height = if corner.moves_top_edge() {
        (start_size.height - dy).min(bottom)
    } else {
        start_size.height + dy
    };

    let size = clamp_size(Size::new(raw_width, raw_height));

    let x = if corner.moves_left_edge() {
        (right - size.width).max(0.0)
    } else {
        start_position.x
    };
    let y = if corner.moves_top_edge() {
        (bottom - size.height).max(0.0)
    } else {
        start_position.y
    };

    (Position::new(x, y), size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_size_saturates() {
        assert_eq!(clamp_size(Size::new(40.0, 20.0)), Size::new(50.0, 30.0));
        assert_eq!(clamp_size(Size::new(900.0, 700.0)), Size::new(800.0, 600.0));
        assert_eq!(clamp_size(Size::new(300.0, 200.0)), Size::new(300.0, 200.0));
    }

    #[test]
    fn test_non_finite_falls_to_minimum() {
        assert_eq!(clamp_size(Size::new(f64::NAN, f64::INFINITY)), Size::new(50.0, 30.0));
        assert_eq!(clamp_opacity(f64::NAN), 0.0);
    }

    #[test]
    fn test_clamp_position_keeps_box_inside() {
        let container = Size::new(640.0, 360.0);
        let size = Size::new(200.0, 80.0);

        let pos = clamp_position(Position::new(-15.0, 500.0), size, container);
        assert_eq!(pos, Position::new(0.0, 280.0));

        let pos = clamp_position(Position::new(1000.0, 10.0), size, container);
        assert_eq!(pos, Position::new(440.0, 10.0));
    }

    #[test]
    fn test_clamp_position_oversized_overlay_pins_to_origin() {
        let pos = clamp_position(
            Position::new(30.0, 30.0),
            Size::new(800.0, 100.0),
            Size::new(640.0, 360.0),
        );
        assert_eq!(pos.x, 0.0);
        assert_eq!(pos.y, 30.0);
    }

    #[test]
    fn test_clamp_style() {
        let mut style = OverlayStyle {
            font_size: 4.0,
            opacity: 1.7,
            ..OverlayStyle::default()
        };
        clamp_style(&mut style);
        assert_eq!(style.font_size, 10.0);
        assert_eq!(style.opacity, 1.0);
    }

    #[test]
    fn test_resize_se_grows_in_place() {
        let (pos, size) = resize_from_corner(
            Position::new(50.0, 50.0),
            Size::new(200.0, 80.0),
            Corner::Se,
            30.0,
            20.0,
        );
        assert_eq!(pos, Position::new(50.0, 50.0));
        assert_eq!(size, Size::new(230.0, 100.0));
    }

    #[test]
    fn test_resize_nw_anchors_far_corner() {
        let (pos, size) = resize_from_corner(
            Position::new(100.0, 100.0),
            Size::new(200.0, 80.0),
            Corner::Nw,
            -40.0,
            -10.0,
        );
        assert_eq!(size, Size::new(240.0, 90.0));
        assert_eq!(pos, Position::new(60.0, 90.0));
    }

    #[test]
    fn test_resize_nw_clamped_shrink_keeps_anchor() {
        // Shrinking past the minimum only moves the edge as far as the clamp allows
        let (pos, size) = resize_from_corner(
            Position::new(100.0, 100.0),
            Size::new(200.0, 80.0),
            Corner::Nw,
            500.0,
            500.0,
        );
        assert_eq!(size, Size::new(50.0, 30.0));
        assert_eq!(pos, Position::new(250.0, 150.0));
    }

    #[test]
    fn test_resize_nw_stops_at_origin() {
        let (pos, size) = resize_from_corner(
            Position::new(0.0, 0.0),
            Size::new(200.0, 80.0),
            Corner::Nw,
            -100.0,
            -40.0,
        );
        assert_eq!(pos, Position::new(0.0, 0.0));
        assert_eq!(size, Size::new(200.0, 80.0));
    }

    #[test]
    fn test_resize_ne_grows_up_to_top_edge() {
        let (pos, size) = resize_from_corner(
            Position::new(40.0, 20.0),
            Size::new(200.0, 80.0),
            Corner::Ne,
            10.0,
            -50.0,
        );
        assert_eq!(size, Size::new(210.0, 100.0));
        assert_eq!(pos, Position::new(40.0, 0.0));
    }
}
