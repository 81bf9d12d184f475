//! Workpiece Transforms
//!
//! Moves, scales and mirrors built objects so the machine zero lands where
//! the workpiece setup expects it.

use crate::contour::ObjectMap;
use serde::{Deserialize, Serialize};
use tracing::debug;
use viamill_core::Point3;
use viamill_settings::WorkpieceZero;

/// Axis aligned bounding box of a drawing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMax {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl MinMax {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Point3 {
        Point3::xy(
            self.min_x + self.width() / 2.0,
            self.min_y + self.height() / 2.0,
        )
    }

    fn include(&mut self, point: Point3) {
        self.min_x = self.min_x.min(point.x);
        self.min_y = self.min_y.min(point.y);
        self.max_x = self.max_x.max(point.x);
        self.max_y = self.max_y.max(point.y);
    }
}

/// Bounding box over all segment endpoints, `None` for an empty drawing.
///
/// Arc bulges are not taken into account.
pub fn objects_min_max(objects: &ObjectMap) -> Option<MinMax> {
    let mut points = objects
        .values()
        .flat_map(|object| object.segments.iter())
        .flat_map(|segment| [segment.start, segment.end]);

    let first = points.next()?;
    let mut bounds = MinMax {
        min_x: first.x,
        min_y: first.y,
        max_x: first.x,
        max_y: first.y,
    };
    for point in points {
        bounds.include(point);
    }
    Some(bounds)
}

/// Translates every object by `(dx, dy)`.
pub fn move_objects(objects: &mut ObjectMap, dx: f64, dy: f64) {
    for segment in objects.values_mut().flat_map(|object| object.segments.iter_mut()) {
        segment.start.x += dx;
        segment.start.y += dy;
        segment.end.x += dx;
        segment.end.y += dy;
    }
}

/// Moves the drawing so `zero` becomes the origin.
///
/// Returns the bounding box after the move.
pub fn align_to_zero(objects: &mut ObjectMap, zero: WorkpieceZero) -> Option<MinMax> {
    let bounds = objects_min_max(objects)?;
    let (dx, dy) = match zero {
        WorkpieceZero::BottomLeft => (-bounds.min_x, -bounds.min_y),
        WorkpieceZero::BottomRight => (-bounds.max_x, -bounds.min_y),
        WorkpieceZero::TopLeft => (-bounds.min_x, -bounds.max_y),
        WorkpieceZero::TopRight => (-bounds.max_x, -bounds.max_y),
        WorkpieceZero::Center => {
            let center = bounds.center();
            (-center.x, -center.y)
        }
        WorkpieceZero::Original => (0.0, 0.0),
    };
    if dx != 0.0 || dy != 0.0 {
        debug!("align_to_zero: {} moves drawing by ({}, {})", zero, dx, dy);
        move_objects(objects, dx, dy);
    }
    objects_min_max(objects)
}

/// Scales every object about the origin. Bulges are scale invariant.
pub fn scale_objects(objects: &mut ObjectMap, factor: f64) {
    for segment in objects.values_mut().flat_map(|object| object.segments.iter_mut()) {
        segment.start.x *= factor;
        segment.start.y *= factor;
        segment.end.x *= factor;
        segment.end.y *= factor;
    }
}

/// Mirrors the drawing about its bounding box centre.
///
/// A single reflection flips every arc's direction, so bulges are negated
/// and closed objects are reversed to stay counter-clockwise. Mirroring both
/// axes is a rotation and leaves directions alone.
pub fn mirror_objects(objects: &mut ObjectMap, mirror_x: bool, mirror_y: bool) {
    let Some(bounds) = objects_min_max(objects) else {
        return;
    };
    let center = bounds.center();
    let flips = mirror_x != mirror_y;

    for object in objects.values_mut() {
        for segment in &mut object.segments {
            for point in [&mut segment.start, &mut segment.end] {
                if mirror_x {
                    point.x = 2.0 * center.x - point.x;
                }
                if mirror_y {
                    point.y = 2.0 * center.y - point.y;
                }
            }
            if flips {
                segment.bulge = -segment.bulge;
            }
        }
        if flips && object.closed {
            object.reverse();
        }
    }
}
