//! Offset Engine
//!
//! Turns objects into the polylines the tool centre actually follows. Closed
//! contours with an offset side are displaced by the tool radius with
//! `cavalier_contours`, which recomputes arc bulges for the new radii. Open
//! contours and contours without offset side are followed on their centre
//! line. Pocket walls can additionally be cleared with concentric rings.

use crate::contour::{Object, ObjectMap, ToolOffset};
use cavalier_contours::polyline::{PlineSource, PlineSourceMut, PlineVertex, Polyline};
use cavalier_contours::shape_algorithms::{Shape, ShapeOffsetOptions};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::panic;
use tracing::{debug, info, warn};
use viamill_core::{bulge_to_arc, signed_area, ObjectId, PathVertex};
use viamill_settings::{MillSetup, ToolSetup};

/// Arcs and loops smaller than this cannot be cut and are clipped.
pub const MIN_MACHINABLE_RADIUS: f64 = 0.01;

/// Upper bound for pocket rings per wall.
const MAX_POCKET_RINGS: usize = 10_000;

/// Identifies one offset polyline: the source object and a running index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OffsetKey {
    pub object: ObjectId,
    pub index: usize,
}

impl OffsetKey {
    pub fn new(object: ObjectId, index: usize) -> Self {
        Self { object, index }
    }
}

impl fmt::Display for OffsetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.object, self.index)
    }
}

/// A path for the tool centre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OffsetPolyline {
    pub vertices: Vec<PathVertex>,
    pub closed: bool,
    /// Nesting depth of the source object; inner levels are cut first.
    pub level: usize,
    pub is_pocket: bool,
    pub tool_offset: ToolOffset,
    pub mill: MillSetup,
    pub tool: ToolSetup,
}

/// Offset polylines in key order.
pub type OffsetMap = BTreeMap<OffsetKey, OffsetPolyline>;

/// Computes the tool paths of all active objects.
///
/// `tool_diameter` must be in the same unit as the geometry. With
/// `small_circles` enabled, closed features that are too small for the tool
/// become a single plunge at their centre; otherwise they are dropped.
pub fn objects_to_offsets(
    objects: &ObjectMap,
    tool_diameter: f64,
    small_circles: bool,
) -> OffsetMap {
    let radius = tool_diameter / 2.0;
    let mut offsets = OffsetMap::new();

    for (&id, object) in objects {
        if !object.setup.mill.active {
            debug!("Object {} is inactive", id);
            continue;
        }
        let vertices = object.vertices();
        if vertices.len() < 2 {
            continue;
        }

        let level = object.outer_objects.len();
        let template = OffsetPolyline {
            vertices: Vec::new(),
            closed: object.closed,
            level,
            is_pocket: false,
            tool_offset: object.tool_offset,
            mill: object.setup.mill.clone(),
            tool: object.setup.tool.clone(),
        };

        if !object.closed || object.tool_offset == ToolOffset::None {
            offsets.insert(
                OffsetKey::new(id, 0),
                OffsetPolyline {
                    vertices,
                    ..template
                },
            );
            continue;
        }

        let ccw = signed_area(&vertices, true) > 0.0;
        let inward = if ccw { radius } else { -radius };
        let delta = match object.tool_offset {
            ToolOffset::Inside => inward,
            _ => -inward,
        };

        let results = offset_closed(&vertices, delta);
        if results.is_empty() {
            if small_circles {
                debug!("Object {} is smaller than the tool, plunging at centre", id);
                offsets.insert(
                    OffsetKey::new(id, 0),
                    OffsetPolyline {
                        vertices: vec![centre_of(&vertices)],
                        closed: false,
                        ..template
                    },
                );
            } else {
                warn!("Object {} is smaller than the tool and is skipped", id);
            }
            continue;
        }

        let mut index = 0;
        for path in results {
            offsets.insert(
                OffsetKey::new(id, index),
                OffsetPolyline {
                    vertices: path,
                    ..template.clone()
                },
            );
            index += 1;
        }

        if object.tool_offset == ToolOffset::Inside && object.setup.pockets.active {
            for ring in pocket_rings(objects, object, radius) {
                offsets.insert(
                    OffsetKey::new(id, index),
                    OffsetPolyline {
                        vertices: ring,
                        is_pocket: true,
                        ..template.clone()
                    },
                );
                index += 1;
            }
        }
    }

    info!(
        "objects_to_offsets: {} objects, {} tool paths",
        objects.len(),
        offsets.len()
    );
    offsets
}

/// Reverses the travel direction of a bulge polyline.
///
/// Positions are reversed; the bulge list is reversed, rotated by one and
/// negated so every arc keeps its geometry.
pub fn reverse_vertices(vertices: &[PathVertex]) -> Vec<PathVertex> {
    let count = vertices.len();
    (0..count)
        .map(|j| {
            let position = &vertices[count - 1 - j];
            let bulge = vertices[(2 * count - 2 - j) % count].bulge;
            PathVertex::new(position.x, position.y, -bulge)
        })
        .collect()
}

fn offset_closed(vertices: &[PathVertex], delta: f64) -> Vec<Vec<PathVertex>> {
    let pline = to_pline(vertices, true);
    let Some(results) = catch_offset(|| pline.parallel_offset(delta)) else {
        return Vec::new();
    };
    results
        .iter()
        .filter_map(machinable_vertices)
        .collect()
}

fn pocket_rings(objects: &ObjectMap, wall: &Object, radius: f64) -> Vec<Vec<PathVertex>> {
    let stepover = wall.setup.pockets.stepover;
    if !(stepover.is_finite() && stepover > 0.0) {
        warn!("Pocket stepover {} is not usable", stepover);
        return Vec::new();
    }

    let mut plines = vec![oriented_pline(&wall.vertices(), true)];
    let island_level = wall.outer_objects.len() + 1;
    for island in wall
        .inner_objects
        .iter()
        .filter_map(|id| objects.get(id))
        .filter(|island| {
            island.closed && island.setup.mill.active && island.outer_objects.len() == island_level
        })
    {
        plines.push(oriented_pline(&island.vertices(), false));
    }
    let shape = Shape::from_plines(plines);

    let mut rings = Vec::new();
    for step in 1..=MAX_POCKET_RINGS {
        let distance = radius + stepover * step as f64;
        let Some(result) =
            catch_offset(|| shape.parallel_offset(distance, ShapeOffsetOptions::new()))
        else {
            break;
        };
        if result.ccw_plines.is_empty() {
            break;
        }
        let before = rings.len();
        rings.extend(
            result
                .ccw_plines
                .iter()
                .chain(result.cw_plines.iter())
                .filter_map(|indexed| machinable_vertices(&indexed.polyline)),
        );
        if rings.len() == before {
            break;
        }
    }
    debug!("Pocket with {} rings", rings.len());
    rings
}

/// Builds a closed polyline with the requested orientation.
fn oriented_pline(vertices: &[PathVertex], ccw: bool) -> Polyline<f64> {
    if (signed_area(vertices, true) > 0.0) == ccw {
        to_pline(vertices, true)
    } else {
        to_pline(&reverse_vertices(vertices), true)
    }
}

fn to_pline(vertices: &[PathVertex], closed: bool) -> Polyline<f64> {
    let mut pline = Polyline::new();
    for v in vertices {
        pline.add_vertex(PlineVertex::new(v.x, v.y, v.bulge));
    }
    pline.set_is_closed(closed);
    pline
}

/// Converts an offset result, or returns `None` when it collapsed below
/// [`MIN_MACHINABLE_RADIUS`]. Arcs tighter than that are cut as chords.
fn machinable_vertices(pline: &Polyline<f64>) -> Option<Vec<PathVertex>> {
    let mut vertices: Vec<PathVertex> = pline
        .vertex_data
        .iter()
        .map(|v| PathVertex::new(v.x, v.y, v.bulge))
        .collect();
    if vertices.len() < 2 || extent(&vertices) < MIN_MACHINABLE_RADIUS {
        return None;
    }

    let count = vertices.len();
    let mut clipped = 0;
    for i in 0..count {
        if vertices[i].bulge == 0.0 {
            continue;
        }
        let next = vertices[(i + 1) % count];
        let tight = bulge_to_arc(vertices[i].point(), next.point(), vertices[i].bulge)
            .is_some_and(|arc| arc.radius < MIN_MACHINABLE_RADIUS);
        if tight {
            vertices[i].bulge = 0.0;
            clipped += 1;
        }
    }
    if clipped > 0 {
        warn!("Clipped {} arcs below the minimum radius to chords", clipped);
    }
    Some(vertices)
}

fn bounds(vertices: &[PathVertex]) -> (f64, f64, f64, f64) {
    vertices.iter().fold(
        (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        |(min_x, min_y, max_x, max_y), v| {
            (min_x.min(v.x), min_y.min(v.y), max_x.max(v.x), max_y.max(v.y))
        },
    )
}

fn extent(vertices: &[PathVertex]) -> f64 {
    let (min_x, min_y, max_x, max_y) = bounds(vertices);
    (max_x - min_x).max(max_y - min_y)
}

fn centre_of(vertices: &[PathVertex]) -> PathVertex {
    let (min_x, min_y, max_x, max_y) = bounds(vertices);
    PathVertex::new((min_x + max_x) / 2.0, (min_y + max_y) / 2.0, 0.0)
}

/// Runs an offset call, turning a panic inside the library into `None`.
fn catch_offset<T>(offset: impl FnOnce() -> T) -> Option<T> {
    match panic::catch_unwind(panic::AssertUnwindSafe(offset)) {
        Ok(result) => Some(result),
        Err(_) => {
            warn!("Panic during parallel offset, feature skipped");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nesting::find_tool_offsets;
    use viamill_core::{Point3, Segment};

    fn square(x: f64, y: f64, size: f64) -> Object {
        let corners = [(x, y), (x + size, y), (x + size, y + size), (x, y + size)];
        let segments = corners
            .iter()
            .zip(corners.iter().cycle().skip(1))
            .map(|(a, b)| Segment::line((*a).into(), (*b).into()))
            .collect();
        Object::new(segments, true)
    }

    fn circle(cx: f64, cy: f64, r: f64) -> Object {
        Object::new(
            vec![
                Segment::new(Point3::xy(cx - r, cy), Point3::xy(cx + r, cy), 1.0, "0"),
                Segment::new(Point3::xy(cx + r, cy), Point3::xy(cx - r, cy), 1.0, "0"),
            ],
            true,
        )
    }

    fn bbox(polyline: &OffsetPolyline) -> (f64, f64, f64, f64) {
        bounds(&polyline.vertices)
    }

    #[test]
    fn test_inside_offset_shrinks() {
        let mut objects = ObjectMap::from([
            (0, square(0.0, 0.0, 100.0)),
            (1, square(40.0, 40.0, 20.0)),
        ]);
        find_tool_offsets(&mut objects);
        let offsets = objects_to_offsets(&objects, 4.0, false);

        let wall = &offsets[&OffsetKey::new(0, 0)];
        let (min_x, min_y, max_x, max_y) = bbox(wall);
        assert!((min_x - 2.0).abs() < 1e-6);
        assert!((min_y - 2.0).abs() < 1e-6);
        assert!((max_x - 98.0).abs() < 1e-6);
        assert!((max_y - 98.0).abs() < 1e-6);
        assert_eq!(wall.level, 0);
        assert_eq!(wall.tool_offset, ToolOffset::Inside);

        let island = &offsets[&OffsetKey::new(1, 0)];
        let (min_x, _, max_x, _) = bbox(island);
        assert!((min_x - 38.0).abs() < 1e-6);
        assert!((max_x - 62.0).abs() < 1e-6);
        assert_eq!(island.level, 1);
        assert!(island.closed);
        // rounded corners of the outside offset
        assert!(island.vertices.iter().any(|v| v.bulge != 0.0));
    }

    #[test]
    fn test_clockwise_object_offsets_the_same_way() {
        let mut objects = ObjectMap::from([
            (0, square(0.0, 0.0, 100.0)),
            (1, square(40.0, 40.0, 20.0)),
        ]);
        objects.get_mut(&0).unwrap().reverse();
        find_tool_offsets(&mut objects);
        let offsets = objects_to_offsets(&objects, 4.0, false);
        let (min_x, _, max_x, _) = bbox(&offsets[&OffsetKey::new(0, 0)]);
        assert!((min_x - 2.0).abs() < 1e-6);
        assert!((max_x - 98.0).abs() < 1e-6);
    }

    #[test]
    fn test_open_and_unrelated_objects_follow_centre_line() {
        let mut line = Object::new(
            vec![Segment::line(Point3::xy(200.0, 0.0), Point3::xy(250.0, 0.0))],
            false,
        );
        line.tool_offset = ToolOffset::Outside;
        let objects = ObjectMap::from([(0, line), (1, square(0.0, 0.0, 10.0))]);
        let offsets = objects_to_offsets(&objects, 4.0, false);

        let open = &offsets[&OffsetKey::new(0, 0)];
        assert!(!open.closed);
        assert_eq!(
            open.vertices,
            vec![PathVertex::new(200.0, 0.0, 0.0), PathVertex::new(250.0, 0.0, 0.0)]
        );
        assert_eq!(offsets[&OffsetKey::new(1, 0)].vertices, objects[&1].vertices());
    }

    #[test]
    fn test_collapsed_hole_is_dropped_or_plunged() {
        let mut hole = circle(5.0, 5.0, 1.0);
        hole.tool_offset = ToolOffset::Inside;
        let objects = ObjectMap::from([(0, hole)]);

        assert!(objects_to_offsets(&objects, 4.0, false).is_empty());

        let offsets = objects_to_offsets(&objects, 4.0, true);
        let plunge = &offsets[&OffsetKey::new(0, 0)];
        assert_eq!(plunge.vertices.len(), 1);
        assert!(!plunge.closed);
        assert!((plunge.vertices[0].x - 5.0).abs() < 1e-9);
        assert!((plunge.vertices[0].y - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_circle_offset_keeps_arcs() {
        let mut hole = circle(0.0, 0.0, 10.0);
        hole.tool_offset = ToolOffset::Inside;
        let objects = ObjectMap::from([(0, hole)]);
        let offsets = objects_to_offsets(&objects, 4.0, false);
        let path = &offsets[&OffsetKey::new(0, 0)];
        for v in &path.vertices {
            assert!((v.x.hypot(v.y) - 8.0).abs() < 1e-6);
            assert!(v.bulge > 0.0);
        }
    }

    #[test]
    fn test_inactive_objects_are_skipped() {
        let mut object = square(0.0, 0.0, 10.0);
        object.setup.mill.active = false;
        let objects = ObjectMap::from([(0, object)]);
        assert!(objects_to_offsets(&objects, 4.0, false).is_empty());
    }

    #[test]
    fn test_pocket_rings_share_level() {
        let mut wall = square(0.0, 0.0, 40.0);
        wall.tool_offset = ToolOffset::Inside;
        wall.setup.pockets.active = true;
        wall.setup.pockets.stepover = 3.0;
        let objects = ObjectMap::from([(0, wall)]);
        let offsets = objects_to_offsets(&objects, 4.0, false);

        assert!(!offsets[&OffsetKey::new(0, 0)].is_pocket);
        let rings: Vec<&OffsetPolyline> = offsets.values().filter(|p| p.is_pocket).collect();
        assert!(rings.len() >= 5);
        assert!(rings.iter().all(|ring| ring.level == 0 && ring.closed));
        for ring in rings {
            let (min_x, _, max_x, _) = bbox(ring);
            assert!(min_x > 2.0 && max_x < 38.0);
        }
    }

    #[test]
    fn test_reverse_vertices() {
        let vertices = [
            PathVertex::new(0.0, 0.0, 0.0),
            PathVertex::new(10.0, 0.0, 0.5),
            PathVertex::new(10.0, 10.0, 0.0),
        ];
        let reversed = reverse_vertices(&vertices);
        assert_eq!(
            reversed,
            vec![
                PathVertex::new(10.0, 10.0, -0.5),
                PathVertex::new(10.0, 0.0, -0.0),
                PathVertex::new(0.0, 0.0, -0.0),
            ]
        );
        assert!((signed_area(&reversed, true) + signed_area(&vertices, true)).abs() < 1e-9);
    }
}
