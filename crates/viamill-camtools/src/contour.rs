//! Contour Builder
//!
//! Chains loose segments into objects. An object is either a closed loop or
//! an open chain of segments where every segment starts where the previous
//! one ended.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};
use viamill_core::{
    fuzzy_match, point_in_polygon, signed_area, ObjectId, PathVertex, Point3, Segment,
};
use viamill_settings::{apply_layer_directives, ObjectSetup, Setup};

/// Which side of a contour the cutter runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolOffset {
    /// Cutter centre follows the contour.
    #[default]
    None,
    /// Cutter runs inside the enclosed area.
    Inside,
    /// Cutter runs outside the enclosed area.
    Outside,
}

impl fmt::Display for ToolOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Inside => write!(f, "inside"),
            Self::Outside => write!(f, "outside"),
        }
    }
}

/// A chain of segments built from the drawing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    pub segments: Vec<Segment>,
    pub closed: bool,
    pub layer: String,
    pub tool_offset: ToolOffset,
    /// User choice that replaces the computed offset side.
    #[serde(default)]
    pub offset_override: Option<ToolOffset>,
    /// Closed objects enclosing this one.
    #[serde(default)]
    pub outer_objects: Vec<ObjectId>,
    /// Objects enclosed by this one.
    #[serde(default)]
    pub inner_objects: Vec<ObjectId>,
    #[serde(default)]
    pub setup: ObjectSetup,
}

/// Objects keyed by id, iterated in id order.
pub type ObjectMap = BTreeMap<ObjectId, Object>;

impl Object {
    /// Creates an object from an already chained list of segments.
    pub fn new(segments: Vec<Segment>, closed: bool) -> Self {
        let layer = segments
            .first()
            .map(|segment| segment.layer.clone())
            .unwrap_or_default();
        Self {
            segments,
            closed,
            layer,
            tool_offset: ToolOffset::None,
            offset_override: None,
            outer_objects: Vec::new(),
            inner_objects: Vec::new(),
            setup: ObjectSetup::default(),
        }
    }

    /// Start of the first segment, used as the object's representative point.
    pub fn start_point(&self) -> Option<Point3> {
        self.segments.first().map(|segment| segment.start)
    }

    /// Bulge polyline of the object. Open objects get their final end point
    /// appended as an extra vertex.
    pub fn vertices(&self) -> Vec<PathVertex> {
        let mut vertices: Vec<PathVertex> = self
            .segments
            .iter()
            .map(|segment| PathVertex::new(segment.start.x, segment.start.y, segment.bulge))
            .collect();
        if !self.closed {
            if let Some(last) = self.segments.last() {
                vertices.push(PathVertex::new(last.end.x, last.end.y, 0.0));
            }
        }
        vertices
    }

    /// Signed enclosed area, positive for counter-clockwise objects.
    pub fn signed_area(&self) -> f64 {
        signed_area(&self.vertices(), self.closed)
    }

    /// True when `point` lies inside this closed object. Arcs count as chords.
    pub fn contains_point(&self, point: Point3) -> bool {
        if !self.closed {
            return false;
        }
        let polygon: Vec<Point3> = self.segments.iter().map(|segment| segment.start).collect();
        point_in_polygon(&polygon, point)
    }

    /// The offset side actually used, honouring the override.
    pub fn effective_offset(&self) -> ToolOffset {
        self.offset_override.unwrap_or(self.tool_offset)
    }

    /// Reverses the travel direction without changing the geometry.
    pub fn reverse(&mut self) {
        self.segments.reverse();
        for segment in &mut self.segments {
            segment.reverse();
        }
    }
}

/// Reverses the travel direction of `object`.
///
/// Segment order is reversed, every segment's endpoints are swapped and its
/// bulge is negated. Negation keeps IEEE semantics, so a straight segment
/// with bulge `0.0` ends up with `-0.0`.
pub fn reverse_object(object: &mut Object) {
    object.reverse();
}

/// Chains segments into objects.
///
/// Starting from the first unassigned segment the chain's tail is extended
/// by the first unassigned segment on the same layer that starts (or,
/// reversed, ends) where the tail ends. When the tail cannot grow the head is
/// extended the same way. A chain that returns to its own start is closed
/// and normalized to counter-clockwise travel.
///
/// Every input segment gets the id of its owning object.
pub fn segments_to_objects(segments: &mut [Segment]) -> ObjectMap {
    let count = segments.len();
    let mut used = vec![false; count];
    let mut objects = ObjectMap::new();

    for first in 0..count {
        if used[first] {
            continue;
        }
        used[first] = true;

        let layer = segments[first].layer.clone();
        let mut chain: Vec<(usize, Segment)> = vec![(first, segments[first].clone())];
        let mut closed = false;

        // tail
        while let Some(tail) = chain.last().map(|(_, segment)| segment.end) {
            if chain.len() > 1 && fuzzy_match(tail, chain[0].1.start) {
                closed = true;
                break;
            }
            match find_next(segments, &used, &layer, tail) {
                Some((index, segment)) => {
                    used[index] = true;
                    chain.push((index, segment));
                }
                None => break,
            }
        }

        // head
        while !closed {
            let head = chain[0].1.start;
            match find_previous(segments, &used, &layer, head) {
                Some((index, segment)) => {
                    used[index] = true;
                    chain.insert(0, (index, segment));
                }
                None => break,
            }
            let tail = chain[chain.len() - 1].1.end;
            if fuzzy_match(tail, chain[0].1.start) {
                closed = true;
            }
        }

        let object_id = objects.len();
        let mut object_segments = Vec::with_capacity(chain.len());
        for (index, mut segment) in chain {
            segments[index].object = Some(object_id);
            segment.object = Some(object_id);
            object_segments.push(segment);
        }

        let mut object = Object::new(object_segments, closed);
        if closed && object.signed_area() < 0.0 {
            reverse_object(&mut object);
        }
        objects.insert(object_id, object);
    }

    info!(
        "segments_to_objects: {} segments chained into {} objects ({} closed)",
        count,
        objects.len(),
        objects.values().filter(|object| object.closed).count()
    );
    objects
}

/// Gives every object its own copy of the per-object setup and applies the
/// directives found in its layer name.
pub fn assign_object_setups(objects: &mut ObjectMap, setup: &Setup) {
    let defaults = setup.object_setup();
    for (id, object) in objects.iter_mut() {
        object.setup = defaults.clone();
        if apply_layer_directives(&object.layer, &mut object.setup) {
            debug!("Object {} uses layer setup '{}'", id, object.layer);
        }
    }
}

fn find_next(
    segments: &[Segment],
    used: &[bool],
    layer: &str,
    tail: Point3,
) -> Option<(usize, Segment)> {
    segments
        .iter()
        .enumerate()
        .filter(|(i, segment)| !used[*i] && segment.layer == layer)
        .find_map(|(i, segment)| {
            if fuzzy_match(segment.start, tail) {
                Some((i, segment.clone()))
            } else if fuzzy_match(segment.end, tail) {
                Some((i, turned(segment)))
            } else {
                None
            }
        })
}

fn find_previous(
    segments: &[Segment],
    used: &[bool],
    layer: &str,
    head: Point3,
) -> Option<(usize, Segment)> {
    segments
        .iter()
        .enumerate()
        .filter(|(i, segment)| !used[*i] && segment.layer == layer)
        .find_map(|(i, segment)| {
            if fuzzy_match(segment.end, head) {
                Some((i, segment.clone()))
            } else if fuzzy_match(segment.start, head) {
                Some((i, turned(segment)))
            } else {
                None
            }
        })
}

/// Turns a loose segment around so it fits the chain being built.
///
/// Unlike [`Segment::reversed`] a straight segment keeps a `+0.0` bulge, so
/// the sign of zero on a finished object only records whether the object as
/// a whole was reversed.
fn turned(segment: &Segment) -> Segment {
    let mut turned = segment.clone();
    std::mem::swap(&mut turned.start, &mut turned.end);
    turned.bulge = 0.0 - segment.bulge;
    turned
}
