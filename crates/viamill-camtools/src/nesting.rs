//! Nesting Analyzer
//!
//! Finds which closed objects enclose which others and decides on which side
//! of each contour the cutter has to run.

use crate::contour::{ObjectMap, ToolOffset};
use tracing::debug;
use viamill_core::{ObjectId, Point3};

/// Ids of all closed objects that contain `point`, ascending.
///
/// Objects listed in `exclude` are skipped.
pub fn find_outer_objects(
    objects: &ObjectMap,
    point: Point3,
    exclude: &[ObjectId],
) -> Vec<ObjectId> {
    objects
        .iter()
        .filter(|(id, object)| !exclude.contains(*id) && object.contains_point(point))
        .map(|(id, _)| *id)
        .collect()
}

/// Fills the nesting lists and the offset side of every object.
///
/// The start of an object's first segment decides which objects enclose it.
/// A closed object at even nesting depth is a pocket wall and is cut from
/// inside, one at odd depth is an island and is cut from outside. Open
/// objects and closed objects without any nesting relation are followed on
/// their centre line. An `offset_override` replaces the computed side.
///
/// Returns the deepest nesting level found.
pub fn find_tool_offsets(objects: &mut ObjectMap) -> usize {
    let ids: Vec<ObjectId> = objects.keys().copied().collect();

    for object in objects.values_mut() {
        object.outer_objects.clear();
        object.inner_objects.clear();
    }

    let mut max_outer = 0;
    for &id in &ids {
        let Some(point) = objects.get(&id).and_then(|object| object.start_point()) else {
            continue;
        };
        let outer = find_outer_objects(objects, point, &[id]);
        max_outer = max_outer.max(outer.len());

        for outer_id in &outer {
            if let Some(outer_object) = objects.get_mut(outer_id) {
                outer_object.inner_objects.push(id);
            }
        }
        if let Some(object) = objects.get_mut(&id) {
            object.outer_objects = outer;
        }
    }

    for (id, object) in objects.iter_mut() {
        let computed = if !object.closed
            || (object.outer_objects.is_empty() && object.inner_objects.is_empty())
        {
            ToolOffset::None
        } else if object.outer_objects.len() % 2 == 0 {
            ToolOffset::Inside
        } else {
            ToolOffset::Outside
        };
        object.tool_offset = object.offset_override.unwrap_or(computed);
        debug!(
            "Object {}: level {}, {} inner, offset {}",
            id,
            object.outer_objects.len(),
            object.inner_objects.len(),
            object.tool_offset
        );
    }

    max_outer
}
