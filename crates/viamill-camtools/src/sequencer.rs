//! Toolpath Sequencer
//!
//! Orders offset polylines and expands them into depth-stepped motion
//! commands. Inner nesting levels are cut before the contours enclosing
//! them so islands keep their support until the separating cut. Within a
//! level the nearest unvisited polyline is taken next.

use crate::contour::ToolOffset;
use crate::offset::{reverse_vertices, OffsetKey, OffsetMap, OffsetPolyline};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};
use viamill_core::{bulge_to_arc, distance, PathVertex, Point3};

/// A single machine move with absolute coordinates.
///
/// Arc centres are given by `i`/`j`, relative to the move's start point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MotionCommand {
    Rapid { x: f64, y: f64, z: f64 },
    Linear { x: f64, y: f64, z: f64 },
    ArcCw { x: f64, y: f64, z: f64, i: f64, j: f64 },
    ArcCcw { x: f64, y: f64, z: f64, i: f64, j: f64 },
}

impl MotionCommand {
    /// Target position of the move.
    pub fn target(&self) -> Point3 {
        match *self {
            Self::Rapid { x, y, z }
            | Self::Linear { x, y, z }
            | Self::ArcCw { x, y, z, .. }
            | Self::ArcCcw { x, y, z, .. } => Point3::new(x, y, z),
        }
    }

    pub fn is_rapid(&self) -> bool {
        matches!(self, Self::Rapid { .. })
    }
}

/// One sequenced polyline with its annotations and moves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub key: OffsetKey,
    pub level: usize,
    /// Position in the cutting order, starting at 0.
    pub order: usize,
    /// Path length of one pass.
    pub distance: f64,
    pub closed: bool,
    pub is_pocket: bool,
    /// Target depth and depth step of the polyline.
    pub depth: f64,
    pub step: f64,
    pub tool_offset: ToolOffset,
    pub rate_h: u32,
    pub rate_v: u32,
    pub commands: Vec<MotionCommand>,
}

/// The complete ordered motion program.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachinePlan {
    /// Safe height used for rapid moves.
    pub fast_move_z: f64,
    pub entries: Vec<PlanEntry>,
}

impl MachinePlan {
    /// All moves in program order.
    pub fn commands(&self) -> impl Iterator<Item = &MotionCommand> {
        self.entries.iter().flat_map(|entry| entry.commands.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `list[k..]` followed by `list[..k]`.
pub fn rotate_list<T: Clone>(list: &[T], k: usize) -> Vec<T> {
    if list.is_empty() {
        return Vec::new();
    }
    let k = k % list.len();
    let mut rotated = Vec::with_capacity(list.len());
    rotated.extend_from_slice(&list[k..]);
    rotated.extend_from_slice(&list[..k]);
    rotated
}

/// Sequences every active polyline into motion commands.
///
/// Levels run from `max_outer` down to 0. The tool starts at the origin.
pub fn polylines_to_plan(offsets: &OffsetMap, max_outer: usize, fast_move_z: f64) -> MachinePlan {
    let mut visited = BTreeSet::new();
    let mut cursor = Point3::xy(0.0, 0.0);
    let mut plan = MachinePlan {
        fast_move_z,
        entries: Vec::new(),
    };

    for level in (0..=max_outer).rev() {
        while let Some((key, start_index)) = nearest(offsets, &visited, level, cursor) {
            visited.insert(key);
            let Some(polyline) = offsets.get(&key) else {
                continue;
            };

            let points = if polyline.closed {
                rotate_list(&polyline.vertices, start_index)
            } else if start_index != 0 {
                reverse_vertices(&polyline.vertices)
            } else {
                polyline.vertices.clone()
            };

            let entry = sequence_polyline(
                key,
                polyline,
                &points,
                plan.entries.len(),
                cursor,
                fast_move_z,
            );
            if let Some(exit) = entry.commands.last() {
                let target = exit.target();
                cursor = Point3::xy(target.x, target.y);
            }
            debug!(
                "Sequenced {} at level {} with {} moves",
                key,
                level,
                entry.commands.len()
            );
            plan.entries.push(entry);
        }
    }

    info!(
        "polylines_to_plan: {} polylines, {} moves",
        plan.entries.len(),
        plan.commands().count()
    );
    plan
}

/// Finds the unvisited active polyline at `level` closest to `cursor`.
///
/// Returns its key and the index of the vertex to start from. Ties keep the
/// first candidate in key order.
fn nearest(
    offsets: &OffsetMap,
    visited: &BTreeSet<OffsetKey>,
    level: usize,
    cursor: Point3,
) -> Option<(OffsetKey, usize)> {
    let mut best: Option<(f64, OffsetKey, usize)> = None;
    let mut consider = |dist: f64, key: OffsetKey, index: usize| {
        if best.is_none_or(|(best_dist, _, _)| dist < best_dist) {
            best = Some((dist, key, index));
        }
    };

    for (key, polyline) in offsets {
        if visited.contains(key)
            || polyline.level != level
            || !polyline.mill.active
            || polyline.vertices.is_empty()
        {
            continue;
        }
        if polyline.closed {
            for (index, vertex) in polyline.vertices.iter().enumerate() {
                consider(distance(cursor, vertex.point()), *key, index);
            }
        } else {
            let last = polyline.vertices.len() - 1;
            consider(distance(cursor, polyline.vertices[0].point()), *key, 0);
            consider(distance(cursor, polyline.vertices[last].point()), *key, last);
        }
    }
    best.map(|(_, key, index)| (key, index))
}

/// Length of the move from `a` to `b`, following the arc for bulged moves.
fn move_length(a: &PathVertex, b: &PathVertex) -> f64 {
    let chord = distance(a.point(), b.point());
    if a.bulge == 0.0 || chord == 0.0 {
        return chord;
    }
    let sweep = 4.0 * a.bulge.abs().atan();
    let radius = chord / (2.0 * (sweep / 2.0).sin());
    radius * sweep
}

/// The moves of one pass: every vertex pair plus the closing move.
fn pass_moves(points: &[PathVertex], closed: bool) -> Vec<(PathVertex, PathVertex)> {
    let mut moves: Vec<(PathVertex, PathVertex)> =
        points.windows(2).map(|pair| (pair[0], pair[1])).collect();
    if closed && points.len() > 1 {
        moves.push((points[points.len() - 1], points[0]));
    }
    moves
}

fn cut_move(from: &PathVertex, to: &PathVertex, z: f64) -> MotionCommand {
    let arc = bulge_to_arc(from.point(), to.point(), from.bulge);
    match arc {
        Some(arc) if from.bulge < 0.0 => MotionCommand::ArcCw {
            x: to.x,
            y: to.y,
            z,
            i: arc.center.x - from.x,
            j: arc.center.y - from.y,
        },
        Some(arc) => MotionCommand::ArcCcw {
            x: to.x,
            y: to.y,
            z,
            i: arc.center.x - from.x,
            j: arc.center.y - from.y,
        },
        None => MotionCommand::Linear { x: to.x, y: to.y, z },
    }
}

fn sequence_polyline(
    key: OffsetKey,
    polyline: &OffsetPolyline,
    points: &[PathVertex],
    order: usize,
    cursor: Point3,
    fast_move_z: f64,
) -> PlanEntry {
    let moves = pass_moves(points, polyline.closed);
    let total: f64 = moves.iter().map(|(a, b)| move_length(a, b)).sum();
    let target = polyline.mill.depth;
    let step = if polyline.mill.step < 0.0 {
        polyline.mill.step
    } else {
        target
    };

    let mut commands = Vec::new();
    let start = points[0];
    let mut position = (cursor.x, cursor.y);

    if polyline.closed {
        commands.push(MotionCommand::Rapid {
            x: position.0,
            y: position.1,
            z: fast_move_z,
        });
        commands.push(MotionCommand::Rapid {
            x: start.x,
            y: start.y,
            z: fast_move_z,
        });
        position = (start.x, start.y);
    }

    let mut helix = polyline.mill.helix_mode && total > 0.0;
    let mut depth = step;
    let mut last_depth = 0.0;
    loop {
        if depth < target {
            depth = target;
        }

        if !polyline.closed {
            commands.push(MotionCommand::Rapid {
                x: position.0,
                y: position.1,
                z: fast_move_z,
            });
            commands.push(MotionCommand::Rapid {
                x: start.x,
                y: start.y,
                z: fast_move_z,
            });
        }

        commands.push(MotionCommand::Linear {
            x: start.x,
            y: start.y,
            z: if helix { last_depth } else { depth },
        });

        let mut travelled = 0.0;
        for (from, to) in &moves {
            let z = if helix {
                travelled += move_length(from, to);
                last_depth + travelled / total * (depth - last_depth)
            } else {
                depth
            };
            commands.push(cut_move(from, to, z));
        }
        if let Some((_, to)) = moves.last() {
            position = (to.x, to.y);
        } else {
            position = (start.x, start.y);
        }

        last_depth = depth;
        if helix {
            // the ramp ends at the pass depth; the next pass is flat
            helix = false;
            if depth <= target {
                continue;
            }
        }
        if depth <= target {
            break;
        }
        depth += step;
    }

    commands.push(MotionCommand::Rapid {
        x: position.0,
        y: position.1,
        z: fast_move_z,
    });

    PlanEntry {
        key,
        level: polyline.level,
        order,
        distance: total,
        closed: polyline.closed,
        is_pocket: polyline.is_pocket,
        depth: target,
        step,
        tool_offset: polyline.tool_offset,
        rate_h: polyline.tool.rate_h,
        rate_v: polyline.tool.rate_v,
        commands,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use viamill_settings::{MillSetup, ToolSetup};

    fn polyline(vertices: Vec<PathVertex>, closed: bool, level: usize) -> OffsetPolyline {
        OffsetPolyline {
            vertices,
            closed,
            level,
            is_pocket: false,
            tool_offset: ToolOffset::None,
            mill: MillSetup {
                depth: -3.0,
                step: -1.0,
                ..MillSetup::default()
            },
            tool: ToolSetup::default(),
        }
    }

    fn square(x: f64, y: f64, size: f64) -> Vec<PathVertex> {
        vec![
            PathVertex::new(x, y, 0.0),
            PathVertex::new(x + size, y, 0.0),
            PathVertex::new(x + size, y + size, 0.0),
            PathVertex::new(x, y + size, 0.0),
        ]
    }

    fn single(path: OffsetPolyline) -> OffsetMap {
        OffsetMap::from([(OffsetKey::new(0, 0), path)])
    }

    fn plunge_depths(entry: &PlanEntry) -> Vec<f64> {
        let mut depths = Vec::new();
        let mut previous: Option<MotionCommand> = None;
        for command in &entry.commands {
            if let (MotionCommand::Linear { x, y, z }, Some(prev)) = (command, previous) {
                let from = prev.target();
                if from.x == *x && from.y == *y && from.z != *z {
                    depths.push(*z);
                }
            }
            previous = Some(*command);
        }
        depths
    }

    #[test]
    fn test_rotate_list() {
        assert_eq!(rotate_list(&[1, 2, 3, 4], 1), vec![2, 3, 4, 1]);
        assert_eq!(rotate_list(&[1, 2, 3, 4], 2), vec![3, 4, 1, 2]);
        assert_eq!(rotate_list(&[1, 2, 3, 4], 3), vec![4, 1, 2, 3]);
        assert_eq!(rotate_list(&[1, 2, 3, 4], 0), vec![1, 2, 3, 4]);
        assert_eq!(rotate_list(&[1, 2, 3, 4], 4), vec![1, 2, 3, 4]);
        assert!(rotate_list::<i32>(&[], 3).is_empty());
    }

    #[test]
    fn test_depth_steps_end_on_target() {
        let offsets = single(polyline(square(0.0, 0.0, 10.0), true, 0));
        let plan = polylines_to_plan(&offsets, 0, 5.0);
        let entry = &plan.entries[0];
        assert_eq!(plunge_depths(entry), vec![-1.0, -2.0, -3.0]);
    }

    #[test]
    fn test_partial_last_step_is_clamped() {
        let mut path = polyline(square(0.0, 0.0, 10.0), true, 0);
        path.mill.depth = -2.5;
        let offsets = single(path);
        let plan = polylines_to_plan(&offsets, 0, 5.0);
        assert_eq!(plunge_depths(&plan.entries[0]), vec![-1.0, -2.0, -2.5]);
    }

    #[test]
    fn test_closed_path_layout() {
        let mut path = polyline(square(0.0, 0.0, 10.0), true, 0);
        path.mill.depth = -1.0;
        let offsets = single(path);
        let plan = polylines_to_plan(&offsets, 0, 5.0);

        assert_eq!(
            plan.entries[0].commands,
            vec![
                MotionCommand::Rapid { x: 0.0, y: 0.0, z: 5.0 },
                MotionCommand::Rapid { x: 0.0, y: 0.0, z: 5.0 },
                MotionCommand::Linear { x: 0.0, y: 0.0, z: -1.0 },
                MotionCommand::Linear { x: 10.0, y: 0.0, z: -1.0 },
                MotionCommand::Linear { x: 10.0, y: 10.0, z: -1.0 },
                MotionCommand::Linear { x: 0.0, y: 10.0, z: -1.0 },
                MotionCommand::Linear { x: 0.0, y: 0.0, z: -1.0 },
                MotionCommand::Rapid { x: 0.0, y: 0.0, z: 5.0 },
            ]
        );
    }

    #[test]
    fn test_closed_path_starts_at_nearest_vertex() {
        let offsets = single(polyline(square(5.0, 5.0, 10.0), true, 0));
        let plan = polylines_to_plan(&offsets, 0, 5.0);
        assert_eq!(
            plan.entries[0].commands[1],
            MotionCommand::Rapid { x: 5.0, y: 5.0, z: 5.0 }
        );

        let moved = single(polyline(square(-20.0, -20.0, 10.0), true, 0));
        let plan = polylines_to_plan(&moved, 0, 5.0);
        assert_eq!(
            plan.entries[0].commands[1],
            MotionCommand::Rapid { x: -10.0, y: -10.0, z: 5.0 }
        );
    }

    #[test]
    fn test_open_path_is_reversed_when_far_end_is_nearer() {
        let line = vec![
            PathVertex::new(50.0, 0.0, 0.5),
            PathVertex::new(10.0, 0.0, 0.0),
        ];
        let mut path = polyline(line, false, 0);
        path.mill.depth = -1.0;
        let offsets = single(path);
        let plan = polylines_to_plan(&offsets, 0, 5.0);
        let commands = &plan.entries[0].commands;

        assert_eq!(commands[1], MotionCommand::Rapid { x: 10.0, y: 0.0, z: 5.0 });
        match commands[3] {
            MotionCommand::ArcCw { x, y, z, i, j } => {
                assert_eq!((x, y, z), (50.0, 0.0, -1.0));
                let centre = bulge_to_arc(Point3::xy(50.0, 0.0), Point3::xy(10.0, 0.0), 0.5).unwrap();
                assert!((10.0 + i - centre.center.x).abs() < 1e-9);
                assert!((j - centre.center.y).abs() < 1e-9);
            }
            other => panic!("expected clockwise arc, got {:?}", other),
        }
    }

    #[test]
    fn test_open_path_repositions_every_pass() {
        let line = vec![PathVertex::new(0.0, 0.0, 0.0), PathVertex::new(10.0, 0.0, 0.0)];
        let offsets = single(polyline(line, false, 0));
        let plan = polylines_to_plan(&offsets, 0, 5.0);
        let repositions = plan.entries[0]
            .commands
            .iter()
            .filter(|c| matches!(c, MotionCommand::Rapid { x, y, z } if *x == 0.0 && *y == 0.0 && *z == 5.0))
            .count();
        assert_eq!(repositions, 4);
        assert_eq!(plunge_depths(&plan.entries[0]), vec![-1.0, -2.0, -3.0]);
    }

    #[test]
    fn test_inner_levels_first_then_nearest() {
        let offsets = OffsetMap::from([
            (OffsetKey::new(0, 0), polyline(square(0.0, 0.0, 100.0), true, 0)),
            (OffsetKey::new(1, 0), polyline(square(60.0, 60.0, 10.0), true, 1)),
            (OffsetKey::new(2, 0), polyline(square(20.0, 20.0, 10.0), true, 1)),
        ]);
        let plan = polylines_to_plan(&offsets, 1, 5.0);
        let order: Vec<OffsetKey> = plan.entries.iter().map(|e| e.key).collect();
        assert_eq!(
            order,
            vec![OffsetKey::new(2, 0), OffsetKey::new(1, 0), OffsetKey::new(0, 0)]
        );
        assert_eq!(
            plan.entries.iter().map(|e| e.order).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_inactive_polylines_are_skipped() {
        let mut path = polyline(square(0.0, 0.0, 10.0), true, 0);
        path.mill.active = false;
        let offsets = single(path);
        assert!(polylines_to_plan(&offsets, 0, 5.0).is_empty());
    }

    #[test]
    fn test_helix_ramps_first_pass_only() {
        let mut path = polyline(square(0.0, 0.0, 10.0), true, 0);
        path.mill.helix_mode = true;
        path.mill.depth = -2.0;
        let offsets = single(path);
        let plan = polylines_to_plan(&offsets, 0, 5.0);
        let commands = &plan.entries[0].commands;

        // ramp: plunge to surface, then four moves down to the first step
        assert_eq!(commands[2], MotionCommand::Linear { x: 0.0, y: 0.0, z: 0.0 });
        let ramp: Vec<f64> = commands[3..7].iter().map(|c| c.target().z).collect();
        assert_eq!(ramp, vec![-0.25, -0.5, -0.75, -1.0]);

        // second pass is flat at the target
        assert_eq!(commands[7], MotionCommand::Linear { x: 0.0, y: 0.0, z: -2.0 });
        assert!(commands[8..12].iter().all(|c| c.target().z == -2.0));
        assert_eq!(commands.len(), 13);
    }

    #[test]
    fn test_helix_single_pass_gets_flat_cleanup() {
        let mut path = polyline(square(0.0, 0.0, 10.0), true, 0);
        path.mill.helix_mode = true;
        path.mill.depth = -1.0;
        let offsets = single(path);
        let plan = polylines_to_plan(&offsets, 0, 5.0);
        let commands = &plan.entries[0].commands;

        assert_eq!(commands[6].target().z, -1.0);
        assert_eq!(commands[7], MotionCommand::Linear { x: 0.0, y: 0.0, z: -1.0 });
        assert!(commands[8..12].iter().all(|c| c.target().z == -1.0));
    }

    #[test]
    fn test_plunge_point_never_ramps() {
        let mut path = polyline(vec![PathVertex::new(5.0, 5.0, 0.0)], false, 0);
        path.mill.helix_mode = true;
        let offsets = single(path);
        let plan = polylines_to_plan(&offsets, 0, 5.0);
        let entry = &plan.entries[0];
        assert_eq!(entry.distance, 0.0);
        let plunges: Vec<f64> = entry
            .commands
            .iter()
            .filter(|c| !c.is_rapid())
            .map(|c| c.target().z)
            .collect();
        assert_eq!(plunges, vec![-1.0, -2.0, -3.0]);
    }

    #[test]
    fn test_arc_direction_and_centre() {
        // full circle of radius 5 around (0, 0), counter-clockwise
        let circle = vec![PathVertex::new(-5.0, 0.0, 1.0), PathVertex::new(5.0, 0.0, 1.0)];
        let mut path = polyline(circle, true, 0);
        path.mill.depth = -1.0;
        let offsets = single(path);
        let plan = polylines_to_plan(&offsets, 0, 5.0);
        let entry = &plan.entries[0];
        assert!((entry.distance - std::f64::consts::PI * 10.0).abs() < 1e-9);

        let arcs: Vec<MotionCommand> = entry
            .commands
            .iter()
            .copied()
            .filter(|c| matches!(c, MotionCommand::ArcCcw { .. }))
            .collect();
        assert_eq!(arcs.len(), 2);
        if let MotionCommand::ArcCcw { x, i, j, .. } = arcs[0] {
            assert_eq!(x, 5.0);
            assert!((i - 5.0).abs() < 1e-9);
            assert!(j.abs() < 1e-9);
        }
    }
}
