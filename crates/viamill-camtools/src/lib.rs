//! # viamill CAM tools
//!
//! Turns a flat list of drawing segments into a machine program.
//!
//! ## Pipeline
//!
//! - **Cleaner**: drops duplicate, overlapping and zero-length segments
//! - **Contour Builder**: chains segments into open and closed objects
//! - **Nesting Analyzer**: finds enclosing objects and the cutter side
//! - **Workpiece Transforms**: moves the drawing to the workpiece zero
//! - **Offset Engine**: tool centre paths and pocket rings
//! - **Sequencer**: cutting order, depth passes and helix ramps
//! - **Post-processors**: controller specific program text
//!
//! [`recalculate`] runs all stages on a [`Project`] snapshot and
//! [`Recalculator`] runs it in the background.

pub mod cleaner;
pub mod contour;
pub mod error;
pub mod nesting;
pub mod offset;
pub mod post;
pub mod project;
pub mod sequencer;
pub mod transform;
pub mod worker;

// Re-export commonly used items
pub use cleaner::clean_segments;
pub use contour::{
    assign_object_setups, reverse_object, segments_to_objects, Object, ObjectMap, ToolOffset,
};
pub use error::{CamToolError, CamToolResult};
pub use nesting::{find_outer_objects, find_tool_offsets};
pub use offset::{
    objects_to_offsets, reverse_vertices, OffsetKey, OffsetMap, OffsetPolyline,
    MIN_MACHINABLE_RADIUS,
};
pub use post::{post_processor_for, LinuxCncPost, PostProcessor};
pub use project::{recalculate, Project, RecalcResult};
pub use sequencer::{polylines_to_plan, rotate_list, MachinePlan, MotionCommand, PlanEntry};
pub use transform::{
    align_to_zero, mirror_objects, move_objects, objects_min_max, scale_objects, MinMax,
};
pub use worker::{Completed, Recalculator};
