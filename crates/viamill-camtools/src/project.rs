//! Recalculation Pipeline
//!
//! A [`Project`] is an owned snapshot of drawing and setup. [`recalculate`]
//! runs every stage on that snapshot and returns a fresh [`RecalcResult`],
//! so a calculation never observes later edits.

use crate::cleaner::clean_segments;
use crate::contour::{assign_object_setups, segments_to_objects, ObjectMap};
use crate::error::CamToolResult;
use crate::nesting::find_tool_offsets;
use crate::offset::{objects_to_offsets, OffsetMap};
use crate::post::post_processor_for;
use crate::sequencer::{polylines_to_plan, MachinePlan};
use crate::transform::{align_to_zero, mirror_objects, scale_objects, MinMax};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};
use viamill_core::{Segment, Unit};
use viamill_settings::Setup;

/// Drawing and setup of one job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub segments: Vec<Segment>,
    #[serde(default)]
    pub setup: Setup,
    /// Unit the drawing coordinates are given in
    #[serde(default)]
    pub drawing_unit: Unit,
}

impl Project {
    pub fn new(segments: Vec<Segment>, setup: Setup) -> Self {
        Self {
            segments,
            setup,
            drawing_unit: Unit::Mm,
        }
    }

    /// Reads a drawing file of the form `{"segments": [...]}`.
    ///
    /// The setup and drawing unit may be part of the same file; missing
    /// values fall back to defaults.
    pub fn load_from_file(path: &Path) -> CamToolResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let project: Self = serde_json::from_str(&content)?;
        debug!(
            "Loaded {} segments from {}",
            project.segments.len(),
            path.display()
        );
        Ok(project)
    }
}

/// Everything one calculation produces. All geometry is in millimeters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecalcResult {
    /// Cleaned segments, labelled with their object ids
    pub segments: Vec<Segment>,
    pub objects: ObjectMap,
    /// Deepest nesting level
    pub max_outer: usize,
    /// Drawing extents after the workpiece zero was applied
    pub min_max: Option<MinMax>,
    pub offsets: OffsetMap,
    pub plan: MachinePlan,
}

impl RecalcResult {
    /// Renders the plan with the post-processor named in `setup`.
    pub fn machine_code(&self, setup: &Setup) -> CamToolResult<String> {
        let post = post_processor_for(
            &setup.machine.plugin,
            setup.machine.comments,
            setup.machine.arc_mode_r,
        )?;
        Ok(post.render(&self.plan, setup))
    }
}

/// Runs the whole pipeline on `project`.
///
/// The setup is clamped and validated first; invalid values and non-finite
/// segment coordinates are the only failures. Geometry problems further down
/// only drop the affected features.
pub fn recalculate(project: &Project) -> CamToolResult<RecalcResult> {
    let mut setup = project.setup.clone();
    setup.clamp();
    setup.validate()?;
    let setup = setup.normalized_mm();

    for (index, segment) in project.segments.iter().enumerate() {
        segment.validate(index)?;
    }

    let mut segments = clean_segments(&project.segments);
    let mut objects = segments_to_objects(&mut segments);
    if project.drawing_unit != Unit::Mm {
        scale_objects(&mut objects, project.drawing_unit.to_mm_factor());
    }
    let (mirror_x, mirror_y) = (setup.workpiece.mirror_x, setup.workpiece.mirror_y);
    if mirror_x || mirror_y {
        debug!("Mirroring drawing (x: {}, y: {})", mirror_x, mirror_y);
        mirror_objects(&mut objects, mirror_x, mirror_y);
    }
    assign_object_setups(&mut objects, &setup);

    let max_outer = find_tool_offsets(&mut objects);
    let min_max = align_to_zero(&mut objects, setup.workpiece.zero);

    let offsets = objects_to_offsets(&objects, setup.tool.diameter, setup.mill.small_circles);
    let plan = polylines_to_plan(&offsets, max_outer, setup.mill.fast_move_z);

    info!(
        "recalculate: {} segments, {} objects, {} tool paths, {} plan entries",
        segments.len(),
        objects.len(),
        offsets.len(),
        plan.entries.len()
    );

    Ok(RecalcResult {
        segments,
        objects,
        max_outer,
        min_max,
        offsets,
        plan,
    })
}
