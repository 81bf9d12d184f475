//! Post-processors
//!
//! Turn a [`MachinePlan`] into controller specific program text. The plan
//! is always in millimeters; dialects convert to the machine unit on output.

use crate::contour::ToolOffset;
use crate::error::{CamToolError, CamToolResult};
use crate::sequencer::{MachinePlan, MotionCommand, PlanEntry};
use tracing::debug;
use viamill_core::Unit;
use viamill_settings::Setup;

/// Renders machine plans for one controller dialect.
pub trait PostProcessor: Send + Sync {
    /// Identifier used in `machine.plugin`.
    fn name(&self) -> &str;

    /// File extension of the generated program, without the dot.
    fn suffix(&self) -> &str;

    /// Renders the complete program.
    ///
    /// `setup` is the user setup, in the user's unit.
    fn render(&self, plan: &MachinePlan, setup: &Setup) -> String;
}

/// Returns the post-processor registered under `name`.
pub fn post_processor_for(
    name: &str,
    comments: bool,
    arc_mode_r: bool,
) -> CamToolResult<Box<dyn PostProcessor>> {
    match name {
        LinuxCncPost::NAME => Ok(Box::new(LinuxCncPost::new(comments, arc_mode_r))),
        other => Err(CamToolError::UnknownOutputTarget(other.to_string())),
    }
}

/// G-code for LinuxCNC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinuxCncPost {
    /// Annotate the program with comments
    pub comments: bool,
    /// Write arcs with `R` instead of `I`/`J`
    pub arc_mode_r: bool,
}

impl LinuxCncPost {
    pub const NAME: &'static str = "gcode_linuxcnc";

    pub fn new(comments: bool, arc_mode_r: bool) -> Self {
        Self {
            comments,
            arc_mode_r,
        }
    }
}

impl Default for LinuxCncPost {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl PostProcessor for LinuxCncPost {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn suffix(&self) -> &str {
        "ngc"
    }

    fn render(&self, plan: &MachinePlan, setup: &Setup) -> String {
        let mut writer = GcodeWriter::new(self, setup.machine.unit);

        writer.header(plan, setup);
        for entry in &plan.entries {
            writer.entry(entry, setup);
        }
        writer.footer(plan, setup);

        debug!(
            "LinuxCncPost: {} entries rendered into {} lines",
            plan.entries.len(),
            writer.lines.len()
        );
        writer.finish()
    }
}

/// Modal state of the program being written.
struct GcodeWriter<'a> {
    post: &'a LinuxCncPost,
    unit: Unit,
    lines: Vec<String>,
    x: Option<f64>,
    y: Option<f64>,
    z: Option<f64>,
    feed: Option<u32>,
}

impl<'a> GcodeWriter<'a> {
    fn new(post: &'a LinuxCncPost, unit: Unit) -> Self {
        Self {
            post,
            unit,
            lines: Vec::new(),
            x: None,
            y: None,
            z: None,
            feed: None,
        }
    }

    fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Pushes `code`, followed by `comment` when comments are on.
    fn code(&mut self, code: &str, comment: &str) {
        if self.post.comments {
            self.push(format!("{} ({})", code, comment));
        } else {
            self.push(code);
        }
    }

    fn comment(&mut self, text: impl AsRef<str>) {
        if self.post.comments {
            self.push(format!("({})", text.as_ref()));
        }
    }

    fn separation(&mut self) {
        if self.post.comments {
            self.push("");
        }
    }

    fn unit_name(&self) -> &'static str {
        match self.unit {
            Unit::Mm => "mm",
            Unit::Inch => "inch",
        }
    }

    /// Converts a millimeter length to the output unit.
    fn scaled(&self, value: f64) -> f64 {
        self.unit.from_mm(value)
    }

    fn header(&mut self, plan: &MachinePlan, setup: &Setup) {
        self.comment("--------------------------------------------------");
        self.comment("Generator: viamill");
        self.comment("--------------------------------------------------");
        self.separation();

        match self.unit {
            Unit::Mm => self.code("G21", "Metric/mm"),
            Unit::Inch => self.code("G20", "Imperial/inches"),
        }
        self.code("G40", "No Offsets");
        self.code("G90", "Absolute-Mode");
        self.set_feed(setup.tool.rate_v);
        if setup.mill.g64 > 0.0 {
            self.push(format!("G64 P{}", setup.mill.g64));
        }
        self.code("M05", "Spindle off");
        self.push(format!("M06 T{}", setup.tool.number));
        self.code(&format!("M03 S{}", setup.tool.speed), "Spindle on / CW");
        self.code("G04 P1", "pause in sec");
        self.push(format!("G00 Z{}", format_number(self.scaled(plan.fast_move_z))));
        self.push("G00 X0.0 Y0.0");
        self.x = Some(0.0);
        self.y = Some(0.0);
        self.z = Some(plan.fast_move_z);
    }

    fn entry(&mut self, entry: &PlanEntry, setup: &Setup) {
        let unit = self.unit_name();
        self.separation();
        self.comment("--------------------------------------------------");
        self.comment(format!("Level: {}", entry.level));
        self.comment(format!("Order: {}", entry.order));
        self.comment(format!("Object: {}", entry.key));
        self.comment(format!(
            "Distance: {}{}",
            format_number(self.scaled(entry.distance)),
            unit
        ));
        self.comment(format!("Closed: {}", entry.closed));
        self.comment(format!("isPocket: {}", entry.is_pocket));
        self.comment(format!(
            "Depth: {}{} / {}{}",
            format_number(self.scaled(entry.depth)),
            unit,
            format_number(self.scaled(entry.step)),
            unit
        ));
        self.comment(format!("Tool-Diameter: {}{}", setup.tool.diameter, unit));
        if entry.tool_offset != ToolOffset::None {
            self.comment(format!(
                "Tool-Offset: {}{} {}",
                setup.tool.diameter / 2.0,
                unit,
                entry.tool_offset
            ));
        }
        self.comment("--------------------------------------------------");

        for command in &entry.commands {
            self.motion(command, entry);
        }
    }

    fn footer(&mut self, plan: &MachinePlan, setup: &Setup) {
        self.separation();
        self.comment("- end -");
        self.push(format!("G00 Z{}", format_number(self.scaled(plan.fast_move_z))));
        self.code("M05", "Spindle off");
        if setup.mill.back_home {
            self.push("G00 X0.0 Y0.0");
        }
        self.push("M02");
    }

    fn set_feed(&mut self, feed: u32) {
        if self.feed != Some(feed) {
            self.push(format!("F{}", feed));
            self.feed = Some(feed);
        }
    }

    fn motion(&mut self, command: &MotionCommand, entry: &PlanEntry) {
        let target = command.target();
        let plunge = self.x == Some(target.x) && self.y == Some(target.y);
        let (start_x, start_y) = (self.x.unwrap_or(0.0), self.y.unwrap_or(0.0));

        let word = match command {
            MotionCommand::Rapid { .. } => "G00",
            MotionCommand::Linear { .. } => {
                self.set_feed(if plunge { entry.rate_v } else { entry.rate_h });
                "G01"
            }
            MotionCommand::ArcCw { .. } => {
                self.set_feed(entry.rate_h);
                "G02"
            }
            MotionCommand::ArcCcw { .. } => {
                self.set_feed(entry.rate_h);
                "G03"
            }
        };

        let mut words = self.axis_words(target.x, target.y, target.z);
        match *command {
            MotionCommand::ArcCw { x, y, i, j, .. } | MotionCommand::ArcCcw { x, y, i, j, .. } => {
                if self.post.arc_mode_r {
                    let clockwise = matches!(command, MotionCommand::ArcCw { .. });
                    let radius = arc_radius_word(start_x, start_y, x, y, i, j, clockwise);
                    words.push(format!("R{}", format_number(self.scaled(radius))));
                } else {
                    words.push(format!("I{}", format_number(self.scaled(i))));
                    words.push(format!("J{}", format_number(self.scaled(j))));
                }
            }
            _ => {}
        }

        if !words.is_empty() {
            self.push(format!("{} {}", word, words.join(" ")));
        }
    }

    /// Axis words for the axes that change; updates the modal position.
    fn axis_words(&mut self, x: f64, y: f64, z: f64) -> Vec<String> {
        let mut words = Vec::new();
        if self.x != Some(x) {
            words.push(format!("X{}", format_number(self.scaled(x))));
            self.x = Some(x);
        }
        if self.y != Some(y) {
            words.push(format!("Y{}", format_number(self.scaled(y))));
            self.y = Some(y);
        }
        if self.z != Some(z) {
            words.push(format!("Z{}", format_number(self.scaled(z))));
            self.z = Some(z);
        }
        words
    }

    fn finish(mut self) -> String {
        self.push("");
        self.lines.join("\n")
    }
}

/// Radius for the `R` arc form. Arcs sweeping more than half a circle get a
/// negative radius.
fn arc_radius_word(
    start_x: f64,
    start_y: f64,
    end_x: f64,
    end_y: f64,
    i: f64,
    j: f64,
    clockwise: bool,
) -> f64 {
    let radius = i.hypot(j);
    // centre relative to the chord: left is positive
    let side = (end_x - start_x) * j - (end_y - start_y) * i;
    let large = if clockwise { side > 0.0 } else { side < 0.0 };
    if large {
        -radius
    } else {
        radius
    }
}

/// Six decimals, without a negative sign on zero.
fn format_number(value: f64) -> String {
    let text = format!("{:.6}", value);
    if text.trim_start_matches('-').trim_matches(|c| c == '0' || c == '.').is_empty() {
        text.trim_start_matches('-').to_string()
    } else {
        text
    }
}
