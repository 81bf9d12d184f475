//! Machining setup for viamill
//!
//! A [`Setup`] is organized into logical sections:
//! - Tool (number, diameter, spindle speed, feed rates)
//! - Mill (target depth, depth step, ramping, safe height)
//! - Pockets (area clearing and stepover)
//! - Machine (output unit and post-processor)
//! - Workpiece (where the drawing's origin is moved to)
//!
//! Setups are read from and written to JSON or TOML files. Values that the
//! kernel requires in a particular form (negative depths, a minimum depth
//! step) are corrected by [`Setup::clamp`] at load time, never inside the
//! kernel itself.

use crate::error::{ConfigError, SettingsError, SettingsResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};
pub use viamill_core::Unit;

/// Shallowest depth step the setup accepts, in setup units.
pub const MIN_DEPTH_STEP: f64 = -0.05;

/// Tool settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSetup {
    /// Tool number used for the tool change
    pub number: u32,
    /// Cutter diameter
    pub diameter: f64,
    /// Spindle speed in RPM
    pub speed: u32,
    /// Horizontal feed rate
    pub rate_h: u32,
    /// Vertical (plunge) feed rate
    pub rate_v: u32,
}

impl Default for ToolSetup {
    fn default() -> Self {
        Self {
            number: 1,
            diameter: 4.0,
            speed: 10000,
            rate_h: 1000,
            rate_v: 100,
        }
    }
}

/// Milling settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MillSetup {
    /// Whether the object is machined at all
    pub active: bool,
    /// Final depth, negative below the workpiece surface
    pub depth: f64,
    /// Depth increment per pass, negative
    pub step: f64,
    /// Ramp into the material along the path on the first pass
    pub helix_mode: bool,
    /// Safe height for rapid moves
    pub fast_move_z: f64,
    /// Keep collapsed features as single plunge points
    pub small_circles: bool,
    /// Return to the origin at program end
    pub back_home: bool,
    /// Path blending tolerance, 0 disables G64
    pub g64: f64,
}

impl Default for MillSetup {
    fn default() -> Self {
        Self {
            active: true,
            depth: -9.0,
            step: -3.0,
            helix_mode: false,
            fast_move_z: 5.0,
            small_circles: false,
            back_home: true,
            g64: 0.05,
        }
    }
}

/// Pocket clearing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PocketSetup {
    /// Clear the whole area inside pocket walls
    pub active: bool,
    /// Distance between concentric clearing rings
    pub stepover: f64,
}

impl Default for PocketSetup {
    fn default() -> Self {
        Self {
            active: false,
            stepover: 2.0,
        }
    }
}

/// Machine output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineSetup {
    /// Unit of the setup values and of the generated program
    pub unit: Unit,
    /// Name of the post-processor
    pub plugin: String,
    /// Emit comments in the generated program
    pub comments: bool,
    /// Write arcs in radius form instead of centre offsets
    pub arc_mode_r: bool,
}

impl Default for MachineSetup {
    fn default() -> Self {
        Self {
            unit: Unit::Mm,
            plugin: "gcode_linuxcnc".to_string(),
            comments: true,
            arc_mode_r: false,
        }
    }
}

/// Where the workpiece origin is placed relative to the drawing's extents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WorkpieceZero {
    #[default]
    BottomLeft,
    BottomRight,
    TopLeft,
    TopRight,
    Center,
    /// Keep drawing coordinates untouched
    Original,
}

impl WorkpieceZero {
    /// All variants in schema order.
    pub const ALL: [WorkpieceZero; 6] = [
        Self::BottomLeft,
        Self::BottomRight,
        Self::TopLeft,
        Self::TopRight,
        Self::Center,
        Self::Original,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BottomLeft => "bottomLeft",
            Self::BottomRight => "bottomRight",
            Self::TopLeft => "topLeft",
            Self::TopRight => "topRight",
            Self::Center => "center",
            Self::Original => "original",
        }
    }
}

impl fmt::Display for WorkpieceZero {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WorkpieceZero {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|zero| zero.as_str() == s)
            .ok_or_else(|| ConfigError::ValueOutOfRange {
                key: "workpiece.zero".to_string(),
                value: s.to_string(),
            })
    }
}

/// Workpiece settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkpieceSetup {
    pub zero: WorkpieceZero,
    /// Flip the drawing left to right
    pub mirror_x: bool,
    /// Flip the drawing top to bottom
    pub mirror_y: bool,
}

/// The per-object part of a setup. Every contour gets its own copy which
/// layer directives may then modify.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectSetup {
    pub tool: ToolSetup,
    pub mill: MillSetup,
    pub pockets: PocketSetup,
}

/// Complete machining setup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Setup {
    /// Tool settings
    pub tool: ToolSetup,
    /// Milling settings
    pub mill: MillSetup,
    /// Pocket clearing settings
    pub pockets: PocketSetup,
    /// Machine output settings
    pub machine: MachineSetup,
    /// Workpiece settings
    pub workpiece: WorkpieceSetup,
}

impl Setup {
    /// Create new setup with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load setup from file (JSON or TOML)
    ///
    /// Values are clamped into the form the kernel expects and then validated.
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SettingsError::LoadError(format!("{}: {}", path.display(), e)))?;

        let mut setup: Self = match file_format(path)? {
            FileFormat::Json => serde_json::from_str(&content)?,
            FileFormat::Toml => toml::from_str(&content)?,
        };

        setup.clamp();
        setup.validate()?;
        debug!("Loaded setup from {}", path.display());
        Ok(setup)
    }

    /// Save setup to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match file_format(path)? {
            FileFormat::Json => serde_json::to_string_pretty(self)?,
            FileFormat::Toml => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, content)
            .map_err(|e| SettingsError::SaveError(format!("{}: {}", path.display(), e)))?;
        Ok(())
    }

    /// Forces depth values into the form the sequencer relies on.
    ///
    /// `step` and `depth` become negative, `step` is at least
    /// [`MIN_DEPTH_STEP`] deep and a target depth shallower than one step is
    /// deepened to that step.
    pub fn clamp(&mut self) {
        clamp_mill(&mut self.mill);
    }

    /// Validate setup
    pub fn validate(&self) -> SettingsResult<()> {
        if !self.tool.diameter.is_finite() || self.tool.diameter <= 0.0 {
            return Err(invalid("tool.diameter", "must be a positive number"));
        }

        validate_mill(&self.mill)?;

        if self.pockets.active && !(self.pockets.stepover.is_finite() && self.pockets.stepover > 0.0)
        {
            return Err(invalid("pockets.stepover", "must be a positive number"));
        }

        if self.machine.plugin.trim().is_empty() {
            return Err(invalid("machine.plugin", "must not be empty"));
        }

        Ok(())
    }

    /// Returns a copy with every length expressed in millimeters.
    ///
    /// Feed rates and spindle speed stay untouched; the unit field is kept so
    /// post-processors can convert the output back.
    pub fn normalized_mm(&self) -> Self {
        let mut setup = self.clone();
        let factor = self.machine.unit.to_mm_factor();
        if factor != 1.0 {
            setup.tool.diameter *= factor;
            setup.mill.depth *= factor;
            setup.mill.step *= factor;
            setup.mill.fast_move_z *= factor;
            setup.pockets.stepover *= factor;
        }
        setup
    }

    /// The per-object part of this setup.
    pub fn object_setup(&self) -> ObjectSetup {
        ObjectSetup {
            tool: self.tool.clone(),
            mill: self.mill.clone(),
            pockets: self.pockets.clone(),
        }
    }
}

impl ObjectSetup {
    /// Re-applies the depth corrections after layer directives changed them.
    pub fn clamp(&mut self) {
        clamp_mill(&mut self.mill);
    }
}

enum FileFormat {
    Json,
    Toml,
}

fn file_format(path: &Path) -> SettingsResult<FileFormat> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(FileFormat::Json),
        Some("toml") => Ok(FileFormat::Toml),
        other => Err(ConfigError::UnsupportedFormat(other.unwrap_or("").to_string()).into()),
    }
}

fn clamp_mill(mill: &mut MillSetup) {
    let (depth, step) = (mill.depth, mill.step);

    mill.step = -mill.step.abs();
    if mill.step > MIN_DEPTH_STEP {
        mill.step = MIN_DEPTH_STEP;
    }
    mill.depth = -mill.depth.abs();
    if mill.depth != 0.0 && mill.depth > mill.step {
        mill.depth = mill.step;
    }

    if mill.depth != depth || mill.step != step {
        warn!(
            "Adjusted mill depth/step from {}/{} to {}/{}",
            depth, step, mill.depth, mill.step
        );
    }
}

fn validate_mill(mill: &MillSetup) -> SettingsResult<()> {
    if !mill.depth.is_finite() || mill.depth == 0.0 {
        return Err(invalid("mill.depth", "must be a non-zero number"));
    }
    if !mill.step.is_finite() || mill.step == 0.0 {
        return Err(invalid("mill.step", "must be a non-zero number"));
    }
    if !mill.fast_move_z.is_finite() {
        return Err(invalid("mill.fast_move_z", "must be a number"));
    }
    if !mill.g64.is_finite() || mill.g64 < 0.0 {
        return Err(invalid("mill.g64", "must not be negative"));
    }
    Ok(())
}

fn invalid(key: &str, reason: &str) -> SettingsError {
    SettingsError::InvalidSetting {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
