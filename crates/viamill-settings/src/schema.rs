//! Typed option table for editing a [`Setup`] one value at a time.
//!
//! Every editable value has an id of the form `section.name` (for example
//! `mill.depth`), a kind and, for numbers, an inclusive range. Values are
//! checked once when they enter the setup.

use crate::config::{Setup, WorkpieceZero};
use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use viamill_core::Unit;

/// Value types for settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum SettingValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    /// Selected value and the allowed choices
    Enum(String, Vec<String>),
}

impl SettingValue {
    /// Get value as string
    pub fn as_str(&self) -> String {
        match self {
            Self::Boolean(b) => b.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Enum(selected, _) => selected.clone(),
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Enum(_, _) => "enum",
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind and bounds of an option.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptionKind {
    Boolean,
    Integer { min: i64, max: i64 },
    Float { min: f64, max: f64 },
    Enum(&'static [&'static str]),
}

/// One editable setup value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptionSpec {
    pub id: &'static str,
    pub title: &'static str,
    pub kind: OptionKind,
}

const UNITS: &[&str] = &["mm", "inch"];
const PLUGINS: &[&str] = &["gcode_linuxcnc"];
const ZEROS: &[&str] = &[
    "bottomLeft",
    "bottomRight",
    "topLeft",
    "topRight",
    "center",
    "original",
];

/// All editable options.
pub const OPTIONS: &[OptionSpec] = &[
    OptionSpec {
        id: "tool.number",
        title: "Tool number",
        kind: OptionKind::Integer { min: 1, max: 999 },
    },
    OptionSpec {
        id: "tool.diameter",
        title: "Tool diameter",
        kind: OptionKind::Float {
            min: 0.01,
            max: 100.0,
        },
    },
    OptionSpec {
        id: "tool.speed",
        title: "Spindle speed",
        kind: OptionKind::Integer {
            min: 0,
            max: 100_000,
        },
    },
    OptionSpec {
        id: "tool.rate_h",
        title: "Feed rate XY",
        kind: OptionKind::Integer {
            min: 1,
            max: 100_000,
        },
    },
    OptionSpec {
        id: "tool.rate_v",
        title: "Feed rate Z",
        kind: OptionKind::Integer {
            min: 1,
            max: 100_000,
        },
    },
    OptionSpec {
        id: "mill.active",
        title: "Active",
        kind: OptionKind::Boolean,
    },
    OptionSpec {
        id: "mill.depth",
        title: "Depth",
        kind: OptionKind::Float {
            min: -1000.0,
            max: -0.001,
        },
    },
    OptionSpec {
        id: "mill.step",
        title: "Depth step",
        kind: OptionKind::Float {
            min: -1000.0,
            max: -0.05,
        },
    },
    OptionSpec {
        id: "mill.helix_mode",
        title: "Helix mode",
        kind: OptionKind::Boolean,
    },
    OptionSpec {
        id: "mill.fast_move_z",
        title: "Safe height",
        kind: OptionKind::Float {
            min: 0.0,
            max: 1000.0,
        },
    },
    OptionSpec {
        id: "mill.small_circles",
        title: "Keep small circles",
        kind: OptionKind::Boolean,
    },
    OptionSpec {
        id: "mill.back_home",
        title: "Back home",
        kind: OptionKind::Boolean,
    },
    OptionSpec {
        id: "mill.g64",
        title: "Path blending",
        kind: OptionKind::Float {
            min: 0.0,
            max: 10.0,
        },
    },
    OptionSpec {
        id: "pockets.active",
        title: "Pockets",
        kind: OptionKind::Boolean,
    },
    OptionSpec {
        id: "pockets.stepover",
        title: "Stepover",
        kind: OptionKind::Float {
            min: 0.01,
            max: 100.0,
        },
    },
    OptionSpec {
        id: "machine.unit",
        title: "Unit",
        kind: OptionKind::Enum(UNITS),
    },
    OptionSpec {
        id: "machine.plugin",
        title: "Output",
        kind: OptionKind::Enum(PLUGINS),
    },
    OptionSpec {
        id: "machine.comments",
        title: "Comments",
        kind: OptionKind::Boolean,
    },
    OptionSpec {
        id: "machine.arc_mode_r",
        title: "Arcs as radius",
        kind: OptionKind::Boolean,
    },
    OptionSpec {
        id: "workpiece.zero",
        title: "Workpiece zero",
        kind: OptionKind::Enum(ZEROS),
    },
    OptionSpec {
        id: "workpiece.mirror_x",
        title: "Mirror X",
        kind: OptionKind::Boolean,
    },
    OptionSpec {
        id: "workpiece.mirror_y",
        title: "Mirror Y",
        kind: OptionKind::Boolean,
    },
];

/// Looks up an option by id.
pub fn option_spec(id: &str) -> ConfigResult<&'static OptionSpec> {
    OPTIONS
        .iter()
        .find(|spec| spec.id == id)
        .ok_or_else(|| ConfigError::UnknownOption(id.to_string()))
}

impl OptionSpec {
    /// Checks kind and range of a value for this option.
    pub fn check(&self, value: &SettingValue) -> ConfigResult<()> {
        let out_of_range = || ConfigError::ValueOutOfRange {
            key: self.id.to_string(),
            value: value.as_str(),
        };
        match (self.kind, value) {
            (OptionKind::Boolean, SettingValue::Boolean(_)) => Ok(()),
            (OptionKind::Integer { min, max }, SettingValue::Integer(v)) => {
                if (min..=max).contains(v) {
                    Ok(())
                } else {
                    Err(out_of_range())
                }
            }
            (OptionKind::Float { min, max }, SettingValue::Float(v)) => {
                if v.is_finite() && (min..=max).contains(v) {
                    Ok(())
                } else {
                    Err(out_of_range())
                }
            }
            (OptionKind::Enum(choices), SettingValue::Enum(selected, _)) => {
                if choices.contains(&selected.as_str()) {
                    Ok(())
                } else {
                    Err(out_of_range())
                }
            }
            (kind, _) => Err(ConfigError::TypeMismatch {
                key: self.id.to_string(),
                expected: match kind {
                    OptionKind::Boolean => "boolean",
                    OptionKind::Integer { .. } => "integer",
                    OptionKind::Float { .. } => "float",
                    OptionKind::Enum(_) => "enum",
                },
            }),
        }
    }

    /// Parses text input into a value of this option's kind.
    pub fn parse(&self, text: &str) -> ConfigResult<SettingValue> {
        let text = text.trim();
        let mismatch = |expected| ConfigError::TypeMismatch {
            key: self.id.to_string(),
            expected,
        };
        let value = match self.kind {
            OptionKind::Boolean => match text {
                "true" | "1" | "yes" | "on" => SettingValue::Boolean(true),
                "false" | "0" | "no" | "off" => SettingValue::Boolean(false),
                _ => return Err(mismatch("boolean")),
            },
            OptionKind::Integer { .. } => {
                SettingValue::Integer(text.parse().map_err(|_| mismatch("integer"))?)
            }
            OptionKind::Float { .. } => {
                SettingValue::Float(text.parse().map_err(|_| mismatch("float"))?)
            }
            OptionKind::Enum(choices) => SettingValue::Enum(
                text.to_string(),
                choices.iter().map(|c| c.to_string()).collect(),
            ),
        };
        self.check(&value)?;
        Ok(value)
    }

    fn enum_value(&self, selected: &str) -> SettingValue {
        let choices = match self.kind {
            OptionKind::Enum(choices) => choices.iter().map(|c| c.to_string()).collect(),
            _ => Vec::new(),
        };
        SettingValue::Enum(selected.to_string(), choices)
    }
}

impl Setup {
    /// Reads one option.
    pub fn get_option(&self, id: &str) -> ConfigResult<SettingValue> {
        let spec = option_spec(id)?;
        let value = match id {
            "tool.number" => SettingValue::Integer(i64::from(self.tool.number)),
            "tool.diameter" => SettingValue::Float(self.tool.diameter),
            "tool.speed" => SettingValue::Integer(i64::from(self.tool.speed)),
            "tool.rate_h" => SettingValue::Integer(i64::from(self.tool.rate_h)),
            "tool.rate_v" => SettingValue::Integer(i64::from(self.tool.rate_v)),
            "mill.active" => SettingValue::Boolean(self.mill.active),
            "mill.depth" => SettingValue::Float(self.mill.depth),
            "mill.step" => SettingValue::Float(self.mill.step),
            "mill.helix_mode" => SettingValue::Boolean(self.mill.helix_mode),
            "mill.fast_move_z" => SettingValue::Float(self.mill.fast_move_z),
            "mill.small_circles" => SettingValue::Boolean(self.mill.small_circles),
            "mill.back_home" => SettingValue::Boolean(self.mill.back_home),
            "mill.g64" => SettingValue::Float(self.mill.g64),
            "pockets.active" => SettingValue::Boolean(self.pockets.active),
            "pockets.stepover" => SettingValue::Float(self.pockets.stepover),
            "machine.unit" => spec.enum_value(&self.machine.unit.to_string()),
            "machine.plugin" => spec.enum_value(&self.machine.plugin),
            "machine.comments" => SettingValue::Boolean(self.machine.comments),
            "machine.arc_mode_r" => SettingValue::Boolean(self.machine.arc_mode_r),
            "workpiece.zero" => spec.enum_value(self.workpiece.zero.as_str()),
            "workpiece.mirror_x" => SettingValue::Boolean(self.workpiece.mirror_x),
            "workpiece.mirror_y" => SettingValue::Boolean(self.workpiece.mirror_y),
            _ => return Err(ConfigError::UnknownOption(id.to_string())),
        };
        Ok(value)
    }

    /// Writes one option after checking its kind and range.
    pub fn set_option(&mut self, id: &str, value: SettingValue) -> ConfigResult<()> {
        let spec = option_spec(id)?;
        spec.check(&value)?;

        match (id, value) {
            ("tool.number", SettingValue::Integer(v)) => self.tool.number = to_u32(id, v)?,
            ("tool.diameter", SettingValue::Float(v)) => self.tool.diameter = v,
            ("tool.speed", SettingValue::Integer(v)) => self.tool.speed = to_u32(id, v)?,
            ("tool.rate_h", SettingValue::Integer(v)) => self.tool.rate_h = to_u32(id, v)?,
            ("tool.rate_v", SettingValue::Integer(v)) => self.tool.rate_v = to_u32(id, v)?,
            ("mill.active", SettingValue::Boolean(v)) => self.mill.active = v,
            ("mill.depth", SettingValue::Float(v)) => {
                self.mill.depth = v;
                self.clamp();
            }
            ("mill.step", SettingValue::Float(v)) => {
                self.mill.step = v;
                self.clamp();
            }
            ("mill.helix_mode", SettingValue::Boolean(v)) => self.mill.helix_mode = v,
            ("mill.fast_move_z", SettingValue::Float(v)) => self.mill.fast_move_z = v,
            ("mill.small_circles", SettingValue::Boolean(v)) => self.mill.small_circles = v,
            ("mill.back_home", SettingValue::Boolean(v)) => self.mill.back_home = v,
            ("mill.g64", SettingValue::Float(v)) => self.mill.g64 = v,
            ("pockets.active", SettingValue::Boolean(v)) => self.pockets.active = v,
            ("pockets.stepover", SettingValue::Float(v)) => self.pockets.stepover = v,
            ("machine.unit", SettingValue::Enum(v, _)) => {
                self.machine.unit = v.parse::<Unit>().map_err(|_| ConfigError::ValueOutOfRange {
                    key: id.to_string(),
                    value: v.clone(),
                })?
            }
            ("machine.plugin", SettingValue::Enum(v, _)) => self.machine.plugin = v,
            ("machine.comments", SettingValue::Boolean(v)) => self.machine.comments = v,
            ("machine.arc_mode_r", SettingValue::Boolean(v)) => self.machine.arc_mode_r = v,
            ("workpiece.zero", SettingValue::Enum(v, _)) => {
                self.workpiece.zero = v.parse::<WorkpieceZero>()?
            }
            ("workpiece.mirror_x", SettingValue::Boolean(v)) => self.workpiece.mirror_x = v,
            ("workpiece.mirror_y", SettingValue::Boolean(v)) => self.workpiece.mirror_y = v,
            (_, value) => {
                return Err(ConfigError::TypeMismatch {
                    key: id.to_string(),
                    expected: value.kind_name(),
                })
            }
        }
        Ok(())
    }

    /// Parses `text` for option `id` and writes it.
    pub fn set_option_str(&mut self, id: &str, text: &str) -> ConfigResult<()> {
        let value = option_spec(id)?.parse(text)?;
        self.set_option(id, value)
    }
}

fn to_u32(id: &str, value: i64) -> ConfigResult<u32> {
    u32::try_from(value).map_err(|_| ConfigError::ValueOutOfRange {
        key: id.to_string(),
        value: value.to_string(),
    })
}
