//! viamill settings
//!
//! Machining setup (tool, mill, pockets, machine, workpiece), JSON/TOML
//! persistence, the typed option table and layer-name directives.

pub mod config;
pub mod error;
pub mod layer;
pub mod schema;

pub use config::{
    MachineSetup, MillSetup, ObjectSetup, PocketSetup, Setup, ToolSetup, Unit, WorkpieceSetup,
    WorkpieceZero, MIN_DEPTH_STEP,
};
pub use error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
pub use layer::{apply_layer_directives, parse_layer_directives, LayerDirective};
pub use schema::{option_spec, OptionKind, OptionSpec, SettingValue, OPTIONS};
