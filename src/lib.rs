//! # viamill
//!
//! A CNC toolpath kernel for 2D drawings: cleans segment soups, chains them
//! into contours, works out nesting and cutter side, offsets by the tool
//! radius, clears pockets and sequences the paths into depth-stepped moves
//! for a G-code post-processor.
//!
//! ## Architecture
//!
//! 1. **viamill-core** - Points, bulge segments, geometric predicates, units
//! 2. **viamill-settings** - Machining setup, option table, layer directives
//! 3. **viamill-camtools** - Cleaner, contour builder, nesting, offsets,
//!    sequencer, post-processors and the recalculation pipeline
//! 4. **viamill** - Command line front end

use anyhow::Context;

pub use viamill_camtools::{
    post_processor_for, recalculate, CamToolError, CamToolResult, LinuxCncPost, MachinePlan,
    MotionCommand, PlanEntry, PostProcessor, Project, RecalcResult, Recalculator,
};
pub use viamill_core::{PathVertex, Point3, Segment, SegmentKind, Unit};
pub use viamill_settings::{Setup, SettingValue, SettingsError, WorkpieceZero};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging
///
/// Log lines go to stderr so program text written to stdout stays clean.
/// `RUST_LOG` adds to the default level, which is `info` when `verbose` is
/// set and `warn` otherwise.
pub fn init_logging(verbose: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let level = if verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    let env_filter = EnvFilter::from_default_env().add_directive(level.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_names(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .context("failed to install the tracing subscriber")?;

    Ok(())
}
