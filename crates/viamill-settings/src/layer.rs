//! Milling parameters embedded in drawing layer names.
//!
//! A layer called `IGNORE:...` is never machined. A layer whose name starts
//! with `MILL:` carries `KEY:VALUE` pairs, e.g. `MILL:1 MD:2.5 SD:0.5 FXY:800`:
//!
//! | key | effect |
//! |---|---|
//! | `MILL` | `1` activates, anything else deactivates |
//! | `MILLDEPTH`, `MD` | target depth (always negative) |
//! | `SLICEDEPTH`, `SD` | depth step (always negative) |
//! | `FEEDXY`, `FXY` | horizontal feed rate |
//! | `FEEDZ`, `FZ` | vertical feed rate |

use crate::config::ObjectSetup;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

static LAYER_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([a-zA-Z]+):\s*([+-]?([0-9]+([.][0-9]*)?|[.][0-9]+))")
        .expect("invalid layer directive regex")
});

/// A single instruction parsed from a layer name.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerDirective {
    /// `IGNORE:` layer
    Ignore,
    Active(bool),
    Depth(f64),
    Step(f64),
    FeedXy(u32),
    FeedZ(u32),
}

/// Parses the directives carried by a layer name.
///
/// Unknown keys and unparsable values are skipped.
pub fn parse_layer_directives(layer: &str) -> Vec<LayerDirective> {
    if layer.starts_with("IGNORE:") {
        return vec![LayerDirective::Ignore];
    }
    if !layer.starts_with("MILL:") {
        return Vec::new();
    }

    let mut directives = Vec::new();
    for caps in LAYER_PAIR.captures_iter(layer) {
        let key = caps[1].to_uppercase();
        let raw = &caps[2];
        let Ok(value) = raw.parse::<f64>() else {
            continue;
        };
        let directive = match key.as_str() {
            "MILL" => LayerDirective::Active(raw == "1"),
            "MILLDEPTH" | "MD" => LayerDirective::Depth(-value.abs()),
            "SLICEDEPTH" | "SD" => LayerDirective::Step(-value.abs()),
            "FEEDXY" | "FXY" => LayerDirective::FeedXy(feed(value)),
            "FEEDZ" | "FZ" => LayerDirective::FeedZ(feed(value)),
            _ => {
                warn!("Unknown layer directive {} in layer '{}'", key, layer);
                continue;
            }
        };
        directives.push(directive);
    }
    directives
}

/// Applies the directives of `layer` to an object's setup copy.
///
/// Returns true when at least one directive was applied.
pub fn apply_layer_directives(layer: &str, setup: &mut ObjectSetup) -> bool {
    let directives = parse_layer_directives(layer);
    if directives.is_empty() {
        return false;
    }

    for directive in &directives {
        match *directive {
            LayerDirective::Ignore => setup.mill.active = false,
            LayerDirective::Active(active) => setup.mill.active = active,
            LayerDirective::Depth(depth) => setup.mill.depth = depth,
            LayerDirective::Step(step) => setup.mill.step = step,
            LayerDirective::FeedXy(rate) => setup.tool.rate_h = rate,
            LayerDirective::FeedZ(rate) => setup.tool.rate_v = rate,
        }
    }
    setup.clamp();
    debug!("Applied {} directives from layer '{}'", directives.len(), layer);
    true
}

fn feed(value: f64) -> u32 {
    // Truncation matches integer feed rates in the setup.
    value.abs().min(f64::from(u32::MAX)) as u32
}
