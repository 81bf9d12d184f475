//! Segment Cleaner
//!
//! Drawings exported by CAD programs often contain the same edge twice,
//! edges lying on top of longer edges and degenerate zero-length entities.
//! None of these must reach the contour builder.

use tracing::debug;
use viamill_core::{fuzzy_match, is_between, Segment, FUZZY_TOLERANCE};

/// Removes duplicate, overlapping and zero-length segments.
///
/// - Two segments describing the same edge (endpoints equal as a set under
///   [`fuzzy_match`], same arc geometry) are duplicates; the later one is kept.
/// - A straight segment lying entirely on another straight segment is dropped.
/// - Segments whose endpoints coincide are dropped.
///
/// Survivors keep their relative order. Cleaning an already clean list
/// returns it unchanged.
pub fn clean_segments(segments: &[Segment]) -> Vec<Segment> {
    let count = segments.len();
    let mut keep = vec![true; count];

    for (i, segment) in segments.iter().enumerate() {
        if fuzzy_match(segment.start, segment.end) {
            keep[i] = false;
            continue;
        }
        if segments[i + 1..]
            .iter()
            .any(|later| is_duplicate(segment, later))
        {
            keep[i] = false;
        }
    }

    let mut overlapping = vec![false; count];
    for (i, segment) in segments.iter().enumerate() {
        if !keep[i] || segment.is_arc() {
            continue;
        }
        overlapping[i] = segments.iter().enumerate().any(|(j, other)| {
            j != i
                && keep[j]
                && !other.is_arc()
                && lies_on(segment, other)
                && !lies_on(other, segment)
        });
    }

    let cleaned: Vec<Segment> = segments
        .iter()
        .enumerate()
        .filter(|(i, _)| keep[*i] && !overlapping[*i])
        .map(|(_, segment)| segment.clone())
        .collect();

    debug!(
        "clean_segments: {} segments in, {} out",
        count,
        cleaned.len()
    );
    cleaned
}

fn is_duplicate(a: &Segment, b: &Segment) -> bool {
    if fuzzy_match(a.start, b.start) && fuzzy_match(a.end, b.end) {
        (a.bulge - b.bulge).abs() < FUZZY_TOLERANCE
    } else if fuzzy_match(a.start, b.end) && fuzzy_match(a.end, b.start) {
        (a.bulge + b.bulge).abs() < FUZZY_TOLERANCE
    } else {
        false
    }
}

fn lies_on(inner: &Segment, outer: &Segment) -> bool {
    is_between(inner.start, outer.start, outer.end) && is_between(inner.end, outer.start, outer.end)
}
