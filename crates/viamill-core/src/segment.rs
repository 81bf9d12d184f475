//! Raw drawing segments as delivered by the drawing readers.

use crate::error::{CoreError, CoreResult};
use crate::geometry::{distance, Point3};
use serde::{Deserialize, Serialize};

/// Identifier of a contour built from chained segments.
pub type ObjectId = usize;

/// Entity type the segment originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SegmentKind {
    #[default]
    Line,
    Arc,
}

/// A straight or circular segment between two points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: Point3,
    pub end: Point3,
    /// `tan(included_angle / 4)`, 0 for straight segments.
    #[serde(default)]
    pub bulge: f64,
    #[serde(default)]
    pub layer: String,
    #[serde(default, rename = "type")]
    pub kind: SegmentKind,
    /// Owning contour, assigned by the contour builder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<ObjectId>,
}

impl Segment {
    /// Creates a segment on the given layer. The kind follows the bulge.
    pub fn new(start: Point3, end: Point3, bulge: f64, layer: impl Into<String>) -> Self {
        Self {
            start,
            end,
            bulge,
            layer: layer.into(),
            kind: if bulge == 0.0 {
                SegmentKind::Line
            } else {
                SegmentKind::Arc
            },
            object: None,
        }
    }

    /// Creates a straight segment on layer `"0"`.
    pub fn line(start: Point3, end: Point3) -> Self {
        Self::new(start, end, 0.0, "0")
    }

    /// True when the segment is a circular arc.
    pub fn is_arc(&self) -> bool {
        self.bulge != 0.0
    }

    /// Straight distance between the endpoints.
    pub fn chord_length(&self) -> f64 {
        distance(self.start, self.end)
    }

    /// Swaps the endpoints and negates the bulge so the geometry stays the same.
    pub fn reverse(&mut self) {
        std::mem::swap(&mut self.start, &mut self.end);
        self.bulge = -self.bulge;
    }

    /// Returns a reversed copy.
    pub fn reversed(&self) -> Self {
        let mut segment = self.clone();
        segment.reverse();
        segment
    }

    /// Rejects NaN and infinite values. `index` is used for the error message.
    pub fn validate(&self, index: usize) -> CoreResult<()> {
        if !self.start.is_finite() {
            return Err(CoreError::NonFinite {
                index,
                field: "start",
            });
        }
        if !self.end.is_finite() {
            return Err(CoreError::NonFinite {
                index,
                field: "end",
            });
        }
        if !self.bulge.is_finite() {
            return Err(CoreError::NonFinite {
                index,
                field: "bulge",
            });
        }
        Ok(())
    }
}
