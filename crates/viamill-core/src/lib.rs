//! # viamill core
//!
//! Geometric primitives shared by every stage of the viamill toolpath kernel:
//! 2.5D points, line/arc segments encoded with bulge values, fuzzy point
//! equality, arc reconstruction and polygon predicates, plus unit handling.

pub mod error;
pub mod geometry;
pub mod segment;
pub mod units;

pub use error::{CoreError, CoreResult};
pub use geometry::{
    angle_of_line, bulge_to_arc, distance, fuzzy_match, is_between, point_in_polygon,
    signed_area, ArcGeometry, PathVertex, Point3, FUZZY_TOLERANCE,
};
pub use segment::{ObjectId, Segment, SegmentKind};
pub use units::{Unit, INCH_TO_MM};
