//! Point and vector math for line/arc contours.
//!
//! Arcs are never stored explicitly. A segment from `start` to `end` carries a
//! bulge value `b = tan(included_angle / 4)`: zero is a straight line, a
//! positive value turns counter-clockwise and a negative value clockwise.

use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

/// Per-axis tolerance used by [`fuzzy_match`].
pub const FUZZY_TOLERANCE: f64 = 0.005;

/// Cross products below this are treated as collinear by [`is_between`].
const COLLINEAR_EPSILON: f64 = 1e-9;

/// A point in drawing space. Z is carried along but ignored by the 2D predicates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "(f64, f64, f64)", into = "(f64, f64, f64)")]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    /// Creates a new point.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Creates a point on the Z=0 plane.
    pub const fn xy(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }

    /// Returns true when every coordinate is finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<(f64, f64, f64)> for Point3 {
    fn from((x, y, z): (f64, f64, f64)) -> Self {
        Self { x, y, z }
    }
}

impl From<(f64, f64)> for Point3 {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y, z: 0.0 }
    }
}

impl From<Point3> for (f64, f64, f64) {
    fn from(p: Point3) -> Self {
        (p.x, p.y, p.z)
    }
}

/// One vertex of a bulge polyline. `bulge` describes the segment that starts here.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PathVertex {
    pub x: f64,
    pub y: f64,
    pub bulge: f64,
}

impl PathVertex {
    pub const fn new(x: f64, y: f64, bulge: f64) -> Self {
        Self { x, y, bulge }
    }

    /// The vertex position on the Z=0 plane.
    pub fn point(&self) -> Point3 {
        Point3::xy(self.x, self.y)
    }
}

/// Circle data reconstructed from a bulge segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcGeometry {
    pub center: Point3,
    /// Angle of the counter-clockwise start of the arc, seen from `center`.
    pub start_angle: f64,
    /// Angle of the counter-clockwise end of the arc, seen from `center`.
    pub end_angle: f64,
    pub radius: f64,
}

/// Direction of the line from `p1` to `p2` in radians, `atan2(dy, dx)`.
///
/// Swapping the endpoints yields `angle - π` for lines pointing up and
/// `angle + π` for lines pointing down; it is not a sign flip.
pub fn angle_of_line(p1: Point3, p2: Point3) -> f64 {
    (p2.y - p1.y).atan2(p2.x - p1.x)
}

/// True when both points agree on X and on Y within [`FUZZY_TOLERANCE`].
pub fn fuzzy_match(p1: Point3, p2: Point3) -> bool {
    (p1.x - p2.x).abs() < FUZZY_TOLERANCE && (p1.y - p2.y).abs() < FUZZY_TOLERANCE
}

/// Euclidean distance in the XY plane.
pub fn distance(p1: Point3, p2: Point3) -> f64 {
    (p2.x - p1.x).hypot(p2.y - p1.y)
}

/// True when `p` lies on the closed segment `a`-`b`.
pub fn is_between(p: Point3, a: Point3, b: Point3) -> bool {
    let cross = (p.y - a.y) * (b.x - a.x) - (p.x - a.x) * (b.y - a.y);
    if cross.abs() > COLLINEAR_EPSILON {
        return false;
    }

    let dot = (p.x - a.x) * (b.x - a.x) + (p.y - a.y) * (b.y - a.y);
    if dot < 0.0 {
        return false;
    }

    let squared_length = (b.x - a.x).powi(2) + (b.y - a.y).powi(2);
    dot <= squared_length
}

/// Reconstructs the circle behind a bulge segment.
///
/// Returns `None` for straight segments (`bulge == 0`).
pub fn bulge_to_arc(start: Point3, end: Point3, bulge: f64) -> Option<ArcGeometry> {
    if bulge == 0.0 {
        return None;
    }

    let signed_radius = distance(start, end) * (1.0 + bulge * bulge) / 4.0 / bulge;
    let direction = angle_of_line(start, end) + (FRAC_PI_2 - bulge.atan() * 2.0);
    let center = Point3::new(
        start.x + signed_radius * direction.cos(),
        start.y + signed_radius * direction.sin(),
        start.z,
    );

    let (start_angle, end_angle) = if bulge < 0.0 {
        (angle_of_line(center, end), angle_of_line(center, start))
    } else {
        (angle_of_line(center, start), angle_of_line(center, end))
    };

    Some(ArcGeometry {
        center,
        start_angle,
        end_angle,
        radius: signed_radius.abs(),
    })
}

/// Signed area enclosed by a bulge polyline, positive when counter-clockwise.
///
/// Open polylines are measured as if closed by a straight chord.
pub fn signed_area(vertices: &[PathVertex], closed: bool) -> f64 {
    let count = vertices.len();
    if count < 2 {
        return 0.0;
    }

    let mut area = 0.0;
    for (i, v1) in vertices.iter().enumerate() {
        let v2 = &vertices[(i + 1) % count];
        area += (v1.x * v2.y - v2.x * v1.y) / 2.0;

        let is_last = i + 1 == count;
        if v1.bulge != 0.0 && (closed || !is_last) {
            let chord = distance(v1.point(), v2.point());
            let sweep = 4.0 * v1.bulge.abs().atan();
            let radius = chord / (2.0 * (sweep / 2.0).sin());
            let segment_area = radius * radius / 2.0 * (sweep - sweep.sin());
            area += segment_area.copysign(v1.bulge);
        }
    }
    area
}

/// Even-odd ray casting test of `point` against a closed chain of vertices.
///
/// Arcs are represented by their chords; callers pass segment start points.
pub fn point_in_polygon(polygon: &[Point3], point: Point3) -> bool {
    let count = polygon.len();
    if count < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = count - 1;
    for i in 0..count {
        let pi = polygon[i];
        let pj = polygon[j];
        if (pi.y > point.y) != (pj.y > point.y)
            && point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn test_angle_of_line_fixture() {
        let a = Point3::xy(123.0, 345.0);
        let b = Point3::xy(678.0, 890.0);
        assert_eq!(angle_of_line(a, b), 0.7763075047323885);
        assert_eq!(angle_of_line(b, a), -2.3652851488574047);
        assert_close(angle_of_line(b, a), angle_of_line(a, b) - PI);
    }

    #[test]
    fn test_fuzzy_match_fixture() {
        let reference = Point3::xy(123.002, 345.001);
        assert!(fuzzy_match(Point3::xy(123.001, 345.002), reference));
        assert!(!fuzzy_match(Point3::xy(123.009, 345.002), reference));
        assert!(!fuzzy_match(Point3::xy(123.001, 345.009), reference));
    }

    #[test]
    fn test_fuzzy_match_ignores_z() {
        assert!(fuzzy_match(
            Point3::new(1.0, 2.0, 0.0),
            Point3::new(1.0, 2.0, -5.0)
        ));
    }

    #[test]
    fn test_distance_fixture() {
        let a = Point3::xy(123.0, 345.0);
        let b = Point3::xy(678.0, 890.0);
        assert!((distance(a, b) - 777.84960).abs() < 1e-5);
        assert_eq!(distance(a, b), distance(b, a));
    }

    #[test]
    fn test_is_between_fixture() {
        let a = Point3::xy(100.0, 100.0);
        let b = Point3::xy(300.0, 300.0);
        assert!(is_between(Point3::xy(200.0, 200.0), a, b));
        assert!(!is_between(Point3::xy(200.001, 200.0), a, b));
        assert!(is_between(a, a, b));
        assert!(!is_between(Point3::xy(400.0, 400.0), a, b));
        assert!(!is_between(Point3::xy(0.0, 0.0), a, b));
    }

    #[test]
    fn test_bulge_to_arc_semicircles() {
        let start = Point3::xy(0.0, 0.0);
        let end = Point3::xy(2.0, 0.0);

        let ccw = bulge_to_arc(start, end, 1.0).unwrap();
        assert_close(ccw.center.x, 1.0);
        assert_close(ccw.center.y, 0.0);
        assert_close(ccw.radius, 1.0);
        assert_close(ccw.start_angle, PI);

        let cw = bulge_to_arc(start, end, -1.0).unwrap();
        assert_close(cw.center.x, 1.0);
        assert_close(cw.center.y, 0.0);
        assert_close(cw.radius, 1.0);
        assert_close(cw.end_angle, PI);
    }

    #[test]
    fn test_bulge_to_arc_quarter_circle() {
        // 90 degree counter-clockwise arc around the origin
        let bulge = (PI / 8.0).tan();
        let arc = bulge_to_arc(Point3::xy(10.0, 0.0), Point3::xy(0.0, 10.0), bulge).unwrap();
        assert_close(arc.center.x, 0.0);
        assert_close(arc.center.y, 0.0);
        assert_close(arc.radius, 10.0);
    }

    #[test]
    fn test_bulge_to_arc_line_is_none() {
        assert!(bulge_to_arc(Point3::xy(0.0, 0.0), Point3::xy(1.0, 0.0), 0.0).is_none());
    }

    #[test]
    fn test_signed_area_orientation() {
        let ccw = [
            PathVertex::new(0.0, 0.0, 0.0),
            PathVertex::new(10.0, 0.0, 0.0),
            PathVertex::new(10.0, 10.0, 0.0),
            PathVertex::new(0.0, 10.0, 0.0),
        ];
        assert_close(signed_area(&ccw, true), 100.0);

        let mut cw = ccw;
        cw.reverse();
        assert_close(signed_area(&cw, true), -100.0);
    }

    #[test]
    fn test_signed_area_circle_from_two_arcs() {
        let circle = [
            PathVertex::new(-5.0, 0.0, 1.0),
            PathVertex::new(5.0, 0.0, 1.0),
        ];
        assert!((signed_area(&circle, true) - PI * 25.0).abs() < 1e-6);
    }

    #[test]
    fn test_point_in_polygon_fixture() {
        let quad = [
            Point3::xy(10.0, 90.0),
            Point3::xy(0.0, 0.0),
            Point3::xy(110.0, -10.0),
            Point3::xy(120.0, 80.0),
        ];
        assert!(point_in_polygon(&quad, Point3::xy(20.0, 70.0)));

        let triangle = [
            Point3::xy(20.0, 70.0),
            Point3::xy(20.0, 10.0),
            Point3::xy(80.0, 70.0),
        ];
        assert!(!point_in_polygon(&triangle, Point3::xy(10.0, 90.0)));
    }

    #[test]
    fn test_point_serializes_as_tuple() {
        let json = serde_json::to_string(&Point3::new(1.0, 2.0, 3.0)).unwrap();
        assert_eq!(json, "[1.0,2.0,3.0]");
        let back: Point3 = serde_json::from_str("[4.5, 5.5, 0.0]").unwrap();
        assert_eq!(back, Point3::xy(4.5, 5.5));
    }
}
