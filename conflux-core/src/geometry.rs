//! Planar approximations of great-circle measurements.
//!
//! Conflation tolerances are a few metres, so an equirectangular projection
//! centred on the points being compared is accurate well below the snapping
//! threshold and keeps every computation closed-form.

use geo::Coord;

/// Mean Earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Where a point projects onto a segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentProjection {
    /// Distance in metres from the point to the closest point of the segment.
    pub distance_m: f64,
    /// Position of the perpendicular foot along the segment, unclamped.
    ///
    /// `0.0` is the segment start and `1.0` its end. Values outside `[0, 1]`
    /// mean the foot lies beyond an endpoint.
    pub parameter: f64,
}

impl SegmentProjection {
    /// Return `true` when the foot lies strictly between the endpoints.
    #[must_use]
    pub fn is_interior(&self) -> bool {
        self.parameter > 0.0 && self.parameter < 1.0
    }
}

#[expect(
    clippy::float_arithmetic,
    reason = "equirectangular projection is inherently floating point"
)]
fn to_plane(origin: Coord<f64>, cos_lat: f64, point: Coord<f64>) -> (f64, f64) {
    let x = (point.x - origin.x).to_radians() * cos_lat * EARTH_RADIUS_M;
    let y = (point.y - origin.y).to_radians() * EARTH_RADIUS_M;
    (x, y)
}

#[expect(
    clippy::float_arithmetic,
    reason = "mean latitude of the compared points"
)]
fn reference_cos(points: &[Coord<f64>]) -> f64 {
    let count = points.len().max(1);
    let sum: f64 = points.iter().map(|p| p.y).sum();
    let mean = sum / f64::from(u32::try_from(count).unwrap_or(u32::MAX));
    mean.to_radians().cos()
}

/// Distance in metres between two coordinates.
///
/// # Examples
///
/// ```
/// use geo::Coord;
/// use conflux_core::geometry::distance_m;
///
/// let d = distance_m(Coord { x: 0.0, y: 0.0 }, Coord { x: 0.0, y: 1.0 });
/// assert!((d - 111_195.0).abs() < 1.0);
/// ```
#[must_use]
pub fn distance_m(a: Coord<f64>, b: Coord<f64>) -> f64 {
    let cos_lat = reference_cos(&[a, b]);
    let (x, y) = to_plane(a, cos_lat, b);
    x.hypot(y)
}

/// Project `point` onto the segment from `start` to `end`.
///
/// A degenerate segment reports the distance to its single point and a
/// parameter of `0.0`.
#[must_use]
#[expect(
    clippy::float_arithmetic,
    reason = "vector projection in the local plane"
)]
pub fn project_onto_segment(
    point: Coord<f64>,
    start: Coord<f64>,
    end: Coord<f64>,
) -> SegmentProjection {
    let cos_lat = reference_cos(&[point, start, end]);
    let (px, py) = to_plane(start, cos_lat, point);
    let (ex, ey) = to_plane(start, cos_lat, end);
    let length_sq = ex.mul_add(ex, ey * ey);
    if length_sq <= f64::EPSILON {
        return SegmentProjection {
            distance_m: px.hypot(py),
            parameter: 0.0,
        };
    }
    let parameter = px.mul_add(ex, py * ey) / length_sq;
    let clamped = parameter.clamp(0.0, 1.0);
    let dx = px - clamped * ex;
    let dy = py - clamped * ey;
    SegmentProjection {
        distance_m: dx.hypot(dy),
        parameter,
    }
}

/// Shortest distance in metres from `point` to the polyline `line`.
///
/// Returns `None` for an empty polyline.
#[must_use]
pub fn distance_to_polyline_m(point: Coord<f64>, line: &[Coord<f64>]) -> Option<f64> {
    match line {
        [] => None,
        [only] => Some(distance_m(point, *only)),
        _ => line
            .windows(2)
            .filter_map(|pair| match pair {
                [a, b] => Some(project_onto_segment(point, *a, *b).distance_m),
                _ => None,
            })
            .reduce(f64::min),
    }
}

/// Undirected angle in degrees between two segments, in `[0, 90]`.
///
/// Degenerate segments have no direction and report `0.0`.
#[must_use]
#[expect(clippy::float_arithmetic, reason = "bearing comparison")]
pub fn undirected_angle_deg(
    first: (Coord<f64>, Coord<f64>),
    second: (Coord<f64>, Coord<f64>),
) -> f64 {
    let cos_lat = reference_cos(&[first.0, first.1, second.0, second.1]);
    let (ax, ay) = to_plane(first.0, cos_lat, first.1);
    let (bx, by) = to_plane(second.0, cos_lat, second.1);
    if ax.hypot(ay) <= f64::EPSILON || bx.hypot(by) <= f64::EPSILON {
        return 0.0;
    }
    let mut diff = (ay.atan2(ax) - by.atan2(bx)).to_degrees().abs() % 180.0;
    if diff > 90.0 {
        diff = 180.0 - diff;
    }
    diff
}

/// Convert a radius in metres to degree offsets `(longitude, latitude)` at
/// `origin`.
///
/// Used to build search envelopes for spatial indexes. Near the poles the
/// longitude span is capped at a full turn.
#[must_use]
#[expect(clippy::float_arithmetic, reason = "metres to degrees conversion")]
pub fn radius_in_degrees(origin: Coord<f64>, radius_m: f64) -> (f64, f64) {
    let lat = (radius_m / EARTH_RADIUS_M).to_degrees();
    let cos_lat = origin.y.to_radians().cos().abs();
    let lon = if cos_lat <= f64::EPSILON {
        360.0
    } else {
        (lat / cos_lat).min(360.0)
    };
    (lon, lat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn c(x: f64, y: f64) -> Coord<f64> {
        Coord { x, y }
    }

    #[rstest]
    fn one_degree_of_latitude_is_about_111_km() {
        let d = distance_m(c(0.0, 0.0), c(0.0, 1.0));
        assert!((d - 111_195.08).abs() < 0.5, "unexpected distance {d}");
    }

    #[rstest]
    #[case(c(0.00004, 0.5), true)]
    #[case(c(0.0001, 0.5), false)]
    fn offsets_from_a_meridian_segment(#[case] point: Coord<f64>, #[case] within_five_m: bool) {
        let projection = project_onto_segment(point, c(0.0, 0.0), c(0.0, 1.0));
        assert_eq!(projection.distance_m <= 5.0, within_five_m);
        assert!(projection.is_interior());
    }

    #[rstest]
    fn projection_beyond_endpoint_is_not_interior() {
        let projection = project_onto_segment(c(0.0, 2.0), c(0.0, 0.0), c(0.0, 1.0));
        assert!(projection.parameter > 1.0);
        assert!(!projection.is_interior());
        assert!((projection.distance_m - 111_195.08).abs() < 0.5);
    }

    #[rstest]
    #[case((c(0.0, 0.0), c(1.0, 0.0)), (c(1.0, 0.0), c(0.0, 0.0)), 0.0)]
    #[case((c(0.0, 0.0), c(1.0, 0.0)), (c(0.0, 0.0), c(0.0, 1.0)), 90.0)]
    fn angle_ignores_direction(
        #[case] first: (Coord<f64>, Coord<f64>),
        #[case] second: (Coord<f64>, Coord<f64>),
        #[case] expected: f64,
    ) {
        let angle = undirected_angle_deg(first, second);
        assert!((angle - expected).abs() < 1e-6, "angle {angle}");
    }

    #[rstest]
    fn polyline_distance_takes_nearest_segment() {
        let line = [c(0.0, 0.0), c(0.0, 1.0), c(1.0, 1.0)];
        let d = distance_to_polyline_m(c(0.5, 1.0), &line).expect("non-empty line");
        assert!(d < 1e-6);
        assert!(distance_to_polyline_m(c(0.0, 0.0), &[]).is_none());
    }
}
