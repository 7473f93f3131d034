//! Fixed-point geographic coordinates and the distance kernel.
//!
//! Coordinates are stored as signed 32-bit integers at a fixed scale of one
//! millionth of a degree. All distance math is an equirectangular
//! approximation: it preserves the ordering of distances at a given latitude
//! and is consistent with the rectangle bounds used for tree pruning, but the
//! returned values are not survey-grade meters.

use std::f64::consts::{FRAC_PI_4, PI};
use std::fmt;

/// Fixed-point scale: one unit is 1e-6 degrees.
pub const COORDINATE_PRECISION: f64 = 1_000_000.0;

/// Sentinel marking an unset coordinate component.
pub const INVALID_COORDINATE_VALUE: i32 = i32::MIN;

/// Slack used to suppress near-duplicate distances, in the same scale the
/// distance functions return.
pub const DISTANCE_EPSILON: f64 = 1.0;

/// Mean earth radius used by the distance approximation, in meters.
const EARTH_RADIUS_M: f64 = 6_372_797.560_856;

/// A latitude/longitude pair in fixed-point representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedCoordinate {
    pub lat: i32,
    pub lon: i32,
}

impl Default for FixedCoordinate {
    fn default() -> Self {
        FixedCoordinate {
            lat: INVALID_COORDINATE_VALUE,
            lon: INVALID_COORDINATE_VALUE,
        }
    }
}

impl FixedCoordinate {
    pub fn new(lat: i32, lon: i32) -> Self {
        FixedCoordinate { lat, lon }
    }

    /// Builds a fixed-point coordinate from degrees, rounding to the nearest
    /// representable unit.
    pub fn from_degrees(lat: f64, lon: f64) -> Self {
        FixedCoordinate {
            lat: (lat * COORDINATE_PRECISION).round() as i32,
            lon: (lon * COORDINATE_PRECISION).round() as i32,
        }
    }

    /// True when neither component carries the unset sentinel.
    pub fn is_valid(&self) -> bool {
        self.lat != INVALID_COORDINATE_VALUE && self.lon != INVALID_COORDINATE_VALUE
    }

    pub fn lat_degrees(&self) -> f64 {
        f64::from(self.lat) / COORDINATE_PRECISION
    }

    pub fn lon_degrees(&self) -> f64 {
        f64::from(self.lon) / COORDINATE_PRECISION
    }
}

impl fmt::Display for FixedCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat_degrees(), self.lon_degrees())
    }
}

/// Mercator projection of a latitude given in degrees.
pub fn lat2y(lat: f64) -> f64 {
    180.0 / PI * (FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln()
}

/// Approximate planar distance between two coordinates.
///
/// Longitudinal differences are compressed by the cosine of the mean
/// latitude, so the result is monotone with true planar distance at that
/// latitude. The same function backs both the rectangle bounds and the
/// segment scoring, which keeps the tree pruning consistent.
pub fn approx_euclidean_distance(a: FixedCoordinate, b: FixedCoordinate) -> f64 {
    debug_assert!(a.is_valid());
    debug_assert!(b.is_valid());

    let lat1 = a.lat_degrees().to_radians();
    let lon1 = a.lon_degrees().to_radians();
    let lat2 = b.lat_degrees().to_radians();
    let lon2 = b.lon_degrees().to_radians();

    let x = (lon2 - lon1) * ((lat1 + lat2) / 2.0).cos();
    let y = lat2 - lat1;
    (x * x + y * y).sqrt() * EARTH_RADIUS_M
}

/// Projects `query` onto the segment `a..b` and returns the distance to the
/// foot of the perpendicular, the foot itself, and the clamped projection
/// parameter `t` in `[0, 1]`.
///
/// The projection parameter is computed on the Mercator plane so that the
/// foot does not drift toward the poles; the foot is then interpolated in
/// fixed-point space. A degenerate segment (`a == b`) projects onto `a`.
pub fn perpendicular_distance(
    a: FixedCoordinate,
    b: FixedCoordinate,
    query: FixedCoordinate,
) -> (f64, FixedCoordinate, f64) {
    debug_assert!(query.is_valid());

    let ax = a.lon_degrees();
    let ay = lat2y(a.lat_degrees());
    let bx = b.lon_degrees();
    let by = lat2y(b.lat_degrees());
    let qx = query.lon_degrees();
    let qy = lat2y(query.lat_degrees());

    let dx = bx - ax;
    let dy = by - ay;
    let len_sq = dx * dx + dy * dy;

    let t = if len_sq > 0.0 {
        (((qx - ax) * dx + (qy - ay) * dy) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let foot = FixedCoordinate::new(
        (f64::from(a.lat) + t * f64::from(b.lat - a.lat)).round() as i32,
        (f64::from(a.lon) + t * f64::from(b.lon - a.lon)).round() as i32,
    );

    let dist = approx_euclidean_distance(query, foot);
    debug_assert!(dist >= 0.0);
    (dist, foot, t)
}

/// Equality predicate for distances, tolerating [`DISTANCE_EPSILON`] of slack.
pub fn epsilon_equal(a: f64, b: f64) -> bool {
    (a - b).abs() < DISTANCE_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_degrees_round_trip() {
        let c = FixedCoordinate::from_degrees(52.517037, 13.388860);
        assert_eq!(c.lat, 52_517_037);
        assert_eq!(c.lon, 13_388_860);
        assert!((c.lat_degrees() - 52.517037).abs() < 1e-9);
        assert!((c.lon_degrees() - 13.388860).abs() < 1e-9);
    }

    #[test]
    fn test_default_is_invalid() {
        let c = FixedCoordinate::default();
        assert!(!c.is_valid());
        assert!(FixedCoordinate::new(0, 0).is_valid());
        assert!(!FixedCoordinate::new(INVALID_COORDINATE_VALUE, 0).is_valid());
    }

    #[test]
    fn test_lat2y_monotone() {
        assert_eq!(lat2y(0.0), 0.0);
        assert!(lat2y(10.0) > lat2y(5.0));
        assert!(lat2y(-5.0) < 0.0);
        // Mercator stretches high latitudes
        assert!(lat2y(60.0) - lat2y(59.0) > lat2y(1.0) - lat2y(0.0));
    }

    #[test]
    fn test_distance_symmetric_and_zero() {
        let a = FixedCoordinate::from_degrees(48.0, 11.0);
        let b = FixedCoordinate::from_degrees(48.1, 11.1);
        assert_eq!(approx_euclidean_distance(a, a), 0.0);
        assert_eq!(
            approx_euclidean_distance(a, b),
            approx_euclidean_distance(b, a)
        );
        assert!(approx_euclidean_distance(a, b) > 0.0);
    }

    #[test]
    fn test_distance_monotone_along_axis() {
        let origin = FixedCoordinate::from_degrees(48.0, 11.0);
        let near = FixedCoordinate::from_degrees(48.0, 11.01);
        let far = FixedCoordinate::from_degrees(48.0, 11.02);
        assert!(
            approx_euclidean_distance(origin, near) < approx_euclidean_distance(origin, far)
        );
    }

    #[test]
    fn test_perpendicular_foot_midpoint() {
        let a = FixedCoordinate::from_degrees(0.0, 0.0);
        let b = FixedCoordinate::from_degrees(0.0, 1.0);
        let q = FixedCoordinate::from_degrees(0.0, 0.5);
        let (dist, foot, t) = perpendicular_distance(a, b, q);
        assert!(dist < 1e-6);
        assert_eq!(foot, FixedCoordinate::new(0, 500_000));
        assert!((t - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_perpendicular_clamps_before_start() {
        let a = FixedCoordinate::from_degrees(0.0, 0.0);
        let b = FixedCoordinate::from_degrees(0.0, 1.0);
        let q = FixedCoordinate::from_degrees(0.1, -0.5);
        let (dist, foot, t) = perpendicular_distance(a, b, q);
        assert_eq!(t, 0.0);
        assert_eq!(foot, a);
        assert_eq!(dist, approx_euclidean_distance(q, a));
    }

    #[test]
    fn test_perpendicular_clamps_past_end() {
        let a = FixedCoordinate::from_degrees(0.0, 0.0);
        let b = FixedCoordinate::from_degrees(0.0, 1.0);
        let q = FixedCoordinate::from_degrees(0.0, 1.5);
        let (_, foot, t) = perpendicular_distance(a, b, q);
        assert_eq!(t, 1.0);
        assert_eq!(foot, b);
    }

    #[test]
    fn test_perpendicular_degenerate_segment() {
        let a = FixedCoordinate::from_degrees(10.0, 10.0);
        let q = FixedCoordinate::from_degrees(10.5, 10.5);
        let (dist, foot, t) = perpendicular_distance(a, a, q);
        assert_eq!(t, 0.0);
        assert_eq!(foot, a);
        assert_eq!(dist, approx_euclidean_distance(q, a));
    }

    #[test]
    fn test_epsilon_equal() {
        assert!(epsilon_equal(100.0, 100.0));
        assert!(epsilon_equal(100.0, 100.0 + DISTANCE_EPSILON / 2.0));
        assert!(!epsilon_equal(100.0, 100.0 + 2.0 * DISTANCE_EPSILON));
    }
}
