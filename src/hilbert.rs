//! Hilbert curve sort key over the fixed-point coordinate plane.
//!
//! The Hilbert curve maps 2D coordinates to a 1D index while preserving
//! spatial locality, which makes it a good clustering key when packing leaf
//! pages: records adjacent on the curve end up in the same page. The code is
//! used only as a sort key during the bulk build.

use crate::coordinate::FixedCoordinate;

/// Grid span added to latitudes to shift them into unsigned range.
const LAT_SHIFT: i64 = 90_000_000;
/// Grid span added to longitudes to shift them into unsigned range.
const LON_SHIFT: i64 = 180_000_000;

/// Encodes a fixed-point coordinate to its 64-bit Hilbert index on the full
/// 2^32 x 2^32 grid.
pub fn hilbert_code(coord: FixedCoordinate) -> u64 {
    let x = (i64::from(coord.lat) + LAT_SHIFT) as u32;
    let y = (i64::from(coord.lon) + LON_SHIFT) as u32;
    xy2d(u64::from(x), u64::from(y))
}

/// Converts grid coordinates to a distance along the Hilbert curve using the
/// standard rotate-and-reflect recurrence at order 32.
fn xy2d(mut x: u64, mut y: u64) -> u64 {
    let mut d = 0u64;
    let mut s = 1u64 << 31;

    while s > 0 {
        let rx = u64::from(x & s > 0);
        let ry = u64::from(y & s > 0);
        d = d.wrapping_add(s.wrapping_mul(s).wrapping_mul((3 * rx) ^ ry));
        rotate(s, &mut x, &mut y, rx, ry);
        s /= 2;
    }

    d
}

/// Rotates and reflects the quadrant frame for the next recursion level.
fn rotate(n: u64, x: &mut u64, y: &mut u64, rx: u64, ry: u64) {
    if ry == 0 {
        if rx == 1 {
            *x = n.wrapping_sub(1).wrapping_sub(*x);
            *y = n.wrapping_sub(1).wrapping_sub(*y);
        }
        std::mem::swap(x, y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let c = FixedCoordinate::from_degrees(52.5, 13.4);
        assert_eq!(hilbert_code(c), hilbert_code(c));
    }

    #[test]
    fn test_distinct_corners() {
        let mut codes = vec![
            hilbert_code(FixedCoordinate::from_degrees(-80.0, -170.0)),
            hilbert_code(FixedCoordinate::from_degrees(-80.0, 170.0)),
            hilbert_code(FixedCoordinate::from_degrees(80.0, -170.0)),
            hilbert_code(FixedCoordinate::from_degrees(80.0, 170.0)),
        ];
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), 4);
    }

    #[test]
    fn test_spatial_locality() {
        // Points a few meters apart should sort far closer to each other
        // than to a point on another continent.
        let a = hilbert_code(FixedCoordinate::from_degrees(48.137, 11.575));
        let b = hilbert_code(FixedCoordinate::from_degrees(48.138, 11.576));
        let c = hilbert_code(FixedCoordinate::from_degrees(-33.868, 151.209));
        assert!(a.abs_diff(b) < a.abs_diff(c));
    }

    #[test]
    fn test_xy2d_unit_cells() {
        // The four lowest-order cells are visited consecutively.
        assert_eq!(xy2d(0, 0), 0);
        assert_eq!(xy2d(1, 0), 1);
        assert_eq!(xy2d(1, 1), 2);
        assert_eq!(xy2d(0, 1), 3);
    }
}
