//! Axis-aligned integer rectangles in fixed-point coordinate space.
//!
//! The rectangle carries the two pruning bounds used by the best-first
//! traversal: `min_dist`, a lower bound on the distance from a query point to
//! anything inside the rectangle, and `min_max_dist`, the Roussopoulos upper
//! bound on the distance to the nearest object inside it.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::coordinate::{approx_euclidean_distance, FixedCoordinate};

/// Minimum bounding rectangle over fixed-point coordinates.
///
/// A freshly constructed rectangle has inverted bounds so that the first
/// merge or extension sets it cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RectangleInt2D {
    pub min_lat: i32,
    pub min_lon: i32,
    pub max_lat: i32,
    pub max_lon: i32,
}

impl Default for RectangleInt2D {
    fn default() -> Self {
        RectangleInt2D {
            min_lat: i32::MAX,
            min_lon: i32::MAX,
            max_lat: i32::MIN,
            max_lon: i32::MIN,
        }
    }
}

impl RectangleInt2D {
    /// Encoded width on disk: four little-endian `i32` values.
    pub const ENCODED_SIZE: usize = 16;

    pub fn new() -> Self {
        Self::default()
    }

    /// Grows the rectangle to cover `coord`.
    pub fn extend_with(&mut self, coord: FixedCoordinate) {
        self.min_lat = self.min_lat.min(coord.lat);
        self.min_lon = self.min_lon.min(coord.lon);
        self.max_lat = self.max_lat.max(coord.lat);
        self.max_lon = self.max_lon.max(coord.lon);
    }

    /// Grows the rectangle to cover `other`.
    pub fn merge(&mut self, other: &RectangleInt2D) {
        self.min_lat = self.min_lat.min(other.min_lat);
        self.min_lon = self.min_lon.min(other.min_lon);
        self.max_lat = self.max_lat.max(other.max_lat);
        self.max_lon = self.max_lon.max(other.max_lon);
    }

    /// True once at least one coordinate or rectangle has been merged in.
    pub fn is_initialized(&self) -> bool {
        self.min_lat <= self.max_lat && self.min_lon <= self.max_lon
    }

    pub fn contains(&self, coord: FixedCoordinate) -> bool {
        coord.lat >= self.min_lat
            && coord.lat <= self.max_lat
            && coord.lon >= self.min_lon
            && coord.lon <= self.max_lon
    }

    /// Corner-containment overlap test: true iff any corner of `other` lies
    /// inside `self`. Sufficient for testing against an enclosing rectangle;
    /// not a general AABB overlap predicate.
    pub fn intersects(&self, other: &RectangleInt2D) -> bool {
        self.contains(FixedCoordinate::new(other.max_lat, other.min_lon))
            || self.contains(FixedCoordinate::new(other.max_lat, other.max_lon))
            || self.contains(FixedCoordinate::new(other.min_lat, other.max_lon))
            || self.contains(FixedCoordinate::new(other.min_lat, other.min_lon))
    }

    pub fn centroid(&self) -> FixedCoordinate {
        FixedCoordinate::new(
            ((i64::from(self.min_lat) + i64::from(self.max_lat)) / 2) as i32,
            ((i64::from(self.min_lon) + i64::from(self.max_lon)) / 2) as i32,
        )
    }

    /// Lower bound on the distance from `location` to any point inside the
    /// rectangle: zero when contained, otherwise the distance to the nearest
    /// edge or corner.
    pub fn min_dist(&self, location: FixedCoordinate) -> f64 {
        if self.contains(location) {
            return 0.0;
        }
        let nearest = FixedCoordinate::new(
            location.lat.clamp(self.min_lat, self.max_lat),
            location.lon.clamp(self.min_lon, self.max_lon),
        );
        approx_euclidean_distance(location, nearest)
    }

    /// Upper bound on the distance from `location` to the nearest object
    /// inside the rectangle: for each side take the larger of its two corner
    /// distances, then take the minimum over the four sides.
    pub fn min_max_dist(&self, location: FixedCoordinate) -> f64 {
        let upper_left = FixedCoordinate::new(self.max_lat, self.min_lon);
        let upper_right = FixedCoordinate::new(self.max_lat, self.max_lon);
        let lower_right = FixedCoordinate::new(self.min_lat, self.max_lon);
        let lower_left = FixedCoordinate::new(self.min_lat, self.min_lon);

        let d_ul = approx_euclidean_distance(location, upper_left);
        let d_ur = approx_euclidean_distance(location, upper_right);
        let d_lr = approx_euclidean_distance(location, lower_right);
        let d_ll = approx_euclidean_distance(location, lower_left);

        let top = d_ul.max(d_ur);
        let right = d_ur.max(d_lr);
        let bottom = d_lr.max(d_ll);
        let left = d_ll.max(d_ul);

        top.min(right).min(bottom).min(left)
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_i32::<LittleEndian>(self.min_lat)?;
        w.write_i32::<LittleEndian>(self.min_lon)?;
        w.write_i32::<LittleEndian>(self.max_lat)?;
        w.write_i32::<LittleEndian>(self.max_lon)?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> std::io::Result<Self> {
        Ok(RectangleInt2D {
            min_lat: r.read_i32::<LittleEndian>()?,
            min_lon: r.read_i32::<LittleEndian>()?,
            max_lat: r.read_i32::<LittleEndian>()?,
            max_lon: r.read_i32::<LittleEndian>()?,
        })
    }
}
