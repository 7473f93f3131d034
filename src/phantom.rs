//! Phantom nodes: synthetic routing vertices projected onto a segment.
//!
//! A phantom node sits at the foot of the perpendicular from a query point to
//! the chosen segment. It carries the segment's routing identifiers and its
//! forward/reverse weights pro-rated by how far along the segment the foot
//! falls, so the engine can treat it as a source or target vertex.

use crate::coordinate::{approx_euclidean_distance, FixedCoordinate};
use crate::segment::{TravelMode, INVALID_NODE_ID};

/// A synthetic graph vertex on a road segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhantomNode {
    pub forward_node_id: u32,
    pub reverse_node_id: u32,
    pub name_id: u32,
    pub forward_weight: i32,
    pub reverse_weight: i32,
    pub forward_offset: i32,
    pub reverse_offset: i32,
    pub packed_geometry_id: u32,
    /// Foot of the perpendicular on the segment.
    pub location: FixedCoordinate,
    pub fwd_segment_position: u16,
    pub forward_travel_mode: TravelMode,
    pub backward_travel_mode: TravelMode,
}

impl PhantomNode {
    /// Splits the segment weights at the phantom location.
    ///
    /// The forward weight is scaled by `min(1, d(u, location) / d(u, v))` and
    /// the reverse weight by the complement. Weights stay integral; the
    /// scaled value is truncated, and callers rely on monotonicity only. A
    /// side whose routing node is absent keeps its weight untouched.
    pub fn scale_weights(&mut self, u: FixedCoordinate, v: FixedCoordinate) {
        let along = approx_euclidean_distance(u, self.location);
        let total = approx_euclidean_distance(u, v);
        let ratio = if total > 0.0 {
            (along / total).min(1.0)
        } else {
            0.0
        };

        if self.forward_node_id != INVALID_NODE_ID {
            self.forward_weight = (f64::from(self.forward_weight) * ratio) as i32;
        }
        if self.reverse_node_id != INVALID_NODE_ID {
            self.reverse_weight = (f64::from(self.reverse_weight) * (1.0 - ratio)) as i32;
        }
    }

    /// Snaps the location onto the query coordinate when the two differ by a
    /// single fixed-point unit on an axis. Keeps repeated queries from
    /// producing via points that wander by one unit.
    pub fn snap_to_input(&mut self, input: FixedCoordinate) {
        if (input.lon - self.location.lon).abs() == 1 {
            self.location.lon = input.lon;
        }
        if (input.lat - self.location.lat).abs() == 1 {
            self.location.lat = input.lat;
        }
    }
}
