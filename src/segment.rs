//! Segment records stored in the index.
//!
//! The tree is generic over the record it stores. Aside from the on-disk
//! codec, the index itself only ever looks at the two endpoint indices, the
//! tiny-component flag, and the centroid; everything else in the record is
//! opaque payload carried through to the caller.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::coordinate::FixedCoordinate;

/// Travel mode identifier carried through to the routing engine.
pub type TravelMode = u8;

/// Travel mode of a direction that cannot be used.
pub const TRAVEL_MODE_INACCESSIBLE: TravelMode = 0;

/// Sentinel for a missing routing node on one side of a segment.
pub const INVALID_NODE_ID: u32 = u32::MAX;

/// A record that can be bulk-loaded into the spatial index.
///
/// Records are value types copied into fixed-size leaf pages; the codec must
/// write exactly [`ENCODED_SIZE`](IndexedSegment::ENCODED_SIZE) bytes so that
/// page offsets are reproducible across build and load.
pub trait IndexedSegment: Copy + Default {
    /// Exact number of bytes written by [`write_to`](IndexedSegment::write_to).
    const ENCODED_SIZE: usize;

    /// Index of the first endpoint in the coordinate table.
    fn source(&self) -> u32;

    /// Index of the second endpoint in the coordinate table.
    fn target(&self) -> u32;

    /// True when the segment belongs to a small connected component of the
    /// road graph.
    fn is_in_tiny_cc(&self) -> bool;

    /// Midpoint of the two endpoint coordinates.
    fn centroid(u: FixedCoordinate, v: FixedCoordinate) -> FixedCoordinate {
        FixedCoordinate::new(
            ((i64::from(u.lat) + i64::from(v.lat)) / 2) as i32,
            ((i64::from(u.lon) + i64::from(v.lon)) / 2) as i32,
        )
    }

    fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()>;

    fn read_from<R: Read>(r: &mut R) -> std::io::Result<Self>;
}

/// The production segment record: one directed pair of routing nodes with
/// weights, name and geometry references, and component membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoadSegment {
    /// Endpoint node indices into the coordinate table.
    pub u: u32,
    pub v: u32,
    /// Edge-based routing node ids; [`INVALID_NODE_ID`] when absent.
    pub forward_node_id: u32,
    pub reverse_node_id: u32,
    pub name_id: u32,
    pub forward_weight: i32,
    pub reverse_weight: i32,
    pub forward_offset: i32,
    pub reverse_offset: i32,
    pub packed_geometry_id: u32,
    /// Position of this segment within its parent edge geometry.
    pub fwd_segment_position: u16,
    pub forward_travel_mode: TravelMode,
    pub backward_travel_mode: TravelMode,
    pub is_in_tiny_cc: bool,
}

impl IndexedSegment for RoadSegment {
    const ENCODED_SIZE: usize = 45;

    fn source(&self) -> u32 {
        self.u
    }

    fn target(&self) -> u32 {
        self.v
    }

    fn is_in_tiny_cc(&self) -> bool {
        self.is_in_tiny_cc
    }

    fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_u32::<LittleEndian>(self.u)?;
        w.write_u32::<LittleEndian>(self.v)?;
        w.write_u32::<LittleEndian>(self.forward_node_id)?;
        w.write_u32::<LittleEndian>(self.reverse_node_id)?;
        w.write_u32::<LittleEndian>(self.name_id)?;
        w.write_i32::<LittleEndian>(self.forward_weight)?;
        w.write_i32::<LittleEndian>(self.reverse_weight)?;
        w.write_i32::<LittleEndian>(self.forward_offset)?;
        w.write_i32::<LittleEndian>(self.reverse_offset)?;
        w.write_u32::<LittleEndian>(self.packed_geometry_id)?;
        w.write_u16::<LittleEndian>(self.fwd_segment_position)?;
        w.write_u8(self.forward_travel_mode)?;
        w.write_u8(self.backward_travel_mode)?;
        w.write_u8(u8::from(self.is_in_tiny_cc))?;
        Ok(())
    }

    fn read_from<R: Read>(r: &mut R) -> std::io::Result<Self> {
        Ok(RoadSegment {
            u: r.read_u32::<LittleEndian>()?,
            v: r.read_u32::<LittleEndian>()?,
            forward_node_id: r.read_u32::<LittleEndian>()?,
            reverse_node_id: r.read_u32::<LittleEndian>()?,
            name_id: r.read_u32::<LittleEndian>()?,
            forward_weight: r.read_i32::<LittleEndian>()?,
            reverse_weight: r.read_i32::<LittleEndian>()?,
            forward_offset: r.read_i32::<LittleEndian>()?,
            reverse_offset: r.read_i32::<LittleEndian>()?,
            packed_geometry_id: r.read_u32::<LittleEndian>()?,
            fwd_segment_position: r.read_u16::<LittleEndian>()?,
            forward_travel_mode: r.read_u8()?,
            backward_travel_mode: r.read_u8()?,
            is_in_tiny_cc: r.read_u8()? != 0,
        })
    }
}
