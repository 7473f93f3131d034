//! Constants for the packed R-tree.
//!
//! The fan-in values are part of the on-disk format contract: an index built
//! with one pair cannot be read with another.

/// Children per interior tree node.
pub const BRANCHING_FACTOR: usize = 64;

/// Segment records per leaf page.
pub const LEAF_PAGE_SIZE: usize = 1024;

/// Encoded width of one tree node: the rectangle, the packed count/flag
/// word, and the child slots.
pub const TREE_NODE_BYTES: usize = 16 + 4 + 4 * BRANCHING_FACTOR;

/// Zoom level at or below which tiny connected components are ignored.
pub(crate) const TINY_CC_ZOOM_CUTOFF: u32 = 14;

/// Default segment inspection cap, as a multiple of the leaf page size.
pub(crate) const DEFAULT_MAX_CHECKED_FACTOR: usize = 4;

const _: () = assert!(BRANCHING_FACTOR > 1);
const _: () = assert!(LEAF_PAGE_SIZE > 1);
