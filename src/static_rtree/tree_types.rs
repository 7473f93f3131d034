//! Node and error types for the packed R-tree.

use std::cmp::Ordering;
use std::io::{Read, Write};
use std::path::PathBuf;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;

use crate::rectangle::RectangleInt2D;
use crate::segment::IndexedSegment;

use super::tree_constants::{BRANCHING_FACTOR, LEAF_PAGE_SIZE};

/// Errors raised while building or opening an index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index file does not exist: {0}")]
    MissingArtifact(PathBuf),

    #[error("index file is empty: {0}")]
    EmptyArtifact(PathBuf),

    #[error("cannot build an index from zero segments")]
    EmptyInput,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;

/// One node of the in-memory search tree.
///
/// A node either points at a leaf page on disk (`child_is_on_disk`, with the
/// page index in `children[0]`) or carries up to [`BRANCHING_FACTOR`] child
/// node indices. The child array has fixed capacity so the node is a plain
/// value type with a reproducible encoded width.
#[derive(Debug, Clone, Copy)]
pub struct TreeNode {
    pub mbr: RectangleInt2D,
    pub child_count: u32,
    pub child_is_on_disk: bool,
    pub children: [u32; BRANCHING_FACTOR],
}

impl Default for TreeNode {
    fn default() -> Self {
        TreeNode {
            mbr: RectangleInt2D::new(),
            child_count: 0,
            child_is_on_disk: false,
            children: [0; BRANCHING_FACTOR],
        }
    }
}

impl TreeNode {
    pub fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        self.mbr.write_to(w)?;
        let packed = (self.child_count & 0x7FFF_FFFF) | (u32::from(self.child_is_on_disk) << 31);
        w.write_u32::<LittleEndian>(packed)?;
        for &child in &self.children {
            w.write_u32::<LittleEndian>(child)?;
        }
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> std::io::Result<Self> {
        let mbr = RectangleInt2D::read_from(r)?;
        let packed = r.read_u32::<LittleEndian>()?;
        let mut children = [0u32; BRANCHING_FACTOR];
        for child in children.iter_mut() {
            *child = r.read_u32::<LittleEndian>()?;
        }
        Ok(TreeNode {
            mbr,
            child_count: packed & 0x7FFF_FFFF,
            child_is_on_disk: packed >> 31 == 1,
            children,
        })
    }
}

/// One leaf page: a fixed-capacity block of segment records.
#[derive(Debug, Clone, Copy)]
pub struct LeafNode<S: IndexedSegment> {
    pub object_count: u32,
    pub objects: [S; LEAF_PAGE_SIZE],
}

impl<S: IndexedSegment> Default for LeafNode<S> {
    fn default() -> Self {
        LeafNode {
            object_count: 0,
            objects: [S::default(); LEAF_PAGE_SIZE],
        }
    }
}

impl<S: IndexedSegment> LeafNode<S> {
    /// Encoded width of one leaf page for this record type.
    pub const ENCODED_SIZE: usize = 4 + LEAF_PAGE_SIZE * S::ENCODED_SIZE;

    /// The populated prefix of the page.
    pub fn objects(&self) -> &[S] {
        &self.objects[..self.object_count as usize]
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_u32::<LittleEndian>(self.object_count)?;
        for obj in &self.objects {
            obj.write_to(w)?;
        }
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> std::io::Result<Self> {
        let object_count = r.read_u32::<LittleEndian>()?;
        let mut objects = [S::default(); LEAF_PAGE_SIZE];
        for obj in objects.iter_mut() {
            *obj = S::read_from(r)?;
        }
        Ok(LeafNode {
            object_count,
            objects,
        })
    }
}

/// Priority-queue entry for the node-only traversal, ordered so that the
/// smallest `min_dist` is popped first.
#[derive(Debug, Clone, Copy)]
pub(crate) struct QueryCandidate {
    pub min_dist: f64,
    pub node_id: u32,
}

impl QueryCandidate {
    pub fn new(min_dist: f64, node_id: u32) -> Self {
        QueryCandidate { min_dist, node_id }
    }
}

impl PartialEq for QueryCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.min_dist == other.min_dist
    }
}

impl Eq for QueryCandidate {}

impl PartialOrd for QueryCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueryCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the std max-heap behaves as a min-heap.
        other
            .min_dist
            .partial_cmp(&self.min_dist)
            .unwrap_or(Ordering::Equal)
    }
}

/// What an incremental traversal entry refers to: a tree node by index, or a
/// concrete segment lifted out of a leaf page.
#[derive(Debug, Clone, Copy)]
pub(crate) enum QueryEntry<S> {
    Node(u32),
    Segment(S),
}

/// Priority-queue entry for the incremental traversal.
#[derive(Debug, Clone, Copy)]
pub(crate) struct IncrementalCandidate<S> {
    pub min_dist: f64,
    pub entry: QueryEntry<S>,
}

impl<S> IncrementalCandidate<S> {
    pub fn new(min_dist: f64, entry: QueryEntry<S>) -> Self {
        IncrementalCandidate { min_dist, entry }
    }
}

impl<S> PartialEq for IncrementalCandidate<S> {
    fn eq(&self, other: &Self) -> bool {
        self.min_dist == other.min_dist
    }
}

impl<S> Eq for IncrementalCandidate<S> {}

impl<S> PartialOrd for IncrementalCandidate<S> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<S> Ord for IncrementalCandidate<S> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .min_dist
            .partial_cmp(&self.min_dist)
            .unwrap_or(Ordering::Equal)
    }
}
