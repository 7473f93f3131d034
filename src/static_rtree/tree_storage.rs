//! File storage for the two index artifacts.
//!
//! The tree file is read fully into memory at open; the leaf file stays open
//! for random page reads, one seek and one read per access. The file handle
//! is shared behind a lock because a concurrent seek+read pair on a single
//! descriptor is a data race.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use parking_lot::RwLock;

use crate::segment::IndexedSegment;

use super::tree_types::{IndexError, LeafNode, Result, TreeNode};

/// Random-access handle to the leaf page file.
pub(crate) struct LeafStorage<S: IndexedSegment> {
    file: RwLock<File>,
    _records: PhantomData<S>,
}

impl<S: IndexedSegment> LeafStorage<S> {
    /// Opens the leaf file for reads and returns the handle together with
    /// the element count from the file header.
    pub fn open(path: &Path) -> Result<(Self, u64)> {
        ensure_artifact(path)?;

        let mut file = OpenOptions::new().read(true).open(path)?;
        let element_count = file.read_u64::<LittleEndian>()?;

        Ok((
            LeafStorage {
                file: RwLock::new(file),
                _records: PhantomData,
            },
            element_count,
        ))
    }

    /// Reads a single leaf page. A failed read leaves the handle usable; the
    /// next access seeks afresh.
    pub fn read_leaf(&self, leaf_id: u32) -> Result<LeafNode<S>> {
        let offset = 8 + leaf_id as u64 * LeafNode::<S>::ENCODED_SIZE as u64;
        let mut buf = vec![0u8; LeafNode::<S>::ENCODED_SIZE];

        {
            let mut file = self.file.write();
            file.seek(SeekFrom::Start(offset))?;
            file.read_exact(&mut buf)?;
        }

        Ok(LeafNode::read_from(&mut buf.as_slice())?)
    }
}

/// Streaming writer used by the builder to emit leaf pages in order.
pub(crate) struct LeafWriter<S: IndexedSegment> {
    writer: BufWriter<File>,
    _records: PhantomData<S>,
}

impl<S: IndexedSegment> LeafWriter<S> {
    pub fn create(path: &Path, element_count: u64) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        let mut writer = BufWriter::new(file);
        writer.write_u64::<LittleEndian>(element_count)?;
        Ok(LeafWriter {
            writer,
            _records: PhantomData,
        })
    }

    pub fn write_leaf(&mut self, leaf: &LeafNode<S>) -> Result<()> {
        leaf.write_to(&mut self.writer)?;
        Ok(())
    }

    /// Flushes and closes the file.
    pub fn finish(mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;
        Ok(())
    }
}

/// Writes the tree file: a length prefix followed by the packed node array.
pub(crate) fn write_tree_file(path: &Path, nodes: &[TreeNode]) -> Result<()> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    let mut writer = BufWriter::new(file);

    writer.write_u32::<LittleEndian>(nodes.len() as u32)?;
    for node in nodes {
        node.write_to(&mut writer)?;
    }

    writer.flush()?;
    writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;
    Ok(())
}

/// Reads the tree file fully into memory.
pub(crate) fn read_tree_file(path: &Path) -> Result<Vec<TreeNode>> {
    ensure_artifact(path)?;

    let mut reader = BufReader::new(File::open(path)?);
    let tree_size = reader.read_u32::<LittleEndian>()?;

    let mut nodes = Vec::with_capacity(tree_size as usize);
    for _ in 0..tree_size {
        nodes.push(TreeNode::read_from(&mut reader)?);
    }
    Ok(nodes)
}

/// Rejects a missing or zero-length artifact before any read is attempted.
fn ensure_artifact(path: &Path) -> Result<()> {
    let metadata =
        std::fs::metadata(path).map_err(|_| IndexError::MissingArtifact(path.to_path_buf()))?;
    if metadata.len() == 0 {
        return Err(IndexError::EmptyArtifact(path.to_path_buf()));
    }
    Ok(())
}
