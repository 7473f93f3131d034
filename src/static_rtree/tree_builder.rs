//! Bottom-up bulk construction of the packed tree.
//!
//! Segments are sorted by the Hilbert code of their centroid, packed into
//! full leaf pages, and the pages are then grouped upward level by level
//! until a single root remains. The finished array is reversed and
//! renumbered so the root sits at index 0 and every parent precedes its
//! children.

use std::path::Path;
use std::time::Instant;

use rayon::prelude::*;

use crate::coordinate::{lat2y, FixedCoordinate, COORDINATE_PRECISION};
use crate::hilbert::hilbert_code;
use crate::segment::IndexedSegment;

use super::tree_constants::{BRANCHING_FACTOR, LEAF_PAGE_SIZE};
use super::tree_storage::{write_tree_file, LeafWriter};
use super::tree_types::{IndexError, LeafNode, Result, TreeNode};

/// A segment's Hilbert sort key paired with its position in the input.
#[derive(Debug, Clone, Copy)]
struct WrappedInput {
    hilbert_value: u64,
    array_index: u32,
}

/// Packs `input` into the two index artifacts and returns the finished
/// search tree.
pub(crate) fn build_index<S: IndexedSegment + Sync>(
    input: &[S],
    coords: &[FixedCoordinate],
    tree_path: &Path,
    leaf_path: &Path,
) -> Result<Vec<TreeNode>> {
    if input.is_empty() {
        return Err(IndexError::EmptyInput);
    }

    log::info!(
        "packing r-tree over {} segments and {} coordinates",
        input.len(),
        coords.len()
    );
    let started = Instant::now();

    // Hilbert keys of the Mercator-projected segment centroids, computed in
    // parallel over disjoint input ranges.
    let mut wrapped: Vec<WrappedInput> = input
        .par_iter()
        .enumerate()
        .map(|(index, segment)| {
            let mut centroid = S::centroid(
                coords[segment.source() as usize],
                coords[segment.target() as usize],
            );
            centroid.lat =
                (COORDINATE_PRECISION * lat2y(f64::from(centroid.lat) / COORDINATE_PRECISION)) as i32;
            WrappedInput {
                hilbert_value: hilbert_code(centroid),
                array_index: index as u32,
            }
        })
        .collect();

    wrapped.par_sort_by_key(|w| w.hilbert_value);

    // Pack sorted segments into leaf pages, emitting each page to disk and
    // keeping one leaf-pointer tree node per page for the level above.
    let mut leaf_writer = LeafWriter::<S>::create(leaf_path, input.len() as u64)?;
    let mut current_level: Vec<TreeNode> = Vec::new();

    for chunk in wrapped.chunks(LEAF_PAGE_SIZE) {
        let mut leaf: LeafNode<S> = LeafNode::default();
        let mut node = TreeNode::default();

        for (slot, wrapped_input) in chunk.iter().enumerate() {
            let segment = input[wrapped_input.array_index as usize];
            leaf.objects[slot] = segment;
            leaf.object_count += 1;

            node.mbr.extend_with(coords[segment.source() as usize]);
            node.mbr.extend_with(coords[segment.target() as usize]);
        }
        debug_assert!(node.mbr.is_initialized());

        node.child_is_on_disk = true;
        node.children[0] = current_level.len() as u32;
        current_level.push(node);

        leaf_writer.write_leaf(&leaf)?;
    }
    leaf_writer.finish()?;

    // Group each run of BRANCHING_FACTOR nodes under a parent until a single
    // root remains. Children are appended to the permanent array as they are
    // consumed, so at this point the array runs leaves-first, root-last.
    let mut search_tree: Vec<TreeNode> = Vec::new();
    while current_level.len() > 1 {
        let mut next_level: Vec<TreeNode> = Vec::new();

        for group in current_level.chunks(BRANCHING_FACTOR) {
            let mut parent = TreeNode::default();
            for child in group {
                parent.children[parent.child_count as usize] = search_tree.len() as u32;
                parent.child_count += 1;
                parent.mbr.merge(&child.mbr);
                search_tree.push(*child);
            }
            next_level.push(parent);
        }

        current_level = next_level;
    }
    assert!(current_level.len() == 1, "tree packing left more than one root");
    search_tree.push(current_level[0]);

    // Flip the array so the root lands at index 0, then rewrite child links
    // to match. Leaf-pointer nodes keep their page index untouched because
    // their child count is zero.
    search_tree.reverse();
    let tree_size = search_tree.len() as u32;
    search_tree.par_iter_mut().for_each(|node| {
        for child in &mut node.children[..node.child_count as usize] {
            *child = tree_size - *child - 1;
        }
    });

    assert!(!search_tree.is_empty(), "tree empty after packing");
    write_tree_file(tree_path, &search_tree)?;

    log::info!(
        "finished r-tree construction in {:.3}s",
        started.elapsed().as_secs_f64()
    );
    Ok(search_tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rectangle::RectangleInt2D;
    use crate::segment::RoadSegment;
    use tempfile::tempdir;

    fn grid_fixture(n: usize) -> (Vec<RoadSegment>, Vec<FixedCoordinate>) {
        let mut coords = Vec::new();
        let mut segments = Vec::new();
        for i in 0..n {
            let lat = (i % 100) as i32 * 10_000;
            let lon = (i / 100) as i32 * 10_000;
            coords.push(FixedCoordinate::new(lat, lon));
            coords.push(FixedCoordinate::new(lat + 5_000, lon + 5_000));
            segments.push(RoadSegment {
                u: (2 * i) as u32,
                v: (2 * i + 1) as u32,
                forward_node_id: i as u32,
                reverse_node_id: i as u32,
                name_id: i as u32,
                forward_weight: 100,
                reverse_weight: 100,
                ..RoadSegment::default()
            });
        }
        (segments, coords)
    }

    #[test]
    fn test_empty_input_rejected() {
        let dir = tempdir().unwrap();
        let result = build_index::<RoadSegment>(
            &[],
            &[],
            &dir.path().join("index.tree"),
            &dir.path().join("index.leaves"),
        );
        assert!(matches!(result, Err(IndexError::EmptyInput)));
    }

    #[test]
    fn test_single_leaf_tree() {
        let dir = tempdir().unwrap();
        let (segments, coords) = grid_fixture(10);
        let tree = build_index(
            &segments,
            &coords,
            &dir.path().join("index.tree"),
            &dir.path().join("index.leaves"),
        )
        .unwrap();

        // Ten segments fit a single page, so the root is the leaf pointer.
        assert_eq!(tree.len(), 1);
        assert!(tree[0].child_is_on_disk);
        assert_eq!(tree[0].children[0], 0);
    }

    #[test]
    fn test_root_first_and_children_after_parent() {
        let dir = tempdir().unwrap();
        let (segments, coords) = grid_fixture(5000);
        let tree = build_index(
            &segments,
            &coords,
            &dir.path().join("index.tree"),
            &dir.path().join("index.leaves"),
        )
        .unwrap();

        // 5000 segments over pages of LEAF_PAGE_SIZE: five leaves, one root.
        assert_eq!(tree.len(), 6);
        assert!(!tree[0].child_is_on_disk);
        assert_eq!(tree[0].child_count, 5);
        for (parent_id, node) in tree.iter().enumerate() {
            for &child in &node.children[..node.child_count as usize] {
                assert!(child as usize > parent_id);
                assert!((child as usize) < tree.len());
            }
        }
    }

    #[test]
    fn test_interior_mbr_is_union_of_children() {
        let dir = tempdir().unwrap();
        let (segments, coords) = grid_fixture(5000);
        let tree = build_index(
            &segments,
            &coords,
            &dir.path().join("index.tree"),
            &dir.path().join("index.leaves"),
        )
        .unwrap();

        for node in &tree {
            if node.child_is_on_disk {
                continue;
            }
            let mut merged = RectangleInt2D::new();
            for &child in &node.children[..node.child_count as usize] {
                merged.merge(&tree[child as usize].mbr);
            }
            assert_eq!(merged, node.mbr);
        }
    }

    #[test]
    fn test_leaf_mbr_covers_all_endpoints() {
        let dir = tempdir().unwrap();
        let (segments, coords) = grid_fixture(3000);
        let leaf_path = dir.path().join("index.leaves");
        let tree = build_index(&segments, &coords, &dir.path().join("index.tree"), &leaf_path)
            .unwrap();

        let (storage, element_count) =
            super::super::tree_storage::LeafStorage::<RoadSegment>::open(&leaf_path).unwrap();
        assert_eq!(element_count, 3000);

        let mut seen = 0u64;
        for node in tree.iter().filter(|n| n.child_is_on_disk) {
            let page = storage.read_leaf(node.children[0]).unwrap();
            for segment in page.objects() {
                assert!(node.mbr.contains(coords[segment.u as usize]));
                assert!(node.mbr.contains(coords[segment.v as usize]));
                seen += 1;
            }
        }
        assert_eq!(seen, element_count);
    }
}
