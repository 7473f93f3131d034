//! Static packed R-tree over road segments.
//!
//! The index is bulk-loaded once and read-only afterwards. It lives in two
//! artifacts: a memory-resident array of bounding-rectangle nodes and an
//! on-disk file of leaf pages streamed in on demand. Queries run a
//! best-first traversal over the node array, loading only the leaf pages
//! whose rectangles survive pruning.

pub mod tree_constants;
pub mod tree_types;

mod tree_builder;
mod tree_storage;

use std::collections::BinaryHeap;
use std::path::Path;
use std::sync::Arc;

use crate::coordinate::{
    approx_euclidean_distance, epsilon_equal, perpendicular_distance, FixedCoordinate,
};
use crate::phantom::PhantomNode;
use crate::segment::{IndexedSegment, RoadSegment, TRAVEL_MODE_INACCESSIBLE};

pub use tree_constants::{BRANCHING_FACTOR, LEAF_PAGE_SIZE, TREE_NODE_BYTES};
pub use tree_types::{IndexError, LeafNode, Result, TreeNode};

use tree_constants::{DEFAULT_MAX_CHECKED_FACTOR, TINY_CC_ZOOM_CUTOFF};
use tree_storage::LeafStorage;
use tree_types::{IncrementalCandidate, QueryCandidate, QueryEntry};

/// Handle to a packed road-segment index.
///
/// The search tree is shared behind an [`Arc`], so clones of the tree array
/// can serve concurrent queries without synchronization. The leaf file
/// handle is owned by this instance; the handle is movable but not clonable.
pub struct StaticRTree<S: IndexedSegment = RoadSegment> {
    tree: Arc<[TreeNode]>,
    coords: Arc<[FixedCoordinate]>,
    element_count: u64,
    leaves: LeafStorage<S>,
}

impl<S: IndexedSegment + Sync> StaticRTree<S> {
    /// Packs `input` into a fresh index, writing both artifacts, and returns
    /// a serving instance over them.
    ///
    /// Building from zero segments is disallowed and fails with
    /// [`IndexError::EmptyInput`].
    pub fn build(
        input: &[S],
        coords: Arc<[FixedCoordinate]>,
        tree_path: &Path,
        leaf_path: &Path,
    ) -> Result<Self> {
        let tree = tree_builder::build_index(input, &coords, tree_path, leaf_path)?;
        let (leaves, element_count) = LeafStorage::open(leaf_path)?;
        Ok(StaticRTree {
            tree: tree.into(),
            coords,
            element_count,
            leaves,
        })
    }

    /// Opens an index previously written by [`build`](StaticRTree::build),
    /// reading the node array fully into memory.
    pub fn open(
        tree_path: &Path,
        leaf_path: &Path,
        coords: Arc<[FixedCoordinate]>,
    ) -> Result<Self> {
        let tree = tree_storage::read_tree_file(tree_path)?;
        let (leaves, element_count) = LeafStorage::open(leaf_path)?;
        Ok(StaticRTree {
            tree: tree.into(),
            coords,
            element_count,
            leaves,
        })
    }

    /// Builds a handle over an already-resident node array, for instances
    /// that share one tree across processes or threads. Only the leaf file
    /// is opened.
    pub fn with_shared_tree(
        tree: Arc<[TreeNode]>,
        leaf_path: &Path,
        coords: Arc<[FixedCoordinate]>,
    ) -> Result<Self> {
        let (leaves, element_count) = LeafStorage::open(leaf_path)?;
        Ok(StaticRTree {
            tree,
            coords,
            element_count,
            leaves,
        })
    }

    /// The resident node array, shareable with
    /// [`with_shared_tree`](StaticRTree::with_shared_tree).
    pub fn shared_tree(&self) -> Arc<[TreeNode]> {
        Arc::clone(&self.tree)
    }

    /// Number of segments stored in the leaf file.
    pub fn element_count(&self) -> u64 {
        self.element_count
    }

    /// Number of nodes in the search tree.
    pub fn tree_len(&self) -> usize {
        self.tree.len()
    }

    /// Finds the segment endpoint closest to `input`.
    ///
    /// At zoom levels of 14 and below, segments in tiny connected components
    /// are ignored. Returns `None` when no endpoint qualifies or a leaf page
    /// cannot be read.
    pub fn locate_closest_endpoint(
        &self,
        input: FixedCoordinate,
        zoom_level: u32,
    ) -> Option<FixedCoordinate> {
        let ignore_tiny_components = zoom_level <= TINY_CC_ZOOM_CUTOFF;

        let mut min_dist = f64::MAX;
        let mut min_max_dist = f64::MAX;
        let mut result: Option<FixedCoordinate> = None;

        let mut queue = BinaryHeap::new();
        queue.push(QueryCandidate::new(0.0, 0));

        while let Some(candidate) = queue.pop() {
            if candidate.min_dist >= min_max_dist || candidate.min_dist >= min_dist {
                continue;
            }

            let node = &self.tree[candidate.node_id as usize];
            if node.child_is_on_disk {
                let leaf = self.load_leaf(node.children[0])?;
                for segment in leaf.objects() {
                    if ignore_tiny_components && segment.is_in_tiny_cc() {
                        continue;
                    }
                    for endpoint in [
                        self.coords[segment.source() as usize],
                        self.coords[segment.target() as usize],
                    ] {
                        let dist = approx_euclidean_distance(input, endpoint);
                        if dist < min_dist {
                            min_dist = dist;
                            result = Some(endpoint);
                        }
                    }
                }
            } else {
                min_max_dist =
                    self.explore_tree_node(node, input, min_dist, min_max_dist, &mut queue);
            }
        }

        result
    }

    /// Expands an interior node: pushes every child whose lower bound beats
    /// both the best distance so far and the tightest upper bound, and
    /// returns the tightened upper bound.
    fn explore_tree_node(
        &self,
        parent: &TreeNode,
        input: FixedCoordinate,
        min_dist: f64,
        min_max_dist: f64,
        queue: &mut BinaryHeap<QueryCandidate>,
    ) -> f64 {
        let mut new_min_max_dist = min_max_dist;

        for &child_id in &parent.children[..parent.child_count as usize] {
            let child = &self.tree[child_id as usize];
            let lower_bound = child.mbr.min_dist(input);
            let upper_bound = child.mbr.min_max_dist(input);
            new_min_max_dist = new_min_max_dist.min(upper_bound);
            if lower_bound > new_min_max_dist {
                continue;
            }
            if lower_bound > min_dist {
                continue;
            }
            queue.push(QueryCandidate::new(lower_bound, child_id));
        }

        new_min_max_dist
    }

    fn load_leaf(&self, leaf_id: u32) -> Option<LeafNode<S>> {
        match self.leaves.read_leaf(leaf_id) {
            Ok(leaf) => Some(leaf),
            Err(err) => {
                log::error!("failed to read leaf page {leaf_id}: {err}");
                None
            }
        }
    }
}

impl StaticRTree<RoadSegment> {
    /// Finds the single best phantom node for `input`: the foot of the
    /// perpendicular onto the segment with the smallest perpendicular
    /// distance, with weights split at the foot.
    ///
    /// At zoom levels of 14 and below, segments in tiny connected components
    /// are ignored.
    pub fn find_phantom_node(
        &self,
        input: FixedCoordinate,
        zoom_level: u32,
    ) -> Option<PhantomNode> {
        let ignore_tiny_components = zoom_level <= TINY_CC_ZOOM_CUTOFF;

        let mut min_dist = f64::MAX;
        let mut min_max_dist = f64::MAX;
        let mut best: Option<(RoadSegment, FixedCoordinate)> = None;

        let mut queue = BinaryHeap::new();
        queue.push(QueryCandidate::new(0.0, 0));

        while let Some(candidate) = queue.pop() {
            if candidate.min_dist > min_max_dist || candidate.min_dist > min_dist {
                continue;
            }

            let node = &self.tree[candidate.node_id as usize];
            if node.child_is_on_disk {
                let leaf = self.load_leaf(node.children[0])?;
                for segment in leaf.objects() {
                    if ignore_tiny_components && segment.is_in_tiny_cc {
                        continue;
                    }

                    let (dist, foot, _ratio) = perpendicular_distance(
                        self.coords[segment.u as usize],
                        self.coords[segment.v as usize],
                        input,
                    );

                    if dist < min_dist && !epsilon_equal(dist, min_dist) {
                        min_dist = dist;
                        best = Some((*segment, foot));
                    }
                }
            } else {
                min_max_dist =
                    self.explore_tree_node(node, input, min_dist, min_max_dist, &mut queue);
            }
        }

        best.map(|(segment, foot)| {
            let mut phantom = phantom_from_segment(&segment, foot);
            phantom.snap_to_input(input);
            phantom.scale_weights(
                self.coords[segment.u as usize],
                self.coords[segment.v as usize],
            );
            phantom
        })
    }

    /// Finds up to `k` phantom nodes in large components and up to `k` in
    /// tiny components, nearest-first by perpendicular distance.
    ///
    /// `max_checked` caps how many segment entries the traversal inspects
    /// before giving up; it defaults to four leaf pages' worth. The zoom
    /// level is accepted for interface parity with the directed searches;
    /// here the component split is governed by the result caps instead.
    pub fn find_phantom_nodes(
        &self,
        input: FixedCoordinate,
        _zoom_level: u32,
        k: usize,
        max_checked: Option<usize>,
    ) -> Vec<PhantomNode> {
        self.incremental_phantom_search(input, k, max_checked)
            .into_iter()
            .map(|(segment, foot, _dist)| {
                let mut phantom = phantom_from_segment(&segment, foot);
                phantom.snap_to_input(input);
                phantom.scale_weights(
                    self.coords[segment.u as usize],
                    self.coords[segment.v as usize],
                );
                phantom
            })
            .collect()
    }

    /// Like [`find_phantom_nodes`](StaticRTree::find_phantom_nodes), but
    /// pairs each phantom node with its perpendicular distance. Travel modes
    /// are left inaccessible on the returned nodes.
    pub fn find_phantom_nodes_with_distance(
        &self,
        input: FixedCoordinate,
        _zoom_level: u32,
        k: usize,
        max_checked: Option<usize>,
    ) -> Vec<(PhantomNode, f64)> {
        self.incremental_phantom_search(input, k, max_checked)
            .into_iter()
            .map(|(segment, foot, dist)| {
                let mut phantom = phantom_from_segment(&segment, foot);
                phantom.forward_travel_mode = TRAVEL_MODE_INACCESSIBLE;
                phantom.backward_travel_mode = TRAVEL_MODE_INACCESSIBLE;
                phantom.snap_to_input(input);
                phantom.scale_weights(
                    self.coords[segment.u as usize],
                    self.coords[segment.v as usize],
                );
                (phantom, dist)
            })
            .collect()
    }

    /// Best-first traversal over nodes and segments together.
    ///
    /// The pruning threshold is the k-th best distance admitted from a large
    /// component so far; it tightens as results are admitted but the result
    /// vector is not re-sorted afterwards. Segments are admitted strictly
    /// below the threshold, with near-duplicates of the current threshold
    /// suppressed so the same road reached along two paths is not reported
    /// twice.
    fn incremental_phantom_search(
        &self,
        input: FixedCoordinate,
        k: usize,
        max_checked: Option<usize>,
    ) -> Vec<(RoadSegment, FixedCoordinate, f64)> {
        if k == 0 {
            return Vec::new();
        }
        let max_checked_segments =
            max_checked.unwrap_or(DEFAULT_MAX_CHECKED_FACTOR * LEAF_PAGE_SIZE);

        let mut min_found_distances = vec![f64::MAX; k];
        let mut big_cc_found = 0usize;
        let mut tiny_cc_found = 0usize;
        let mut inspected_segments = 0usize;
        let mut results: Vec<(RoadSegment, FixedCoordinate, f64)> = Vec::new();

        let mut queue: BinaryHeap<IncrementalCandidate<RoadSegment>> = BinaryHeap::new();
        queue.push(IncrementalCandidate::new(0.0, QueryEntry::Node(0)));

        while let Some(candidate) = queue.pop() {
            let threshold = min_found_distances[k - 1];
            if candidate.min_dist > threshold {
                continue;
            }

            match candidate.entry {
                QueryEntry::Node(node_id) => {
                    let node = &self.tree[node_id as usize];
                    if node.child_is_on_disk {
                        let Some(leaf) = self.load_leaf(node.children[0]) else {
                            return Vec::new();
                        };
                        for segment in leaf.objects() {
                            let (dist, _foot, _ratio) = perpendicular_distance(
                                self.coords[segment.u as usize],
                                self.coords[segment.v as usize],
                                input,
                            );
                            if dist < threshold {
                                queue.push(IncrementalCandidate::new(
                                    dist,
                                    QueryEntry::Segment(*segment),
                                ));
                            }
                        }
                    } else {
                        for &child_id in &node.children[..node.child_count as usize] {
                            let lower_bound = self.tree[child_id as usize].mbr.min_dist(input);
                            if lower_bound < threshold {
                                queue.push(IncrementalCandidate::new(
                                    lower_bound,
                                    QueryEntry::Node(child_id),
                                ));
                            }
                        }
                    }
                }
                QueryEntry::Segment(segment) => {
                    inspected_segments += 1;

                    if big_cc_found == k && !segment.is_in_tiny_cc {
                        continue;
                    }
                    if tiny_cc_found == k && segment.is_in_tiny_cc {
                        continue;
                    }

                    let (dist, foot, _ratio) = perpendicular_distance(
                        self.coords[segment.u as usize],
                        self.coords[segment.v as usize],
                        input,
                    );

                    if dist < threshold && !epsilon_equal(dist, threshold) {
                        results.push((segment, foot, dist));
                        if segment.is_in_tiny_cc {
                            tiny_cc_found += 1;
                        } else {
                            min_found_distances[big_cc_found] = dist;
                            big_cc_found += 1;
                        }
                    }
                }
            }

            if big_cc_found == k || inspected_segments >= max_checked_segments {
                queue.clear();
            }
        }

        results
    }
}

fn phantom_from_segment(segment: &RoadSegment, location: FixedCoordinate) -> PhantomNode {
    PhantomNode {
        forward_node_id: segment.forward_node_id,
        reverse_node_id: segment.reverse_node_id,
        name_id: segment.name_id,
        forward_weight: segment.forward_weight,
        reverse_weight: segment.reverse_weight,
        forward_offset: segment.forward_offset,
        reverse_offset: segment.reverse_offset,
        packed_geometry_id: segment.packed_geometry_id,
        location,
        fwd_segment_position: segment.fwd_segment_position,
        forward_travel_mode: segment.forward_travel_mode,
        backward_travel_mode: segment.backward_travel_mode,
    }
}
