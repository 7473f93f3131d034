//! # roadtree - packed spatial index for road networks
//!
//! This crate locates the road segments nearest to a query point on a
//! planet-scale street graph and projects the point onto them as phantom
//! nodes, the synthetic source/target vertices a routing engine runs
//! shortest paths between.
//!
//! ## Features
//!
//! - **Bulk-loaded packed R-tree**: segments are sorted by the Hilbert code
//!   of their centroid and packed into full pages, one pass, no rebalancing
//! - **Two artifacts**: a memory-resident tree of bounding rectangles and an
//!   on-disk leaf file read page-by-page during queries
//! - **Best-first nearest search**: distance-ordered traversal with
//!   lower/upper bound pruning, streaming leaves from disk on demand
//! - **Phantom node projection**: perpendicular-foot placement with
//!   forward/reverse weights split at the foot
//! - **Component-aware results**: up to `k` results each from large and tiny
//!   connected components of the road graph
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use roadtree::{FixedCoordinate, RoadSegment, StaticRTree};
//!
//! # fn main() -> roadtree::Result<()> {
//! let coords: Arc<[FixedCoordinate]> = vec![
//!     FixedCoordinate::from_degrees(52.5170, 13.3888),
//!     FixedCoordinate::from_degrees(52.5171, 13.3897),
//! ]
//! .into();
//! let segments = vec![RoadSegment {
//!     u: 0,
//!     v: 1,
//!     forward_node_id: 0,
//!     reverse_node_id: 1,
//!     forward_weight: 100,
//!     reverse_weight: 100,
//!     ..RoadSegment::default()
//! }];
//!
//! let index = StaticRTree::build(
//!     &segments,
//!     Arc::clone(&coords),
//!     "index.tree".as_ref(),
//!     "index.leaves".as_ref(),
//! )?;
//!
//! let query = FixedCoordinate::from_degrees(52.51705, 13.3892);
//! if let Some(phantom) = index.find_phantom_node(query, 18) {
//!     println!("snapped to {}", phantom.location);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The build phase and the serve phase are distinct: [`StaticRTree::build`]
//! writes both artifacts, [`StaticRTree::open`] loads them read-only, and no
//! mutation is possible afterwards.

pub mod coordinate;
pub mod hilbert;
pub mod phantom;
pub mod rectangle;
pub mod segment;
pub mod static_rtree;

pub use coordinate::{
    approx_euclidean_distance, epsilon_equal, lat2y, perpendicular_distance, FixedCoordinate,
    COORDINATE_PRECISION, DISTANCE_EPSILON, INVALID_COORDINATE_VALUE,
};
pub use phantom::PhantomNode;
pub use rectangle::RectangleInt2D;
pub use segment::{
    IndexedSegment, RoadSegment, TravelMode, INVALID_NODE_ID, TRAVEL_MODE_INACCESSIBLE,
};
pub use static_rtree::{
    IndexError, Result, StaticRTree, TreeNode, BRANCHING_FACTOR, LEAF_PAGE_SIZE,
};
