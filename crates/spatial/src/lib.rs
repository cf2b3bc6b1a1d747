#![forbid(unsafe_code)]

pub mod nearest;
pub mod octree;

pub use nearest::{closest_to_origin, search_nearest, NearestHit};
pub use octree::{Neighbor, OctreeParams, PointOctree};
