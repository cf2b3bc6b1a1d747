//! Binary PLY point cloud loading with octree-backed ray picking.
//!
//! Re-exports the member crates: `plypick_core` types at the top level,
//! the rest both at the top level and as modules.

#![forbid(unsafe_code)]

pub use plypick_io as io;
pub use plypick_loader as loader;
pub use plypick_spatial as spatial;

pub use plypick_core::{
    BoundingExtents, CancelFlag, Cancelled, Colors, LoadStage, NoProgress, Placement, PointCloud,
    ProgressSink, Ray,
};
pub use plypick_io::{read_ply, read_ply_from, read_ply_with, write_ply_binary, PlyError};
pub use plypick_loader::{
    LoadError, LoadState, LoadTask, LoadedCloud, LoaderConfig, LoaderEvent, PointCloudLoader,
};
pub use plypick_spatial::{search_nearest, NearestHit, Neighbor, OctreeParams, PointOctree};
