use plypick_spatial::OctreeParams;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoaderConfig {
    pub octree: OctreeParams,
    /// Radius used by [`PointCloudLoader::pick`](crate::PointCloudLoader::pick),
    /// in the cloud's local units.
    pub pick_tolerance: f32,
    /// Progress events forwarded to subscribers per stage, at most.
    pub progress_granularity: u32,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            octree: OctreeParams::default(),
            pick_tolerance: 0.05,
            progress_granularity: 1000,
        }
    }
}
