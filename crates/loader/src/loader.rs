use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use async_channel::Receiver;
use parking_lot::{Mutex, RwLock};
use plypick_core::{BoundingExtents, CancelFlag, Placement, PointCloud, Ray};
use plypick_io::read_ply_with;
use plypick_spatial::{search_nearest, NearestHit, PointOctree};
use tracing::{debug, error, info};

use crate::config::LoaderConfig;
use crate::error::LoadError;
use crate::events::{EventBus, LoadState, LoaderEvent, ProgressForwarder};

/// A decoded cloud together with the octree built over it. Published as a
/// whole and never mutated afterwards.
#[derive(Debug)]
pub struct LoadedCloud {
    pub cloud: PointCloud,
    pub index: PointOctree,
    pub path: PathBuf,
}

#[derive(Debug, Default)]
struct Status {
    active_loads: usize,
    loaded: bool,
}

impl Status {
    fn snapshot(&self) -> LoadState {
        LoadState {
            loading: self.active_loads > 0,
            loaded: self.loaded,
        }
    }
}

#[derive(Debug)]
struct Shared {
    config: LoaderConfig,
    current: RwLock<Option<Arc<LoadedCloud>>>,
    status: Mutex<Status>,
    placement: RwLock<Placement>,
    last_pick: Mutex<Option<NearestHit>>,
    bus: EventBus,
}

impl Shared {
    fn begin_load(&self) {
        let state = {
            let mut status = self.status.lock();
            status.active_loads += 1;
            status.loaded = false;
            status.snapshot()
        };
        self.bus.publish(LoaderEvent::StateChanged(state));
    }

    fn end_load(&self) {
        let has_cloud = self.current.read().is_some();
        let state = {
            let mut status = self.status.lock();
            status.active_loads = status.active_loads.saturating_sub(1);
            status.loaded = has_cloud && status.active_loads == 0;
            status.snapshot()
        };
        self.bus.publish(LoaderEvent::StateChanged(state));
    }

    fn run_pipeline(&self, path: &Path, cancel: &CancelFlag) -> Result<Arc<LoadedCloud>, LoadError> {
        let progress = ProgressForwarder::new(&self.bus, self.config.progress_granularity);

        let cloud = read_ply_with(path, &progress, cancel).map_err(|e| LoadError::from_ply(path, e))?;
        debug!(points = cloud.len(), "decoded point cloud");

        let index = PointOctree::build_with(&cloud, self.config.octree, &progress, cancel)?;

        Ok(Arc::new(LoadedCloud {
            cloud,
            index,
            path: path.to_path_buf(),
        }))
    }

    fn publish(&self, loaded: &Arc<LoadedCloud>, cancel: &CancelFlag) -> Result<(), LoadError> {
        {
            let mut current = self.current.write();
            cancel.check()?;
            *current = Some(Arc::clone(loaded));
        }
        *self.last_pick.lock() = None;

        self.bus.publish(LoaderEvent::Loaded {
            point_count: loaded.cloud.len(),
            extents: loaded.cloud.extents,
        });
        Ok(())
    }

    fn load(&self, path: &Path, cancel: &CancelFlag) -> Result<Arc<LoadedCloud>, LoadError> {
        let started = Instant::now();
        let _guard = ActiveLoad::begin(self);

        let result = self
            .run_pipeline(path, cancel)
            .and_then(|loaded| self.publish(&loaded, cancel).map(|()| loaded));

        match &result {
            Ok(loaded) => info!(
                path = %path.display(),
                points = loaded.cloud.len(),
                nodes = loaded.index.node_count(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "point cloud loaded"
            ),
            Err(LoadError::Cancelled) => info!(path = %path.display(), "point cloud load cancelled"),
            Err(e) => {
                error!(path = %path.display(), error = %e, "point cloud load failed");
                self.bus.publish(LoaderEvent::Failed {
                    message: e.to_string(),
                });
            }
        }

        result
    }
}

/// Marks a load as active until dropped, so a panicking worker still clears
/// the loading flag.
struct ActiveLoad<'a>(&'a Shared);

impl<'a> ActiveLoad<'a> {
    fn begin(shared: &'a Shared) -> Self {
        shared.begin_load();
        Self(shared)
    }
}

impl Drop for ActiveLoad<'_> {
    fn drop(&mut self) {
        self.0.end_load();
    }
}

/// Loads PLY point clouds, indexes them and answers pick queries against the
/// most recently published one.
///
/// Clones share the same state. Queries read an `Arc` snapshot, so a load in
/// flight never exposes a partially built cloud; it replaces the snapshot
/// only once decode and indexing have both finished.
#[derive(Debug, Clone)]
pub struct PointCloudLoader {
    shared: Arc<Shared>,
}

impl Default for PointCloudLoader {
    fn default() -> Self {
        Self::new(LoaderConfig::default())
    }
}

impl PointCloudLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                current: RwLock::new(None),
                status: Mutex::new(Status::default()),
                placement: RwLock::new(Placement::identity()),
                last_pick: Mutex::new(None),
                bus: EventBus::default(),
            }),
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.shared.config
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> Receiver<LoaderEvent> {
        self.shared.bus.subscribe()
    }

    /// Load on the calling thread.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Arc<LoadedCloud>, LoadError> {
        self.load_with(path, &CancelFlag::new())
    }

    /// Load on the calling thread, stopping early once `cancel` is set.
    /// A cancelled load never publishes.
    pub fn load_with(
        &self,
        path: impl AsRef<Path>,
        cancel: &CancelFlag,
    ) -> Result<Arc<LoadedCloud>, LoadError> {
        self.shared.load(path.as_ref(), cancel)
    }

    /// Load on a background thread.
    pub fn spawn_load(&self, path: impl Into<PathBuf>) -> LoadTask {
        let path = path.into();
        let shared = Arc::clone(&self.shared);
        let cancel = CancelFlag::new();
        let (tx, rx) = async_channel::bounded(1);

        let worker_cancel = cancel.clone();
        let handle = thread::spawn(move || {
            let result = shared.load(&path, &worker_cancel);
            let _ = tx.try_send(result);
        });

        LoadTask {
            cancel,
            handle,
            result: rx,
        }
    }

    pub fn state(&self) -> LoadState {
        self.shared.status.lock().snapshot()
    }

    /// The published cloud, if any.
    pub fn current(&self) -> Option<Arc<LoadedCloud>> {
        self.shared.current.read().clone()
    }

    pub fn extents(&self) -> Option<BoundingExtents> {
        self.current().map(|c| c.cloud.extents)
    }

    pub fn placement(&self) -> Placement {
        *self.shared.placement.read()
    }

    pub fn set_placement(&self, placement: Placement) {
        *self.shared.placement.write() = placement;
    }

    /// Nearest published point within `tolerance` of `world_ray`, measured
    /// in the cloud's local frame under the current placement.
    pub fn search_nearest(&self, world_ray: &Ray, tolerance: f32) -> Option<NearestHit> {
        let current = self.current();
        let placement = self.placement();
        search_nearest(current.as_deref().map(|c| &c.index), &placement, world_ray, tolerance)
    }

    /// [`search_nearest`](Self::search_nearest) with the configured
    /// tolerance. A hit is remembered as the last pick and published;
    /// a miss leaves the last pick unchanged.
    pub fn pick(&self, world_ray: &Ray) -> Option<NearestHit> {
        let hit = self.search_nearest(world_ray, self.shared.config.pick_tolerance)?;
        *self.shared.last_pick.lock() = Some(hit);
        debug!(index = hit.index, "picked point");
        self.shared.bus.publish(LoaderEvent::Picked(hit));
        Some(hit)
    }

    /// Last successful pick since the current cloud was published.
    pub fn last_pick(&self) -> Option<NearestHit> {
        *self.shared.last_pick.lock()
    }
}

/// Handle to a background load started by [`PointCloudLoader::spawn_load`].
#[derive(Debug)]
pub struct LoadTask {
    cancel: CancelFlag,
    handle: JoinHandle<()>,
    result: Receiver<Result<Arc<LoadedCloud>, LoadError>>,
}

impl LoadTask {
    /// Ask the worker to stop. Has no effect once the cloud is published.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the worker is done.
    pub fn wait(self) -> Result<Arc<LoadedCloud>, LoadError> {
        let result = self.result.recv_blocking();
        let _ = self.handle.join();
        result.unwrap_or(Err(LoadError::WorkerPanicked))
    }

    /// Await the worker without blocking an executor thread.
    pub async fn finished(self) -> Result<Arc<LoadedCloud>, LoadError> {
        self.result
            .recv()
            .await
            .unwrap_or(Err(LoadError::WorkerPanicked))
    }
}
