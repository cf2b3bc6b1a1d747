use std::io;
use std::path::{Path, PathBuf};

use plypick_core::Cancelled;
use plypick_io::PlyError;
use thiserror::Error;

/// Why a load did not publish a new point cloud. The previously published
/// cloud, if any, stays in place.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("point cloud file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Ply(#[from] PlyError),

    #[error("load cancelled")]
    Cancelled,

    #[error("load worker panicked")]
    WorkerPanicked,
}

impl LoadError {
    pub(crate) fn from_ply(path: &Path, err: PlyError) -> Self {
        match err {
            PlyError::Io(e) if e.kind() == io::ErrorKind::NotFound => LoadError::FileNotFound {
                path: path.to_path_buf(),
            },
            PlyError::Cancelled => LoadError::Cancelled,
            other => LoadError::Ply(other),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, LoadError::Cancelled)
    }
}

impl From<Cancelled> for LoadError {
    fn from(_: Cancelled) -> Self {
        LoadError::Cancelled
    }
}
