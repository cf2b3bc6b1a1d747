//! Progress reporting and cooperative cancellation for the load pipeline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The three phases of a load, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadStage {
    Reading,
    Generating,
    CalculatingOctree,
}

impl LoadStage {
    pub fn label(self) -> &'static str {
        match self {
            LoadStage::Reading => "reading",
            LoadStage::Generating => "generating",
            LoadStage::CalculatingOctree => "calculating octree",
        }
    }
}

impl std::fmt::Display for LoadStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.label())
    }
}

/// Receives best-effort progress. Within a stage, `fraction` never decreases
/// and stays in `0.0..=1.0`.
///
/// Implementations must return quickly; the decoder calls this once per
/// record.
pub trait ProgressSink: Send + Sync {
    fn report(&self, stage: LoadStage, fraction: f32);
}

/// Discards every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _stage: LoadStage, _fraction: f32) {}
}

impl<F> ProgressSink for F
where
    F: Fn(LoadStage, f32) + Send + Sync,
{
    fn report(&self, stage: LoadStage, fraction: f32) {
        self(stage, fraction)
    }
}

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// `Err(Cancelled)` once [`cancel`](Self::cancel) has been called.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation cancelled")]
pub struct Cancelled;
