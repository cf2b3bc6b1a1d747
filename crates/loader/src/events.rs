//! Load-state notifications for UI and rendering collaborators.

use async_channel::{Receiver, Sender};
use parking_lot::Mutex;
use plypick_core::{BoundingExtents, LoadStage, ProgressSink};
use plypick_spatial::NearestHit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadState {
    /// A load is in progress.
    pub loading: bool,
    /// A complete cloud and its index are published and idle.
    pub loaded: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoaderEvent {
    Progress { stage: LoadStage, fraction: f32 },
    StateChanged(LoadState),
    Loaded {
        point_count: usize,
        extents: BoundingExtents,
    },
    Failed { message: String },
    Picked(NearestHit),
}

/// Fan-out of [`LoaderEvent`]s to any number of unbounded channels.
/// Closed receivers are dropped on the next publish.
#[derive(Debug, Default)]
pub(crate) struct EventBus {
    subscribers: Mutex<Vec<Sender<LoaderEvent>>>,
}

impl EventBus {
    pub(crate) fn subscribe(&self) -> Receiver<LoaderEvent> {
        let (tx, rx) = async_channel::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    pub(crate) fn publish(&self, event: LoaderEvent) {
        self.subscribers
            .lock()
            .retain(|tx| tx.try_send(event.clone()).is_ok());
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

/// Turns per-record progress into at most `granularity + 1` events per stage.
pub(crate) struct ProgressForwarder<'a> {
    bus: &'a EventBus,
    granularity: u32,
    last: Mutex<Option<(LoadStage, u32)>>,
}

impl<'a> ProgressForwarder<'a> {
    pub(crate) fn new(bus: &'a EventBus, granularity: u32) -> Self {
        Self {
            bus,
            granularity: granularity.max(1),
            last: Mutex::new(None),
        }
    }
}

impl ProgressSink for ProgressForwarder<'_> {
    fn report(&self, stage: LoadStage, fraction: f32) {
        let fraction = fraction.clamp(0.0, 1.0);
        let step = (fraction * self.granularity as f32).floor() as u32;

        let mut last = self.last.lock();
        let forward = match *last {
            Some((s, prev)) if s == stage => step > prev,
            _ => true,
        };
        if forward {
            *last = Some((stage, step));
            drop(last);
            self.bus.publish(LoaderEvent::Progress { stage, fraction });
        }
    }
}
