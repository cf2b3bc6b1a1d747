#![forbid(unsafe_code)]

pub mod bbox;
pub mod cloud;
pub mod placement;
pub mod progress;
pub mod ray;

pub use bbox::BoundingExtents;
pub use cloud::{Colors, PointCloud};
pub use placement::Placement;
pub use progress::{CancelFlag, Cancelled, LoadStage, NoProgress, ProgressSink};
pub use ray::Ray;
