#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod events;
pub mod loader;

pub use config::LoaderConfig;
pub use error::LoadError;
pub use events::{LoadState, LoaderEvent};
pub use loader::{LoadTask, LoadedCloud, PointCloudLoader};
