//! Tile scheduling, caching and streaming control

pub mod cache;
pub mod config;
pub mod refine;
pub mod scheduler;
pub mod service;

pub use cache::Cache;
pub use config::SchedulerConfig;
pub use refine::{refine_functor, MAX_ZOOM_LEVEL};
pub use scheduler::{GpuQuadDelta, Scheduler, RAM_PURGE_SLACK};
pub use service::{SchedulerEvents, SchedulerHandle, SchedulerMessage, SchedulerService};
