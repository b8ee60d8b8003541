// src/streaming/mod.rs
//! Chunk streaming: coordinate math, lifecycle bookkeeping, async
//! pipelines and the plugin that schedules them.

pub mod backends;
pub mod components;
pub mod config;
pub mod coords;
pub mod lifecycle;
pub mod loader;
pub mod plugin;

pub use backends::{
    MemoryPlacementSource, NothingOwned, OwnedItemQuery, PlacementDataError, PlacementDataSource,
    RonPlacementSource, SegmentError, SegmentManifest, StreamingBackends, WorldSegmentLoader,
};
pub use components::{StreamingAnchor, StreamingRoot, StreamingRootEntity};
pub use config::{ConfigError, StreamingConfig};
pub use coords::{
    coordinate_of, is_valid, manhattan_distance, needed_chunks, ChunkBounds, ChunkCoordinate,
};
pub use lifecycle::{ChunkInfo, ChunkLifecycle, ChunkState, StreamingPlan, StreamingStats};
pub use loader::{ChunkLoadError, ChunkPayload, ChunkTasks};
pub use plugin::{ChunkLoadFailed, ChunkLoaded, ChunkStreamingPlugin, ChunkUnloaded, StreamingSet};
