//! Chunk streaming for large 2D worlds, as a Bevy plugin.
//!
//! The world is cut into square chunks. Chunks near a [`StreamingAnchor`]
//! are loaded (world segment + placement data), their placements resolved
//! and instantiated in batches, and their declared connections wired.
//! Chunks the anchor has left behind are torn down again.

pub mod content;
pub mod placement;
pub mod streaming;

pub use content::{ContentDefinition, ContentResolver, ContentSource};
pub use placement::{InstanceRegistry, PlacementInstance, PlacementRecord};
pub use streaming::{
    ChunkCoordinate, ChunkLifecycle, ChunkState, ChunkStreamingPlugin, StreamingAnchor,
    StreamingBackends, StreamingConfig, StreamingSet,
};
