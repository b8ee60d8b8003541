//! Streaming plugin wiring (glue).
//! - Config, backends and resolver resources
//! - World root entity
//! - Chunk load/unload events
//! - Per-frame pipeline, ordered by `StreamingSet`

use std::sync::Arc;

use bevy::prelude::*;

use crate::content::{ContentDefinition, ContentResolver, ContentSource};
use crate::placement::{instantiate_pending_chunks, InstanceRegistry, InstantiationQueue};

use super::backends::StreamingBackends;
use super::components::{StreamingRoot, StreamingRootEntity};
use super::config::{ConfigError, StreamingConfig};
use super::coords::ChunkCoordinate;
use super::lifecycle::ChunkLifecycle;
use super::loader::{
    dispatch_loads, dispatch_unloads, plan_streaming, receive_loads, receive_unloads,
    ChunkLoadError,
    ChunkTasks,
};

/// Fired when a chunk finished instantiating and became `Loaded`.
#[derive(Event, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkLoaded {
    pub coord: ChunkCoordinate,
    pub placements: usize,
}

/// Fired when a chunk's unload completed.
#[derive(Event, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkUnloaded {
    pub coord: ChunkCoordinate,
}

/// Fired when a load was aborted and the chunk reverted to `Unloaded`.
#[derive(Event, Clone, Debug, PartialEq, Eq)]
pub struct ChunkLoadFailed {
    pub coord: ChunkCoordinate,
    pub reason: ChunkLoadError,
}

/// Per-frame ordering of the streaming pipeline.
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub enum StreamingSet {
    Plan,
    Unload,
    Dispatch,
    Receive,
    Instantiate,
    Finalize,
}

pub struct ChunkStreamingPlugin {
    config: StreamingConfig,
    backends: StreamingBackends,
    content: Arc<dyn ContentSource>,
    direct: Vec<(String, ContentDefinition)>,
}

impl ChunkStreamingPlugin {
    /// Fails if `config` does not validate.
    pub fn new(
        config: StreamingConfig,
        backends: StreamingBackends,
        content: Arc<dyn ContentSource>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, backends, content, direct: Vec::new() })
    }

    /// Explicit id → definition mappings tried before any path lookup.
    pub fn with_direct_entries(
        mut self,
        entries: impl IntoIterator<Item = (String, ContentDefinition)>,
    ) -> Self {
        self.direct.extend(entries);
        self
    }
}

impl Plugin for ChunkStreamingPlugin {
    fn build(&self, app: &mut App) {
        let root = app
            .world_mut()
            .spawn((Name::new("StreamingRoot"), StreamingRoot, Transform::default()))
            .id();

        let resolver = ContentResolver::new(self.content.clone(), self.config.content.clone())
            .with_direct_entries(self.direct.iter().cloned());

        app.insert_resource(self.config.clone())
            .insert_resource(self.backends.clone())
            .insert_resource(resolver)
            .insert_resource(StreamingRootEntity(root))
            .init_resource::<ChunkLifecycle>()
            .init_resource::<ChunkTasks>()
            .init_resource::<InstanceRegistry>()
            .init_resource::<InstantiationQueue>()

            .add_event::<ChunkLoaded>()
            .add_event::<ChunkUnloaded>()
            .add_event::<ChunkLoadFailed>()

            .configure_sets(
                Update,
                (
                    StreamingSet::Plan,
                    StreamingSet::Unload,
                    StreamingSet::Dispatch,
                    StreamingSet::Receive,
                    StreamingSet::Instantiate,
                    StreamingSet::Finalize,
                )
                    .chain(),
            )
            .add_systems(Update, plan_streaming.in_set(StreamingSet::Plan))
            .add_systems(Update, dispatch_unloads.in_set(StreamingSet::Unload))
            .add_systems(Update, dispatch_loads.in_set(StreamingSet::Dispatch))
            .add_systems(Update, receive_loads.in_set(StreamingSet::Receive))
            .add_systems(Update, instantiate_pending_chunks.in_set(StreamingSet::Instantiate))
            .add_systems(Update, receive_unloads.in_set(StreamingSet::Finalize));

        info!(
            "Streaming: chunk_size={}, load_radius={}, unload_radius={}",
            self.config.chunk_size, self.config.load_radius, self.config.unload_radius
        );
    }
}
