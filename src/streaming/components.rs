// src/streaming/components.rs
use bevy::prelude::*;

/// Entity whose translation drives streaming (usually the player).
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct StreamingAnchor;

/// Marker on the world root that parents every placement instance.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct StreamingRoot;

/// The root entity, spawned when the plugin builds.
#[derive(Resource, Debug, Clone, Copy)]
pub struct StreamingRootEntity(pub Entity);
