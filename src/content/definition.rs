// src/content/definition.rs
//! Resolved content definitions (data form).

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// A loadable unit of content: the asset it instantiates plus the metadata
/// of the connection points it exposes. Immutable once resolved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContentDefinition {
    /// Asset/prefab reference (opaque to the streaming core).
    pub asset: String,

    /// Connection points, addressed by index from `ConnectionRecord`s.
    #[serde(default)]
    pub connection_points: Vec<ConnectionPoint>,

    /// Marks content that needs special handling once spawned.
    #[serde(default)]
    pub special: bool,
}

impl ContentDefinition {
    pub fn new(asset: impl Into<String>) -> Self {
        Self { asset: asset.into(), connection_points: Vec::new(), special: false }
    }

    pub fn with_point(mut self, point: ConnectionPoint) -> Self {
        self.connection_points.push(point);
        self
    }

    pub fn special(mut self) -> Self {
        self.special = true;
        self
    }

    pub fn point(&self, index: u32) -> Option<&ConnectionPoint> {
        self.connection_points.get(index as usize)
    }
}

/// One connection point on a piece of content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectionPoint {
    /// Local offset from the content origin.
    #[serde(default)]
    pub offset: Vec2,

    /// Passage kind ("passable", "one_way", "key", "ability"). Unknown kinds
    /// wire as a plain passage.
    #[serde(default = "default_kind")]
    pub kind: String,

    /// Item or ability that gates the passage, for gated kinds.
    #[serde(default)]
    pub requirement: Option<String>,
}

fn default_kind() -> String {
    "passable".to_string()
}

impl ConnectionPoint {
    pub fn new(kind: impl Into<String>) -> Self {
        Self { offset: Vec2::ZERO, kind: kind.into(), requirement: None }
    }

    pub fn at(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    pub fn requires(mut self, requirement: impl Into<String>) -> Self {
        self.requirement = Some(requirement.into());
        self
    }
}
