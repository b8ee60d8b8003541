// src/placement/components.rs
use bevy::prelude::*;
use std::sync::Arc;

use crate::content::ContentDefinition;
use crate::streaming::ChunkCoordinate;

use super::record::PlacementKind;
use super::registry::InstanceKey;

/// Tag on each instantiated placement (stable identity + owning chunk).
#[derive(Component, Debug, Clone)]
pub struct PlacementInstance {
    pub key: InstanceKey,
    pub chunk: ChunkCoordinate,
    pub kind: PlacementKind,
    pub content: Arc<ContentDefinition>,
}

/// Marker for instances whose definition is flagged `special`.
#[derive(Component, Debug, Clone, Copy)]
pub struct SpecialContent;

/// Neighbor references attached by connection wiring.
#[derive(Component, Debug, Clone, Default, PartialEq)]
pub struct PlacementLinks(pub Vec<PlacementLink>);

impl PlacementLinks {
    pub fn to_target(&self, key: &InstanceKey) -> Option<&PlacementLink> {
        self.0.iter().find(|l| &l.target_key == key)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacementLink {
    pub local_point: u32,
    pub target: Entity,
    pub target_key: InstanceKey,
    pub target_point: u32,
    pub passage: Passage,
}

/// Traversal behaviour set up for a link, chosen by the local point's kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Passage {
    Open,
    OneWay,
    KeyGated { key: String, unlocked: bool },
    AbilityGated { ability: String },
}
