// src/placement/registry.rs
use bevy::prelude::*;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::content::ContentDefinition;
use crate::streaming::ChunkCoordinate;

use super::record::PlacementRecord;

/// Positions are keyed at 1/100 world unit.
const KEY_QUANTUM: f32 = 100.0;

/// Composite identity of a placement instance: content id + position.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InstanceKey {
    pub content_id: String,
    pub x: i64,
    pub y: i64,
}

impl InstanceKey {
    pub fn new(content_id: &str, position: Vec2) -> Self {
        Self {
            content_id: content_id.to_string(),
            x: (position.x * KEY_QUANTUM).round() as i64,
            y: (position.y * KEY_QUANTUM).round() as i64,
        }
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@({:.2},{:.2})",
            self.content_id,
            self.x as f64 / KEY_QUANTUM as f64,
            self.y as f64 / KEY_QUANTUM as f64
        )
    }
}

/// Registry entry for a live instance.
#[derive(Clone, Debug)]
pub struct RegisteredInstance {
    pub entity: Entity,
    /// Chunk whose data created the instance (owns its lifetime).
    pub chunk: ChunkCoordinate,
    pub content: Arc<ContentDefinition>,
}

/// Live placement instances by composite key, bucketed by owning chunk,
/// plus the placement data of every chunk that finished loading.
#[derive(Resource, Default)]
pub struct InstanceRegistry {
    instances: HashMap<InstanceKey, RegisteredInstance>,
    by_chunk: HashMap<ChunkCoordinate, Vec<InstanceKey>>,
    records: HashMap<ChunkCoordinate, Arc<[PlacementRecord]>>,
}

impl InstanceRegistry {
    /// Register an instance. Returns `false` (and changes nothing) if the key is taken.
    pub fn register(&mut self, key: InstanceKey, instance: RegisteredInstance) -> bool {
        if self.instances.contains_key(&key) {
            return false;
        }
        self.by_chunk.entry(instance.chunk).or_default().push(key.clone());
        self.instances.insert(key, instance);
        true
    }

    pub fn get(&self, key: &InstanceKey) -> Option<&RegisteredInstance> {
        self.instances.get(key)
    }

    pub fn contains(&self, key: &InstanceKey) -> bool {
        self.instances.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn count_in(&self, chunk: ChunkCoordinate) -> usize {
        self.by_chunk.get(&chunk).map_or(0, Vec::len)
    }

    /// Remember a chunk's placement data for cross-chunk connection lookups.
    pub fn set_chunk_records(&mut self, chunk: ChunkCoordinate, records: Arc<[PlacementRecord]>) {
        self.records.insert(chunk, records);
    }

    /// Whether any retained chunk data holds a placement of `content_id`.
    pub fn has_placement(&self, content_id: &str) -> bool {
        self.records.values().any(|records| records.iter().any(|r| r.content_id == content_id))
    }

    /// Live instance a connection from `source` (at `near`, in chunk `home`)
    /// should target. The source itself never matches. Candidates in `home`
    /// come first, then the nearest one; ties go to the lower chunk `(y, x)`,
    /// then the lower key position.
    pub fn find_target(
        &self,
        content_id: &str,
        source: &InstanceKey,
        home: ChunkCoordinate,
        near: Vec2,
    ) -> Option<(InstanceKey, &RegisteredInstance)> {
        self.records
            .iter()
            .flat_map(|(chunk, records)| records.iter().map(move |r| (*chunk, r)))
            .filter(|(_, r)| r.content_id == content_id)
            .filter_map(|(chunk, r)| {
                let key = r.instance_key();
                if &key == source {
                    return None;
                }
                let live = self.instances.get(&key)?;
                Some((chunk, r.position.distance_squared(near), key, live))
            })
            .min_by(|a, b| {
                (a.0 != home)
                    .cmp(&(b.0 != home))
                    .then_with(|| a.1.total_cmp(&b.1))
                    .then_with(|| (a.0.y, a.0.x).cmp(&(b.0.y, b.0.x)))
                    .then_with(|| (a.2.y, a.2.x).cmp(&(b.2.y, b.2.x)))
            })
            .map(|(_, _, key, live)| (key, live))
    }

    /// Forget everything owned by `chunk`; returns the removed instances.
    pub fn remove_chunk(
        &mut self,
        chunk: ChunkCoordinate,
    ) -> Vec<(InstanceKey, RegisteredInstance)> {
        self.records.remove(&chunk);
        let Some(keys) = self.by_chunk.remove(&chunk) else {
            return Vec::new();
        };
        keys.into_iter()
            .filter_map(|k| self.instances.remove(&k).map(|inst| (k, inst)))
            .collect()
    }
}
