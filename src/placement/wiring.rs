// src/placement/wiring.rs
//! Connection wiring for a freshly instantiated chunk.
//!
//! Targets are looked up in the placement data of loaded chunks only. A
//! connection whose target is not instantiated right now is skipped and is
//! not revisited when the target's chunk loads later.

use bevy::prelude::*;

use crate::content::ConnectionPoint;
use crate::streaming::{ChunkCoordinate, OwnedItemQuery};

use super::components::{Passage, PlacementLink};
use super::record::{ConnectionRecord, PlacementRecord};
use super::registry::{InstanceRegistry, RegisteredInstance};

/// Links to attach, grouped by source entity.
#[derive(Debug, Default)]
pub struct WiringOutcome {
    pub links: Vec<(Entity, Vec<PlacementLink>)>,
    pub wired: usize,
    pub unresolved: usize,
}

/// Wire every connection declared by `records` (the chunk's own data).
pub fn wire_chunk(
    chunk: ChunkCoordinate,
    records: &[PlacementRecord],
    registry: &InstanceRegistry,
    owned: &dyn OwnedItemQuery,
) -> WiringOutcome {
    let mut out = WiringOutcome::default();

    for record in records.iter().filter(|r| !r.connections.is_empty()) {
        let source_key = record.instance_key();
        // Not instantiated (owned, unresolved): nothing to wire from.
        let Some(source) = registry.get(&source_key) else { continue };
        // Duplicate of an instance another chunk owns; that chunk wired it.
        if source.chunk != chunk {
            continue;
        }

        let mut links = Vec::with_capacity(record.connections.len());
        for conn in &record.connections {
            match link_for(chunk, record, source, conn, registry, owned) {
                Ok(link) => links.push(link),
                Err(e) => {
                    debug!("Chunk {}: connection {} skipped: {}", chunk, source_key, e);
                    out.unresolved += 1;
                }
            }
        }
        if links.is_empty() {
            continue;
        }

        out.wired += links.len();
        match out.links.iter_mut().find(|(e, _)| *e == source.entity) {
            Some((_, existing)) => existing.extend(links),
            None => out.links.push((source.entity, links)),
        }
    }
    out
}

fn link_for(
    chunk: ChunkCoordinate,
    record: &PlacementRecord,
    source: &RegisteredInstance,
    conn: &ConnectionRecord,
    registry: &InstanceRegistry,
    owned: &dyn OwnedItemQuery,
) -> Result<PlacementLink, ConnectionError> {
    let source_key = record.instance_key();
    let Some((target_key, target)) =
        registry.find_target(&conn.target_id, &source_key, chunk, record.position)
    else {
        return Err(if registry.has_placement(&conn.target_id) {
            ConnectionError::TargetNotInstantiated(conn.target_id.clone())
        } else {
            ConnectionError::TargetNotLoaded(conn.target_id.clone())
        });
    };

    let local = source.content.point(conn.local_point).ok_or(ConnectionError::PointOutOfRange {
        content: source_key.content_id.clone(),
        index: conn.local_point,
    })?;
    if target.content.point(conn.target_point).is_none() {
        return Err(ConnectionError::PointOutOfRange {
            content: conn.target_id.clone(),
            index: conn.target_point,
        });
    }

    Ok(PlacementLink {
        local_point: conn.local_point,
        target: target.entity,
        target_key,
        target_point: conn.target_point,
        passage: passage_for(local, owned),
    })
}

/// Kind-specific setup; unrecognized kinds and gates without a requirement are plain.
pub fn passage_for(point: &ConnectionPoint, owned: &dyn OwnedItemQuery) -> Passage {
    match (point.kind.as_str(), point.requirement.as_deref()) {
        ("one_way", _) => Passage::OneWay,
        ("key", Some(key)) => {
            Passage::KeyGated { key: key.to_string(), unlocked: owned.is_owned(key) }
        }
        ("ability", Some(ability)) => Passage::AbilityGated { ability: ability.to_string() },
        ("passable" | "open", _) => Passage::Open,
        (other, _) => {
            trace!("Connection kind '{}' wired as a plain passage", other);
            Passage::Open
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("target '{0}' is not in any loaded chunk")]
    TargetNotLoaded(String),
    #[error("no placement of '{0}' is instantiated")]
    TargetNotInstantiated(String),
    #[error("'{content}' has no connection point #{index}")]
    PointOutOfRange { content: String, index: u32 },
}
