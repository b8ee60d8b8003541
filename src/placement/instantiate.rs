// src/placement/instantiate.rs
use std::collections::VecDeque;
use std::sync::Arc;

use bevy::prelude::*;

use crate::content::{ContentError, ContentResolver};
use crate::streaming::{
    ChunkCoordinate, ChunkInfo, ChunkLifecycle, ChunkLoaded, OwnedItemQuery, StreamingBackends,
    StreamingConfig, StreamingRootEntity,
};

use super::components::{PlacementInstance, PlacementLinks, SpecialContent};
use super::record::PlacementRecord;
use super::registry::{InstanceRegistry, RegisteredInstance};
use super::wiring::wire_chunk;

/// A chunk whose placement data arrived and is being instantiated in batches.
#[derive(Debug)]
pub struct InstantiationJob {
    pub coord: ChunkCoordinate,
    pub records: Arc<[PlacementRecord]>,
    pub source: Option<String>,
    cursor: usize,
    spawned: usize,
    skipped: usize,
}

impl InstantiationJob {
    fn is_done(&self) -> bool {
        self.cursor >= self.records.len()
    }
}

/// Chunks waiting for (more) instantiation, oldest first.
#[derive(Resource, Default, Debug)]
pub struct InstantiationQueue {
    jobs: VecDeque<InstantiationJob>,
}

impl InstantiationQueue {
    pub fn push(
        &mut self,
        coord: ChunkCoordinate,
        records: Vec<PlacementRecord>,
        source: Option<String>,
    ) {
        self.jobs.push_back(InstantiationJob {
            coord,
            records: Arc::from(records),
            source,
            cursor: 0,
            spawned: 0,
            skipped: 0,
        });
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn contains(&self, coord: ChunkCoordinate) -> bool {
        self.jobs.iter().any(|j| j.coord == coord)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlacementOutcome {
    Spawned(Entity),
    /// Owner item already acquired.
    SkippedOwned,
    /// Key already registered by this or another chunk.
    SkippedDuplicate,
}

/// Instantiate one record under `root` and register it. Resolution failure
/// is returned to the caller; nothing is spawned in that case.
pub fn instantiate_placement(
    commands: &mut Commands,
    root: Entity,
    chunk: ChunkCoordinate,
    record: &PlacementRecord,
    resolver: &mut ContentResolver,
    registry: &mut InstanceRegistry,
    owned: &dyn OwnedItemQuery,
) -> Result<PlacementOutcome, ContentError> {
    if record.owner_item.as_deref().is_some_and(|item| owned.is_owned(item)) {
        return Ok(PlacementOutcome::SkippedOwned);
    }
    let key = record.instance_key();
    if registry.contains(&key) {
        return Ok(PlacementOutcome::SkippedDuplicate);
    }

    let content = resolver.resolve(&record.content_id)?;

    let mut e = commands.spawn((
        Name::new(key.to_string()),
        PlacementInstance { key: key.clone(), chunk, kind: record.kind, content: content.clone() },
        record.transform(),
        ChildOf(root),
    ));
    if content.special {
        e.insert(SpecialContent);
    }
    let entity = e.id();

    registry.register(key, RegisteredInstance { entity, chunk, content });
    Ok(PlacementOutcome::Spawned(entity))
}

// ---------- Systems ----------

/// One batch per pending chunk per frame. A chunk whose last batch is done
/// gets wired, marked loaded and announced.
#[allow(clippy::too_many_arguments)]
pub fn instantiate_pending_chunks(
    mut commands: Commands,
    config: Res<StreamingConfig>,
    root: Res<StreamingRootEntity>,
    backends: Res<StreamingBackends>,
    mut queue: ResMut<InstantiationQueue>,
    mut resolver: ResMut<ContentResolver>,
    mut registry: ResMut<InstanceRegistry>,
    mut lifecycle: ResMut<ChunkLifecycle>,
    mut loaded: EventWriter<ChunkLoaded>,
) {
    if queue.is_empty() {
        return;
    }
    let owned = backends.owned.as_ref();
    let batch = config.instantiate_batch_size.max(1);

    for job in queue.jobs.iter_mut() {
        let end = (job.cursor + batch).min(job.records.len());
        for record in &job.records[job.cursor..end] {
            match instantiate_placement(
                &mut commands,
                root.0,
                job.coord,
                record,
                &mut resolver,
                &mut registry,
                owned,
            ) {
                Ok(PlacementOutcome::Spawned(_)) => job.spawned += 1,
                Ok(skip) => {
                    debug!("Chunk {}: '{}' skipped ({:?})", job.coord, record.content_id, skip);
                    job.skipped += 1;
                }
                Err(e) => {
                    warn!(
                        "Chunk {}: placement '{}' not instantiated: {}",
                        job.coord, record.content_id, e
                    );
                    job.skipped += 1;
                }
            }
        }
        job.cursor = end;
    }

    while let Some(idx) = queue.jobs.iter().position(InstantiationJob::is_done) {
        let Some(job) = queue.jobs.remove(idx) else { break };
        registry.set_chunk_records(job.coord, job.records.clone());

        let wiring = wire_chunk(job.coord, &job.records, &registry, owned);
        for (entity, links) in wiring.links {
            commands.entity(entity).insert(PlacementLinks(links));
        }

        let info = ChunkInfo {
            bounds: job.coord.world_bounds(config.chunk_size),
            item_count: job.spawned,
            source: job.source,
        };
        if !lifecycle.finish_load(job.coord, info) {
            warn!("Chunk {} finished instantiating but was not loading", job.coord);
        }
        let stats = &mut lifecycle.stats;
        stats.placements_instantiated += job.spawned as u64;
        stats.placements_skipped += job.skipped as u64;
        stats.connections_wired += wiring.wired as u64;
        stats.connections_unresolved += wiring.unresolved as u64;

        info!(
            "Chunk {} loaded: {} placement(s), {} skipped, {} link(s)",
            job.coord, job.spawned, job.skipped, wiring.wired
        );
        loaded.write(ChunkLoaded { coord: job.coord, placements: job.spawned });
    }
}
