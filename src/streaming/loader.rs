// src/streaming/loader.rs
//! Async load/unload pipelines. Segment and placement I/O run on the
//! `AsyncComputeTaskPool`; finished tasks are drained once per frame.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use bevy::prelude::*;
use bevy::tasks::{AsyncComputeTaskPool, Task};
use futures_lite::future;

use crate::placement::{InstanceRegistry, InstantiationQueue, PlacementLinks, PlacementRecord};

use super::backends::{SegmentError, StreamingBackends};
use super::components::StreamingAnchor;
use super::config::StreamingConfig;
use super::coords::{is_valid, ChunkCoordinate};
use super::lifecycle::ChunkLifecycle;
use super::plugin::{ChunkLoadFailed, ChunkUnloaded};

/// What a successful load task hands back to the main schedule.
#[derive(Debug)]
pub struct ChunkPayload {
    pub segment: String,
    pub records: Vec<PlacementRecord>,
    /// Set when placement data was missing or unreadable; the chunk is still loaded, empty.
    pub data_error: Option<String>,
    pub source: Option<String>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkLoadError {
    #[error("chunk {0} is outside the streamable range")]
    InvalidCoordinate(ChunkCoordinate),
    #[error("no world segment '{segment}' registered for chunk {coord}")]
    SegmentUnavailable { coord: ChunkCoordinate, segment: String },
    #[error("segment '{segment}' failed to load: {source}")]
    Segment { segment: String, source: SegmentError },
}

impl ChunkLoadError {
    /// Invalid coordinates will never load; everything else may on retry.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::InvalidCoordinate(_))
    }
}

// ---------- Resource to track async work ----------
#[derive(Resource, Default)]
pub struct ChunkTasks {
    pending_loads: VecDeque<ChunkCoordinate>,
    pending_unloads: Vec<ChunkCoordinate>,
    next_dispatch_at: Option<Duration>,
    loads: HashMap<ChunkCoordinate, Task<Result<ChunkPayload, ChunkLoadError>>>,
    unloads: HashMap<ChunkCoordinate, Task<Result<(), SegmentError>>>,
}

impl ChunkTasks {
    /// Loads marked by a tick that have not been dispatched yet.
    pub fn queued_loads(&self) -> usize {
        self.pending_loads.len()
    }

    /// Undispatched loads in dispatch order.
    pub fn queued(&self) -> impl Iterator<Item = ChunkCoordinate> + '_ {
        self.pending_loads.iter().copied()
    }

    pub fn is_in_flight(&self, coord: ChunkCoordinate) -> bool {
        self.loads.contains_key(&coord)
    }

    pub fn loads_in_flight(&self) -> usize {
        self.loads.len()
    }

    pub fn unloads_in_flight(&self) -> usize {
        self.unloads.len()
    }

    /// Nothing queued, nothing running.
    pub fn is_idle(&self) -> bool {
        self.pending_loads.is_empty()
            && self.pending_unloads.is_empty()
            && self.loads.is_empty()
            && self.unloads.is_empty()
    }
}

// ---------- Systems ----------

/// Derive the anchor's chunk and run the lifecycle tick when due.
pub fn plan_streaming(
    time: Res<Time>,
    config: Res<StreamingConfig>,
    anchor_q: Query<&Transform, With<StreamingAnchor>>,
    mut lifecycle: ResMut<ChunkLifecycle>,
    mut tasks: ResMut<ChunkTasks>,
) {
    let Ok(anchor) = anchor_q.single() else { return };
    let Some(player_chunk) = config.player_chunk(anchor.translation.truncate()) else {
        debug!("Anchor at {:?} maps to no valid chunk", anchor.translation);
        return;
    };
    if !lifecycle.needs_tick(player_chunk, time.elapsed()) {
        return;
    }

    let plan = lifecycle.tick(player_chunk, &config);
    tasks.pending_loads.extend(plan.loads);
    tasks.pending_unloads.extend(plan.unloads);
}

/// Tear down every instance a chunk owns, then unload its segment.
pub fn dispatch_unloads(
    mut commands: Commands,
    config: Res<StreamingConfig>,
    backends: Res<StreamingBackends>,
    mut tasks: ResMut<ChunkTasks>,
    mut registry: ResMut<InstanceRegistry>,
    mut links_q: Query<&mut PlacementLinks>,
) {
    if tasks.pending_unloads.is_empty() {
        return;
    }
    let pool = AsyncComputeTaskPool::get();
    let coords: Vec<ChunkCoordinate> = tasks.pending_unloads.drain(..).collect();

    for coord in coords {
        let removed = registry.remove_chunk(coord);
        let gone: HashSet<Entity> = removed.iter().map(|(_, inst)| inst.entity).collect();
        for entity in &gone {
            commands.entity(*entity).despawn();
        }
        if !gone.is_empty() {
            for mut links in links_q.iter_mut() {
                links.0.retain(|l| !gone.contains(&l.target));
            }
        }
        debug!("Chunk {}: destroyed {} instance(s)", coord, gone.len());

        let segment = coord.segment_name(&config.segment_prefix);
        let fut = backends.segments.unload(&segment);
        tasks.unloads.insert(coord, pool.spawn(fut));
    }
}

/// Issue load tasks, at most one per stagger interval.
pub fn dispatch_loads(
    time: Res<Time>,
    config: Res<StreamingConfig>,
    backends: Res<StreamingBackends>,
    mut tasks: ResMut<ChunkTasks>,
) {
    let now = time.elapsed();
    let stagger = config.dispatch_stagger();
    let pool = AsyncComputeTaskPool::get();

    while !tasks.pending_loads.is_empty() {
        if tasks.next_dispatch_at.is_some_and(|at| now < at) {
            break;
        }
        let Some(coord) = tasks.pending_loads.pop_front() else { break };

        let segment = coord.segment_name(&config.segment_prefix);
        let bounds = config.active_bounds().copied();
        let source = backends.placements.describe(coord);
        let caps = StreamingBackends::clone(&backends);
        let task = pool.spawn(async move {
            if !is_valid(coord, bounds.as_ref()) {
                return Err(ChunkLoadError::InvalidCoordinate(coord));
            }
            if !caps.segments.is_registered(&segment) {
                return Err(ChunkLoadError::SegmentUnavailable { coord, segment });
            }
            if let Err(source) = caps.segments.load(&segment).await {
                return Err(ChunkLoadError::Segment { segment, source });
            }
            let (records, data_error) = match caps.placements.fetch(coord).await {
                Ok(records) => (records, None),
                Err(e) => (Vec::new(), Some(e.to_string())),
            };
            Ok(ChunkPayload { segment, records, data_error, source })
        });
        tasks.loads.insert(coord, task);
        trace!("Chunk {}: load dispatched", coord);

        if !stagger.is_zero() {
            tasks.next_dispatch_at = Some(now + stagger);
            break;
        }
    }
}

/// Drain finished load tasks: queue instantiation, or revert on failure.
pub fn receive_loads(
    time: Res<Time>,
    config: Res<StreamingConfig>,
    mut tasks: ResMut<ChunkTasks>,
    mut lifecycle: ResMut<ChunkLifecycle>,
    mut queue: ResMut<InstantiationQueue>,
    mut failed: EventWriter<ChunkLoadFailed>,
) {
    let mut finished = Vec::new();
    tasks.loads.retain(|coord, task| match future::block_on(future::poll_once(task)) {
        None => true,
        Some(result) => {
            finished.push((*coord, result));
            false
        }
    });

    for (coord, result) in finished {
        match result {
            Ok(payload) => {
                if let Some(err) = &payload.data_error {
                    warn!(
                        "Chunk {}: placement data unavailable ({}); loading it empty",
                        coord, err
                    );
                }
                trace!("Chunk {}: segment '{}' ready", coord, payload.segment);
                queue.push(coord, payload.records, payload.source);
            }
            Err(e) => {
                if e.is_retryable() {
                    warn!("Chunk {}: load aborted: {}", coord, e);
                    lifecycle.schedule_retry(time.elapsed() + config.retry_delay());
                } else {
                    debug!("Chunk {}: load skipped: {}", coord, e);
                }
                lifecycle.abort_load(coord);
                failed.write(ChunkLoadFailed { coord, reason: e });
            }
        }
    }
}

/// Drain finished unload tasks and return those chunks to `Unloaded`.
pub fn receive_unloads(
    mut tasks: ResMut<ChunkTasks>,
    mut lifecycle: ResMut<ChunkLifecycle>,
    mut unloaded: EventWriter<ChunkUnloaded>,
) {
    let mut finished = Vec::new();
    tasks.unloads.retain(|coord, task| match future::block_on(future::poll_once(task)) {
        None => true,
        Some(result) => {
            finished.push((*coord, result));
            false
        }
    });

    for (coord, result) in finished {
        if let Err(e) = result {
            warn!("Chunk {}: segment unload failed: {}", coord, e);
        }
        if lifecycle.finish_unload(coord) {
            info!("Chunk {} unloaded", coord);
            unloaded.write(ChunkUnloaded { coord });
        }
    }
}
