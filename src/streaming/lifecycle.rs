// src/streaming/lifecycle.rs
//! Chunk lifecycle bookkeeping: the loaded / loading / unloading sets and
//! the tick that diffs them against the chunks the player needs.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use bevy::prelude::*;

use super::config::StreamingConfig;
use super::coords::{manhattan_distance, needed_chunks, ChunkCoordinate};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChunkState {
    Unloaded,
    Loading,
    Loaded,
}

/// Descriptive state for a loaded chunk. Not used for correctness.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkInfo {
    pub bounds: Rect,
    pub item_count: usize,
    pub source: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamingStats {
    pub ticks: u64,
    pub loads_completed: u64,
    pub loads_failed: u64,
    pub unloads_completed: u64,
    pub placements_instantiated: u64,
    pub placements_skipped: u64,
    pub connections_wired: u64,
    pub connections_unresolved: u64,
}

/// Work produced by one tick. Loads are nearest-first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamingPlan {
    pub loads: Vec<ChunkCoordinate>,
    pub unloads: Vec<ChunkCoordinate>,
}

impl StreamingPlan {
    pub fn is_empty(&self) -> bool {
        self.loads.is_empty() && self.unloads.is_empty()
    }
}

/// Sole owner of chunk state transitions. A coordinate is in at most one
/// of `loaded`, `loading`, `unloading`.
#[derive(Resource, Default, Debug)]
pub struct ChunkLifecycle {
    loaded: HashSet<ChunkCoordinate>,
    loading: HashSet<ChunkCoordinate>,
    unloading: HashSet<ChunkCoordinate>,
    info: HashMap<ChunkCoordinate, ChunkInfo>,
    last_planned: Option<ChunkCoordinate>,
    rescan: bool,
    retry_at: Option<Duration>,
    pub stats: StreamingStats,
}

impl ChunkLifecycle {
    /// Chunks in `unloading` still report `Loaded` until their unload finishes.
    pub fn state(&self, c: ChunkCoordinate) -> ChunkState {
        if self.loading.contains(&c) {
            ChunkState::Loading
        } else if self.loaded.contains(&c) || self.unloading.contains(&c) {
            ChunkState::Loaded
        } else {
            ChunkState::Unloaded
        }
    }

    pub fn is_unloading(&self, c: ChunkCoordinate) -> bool {
        self.unloading.contains(&c)
    }

    pub fn loaded(&self) -> impl Iterator<Item = ChunkCoordinate> + '_ {
        self.loaded.iter().copied()
    }

    pub fn loading(&self) -> impl Iterator<Item = ChunkCoordinate> + '_ {
        self.loading.iter().copied()
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    /// Chunk the last tick was planned around.
    pub fn player_chunk(&self) -> Option<ChunkCoordinate> {
        self.last_planned
    }

    pub fn info(&self, c: ChunkCoordinate) -> Option<&ChunkInfo> {
        self.info.get(&c)
    }

    /// Tick when the player crossed into a new chunk, a pipeline finished,
    /// or a scheduled retry came due.
    pub fn needs_tick(&self, player_chunk: ChunkCoordinate, now: Duration) -> bool {
        self.last_planned != Some(player_chunk)
            || self.rescan
            || self.retry_at.is_some_and(|at| now >= at)
    }

    pub fn request_rescan(&mut self) {
        self.rescan = true;
    }

    /// Earliest pending retry wins.
    pub fn schedule_retry(&mut self, at: Duration) {
        self.retry_at = Some(self.retry_at.map_or(at, |cur| cur.min(at)));
    }

    /// Diff the needed set against the tracking sets. Marks new loads
    /// `loading` and far chunks `unloading`; returns what to dispatch.
    pub fn tick(
        &mut self,
        player_chunk: ChunkCoordinate,
        config: &StreamingConfig,
    ) -> StreamingPlan {
        self.last_planned = Some(player_chunk);
        self.rescan = false;
        self.retry_at = None;
        self.stats.ticks += 1;

        let mut plan = StreamingPlan::default();
        for c in needed_chunks(player_chunk, config.load_radius, config.active_bounds()) {
            if self.loaded.contains(&c)
                || self.loading.contains(&c)
                || self.unloading.contains(&c)
            {
                continue;
            }
            self.loading.insert(c);
            plan.loads.push(c);
        }

        let mut far: Vec<ChunkCoordinate> = self
            .loaded
            .iter()
            .copied()
            .filter(|c| manhattan_distance(player_chunk, *c) > config.unload_radius)
            .collect();
        far.sort_by_key(|c| (c.y, c.x));
        for c in &far {
            self.loaded.remove(c);
            self.unloading.insert(*c);
        }
        plan.unloads = far;

        if !plan.is_empty() {
            debug!(
                "Tick @ {}: {} load(s), {} unload(s)",
                player_chunk,
                plan.loads.len(),
                plan.unloads.len()
            );
        }
        plan
    }

    /// `Loading → Loaded`. Returns false if the chunk was not loading.
    pub fn finish_load(&mut self, c: ChunkCoordinate, info: ChunkInfo) -> bool {
        if !self.loading.remove(&c) {
            return false;
        }
        self.loaded.insert(c);
        self.info.insert(c, info);
        self.stats.loads_completed += 1;
        self.rescan = true;
        true
    }

    /// `Loading → Unloaded` after a failed load.
    pub fn abort_load(&mut self, c: ChunkCoordinate) -> bool {
        if !self.loading.remove(&c) {
            return false;
        }
        self.stats.loads_failed += 1;
        true
    }

    /// `unloading → Unloaded`; drops the chunk's info.
    pub fn finish_unload(&mut self, c: ChunkCoordinate) -> bool {
        if !self.unloading.remove(&c) {
            return false;
        }
        self.info.remove(&c);
        self.stats.unloads_completed += 1;
        self.rescan = true;
        true
    }

    pub fn sets_are_disjoint(&self) -> bool {
        self.loaded.is_disjoint(&self.loading)
            && self.loaded.is_disjoint(&self.unloading)
            && self.loading.is_disjoint(&self.unloading)
    }
}
