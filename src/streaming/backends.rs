// src/streaming/backends.rs
//! Narrow interfaces to the collaborators the streaming core drives, plus
//! the file/memory implementations the crate ships with.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use bevy::prelude::*;

use crate::placement::PlacementRecord;

use super::config::ConfigError;
use super::coords::ChunkCoordinate;

pub type SegmentFuture = Pin<Box<dyn Future<Output = Result<(), SegmentError>> + Send + 'static>>;
pub type PlacementResult = Result<Vec<PlacementRecord>, PlacementDataError>;
pub type PlacementFuture = Pin<Box<dyn Future<Output = PlacementResult> + Send + 'static>>;

// ---------- Traits ----------

/// Engine-side loader for the world segment bound to each chunk.
pub trait WorldSegmentLoader: Send + Sync + 'static {
    fn is_registered(&self, name: &str) -> bool;
    fn load(&self, name: &str) -> SegmentFuture;
    fn unload(&self, name: &str) -> SegmentFuture;
}

/// Source of each chunk's placement records.
pub trait PlacementDataSource: Send + Sync + 'static {
    fn fetch(&self, chunk: ChunkCoordinate) -> PlacementFuture;

    /// Human-readable origin of a chunk's data, for `ChunkInfo`.
    fn describe(&self, _chunk: ChunkCoordinate) -> Option<String> {
        None
    }
}

/// Read-only view of persistent "already acquired" item state.
pub trait OwnedItemQuery: Send + Sync + 'static {
    fn is_owned(&self, item: &str) -> bool;
}

impl OwnedItemQuery for HashSet<String> {
    fn is_owned(&self, item: &str) -> bool {
        self.contains(item)
    }
}

/// Nothing has been acquired yet.
#[derive(Clone, Copy, Debug, Default)]
pub struct NothingOwned;

impl OwnedItemQuery for NothingOwned {
    fn is_owned(&self, _item: &str) -> bool {
        false
    }
}

/// Capabilities injected into the streaming plugin.
#[derive(Resource, Clone)]
pub struct StreamingBackends {
    pub segments: Arc<dyn WorldSegmentLoader>,
    pub placements: Arc<dyn PlacementDataSource>,
    pub owned: Arc<dyn OwnedItemQuery>,
}

impl StreamingBackends {
    pub fn new(
        segments: impl WorldSegmentLoader,
        placements: impl PlacementDataSource,
        owned: impl OwnedItemQuery,
    ) -> Self {
        Self {
            segments: Arc::new(segments),
            placements: Arc::new(placements),
            owned: Arc::new(owned),
        }
    }
}

// ---------- Segment manifest ----------

/// Segments named in a manifest are registered; load/unload complete at once.
#[derive(Clone, Debug, Default)]
pub struct SegmentManifest {
    registered: HashSet<String>,
}

impl SegmentManifest {
    pub fn new(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self { registered: names.into_iter().map(Into::into).collect() }
    }

    /// Read a RON list of segment names.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let names: Vec<String> =
            ron::de::from_str(&text).map_err(|e| ConfigError::Ron(e.to_string()))?;
        Ok(Self::new(names))
    }

    pub fn len(&self) -> usize {
        self.registered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }
}

impl WorldSegmentLoader for SegmentManifest {
    fn is_registered(&self, name: &str) -> bool {
        self.registered.contains(name)
    }

    fn load(&self, name: &str) -> SegmentFuture {
        let result = if self.registered.contains(name) {
            debug!("Segment '{}' loaded", name);
            Ok(())
        } else {
            Err(SegmentError::NotRegistered(name.to_string()))
        };
        Box::pin(async move { result })
    }

    fn unload(&self, name: &str) -> SegmentFuture {
        debug!("Segment '{}' unloaded", name);
        Box::pin(async { Ok(()) })
    }
}

// ---------- Placement sources ----------

/// Reads `{root}/{prefix}_{x}_{y}.placements.ron`.
#[derive(Clone, Debug)]
pub struct RonPlacementSource {
    root: PathBuf,
    prefix: String,
}

impl RonPlacementSource {
    pub const EXTENSION: &'static str = "placements.ron";

    pub fn new(root: impl AsRef<Path>, prefix: impl Into<String>) -> Self {
        Self { root: root.as_ref().to_path_buf(), prefix: prefix.into() }
    }

    pub fn path_for(&self, chunk: ChunkCoordinate) -> PathBuf {
        self.root
            .join(format!("{}.{}", chunk.segment_name(&self.prefix), Self::EXTENSION))
    }
}

fn read_placements(path: &Path) -> Result<Vec<PlacementRecord>, PlacementDataError> {
    if !path.is_file() {
        return Err(PlacementDataError::Missing(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path)?;
    ron::de::from_str(&text).map_err(|e| PlacementDataError::Parse(e.to_string()))
}

impl PlacementDataSource for RonPlacementSource {
    fn fetch(&self, chunk: ChunkCoordinate) -> PlacementFuture {
        let path = self.path_for(chunk);
        Box::pin(async move { read_placements(&path) })
    }

    fn describe(&self, chunk: ChunkCoordinate) -> Option<String> {
        Some(self.path_for(chunk).display().to_string())
    }
}

/// Placement lists held in memory; chunks without an entry are empty.
#[derive(Clone, Debug, Default)]
pub struct MemoryPlacementSource {
    chunks: HashMap<ChunkCoordinate, Vec<PlacementRecord>>,
}

impl MemoryPlacementSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, chunk: ChunkCoordinate, records: Vec<PlacementRecord>) -> Self {
        self.chunks.insert(chunk, records);
        self
    }
}

impl PlacementDataSource for MemoryPlacementSource {
    fn fetch(&self, chunk: ChunkCoordinate) -> PlacementFuture {
        let records = self.chunks.get(&chunk).cloned().unwrap_or_default();
        Box::pin(async move { Ok(records) })
    }

    fn describe(&self, chunk: ChunkCoordinate) -> Option<String> {
        Some(format!("memory:{}", chunk))
    }
}

// ---------- Errors ----------

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SegmentError {
    #[error("segment '{0}' is not registered")]
    NotRegistered(String),
    #[error("segment backend failure: {0}")]
    Backend(String),
}

#[derive(thiserror::Error, Debug)]
pub enum PlacementDataError {
    #[error("no placement data at {0}")]
    Missing(PathBuf),
    #[error("I/O while reading placement data: {0}")]
    Io(#[from] std::io::Error),
    #[error("placement data parse error: {0}")]
    Parse(String),
}
