// src/streaming/config.rs
use std::path::Path;
use std::time::Duration;

use bevy::prelude::*;
use serde::Deserialize;

use crate::content::ResolverSettings;

use super::coords::{coordinate_of, ChunkBounds, ChunkCoordinate};

/// Streaming tunables. Loadable from RON; every field has a default.
#[derive(Resource, Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// World units per chunk side.
    pub chunk_size: f32,
    /// Manhattan radius (chunks) kept loaded around the player chunk.
    pub load_radius: u32,
    /// Loaded chunks further than this are unloaded. Must exceed `load_radius`.
    pub unload_radius: u32,
    pub bounds: ChunkBounds,
    pub clamp_to_bounds: bool,
    /// Delay between successive load dispatches.
    pub dispatch_stagger_ms: u64,
    /// Placement records instantiated per chunk per frame.
    pub instantiate_batch_size: usize,
    /// Wait before re-planning after a segment failure.
    pub retry_delay_ms: u64,
    pub segment_prefix: String,
    pub content: ResolverSettings,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 100.0,
            load_radius: 1,
            unload_radius: 2,
            bounds: ChunkBounds::new(-64, -64, 64, 64),
            clamp_to_bounds: true,
            dispatch_stagger_ms: 50,
            instantiate_batch_size: 8,
            retry_delay_ms: 2000,
            segment_prefix: "Chunk".to_string(),
            content: ResolverSettings::default(),
        }
    }
}

impl StreamingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.chunk_size.is_finite() || self.chunk_size <= 0.0 {
            return Err(ConfigError::ChunkSize(self.chunk_size));
        }
        if self.unload_radius <= self.load_radius {
            return Err(ConfigError::NoHysteresis {
                load: self.load_radius,
                unload: self.unload_radius,
            });
        }
        if self.instantiate_batch_size == 0 {
            return Err(ConfigError::ZeroBatch);
        }
        if self.bounds.is_inverted() {
            return Err(ConfigError::InvertedBounds(self.bounds));
        }
        Ok(())
    }

    /// Parse and validate.
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::de::from_str(text).map_err(|e| ConfigError::Ron(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_ron_str(&text)?;
        info!("Loaded streaming config from {}", path.display());
        Ok(config)
    }

    /// Bounds used for validity/clamping, `None` when range-limiting is off.
    pub fn active_bounds(&self) -> Option<&ChunkBounds> {
        self.clamp_to_bounds.then_some(&self.bounds)
    }

    /// Chunk containing `position`, clamped when enabled. `None` for
    /// positions that map to an invalid coordinate.
    pub fn player_chunk(&self, position: Vec2) -> Option<ChunkCoordinate> {
        let raw = coordinate_of(position, self.chunk_size);
        if raw.is_sentinel() {
            return None;
        }
        Some(match self.active_bounds() {
            Some(bounds) => bounds.clamp(raw),
            None => raw,
        })
    }

    pub fn dispatch_stagger(&self) -> Duration {
        Duration::from_millis(self.dispatch_stagger_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("chunk_size must be positive and finite, got {0}")]
    ChunkSize(f32),
    #[error("unload_radius ({unload}) must be greater than load_radius ({load})")]
    NoHysteresis { load: u32, unload: u32 },
    #[error("instantiate_batch_size must be at least 1")]
    ZeroBatch,
    #[error("bounds are inverted: {0:?}")]
    InvertedBounds(ChunkBounds),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(String),
}
