// src/streaming/coords.rs
//! Chunk lattice math: world position → chunk coordinate, bounds, distances.

use std::fmt;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Integer chunk coordinate on the 2D world lattice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkCoordinate {
    pub x: i32,
    pub y: i32,
}

impl ChunkCoordinate {
    /// Produced for non-finite positions; never valid.
    pub const INVALID: Self = Self { x: i32::MIN, y: i32::MIN };

    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// True for the sentinel and for saturated (overflowed) components.
    #[inline]
    pub fn is_sentinel(self) -> bool {
        let edge = |v: i32| v == i32::MIN || v == i32::MAX;
        edge(self.x) || edge(self.y)
    }

    /// World-space square covered by this chunk.
    pub fn world_bounds(self, chunk_size: f32) -> Rect {
        let min = Vec2::new(self.x as f32, self.y as f32) * chunk_size;
        Rect::from_corners(min, min + Vec2::splat(chunk_size))
    }

    /// Name of the world segment bound to this chunk.
    pub fn segment_name(self, prefix: &str) -> String {
        format!("{}_{}_{}", prefix, self.x, self.y)
    }
}

impl fmt::Display for ChunkCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Inclusive range of streamable chunk coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkBounds {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl ChunkBounds {
    pub const fn new(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    pub fn contains(&self, c: ChunkCoordinate) -> bool {
        c.x >= self.min_x && c.x <= self.max_x && c.y >= self.min_y && c.y <= self.max_y
    }

    pub fn is_inverted(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    /// Clamp into range. Sentinels pass through untouched so they stay rejectable.
    pub fn clamp(&self, c: ChunkCoordinate) -> ChunkCoordinate {
        if c.is_sentinel() {
            return c;
        }
        ChunkCoordinate::new(c.x.clamp(self.min_x, self.max_x), c.y.clamp(self.min_y, self.max_y))
    }
}

/// Floor-divide a world position into its chunk coordinate.
pub fn coordinate_of(position: Vec2, chunk_size: f32) -> ChunkCoordinate {
    if !position.is_finite() || !chunk_size.is_finite() || chunk_size <= 0.0 {
        return ChunkCoordinate::INVALID;
    }
    let cx = (position.x / chunk_size).floor() as i32;
    let cy = (position.y / chunk_size).floor() as i32;
    ChunkCoordinate::new(cx, cy)
}

/// Rejects sentinels and, when range-limiting is active, anything out of bounds.
pub fn is_valid(c: ChunkCoordinate, bounds: Option<&ChunkBounds>) -> bool {
    !c.is_sentinel() && bounds.is_none_or(|b| b.contains(c))
}

/// |dx| + |dy|, saturating.
#[inline]
pub fn manhattan_distance(a: ChunkCoordinate, b: ChunkCoordinate) -> u32 {
    a.x.abs_diff(b.x).saturating_add(a.y.abs_diff(b.y))
}

/// Every valid coordinate within `radius` (manhattan) of `center`,
/// nearest first. Scans the bounding square of side `2 * radius + 1`.
pub fn needed_chunks(
    center: ChunkCoordinate,
    radius: u32,
    bounds: Option<&ChunkBounds>,
) -> Vec<ChunkCoordinate> {
    let r = radius.min(i32::MAX as u32) as i32;
    let mut out = Vec::new();
    for dy in -r..=r {
        for dx in -r..=r {
            let (Some(x), Some(y)) = (center.x.checked_add(dx), center.y.checked_add(dy)) else {
                continue;
            };
            let c = ChunkCoordinate::new(x, y);
            if manhattan_distance(center, c) <= radius && is_valid(c, bounds) {
                out.push(c);
            }
        }
    }
    out.sort_by_key(|c| (manhattan_distance(center, *c), c.y, c.x));
    out
}
