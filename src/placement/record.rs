// src/placement/record.rs
//! Per-chunk placement data (read-only, one list per chunk load).

use std::f32::consts::FRAC_PI_2;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::registry::InstanceKey;

/// What a placement represents. Only used for bookkeeping/queries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementKind {
    Room,
    Collectible,
    #[default]
    Other,
}

/// One piece of content to instantiate in a chunk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacementRecord {
    pub content_id: String,
    pub position: Vec2,
    /// Quarter turns; interpreted modulo 4.
    #[serde(default)]
    pub rotation: u8,
    #[serde(default)]
    pub kind: PlacementKind,
    /// Item that, once acquired, suppresses this placement.
    #[serde(default)]
    pub owner_item: Option<String>,
    #[serde(default)]
    pub connections: Vec<ConnectionRecord>,
}

impl PlacementRecord {
    pub fn new(content_id: impl Into<String>, position: Vec2) -> Self {
        Self {
            content_id: content_id.into(),
            position,
            rotation: 0,
            kind: PlacementKind::Other,
            owner_item: None,
            connections: Vec::new(),
        }
    }

    pub fn kind(mut self, kind: PlacementKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn rotated(mut self, quarter_turns: u8) -> Self {
        self.rotation = quarter_turns;
        self
    }

    pub fn owned_by(mut self, item: impl Into<String>) -> Self {
        self.owner_item = Some(item.into());
        self
    }

    pub fn connect(
        mut self,
        local_point: u32,
        target_id: impl Into<String>,
        target_point: u32,
    ) -> Self {
        let target_id = target_id.into();
        self.connections.push(ConnectionRecord { local_point, target_id, target_point });
        self
    }

    #[inline]
    pub fn quarter_turns(&self) -> u8 {
        self.rotation % 4
    }

    pub fn transform(&self) -> Transform {
        Transform::from_translation(self.position.extend(0.0))
            .with_rotation(Quat::from_rotation_z(self.quarter_turns() as f32 * FRAC_PI_2))
    }

    pub fn instance_key(&self) -> InstanceKey {
        InstanceKey::new(&self.content_id, self.position)
    }
}

/// A declared link from one of this placement's points to a point on
/// another placement, addressed by content id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub local_point: u32,
    pub target_id: String,
    pub target_point: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_wraps_to_quarter_turns() {
        let r = PlacementRecord::new("a", Vec2::ZERO).rotated(5);
        assert_eq!(r.quarter_turns(), 1);
        let (axis, angle) = r.transform().rotation.to_axis_angle();
        assert!((angle - FRAC_PI_2).abs() < 1e-5);
        assert!((axis - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn placement_lists_parse_from_ron() {
        let text = r#"[
            (
                content_id: "rooms/hall",
                position: (50.0, 50.0),
                kind: Room,
                connections: [(local_point: 0, target_id: "rooms/corridor", target_point: 1)],
            ),
            (
                content_id: "items/key",
                position: (10.0, 20.0),
                kind: Collectible,
                owner_item: Some("key_red"),
            ),
        ]"#;
        let records: Vec<PlacementRecord> = ron::de::from_str(text).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].connections[0].target_id, "rooms/corridor");
        assert_eq!(records[0].rotation, 0);
        assert_eq!(records[1].owner_item.as_deref(), Some("key_red"));
        assert_eq!(records[1].kind, PlacementKind::Collectible);
    }
}
