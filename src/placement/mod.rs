// src/placement/mod.rs
//! Placement records, their live instances, and connection wiring.

pub mod components;
pub mod instantiate;
pub mod record;
pub mod registry;
pub mod wiring;

pub use components::{Passage, PlacementInstance, PlacementLink, PlacementLinks, SpecialContent};
pub use instantiate::{
    instantiate_pending_chunks, instantiate_placement, InstantiationQueue, PlacementOutcome,
};
pub use record::{ConnectionRecord, PlacementKind, PlacementRecord};
pub use registry::{InstanceKey, InstanceRegistry, RegisteredInstance};
pub use wiring::{passage_for, wire_chunk, ConnectionError, WiringOutcome};
