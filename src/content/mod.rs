//! Content definitions and the id → definition resolver.

pub mod definition;
pub mod resolver;
pub mod source;

pub use definition::{ConnectionPoint, ContentDefinition};
pub use resolver::{ContentError, ContentResolver, ResolutionStrategy, ResolverSettings};
pub use source::{
    load_direct_table, ContentLoadError, ContentSource, MemoryContentSource, RonContentSource,
};
