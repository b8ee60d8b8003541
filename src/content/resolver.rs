// src/content/resolver.rs
//! Opaque content id → `ContentDefinition`, memoized for the process lifetime.
//!
//! Resolution order (first hit wins, later tiers only tried on a miss):
//! 1. direct table configured ahead of time
//! 2. convention path: `{content_root}/{name}`, where `name` is the id after
//!    its last separator
//! 3. fallback templates, in order (`{name}` / `{id}` placeholders)
//!
//! Hits are cached and never evicted. Misses are not cached, so content that
//! becomes available later still resolves on a retry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::definition::ContentDefinition;
use super::source::ContentSource;

const SEPARATORS: [char; 3] = ['/', '\\', ':'];

/// Tunables for tiers 2 and 3.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    pub content_root: String,
    pub fallback_templates: Vec<String>,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            content_root: "content".to_string(),
            fallback_templates: vec![
                "content/rooms/{name}".to_string(),
                "content/items/{name}".to_string(),
                "{id}".to_string(),
            ],
        }
    }
}

/// Which tier satisfied a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolutionStrategy {
    DirectTable,
    Convention,
    Fallback(usize),
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DirectTable => f.write_str("direct table"),
            Self::Convention => f.write_str("convention path"),
            Self::Fallback(i) => write!(f, "fallback template #{i}"),
        }
    }
}

#[derive(Resource)]
pub struct ContentResolver {
    source: Arc<dyn ContentSource>,
    settings: ResolverSettings,
    direct: HashMap<String, Arc<ContentDefinition>>,
    cache: HashMap<String, Arc<ContentDefinition>>,
}

impl ContentResolver {
    pub fn new(source: Arc<dyn ContentSource>, settings: ResolverSettings) -> Self {
        Self { source, settings, direct: HashMap::new(), cache: HashMap::new() }
    }

    pub fn with_direct_entries(
        mut self,
        entries: impl IntoIterator<Item = (String, ContentDefinition)>,
    ) -> Self {
        self.direct.extend(entries.into_iter().map(|(id, def)| (id, Arc::new(def))));
        self
    }

    /// Resolve `id`, consulting the cache first.
    pub fn resolve(&mut self, id: &str) -> Result<Arc<ContentDefinition>, ContentError> {
        if let Some(def) = self.cache.get(id) {
            return Ok(Arc::clone(def));
        }
        if id.is_empty() {
            return Err(ContentError::EmptyId);
        }

        let Some((def, strategy)) = self.walk_chain(id) else {
            return Err(ContentError::NotFound(id.to_string()));
        };
        debug!("Content '{}' resolved via {}", id, strategy);
        self.cache.insert(id.to_string(), Arc::clone(&def));
        Ok(def)
    }

    pub fn is_cached(&self, id: &str) -> bool {
        self.cache.contains_key(id)
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    fn walk_chain(&self, id: &str) -> Option<(Arc<ContentDefinition>, ResolutionStrategy)> {
        if let Some(def) = self.direct.get(id) {
            return Some((Arc::clone(def), ResolutionStrategy::DirectTable));
        }

        let name = convention_name(id);
        if let Some(name) = name {
            let path = format!("{}/{}", self.settings.content_root, name);
            if let Some(def) = self.try_path(id, &path) {
                return Some((def, ResolutionStrategy::Convention));
            }
        }

        for (i, template) in self.settings.fallback_templates.iter().enumerate() {
            let path = template.replace("{name}", name.unwrap_or(id)).replace("{id}", id);
            if let Some(def) = self.try_path(id, &path) {
                return Some((def, ResolutionStrategy::Fallback(i)));
            }
        }
        None
    }

    fn try_path(&self, id: &str, path: &str) -> Option<Arc<ContentDefinition>> {
        match self.source.load(path) {
            Ok(def) => Some(Arc::new(def)),
            Err(e) => {
                trace!("Content '{}': '{}' missed ({})", id, path, e);
                None
            }
        }
    }
}

/// Everything after the id's last separator; `None` if that is empty.
pub fn convention_name(id: &str) -> Option<&str> {
    id.rsplit(&SEPARATORS[..]).next().filter(|n| !n.is_empty())
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    #[error("empty content id")]
    EmptyId,
    #[error("content '{0}' could not be resolved by any strategy")]
    NotFound(String),
}
