// src/content/source.rs
//! Deployment-specific content loading primitives.
//!
//! The resolver only knows how to turn an id into candidate paths; a
//! `ContentSource` turns a path into a definition. Two interchangeable
//! implementations ship: an in-memory one (preloaded/editor data) and a
//! runtime one reading `.content.ron` files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::definition::ContentDefinition;

/// Loads a content definition from a resolved path.
pub trait ContentSource: Send + Sync + 'static {
    fn load(&self, path: &str) -> Result<ContentDefinition, ContentLoadError>;
}

// ---------- In-memory source ----------

/// Path → definition map populated ahead of time.
#[derive(Default, Clone)]
pub struct MemoryContentSource {
    entries: HashMap<String, ContentDefinition>,
}

impl MemoryContentSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: impl Into<String>, def: ContentDefinition) -> Self {
        self.insert(path, def);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, def: ContentDefinition) {
        self.entries.insert(path.into(), def);
    }
}

impl ContentSource for MemoryContentSource {
    fn load(&self, path: &str) -> Result<ContentDefinition, ContentLoadError> {
        self.entries
            .get(path)
            .cloned()
            .ok_or_else(|| ContentLoadError::Missing(PathBuf::from(path)))
    }
}

// ---------- RON file source ----------

/// Reads `{root}/{path}.content.ron`.
#[derive(Clone, Debug)]
pub struct RonContentSource {
    root: PathBuf,
}

impl RonContentSource {
    pub const EXTENSION: &'static str = "content.ron";

    pub fn new(root: impl AsRef<Path>) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    fn file_for(&self, path: &str) -> PathBuf {
        self.root.join(format!("{}.{}", path, Self::EXTENSION))
    }
}

impl ContentSource for RonContentSource {
    fn load(&self, path: &str) -> Result<ContentDefinition, ContentLoadError> {
        let file = self.file_for(path);
        if !file.is_file() {
            return Err(ContentLoadError::Missing(file));
        }
        let text = std::fs::read_to_string(&file)?;
        ron::de::from_str(&text).map_err(|e| ContentLoadError::Ron(e.to_string()))
    }
}

/// Load an id → definition map for the resolver's direct table.
pub fn load_direct_table(
    path: impl AsRef<Path>,
) -> Result<HashMap<String, ContentDefinition>, ContentLoadError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(ContentLoadError::Missing(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path)?;
    ron::de::from_str(&text).map_err(|e| ContentLoadError::Ron(e.to_string()))
}

// ---------- Errors ----------

#[derive(thiserror::Error, Debug)]
pub enum ContentLoadError {
    #[error("no content at {0}")]
    Missing(PathBuf),
    #[error("I/O while reading content: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(String),
}

#[cfg(test)]
mod tests {
    use bevy::math::Vec2;

    use super::*;
    use crate::content::definition::ConnectionPoint;

    #[test]
    fn memory_source_returns_clones_and_misses() {
        let src = MemoryContentSource::new().with("rooms/hall", ContentDefinition::new("hall.scn"));
        assert_eq!(src.load("rooms/hall").unwrap().asset, "hall.scn");
        assert!(matches!(src.load("rooms/none"), Err(ContentLoadError::Missing(_))));
    }

    #[test]
    fn ron_source_reads_definitions_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("content")).unwrap();
        std::fs::write(
            dir.path().join("content/hall.content.ron"),
            r#"(
                asset: "hall.scn",
                connection_points: [
                    (offset: (50.0, 0.0)),
                    (kind: "key", requirement: Some("key_red")),
                ],
            )"#,
        )
        .unwrap();

        let src = RonContentSource::new(dir.path());
        let def = src.load("content/hall").unwrap();
        assert_eq!(def.asset, "hall.scn");
        assert!(!def.special);
        let east = ConnectionPoint::new("passable").at(Vec2::new(50.0, 0.0));
        assert_eq!(def.connection_points[0], east);
        assert_eq!(def.connection_points[1].requirement.as_deref(), Some("key_red"));
    }

    #[test]
    fn ron_source_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.content.ron"), "(asset: ").unwrap();
        let src = RonContentSource::new(dir.path());
        assert!(matches!(src.load("broken"), Err(ContentLoadError::Ron(_))));
        assert!(matches!(src.load("absent"), Err(ContentLoadError::Missing(_))));
    }

    #[test]
    fn direct_table_parses_a_ron_map() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("table.ron");
        std::fs::write(&file, r#"{ "guid:7f3a": (asset: "shrine.scn", special: true) }"#).unwrap();
        let table = load_direct_table(&file).unwrap();
        assert!(table["guid:7f3a"].special);
    }
}
