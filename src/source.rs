//! Where call definitions come from.

use crate::error::{CallError, Result};
use globset::Glob;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Loads the raw text of a call definition by identifier.
pub trait CallSource: Send + Sync {
    fn load(&self, source_id: &str) -> Result<String>;
}

/// Call definitions stored as files under a root directory.
///
/// Source identifiers are paths relative to the root, e.g.
/// `prices/update-price.txt`.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Identifiers of every file under the root matching `pattern`, sorted.
    pub fn resolve_glob(&self, pattern: &str) -> Result<Vec<String>> {
        let matcher = Glob::new(pattern)
            .map_err(|reason| CallError::InvalidPattern {
                pattern: pattern.to_string(),
                reason,
            })?
            .compile_matcher();

        let mut ids: Vec<String> = WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                entry
                    .path()
                    .strip_prefix(&self.root)
                    .ok()
                    .map(|relative| relative.to_string_lossy().replace('\\', "/"))
            })
            .filter(|id| matcher.is_match(id))
            .collect();
        ids.sort();

        debug!(pattern, matches = ids.len(), "Resolved call source pattern");
        Ok(ids)
    }
}

impl CallSource for DirectorySource {
    fn load(&self, source_id: &str) -> Result<String> {
        let path = self.root.join(source_id);
        std::fs::read_to_string(&path).map_err(|e| CallError::SourceNotFound {
            source_id: source_id.to_string(),
            reason: format!("{}: {}", path.display(), e),
        })
    }
}

/// Call definitions held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    sources: HashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, source_id: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(source_id, text);
        self
    }

    pub fn insert(&mut self, source_id: impl Into<String>, text: impl Into<String>) {
        self.sources.insert(source_id.into(), text.into());
    }
}

impl CallSource for MemorySource {
    fn load(&self, source_id: &str) -> Result<String> {
        self.sources
            .get(source_id)
            .cloned()
            .ok_or_else(|| CallError::SourceNotFound {
                source_id: source_id.to_string(),
                reason: "no such in-memory call definition".to_string(),
            })
    }
}
