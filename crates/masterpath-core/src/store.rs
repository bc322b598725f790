//! Persistence implementations: an in-memory store and a JSON file store.
//!
//! File layout of [`JsonFileStore`]:
//!
//! ```text
//! <root>/<path_id>/path.json
//! <root>/<path_id>/nodes/<node_id>.json
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::model::{LearningPath, NodeState, NodeStatePatch};
use crate::traits::Persistence;

/// Keeps everything in memory. State is lost when the store is dropped.
#[derive(Default)]
pub struct MemoryStore {
    nodes: Mutex<HashMap<(String, String), NodeState>>,
    paths: Mutex<HashMap<String, LearningPath>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Persistence for MemoryStore {
    fn load_node_state(&self, path_id: &str, node_id: &str) -> Result<NodeState> {
        let nodes = self
            .nodes
            .lock()
            .map_err(|_| anyhow::anyhow!("node store lock poisoned"))?;
        Ok(nodes
            .get(&(path_id.to_string(), node_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn save_node_state(&self, path_id: &str, node_id: &str, patch: NodeStatePatch) -> Result<()> {
        let mut nodes = self
            .nodes
            .lock()
            .map_err(|_| anyhow::anyhow!("node store lock poisoned"))?;
        let state = nodes
            .entry((path_id.to_string(), node_id.to_string()))
            .or_default();
        patch.apply_to(state);
        Ok(())
    }

    fn load_path(&self, path_id: &str) -> Result<Option<LearningPath>> {
        let paths = self
            .paths
            .lock()
            .map_err(|_| anyhow::anyhow!("path store lock poisoned"))?;
        Ok(paths.get(path_id).cloned())
    }

    fn save_path(&self, path: &LearningPath) -> Result<()> {
        let mut paths = self
            .paths
            .lock()
            .map_err(|_| anyhow::anyhow!("path store lock poisoned"))?;
        paths.insert(path.id.clone(), path.clone());
        Ok(())
    }
}

/// Stores paths and node state as pretty-printed JSON files under a root directory.
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_file(&self, path_id: &str) -> Result<PathBuf> {
        check_id(path_id)?;
        Ok(self.root.join(path_id).join("path.json"))
    }

    fn node_file(&self, path_id: &str, node_id: &str) -> Result<PathBuf> {
        check_id(path_id)?;
        check_id(node_id)?;
        Ok(self
            .root
            .join(path_id)
            .join("nodes")
            .join(format!("{node_id}.json")))
    }
}

fn check_id(id: &str) -> Result<()> {
    anyhow::ensure!(
        !id.is_empty() && !id.contains(['/', '\\']) && id != "." && id != "..",
        "invalid id for file storage: {id:?}"
    );
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize state")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(value))
}

impl Persistence for JsonFileStore {
    fn load_node_state(&self, path_id: &str, node_id: &str) -> Result<NodeState> {
        let file = self.node_file(path_id, node_id)?;
        Ok(read_json(&file)?.unwrap_or_default())
    }

    fn save_node_state(&self, path_id: &str, node_id: &str, patch: NodeStatePatch) -> Result<()> {
        let file = self.node_file(path_id, node_id)?;
        let mut state: NodeState = read_json(&file)?.unwrap_or_default();
        patch.apply_to(&mut state);
        write_json(&file, &state)
    }

    fn load_path(&self, path_id: &str) -> Result<Option<LearningPath>> {
        read_json(&self.path_file(path_id)?)
    }

    fn save_path(&self, path: &LearningPath) -> Result<()> {
        write_json(&self.path_file(&path.id)?, path)
    }
}
