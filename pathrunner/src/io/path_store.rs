//! Durable storage for serialized action paths.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

use crate::io::paths::write_atomic;
use crate::path::ActionPath;
use crate::registry::NodeRegistry;

/// Load/save of the whole path (head tree plus blackboard) as JSON.
///
/// The driver saves after every tick, unconditionally and atomically;
/// the snapshot is the state the process resumes from after being
/// destroyed at any later point.
pub struct PathStore {
    file: PathBuf,
}

impl PathStore {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self { file: file.into() }
    }

    pub fn exists(&self) -> bool {
        self.file.exists()
    }

    /// Atomically persist the path snapshot.
    pub fn save(&self, path: &ActionPath) -> Result<()> {
        debug!(file = %self.file.display(), "writing path snapshot");
        let mut buf = serde_json::to_string_pretty(&path.save()?)?;
        buf.push('\n');
        write_atomic(&self.file, &buf)
    }

    /// Load a path snapshot, reviving every node through `registry`.
    pub fn load(&self, registry: &NodeRegistry) -> Result<ActionPath> {
        debug!(file = %self.file.display(), "loading path snapshot");
        let contents = fs::read_to_string(&self.file)
            .with_context(|| format!("read path snapshot {}", self.file.display()))?;
        let value: Value = serde_json::from_str(&contents)
            .with_context(|| format!("parse path snapshot {}", self.file.display()))?;
        ActionPath::load(&value, registry)
            .with_context(|| format!("revive path snapshot {}", self.file.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::counter::CounterAction;
    use crate::path::ActionPath;
    use crate::registry::NodeRegistry;
    use crate::test_support::memory_channel;
    use crate::tree::decorator::Repeater;

    /// Verifies save → load round-trip preserves structure and state.
    #[test]
    fn path_snapshot_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = PathStore::new(temp.path().join("path.json"));
        let channel = memory_channel();
        let registry = NodeRegistry::with_builtins(&channel).expect("builtins");

        let head =
            Repeater::new(Box::new(CounterAction::new("layers")), Some(5)).expect("repeater");
        let mut path = ActionPath::new(Box::new(head));
        path.state_mut().set("layers", serde_json::json!(2));

        store.save(&path).expect("save");
        let loaded = store.load(&registry).expect("load");
        assert_eq!(loaded.save().expect("resave"), path.save().expect("save"));
    }

    #[test]
    fn load_missing_snapshot_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = PathStore::new(temp.path().join("missing.json"));
        let channel = memory_channel();
        let registry = NodeRegistry::with_builtins(&channel).expect("builtins");
        assert!(!store.exists());
        assert!(store.load(&registry).is_err());
    }
}
