//! File-backed recovery marker side channel.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};

use crate::io::paths::write_atomic;
use crate::recovery::{MarkerChannel, MarkerStore, MoveIntent};

/// Persists the single in-flight marker as a small JSON file.
///
/// Arming is an atomic write; clearing removes the file; an absent file
/// means no primitive is in flight. The file is deliberately separate
/// from the path snapshot — the two have independently-timed durability
/// points (marker before the motion, snapshot after the tick).
pub struct FileMarkerStore {
    file: PathBuf,
}

impl FileMarkerStore {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self { file: file.into() }
    }

    /// Convenience wrapper building the channel handle directly.
    pub fn channel(file: impl Into<PathBuf>) -> MarkerChannel {
        MarkerChannel::new(Rc::new(Self::new(file)))
    }
}

impl MarkerStore for FileMarkerStore {
    fn pending(&self) -> Result<Option<MoveIntent>> {
        let contents = match fs::read_to_string(&self.file) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("read marker {}", self.file.display()));
            }
        };
        let intent: MoveIntent = serde_json::from_str(&contents)
            .with_context(|| format!("parse marker {}", self.file.display()))?;
        Ok(Some(intent))
    }

    fn arm(&self, intent: &MoveIntent) -> Result<()> {
        let mut buf = serde_json::to_string_pretty(intent)?;
        buf.push('\n');
        write_atomic(&self.file, &buf)
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.file) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("remove marker {}", self.file.display()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Facing, MoveKind, Position};

    #[test]
    fn marker_lifecycle_arm_pending_clear() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = FileMarkerStore::new(temp.path().join("marker.json"));

        assert!(store.pending().expect("pending").is_none());

        let intent = MoveIntent::new(MoveKind::Up, Position::new(1, 2, 3), Facing::West);
        store.arm(&intent).expect("arm");
        assert_eq!(store.pending().expect("pending"), Some(intent));

        store.clear().expect("clear");
        assert!(store.pending().expect("pending").is_none());
        // Clearing an absent marker is not an error.
        store.clear().expect("clear again");
    }

    #[test]
    fn arming_overwrites_the_previous_marker() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = FileMarkerStore::new(temp.path().join("marker.json"));

        let first = MoveIntent::new(MoveKind::Forward, Position::new(0, 0, 0), Facing::North);
        let second = MoveIntent::new(MoveKind::TurnLeft, Position::new(0, 0, -1), Facing::North);
        store.arm(&first).expect("arm");
        store.arm(&second).expect("arm");
        assert_eq!(store.pending().expect("pending"), Some(second));
    }
}
