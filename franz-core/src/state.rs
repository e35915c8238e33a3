//! # Turn State
//!
//! The single durable checkpoint of the loop. One JSON record per run
//! directory, overwritten after every turn, never deleted. On restart the
//! latest record supplies the story and the turn number to resume from.

use crate::config::{SamplingConfig, ToolMap};
use crate::error::{self, Error, Result};
use crate::wire::lenient;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the checkpoint inside the run directory
pub const STATE_FILE_NAME: &str = "state.json";

/// Snapshot written after each turn.
///
/// Only `story` and `turn` matter for resuming. Every field is decoded on its
/// own and falls back to its default when missing, `null` or mistyped, so
/// records written by other builds still resume.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnRecord {
    #[serde(deserialize_with = "lenient")]
    pub turn: u64,
    /// Memory adopted at the end of this turn
    #[serde(deserialize_with = "lenient")]
    pub story: String,
    /// Memory this turn started from
    #[serde(deserialize_with = "lenient")]
    pub prev_story: String,
    /// Untouched VLM output
    #[serde(deserialize_with = "lenient")]
    pub vlm_raw: String,
    #[serde(deserialize_with = "lenient")]
    pub executed: Vec<serde_json::Value>,
    #[serde(deserialize_with = "lenient")]
    pub malformed: Vec<serde_json::Value>,
    #[serde(deserialize_with = "lenient")]
    pub ignored: Vec<serde_json::Value>,
    #[serde(deserialize_with = "lenient")]
    pub wants_screenshot: bool,
    #[serde(deserialize_with = "lenient")]
    pub execute_actions: bool,
    #[serde(deserialize_with = "lenient")]
    pub tools: ToolMap,
    /// Sampling snapshot the turn ran with
    #[serde(deserialize_with = "lenient")]
    pub sampling: Option<SamplingConfig>,
    /// Local ISO-8601 time the record was written
    #[serde(deserialize_with = "lenient")]
    pub timestamp: String,
}

impl TurnRecord {
    /// Story and turn counter to continue from
    pub fn resume_point(&self) -> (String, u64) {
        (self.story.clone(), self.turn)
    }
}

/// Local time in ISO-8601 with microseconds
pub fn timestamp_now() -> String {
    chrono::Local::now()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

/// Where turn records live.
///
/// Written by exactly one turn loop; never shared.
pub trait TurnStore: Send {
    /// Latest record, or `None` when nothing has been persisted yet
    fn load(&self) -> Result<Option<TurnRecord>>;

    /// Replace the latest record
    fn save(&mut self, record: &TurnRecord) -> Result<()>;
}

// ============================================================================
// File store
// ============================================================================

/// `state.json` in a run directory.
#[derive(Debug, Clone)]
pub struct FileTurnStore {
    path: PathBuf,
}

impl FileTurnStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<run_dir>/state.json`
    pub fn in_dir(run_dir: impl AsRef<Path>) -> Self {
        Self::new(run_dir.as_ref().join(STATE_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| STATE_FILE_NAME.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl TurnStore for FileTurnStore {
    fn load(&self) -> Result<Option<TurnRecord>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(error::io_error(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                ))
                .with_operation("state::load")
                .set_source(e))
            }
        };

        let record: TurnRecord = serde_json::from_str(&content).map_err(|e| {
            Error::state_corrupt(self.path.display().to_string(), e.to_string())
                .with_operation("state::load")
                .set_source(e)
        })?;
        Ok(Some(record))
    }

    fn save(&mut self, record: &TurnRecord) -> Result<()> {
        let content = serde_json::to_string_pretty(record)
            .map_err(|e| error::serialization_error(e.to_string()).with_operation("state::save"))?;

        // Write aside, then rename over the old record so a crash never
        // leaves a torn state.json behind.
        let temp = self.temp_path();
        std::fs::write(&temp, content).map_err(|e| {
            Error::storage_failed(format!("failed to write {}: {}", temp.display(), e))
                .with_operation("state::save")
                .set_source(e)
        })?;
        std::fs::rename(&temp, &self.path).map_err(|e| {
            Error::storage_failed(format!("failed to replace {}: {}", self.path.display(), e))
                .with_operation("state::save")
                .set_source(e)
        })?;
        Ok(())
    }
}

// ============================================================================
// Memory store
// ============================================================================

/// Keeps the latest record in memory. Useful for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryTurnStore {
    latest: Option<TurnRecord>,
    saves: usize,
}

impl MemoryTurnStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start as if `record` had been persisted by an earlier run
    pub fn with_record(record: TurnRecord) -> Self {
        Self {
            latest: Some(record),
            saves: 0,
        }
    }

    pub fn latest(&self) -> Option<&TurnRecord> {
        self.latest.as_ref()
    }

    /// Number of successful saves
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl TurnStore for MemoryTurnStore {
    fn load(&self) -> Result<Option<TurnRecord>> {
        Ok(self.latest.clone())
    }

    fn save(&mut self, record: &TurnRecord) -> Result<()> {
        self.latest = Some(record.clone());
        self.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use serde_json::json;

    fn record(turn: u64, story: &str) -> TurnRecord {
        TurnRecord {
            turn,
            story: story.to_string(),
            prev_story: "before".to_string(),
            vlm_raw: story.to_string(),
            executed: vec![json!("drag(1, 2, 3, 4)")],
            execute_actions: true,
            tools: crate::default_tools(),
            sampling: Some(SamplingConfig::default()),
            timestamp: timestamp_now(),
            ..TurnRecord::default()
        }
    }

    #[test]
    fn test_missing_file_means_fresh_start() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTurnStore::in_dir(dir.path());
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileTurnStore::in_dir(dir.path());

        store.save(&record(3, "cat head done")).unwrap();
        store.save(&record(4, "left ear done")).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.resume_point(), ("left ear done".to_string(), 4));
        assert_eq!(loaded.executed, vec![json!("drag(1, 2, 3, 4)")]);
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn test_written_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileTurnStore::in_dir(dir.path());
        store.save(&record(1, "x")).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        for key in [
            "turn",
            "story",
            "prev_story",
            "vlm_raw",
            "executed",
            "malformed",
            "ignored",
            "wants_screenshot",
            "execute_actions",
            "tools",
            "sampling",
            "timestamp",
        ] {
            assert!(raw.get(key).is_some(), "missing key {}", key);
        }
        assert_eq!(raw["tools"]["left_click"], json!(true));
    }

    #[test]
    fn test_partial_record_loads_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(STATE_FILE_NAME),
            r#"{"turn": 7, "story": "X", "prev_story": null}"#,
        )
        .unwrap();

        let loaded = FileTurnStore::in_dir(dir.path()).load().unwrap().unwrap();
        assert_eq!(loaded.resume_point(), ("X".to_string(), 7));
        assert_eq!(loaded.prev_story, "");
        assert!(loaded.sampling.is_none());
    }

    #[test]
    fn test_null_diagnostics_keep_resume_point() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(STATE_FILE_NAME),
            r#"{"turn": 7, "story": "X", "executed": null, "wants_screenshot": null,
                "tools": null, "sampling": {"temperature": "hot"}, "timestamp": 12}"#,
        )
        .unwrap();

        let loaded = FileTurnStore::in_dir(dir.path()).load().unwrap().unwrap();
        assert_eq!(loaded.resume_point(), ("X".to_string(), 7));
        assert!(loaded.executed.is_empty());
        assert!(!loaded.wants_screenshot);
        assert!(loaded.tools.is_empty());
        assert!(loaded.sampling.is_none());
        assert_eq!(loaded.timestamp, "");
    }

    #[test]
    fn test_corrupt_record_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(STATE_FILE_NAME), "{ not json").unwrap();

        let err = FileTurnStore::in_dir(dir.path()).load().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateCorrupt);
        assert_eq!(err.operation(), "state::load");
    }

    #[test]
    fn test_save_into_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileTurnStore::in_dir(dir.path().join("gone"));
        let err = store.save(&record(1, "x")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StorageFailed);
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryTurnStore::new();
        assert_eq!(store.load().unwrap(), None);

        store.save(&record(1, "a")).unwrap();
        store.save(&record(2, "b")).unwrap();
        assert_eq!(store.saves(), 2);
        assert_eq!(store.latest().map(|r| r.turn), Some(2));

        let seeded = MemoryTurnStore::with_record(record(7, "X"));
        assert_eq!(seeded.load().unwrap().unwrap().resume_point(), ("X".to_string(), 7));
        assert_eq!(seeded.saves(), 0);
    }
}
