//! Example sets and the process-wide store that serves them.
//!
//! An [`ExampleSet`] is produced offline by calibration and only ever
//! replaced whole. The [`ExampleStore`] hands out `Arc` snapshots, so a
//! decision in flight keeps the set it started with while a swap happens.

use chrono::{DateTime, Utc};
use sentinel_core::decision::Decision;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

/// One worked example shown to the model before the real case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Demonstration {
    #[serde(rename = "container_name")]
    pub workload: String,
    pub logs: String,
    pub decision: Decision,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExampleSet {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    /// Model the demonstrations were bootstrapped with.
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub demonstrations: Vec<Demonstration>,
}

impl ExampleSet {
    /// The zero-shot set.
    pub fn empty() -> Self {
        Self {
            version: 0,
            created_at: Utc::now(),
            model: String::new(),
            demonstrations: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.demonstrations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.demonstrations.len()
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path).map_err(|e| StoreError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| StoreError::Format {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Write to `path` via a sibling temp file and a rename, so readers of
    /// the path see either the old file or the new one.
    pub fn save_atomic(&self, path: &Path) -> Result<(), StoreError> {
        let io_err = |e: std::io::Error| StoreError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| StoreError::Format {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        let written = std::fs::File::create(&tmp_path).and_then(|mut file| {
            file.write_all(json.as_bytes())?;
            file.sync_all()
        });
        let result = written.and_then(|()| std::fs::rename(&tmp_path, path));
        if result.is_err() {
            let _ = std::fs::remove_file(&tmp_path);
        }
        result.map_err(io_err)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Example set I/O failed at {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("Example set at {path} is malformed: {reason}")]
    Format { path: PathBuf, reason: String },

    #[error("Example store has no backing file")]
    NoBackingFile,
}

/// What `GET /policy` and `sentinel status` report.
#[derive(Debug, Clone, Serialize)]
pub struct ExampleSetSummary {
    pub mode: &'static str,
    pub demonstrations: usize,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub model: String,
    pub path: Option<PathBuf>,
}

/// Holder of the current example set.
pub struct ExampleStore {
    current: RwLock<Arc<ExampleSet>>,
    path: Option<PathBuf>,
}

impl ExampleStore {
    /// A store with no file behind it.
    pub fn in_memory(set: ExampleSet) -> Self {
        Self {
            current: RwLock::new(Arc::new(set)),
            path: None,
        }
    }

    /// Open the store backed by `path`. A missing or unreadable file
    /// leaves the policy zero-shot.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let set = if path.exists() {
            match ExampleSet::load(&path) {
                Ok(set) => {
                    info!(path = %path.display(), demonstrations = set.len(), version = set.version, "Loaded example set");
                    set
                }
                Err(e) => {
                    warn!(error = %e, "Ignoring example set, running zero-shot");
                    ExampleSet::empty()
                }
            }
        } else {
            warn!(path = %path.display(), "No example set found, running zero-shot");
            ExampleSet::empty()
        };

        Self {
            current: RwLock::new(Arc::new(set)),
            path: Some(path),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The current set. The lock is held only to clone the `Arc`.
    pub fn snapshot(&self) -> Arc<ExampleSet> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Swap in a new set, returning the previous one.
    pub fn replace(&self, set: ExampleSet) -> Arc<ExampleSet> {
        let next = Arc::new(set);
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *guard, next)
    }

    /// Write `set` to the backing file, then swap it in. Nothing is
    /// swapped when the write fails.
    pub fn persist_and_replace(&self, set: ExampleSet) -> Result<Option<PathBuf>, StoreError> {
        if let Some(path) = &self.path {
            set.save_atomic(path)?;
        }
        info!(demonstrations = set.len(), version = set.version, "Example set replaced");
        self.replace(set);
        Ok(self.path.clone())
    }

    /// Re-read the backing file and swap it in. On failure the current set
    /// stays.
    pub fn reload(&self) -> Result<Arc<ExampleSet>, StoreError> {
        let path = self.path.as_ref().ok_or(StoreError::NoBackingFile)?;
        let set = ExampleSet::load(path)?;
        info!(path = %path.display(), demonstrations = set.len(), "Reloaded example set");
        self.replace(set);
        Ok(self.snapshot())
    }

    pub fn summary(&self) -> ExampleSetSummary {
        let set = self.snapshot();
        ExampleSetSummary {
            mode: if set.is_empty() { "zero-shot" } else { "few-shot" },
            demonstrations: set.len(),
            version: set.version,
            created_at: set.created_at,
            model: set.model.clone(),
            path: self.path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_core::decision::{Action, Severity};

    fn demo(workload: &str) -> Demonstration {
        Demonstration {
            workload: workload.into(),
            logs: "FATAL: Password authentication failed for user 'admin'.".into(),
            decision: Decision {
                reasoning: "Credentials rejected.".into(),
                root_cause: "Auth Failure".into(),
                severity: Severity::Critical,
                suggested_action: Action::Escalate,
            },
        }
    }

    fn set_with(version: u32, count: usize) -> ExampleSet {
        ExampleSet {
            version,
            created_at: Utc::now(),
            model: "gemini-2.5-flash".into(),
            demonstrations: (0..count).map(|_| demo(&format!("v{version}"))).collect(),
        }
    }

    #[test]
    fn save_then_open_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("brain_compiled.json");
        set_with(3, 2).save_atomic(&path).unwrap();

        let store = ExampleStore::open(&path);
        let snapshot = store.snapshot();
        assert_eq!(snapshot.version, 3);
        assert_eq!(snapshot.demonstrations[0].workload, "v3");
        assert!(!dir.path().join("nested").join("brain_compiled.json.tmp").exists());
    }

    #[test]
    fn failed_save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory in the way makes the final rename fail.
        let path = dir.path().join("brain.json");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "x").unwrap();

        let err = set_with(1, 1).save_atomic(&path).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert!(!dir.path().join("brain.json.tmp").exists());
    }

    #[test]
    fn file_uses_wire_labels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("brain.json");
        set_with(1, 1).save_atomic(&path).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"container_name\": \"v1\""));
        assert!(raw.contains("\"severity\": \"CRITICAL\""));
        assert!(raw.contains("\"suggested_action\": \"escalate\""));
    }

    #[test]
    fn missing_file_is_zero_shot() {
        let dir = tempfile::tempdir().unwrap();
        let store = ExampleStore::open(dir.path().join("absent.json"));
        assert!(store.snapshot().is_empty());
        assert_eq!(store.summary().mode, "zero-shot");
    }

    #[test]
    fn corrupt_file_is_zero_shot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("brain.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = ExampleStore::open(&path);
        assert!(store.snapshot().is_empty());
        assert!(matches!(store.reload(), Err(StoreError::Format { .. })));
    }

    #[test]
    fn snapshot_survives_replace() {
        let store = ExampleStore::in_memory(set_with(1, 1));
        let before = store.snapshot();
        let previous = store.replace(set_with(2, 2));
        assert_eq!(previous.version, 1);
        assert_eq!(before.version, 1);
        assert_eq!(store.snapshot().version, 2);
    }

    #[test]
    fn reload_picks_up_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("brain.json");
        let store = ExampleStore::open(&path);
        set_with(7, 1).save_atomic(&path).unwrap();
        let reloaded = store.reload().unwrap();
        assert_eq!(reloaded.version, 7);
        assert_eq!(store.summary().mode, "few-shot");
    }

    #[test]
    fn reload_without_file_backing() {
        let store = ExampleStore::in_memory(ExampleSet::empty());
        assert!(matches!(store.reload(), Err(StoreError::NoBackingFile)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn readers_never_see_a_mixed_set() {
        let store = Arc::new(ExampleStore::in_memory(set_with(0, 3)));

        let mut readers = Vec::new();
        for _ in 0..4 {
            let store = store.clone();
            readers.push(tokio::spawn(async move {
                for _ in 0..2_000 {
                    let set = store.snapshot();
                    let tag = format!("v{}", set.version);
                    assert_eq!(set.len(), 3);
                    assert!(set.demonstrations.iter().all(|d| d.workload == tag));
                    tokio::task::yield_now().await;
                }
            }));
        }

        let writer = {
            let store = store.clone();
            tokio::spawn(async move {
                for version in 1..=500 {
                    store.replace(set_with(version, 3));
                    tokio::task::yield_now().await;
                }
            })
        };

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
        assert_eq!(store.snapshot().version, 500);
    }
}
