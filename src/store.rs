//! File-backed task store.
//!
//! `TaskStore` owns the ordered task list and the id counter. Every mutating
//! operation writes the whole store back to its JSON file before returning.
//! Write failures never undo the in-memory change; they are logged and kept
//! for the caller to report via [`TaskStore::take_save_error`].

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{Result, StoreError};
use crate::fields::Status;
use crate::task::Task;

/// On-disk layout: `{ "next_id": n, "tasks": [...] }`.
#[derive(Debug, Deserialize)]
struct StoreFile {
    next_id: u64,
    tasks: Vec<Task>,
}

#[derive(Serialize)]
struct StoreFileRef<'a> {
    next_id: u64,
    tasks: &'a [Task],
}

/// Result of a `complete` call that found its task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Completed(Task),
    /// The task was already completed; nothing changed and nothing was saved.
    AlreadyCompleted(Task),
}

/// What happened when the store was opened at startup.
#[derive(Debug)]
pub enum LoadOutcome {
    /// No file yet.
    Fresh,
    Loaded(usize),
    /// The file existed but could not be used; the store starts empty.
    Recovered {
        error: StoreError,
        backup: Option<PathBuf>,
    },
}

/// The task collection plus its id counter, backed by a JSON file.
#[derive(Debug)]
pub struct TaskStore {
    path: PathBuf,
    tasks: Vec<Task>,
    next_id: u64,
    save_error: Option<StoreError>,
}

impl TaskStore {
    /// Create an empty store that will persist to `path`. Nothing is written yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tasks: Vec::new(),
            next_id: 1,
            save_error: None,
        }
    }

    /// Open the store for interactive use, never failing.
    ///
    /// A missing file gives an empty store. An unreadable or invalid file is
    /// logged, copied into a `backup/` directory beside it, and replaced by an
    /// empty store in memory.
    pub fn open(path: impl Into<PathBuf>) -> (Self, LoadOutcome) {
        let path = path.into();
        if !path.exists() {
            info!(path = %path.display(), "no task file found, starting fresh");
            return (Self::new(path), LoadOutcome::Fresh);
        }
        match Self::load(&path) {
            Ok(store) => {
                let count = store.tasks.len();
                (store, LoadOutcome::Loaded(count))
            }
            Err(err) => {
                error!(path = %path.display(), error = %err, "failed to load tasks, starting with an empty list");
                let backup = match create_backup(&path) {
                    Ok(backup) => {
                        warn!(backup = %backup.display(), "copied unreadable task file aside");
                        Some(backup)
                    }
                    Err(e) => {
                        error!(error = %e, "failed to back up unreadable task file");
                        None
                    }
                };
                (Self::new(path), LoadOutcome::Recovered { error: err, backup })
            }
        }
    }

    /// Load the store from `path`. A missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new(path));
        }
        let buf = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
        let file: StoreFile = serde_json::from_str(&buf).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self::from_file(path, file)?;
        info!(path = %path.display(), tasks = store.tasks.len(), "loaded tasks");
        Ok(store)
    }

    /// Validate a parsed file and build the store from it.
    fn from_file(path: &Path, file: StoreFile) -> Result<Self> {
        let schema = |reason: String| StoreError::Schema {
            path: path.to_path_buf(),
            reason,
        };

        let mut seen = HashSet::new();
        for t in &file.tasks {
            if !seen.insert(t.id) {
                return Err(schema(format!("duplicate task id {}", t.id)));
            }
            if t.description.trim().is_empty() {
                return Err(schema(format!("task {} has an empty description", t.id)));
            }
        }

        let floor = file
            .tasks
            .iter()
            .map(|t| t.id)
            .max()
            .unwrap_or(0)
            .checked_add(1)
            .ok_or_else(|| schema("id counter exhausted".to_string()))?;
        let next_id = if file.next_id < floor {
            warn!(stored = file.next_id, repaired = floor, "next_id not above existing ids, repairing");
            floor
        } else {
            file.next_id
        };

        Ok(Self {
            path: path.to_path_buf(),
            tasks: file.tasks,
            next_id,
            save_error: None,
        })
    }

    /// Write the whole store to its file (temp file + rename).
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let data = serde_json::to_string_pretty(&StoreFileRef {
            next_id: self.next_id,
            tasks: &self.tasks,
        })
        .map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;

        let tmp = self.path.with_extension("json.tmp");
        let written = File::create(&tmp)
            .and_then(|mut f| {
                f.write_all(data.as_bytes())?;
                f.flush()
            })
            .map_err(|e| StoreError::io(&tmp, e))
            .and_then(|_| fs::rename(&tmp, &self.path).map_err(|e| StoreError::io(&self.path, e)));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        debug!(path = %self.path.display(), tasks = self.tasks.len(), "saved tasks");
        Ok(())
    }

    fn persist(&mut self) {
        match self.save() {
            Ok(()) => self.save_error = None,
            Err(e) => {
                error!(error = %e, "failed to save tasks, keeping changes in memory");
                self.save_error = Some(e);
            }
        }
    }

    /// The error from the most recent failed save, if it has not been taken yet.
    pub fn take_save_error(&mut self) -> Option<StoreError> {
        self.save_error.take()
    }

    /// Add a pending task with the trimmed description.
    pub fn add(&mut self, description: &str) -> Result<Task> {
        let description = description.trim();
        if description.is_empty() {
            return Err(StoreError::Validation);
        }
        let following = self.next_id.checked_add(1).ok_or(StoreError::IdsExhausted)?;
        let task = Task::new(self.next_id, description);
        self.next_id = following;
        self.tasks.push(task.clone());
        self.persist();
        Ok(task)
    }

    /// All tasks in insertion order.
    pub fn list(&self) -> &[Task] {
        &self.tasks
    }

    pub fn find(&self, id: u64) -> Result<&Task> {
        self.tasks
            .iter()
            .find(|t| t.id == id)
            .ok_or(StoreError::NotFound(id))
    }

    /// Mark a task completed. Completing twice is reported, not an error.
    pub fn complete(&mut self, id: u64) -> Result<Completion> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(StoreError::NotFound(id))?;
        if task.is_completed() {
            return Ok(Completion::AlreadyCompleted(task.clone()));
        }
        task.status = Status::Completed;
        let task = task.clone();
        self.persist();
        Ok(Completion::Completed(task))
    }

    /// Remove a task and return it. Its id is never handed out again.
    pub fn delete(&mut self, id: u64) -> Result<Task> {
        let idx = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or(StoreError::NotFound(id))?;
        let task = self.tasks.remove(idx);
        self.persist();
        Ok(task)
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Copy the task file into `backup/<timestamp>_<file name>` beside it.
pub fn create_backup(path: &Path) -> std::io::Result<PathBuf> {
    let parent_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let backup_dir = parent_dir.join("backup");
    fs::create_dir_all(&backup_dir)?;

    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("tasks.json");
    let backup_path = backup_dir.join(format!("{}_{}", timestamp, file_name));

    fs::copy(path, &backup_path)?;
    Ok(backup_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store_in(dir: &tempfile::TempDir) -> TaskStore {
        TaskStore::new(dir.path().join("tasks.json"))
    }

    #[test]
    fn test_add_assigns_next_id_and_persists() {
        let dir = tempdir().unwrap();
        let mut store = store_in(&dir);

        let t = store.add("  Buy milk  ").unwrap();
        assert_eq!(t.id, 1);
        assert_eq!(t.description, "Buy milk");
        assert_eq!(t.status, Status::Pending);
        assert_eq!(store.len(), 1);
        assert_eq!(store.next_id(), 2);
        assert!(store.path().exists());
        assert!(store.take_save_error().is_none());
    }

    #[test]
    fn test_add_rejects_blank_description() {
        let dir = tempdir().unwrap();
        let mut store = store_in(&dir);

        assert!(matches!(store.add(""), Err(StoreError::Validation)));
        assert!(matches!(store.add(" \t\n"), Err(StoreError::Validation)));
        assert!(store.is_empty());
        assert_eq!(store.next_id(), 1);
        assert!(!store.path().exists());
    }

    #[test]
    fn test_complete_is_one_way_and_idempotent() {
        let dir = tempdir().unwrap();
        let mut store = store_in(&dir);
        let added = store.add("Write report").unwrap();

        let done = match store.complete(added.id).unwrap() {
            Completion::Completed(t) => t,
            other => panic!("expected completion, got {:?}", other),
        };
        assert_eq!(done.status, Status::Completed);
        assert_eq!(done.id, added.id);
        assert_eq!(done.description, added.description);
        assert_eq!(done.created_date, added.created_date);

        // Put a marker in the file: a second save would overwrite it.
        fs::write(store.path(), "untouched").unwrap();
        let again = store.complete(added.id).unwrap();
        assert_eq!(again, Completion::AlreadyCompleted(done.clone()));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "untouched");
        assert_eq!(store.find(added.id).unwrap(), &done);
    }

    #[test]
    fn test_complete_and_delete_unknown_id() {
        let dir = tempdir().unwrap();
        let mut store = store_in(&dir);
        store.add("only").unwrap();

        assert!(matches!(store.complete(42), Err(StoreError::NotFound(42))));
        assert!(matches!(store.delete(42), Err(StoreError::NotFound(42))));
        assert!(matches!(store.find(42), Err(StoreError::NotFound(42))));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_deleted_ids_are_not_reused() {
        let dir = tempdir().unwrap();
        let mut store = store_in(&dir);
        store.add("a").unwrap();
        let b = store.add("b").unwrap();

        let removed = store.delete(b.id).unwrap();
        assert_eq!(removed.id, 2);
        assert!(matches!(store.find(2), Err(StoreError::NotFound(2))));

        let c = store.add("c").unwrap();
        assert_eq!(c.id, 3);
        let ids: Vec<u64> = store.list().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempdir().unwrap();
        let mut store = store_in(&dir);
        store.add("first").unwrap();
        store.add("second").unwrap();
        store.add("third").unwrap();
        store.complete(2).unwrap();
        store.delete(3).unwrap();

        let reloaded = TaskStore::load(store.path()).unwrap();
        assert_eq!(reloaded.list(), store.list());
        assert_eq!(reloaded.next_id(), 4);
    }

    #[test]
    fn test_walkthrough_example() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let (mut store, outcome) = TaskStore::open(&path);
        assert!(matches!(outcome, LoadOutcome::Fresh));

        let milk = store.add("Buy milk").unwrap();
        assert_eq!((milk.id, milk.status), (1, Status::Pending));
        assert_eq!(store.add("Write report").unwrap().id, 2);
        store.complete(1).unwrap();
        store.delete(2).unwrap();

        let (reloaded, outcome) = TaskStore::open(&path);
        assert!(matches!(outcome, LoadOutcome::Loaded(1)));
        assert_eq!(reloaded.len(), 1);
        let t = reloaded.find(1).unwrap();
        assert_eq!(t.description, "Buy milk");
        assert_eq!(t.status, Status::Completed);
        assert_eq!(reloaded.next_id(), 3);
    }

    #[test]
    fn test_file_format_and_verbatim_dates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(
            &path,
            r#"{"next_id": 5, "tasks": [
                {"id": 4, "description": "legacy", "status": "pending", "created_date": "yesterday-ish"}
            ]}"#,
        )
        .unwrap();

        let mut store = TaskStore::load(&path).unwrap();
        assert_eq!(store.find(4).unwrap().created_date, "yesterday-ish");
        store.complete(4).unwrap();

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["next_id"], 5);
        assert_eq!(raw["tasks"][0]["status"], "completed");
        assert_eq!(raw["tasks"][0]["created_date"], "yesterday-ish");
    }

    #[test]
    fn test_load_rejects_missing_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(&path, r#"{"tasks": []}"#).unwrap();
        assert!(matches!(TaskStore::load(&path), Err(StoreError::Json { .. })));

        fs::write(&path, r#"{"next_id": 2, "tasks": [{"id": 1, "status": "pending"}]}"#).unwrap();
        assert!(matches!(TaskStore::load(&path), Err(StoreError::Json { .. })));
    }

    #[test]
    fn test_load_rejects_duplicate_ids_and_blank_descriptions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(
            &path,
            r#"{"next_id": 3, "tasks": [
                {"id": 1, "description": "a", "status": "pending", "created_date": "d"},
                {"id": 1, "description": "b", "status": "pending", "created_date": "d"}
            ]}"#,
        )
        .unwrap();
        assert!(matches!(TaskStore::load(&path), Err(StoreError::Schema { .. })));

        fs::write(
            &path,
            r#"{"next_id": 3, "tasks": [
                {"id": 1, "description": "   ", "status": "pending", "created_date": "d"}
            ]}"#,
        )
        .unwrap();
        assert!(matches!(TaskStore::load(&path), Err(StoreError::Schema { .. })));
    }

    #[test]
    fn test_load_repairs_stale_counter() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(
            &path,
            r#"{"next_id": 2, "tasks": [
                {"id": 7, "description": "a", "status": "completed", "created_date": "d"}
            ]}"#,
        )
        .unwrap();

        let mut store = TaskStore::load(&path).unwrap();
        assert_eq!(store.next_id(), 8);
        assert_eq!(store.add("b").unwrap().id, 8);
    }

    #[test]
    fn test_open_rejects_exhausted_id_counter() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(
            &path,
            r#"{"next_id": 18446744073709551615, "tasks": [
                {"id": 18446744073709551615, "description": "last", "status": "pending", "created_date": "d"}
            ]}"#,
        )
        .unwrap();

        assert!(matches!(TaskStore::load(&path), Err(StoreError::Schema { .. })));
        let (store, outcome) = TaskStore::open(&path);
        assert!(store.is_empty());
        assert_eq!(store.next_id(), 1);
        assert!(matches!(outcome, LoadOutcome::Recovered { .. }));
    }

    #[test]
    fn test_add_fails_when_counter_is_exhausted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(&path, r#"{"next_id": 18446744073709551615, "tasks": []}"#).unwrap();

        let (mut store, outcome) = TaskStore::open(&path);
        assert!(matches!(outcome, LoadOutcome::Loaded(0)));
        assert!(matches!(store.add("x"), Err(StoreError::IdsExhausted)));
        assert!(store.is_empty());
        assert_eq!(store.next_id(), u64::MAX);
    }

    #[test]
    fn test_open_corrupt_file_backs_up_and_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(&path, "{ not json").unwrap();

        let (store, outcome) = TaskStore::open(&path);
        assert!(store.is_empty());
        assert_eq!(store.next_id(), 1);
        match outcome {
            LoadOutcome::Recovered { error, backup } => {
                assert!(error.is_storage());
                let backup = backup.expect("backup path");
                assert_eq!(fs::read_to_string(backup).unwrap(), "{ not json");
            }
            other => panic!("expected recovery, got {:?}", other),
        }
    }

    #[test]
    fn test_save_failure_keeps_change_in_memory() {
        let dir = tempdir().unwrap();
        // A directory where the file should be makes the final rename fail.
        let path = dir.path().join("tasks.json");
        fs::create_dir(&path).unwrap();
        let mut store = TaskStore::new(&path);

        let t = store.add("still here").unwrap();
        assert_eq!(store.find(t.id).unwrap().description, "still here");
        let err = store.take_save_error().expect("save error");
        assert!(matches!(err, StoreError::Io { .. }));
        assert!(store.take_save_error().is_none());
        assert!(!dir.path().join("tasks.json.tmp").exists());
    }
}
