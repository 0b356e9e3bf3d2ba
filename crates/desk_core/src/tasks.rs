//! Ordered to-do list backed by the JSON task file.
//!
//! Every successful mutation rewrites the whole file before returning.

use crate::error::AppError;
use crate::model::Task;
use crate::storage::json_store;
use std::fmt;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tracing::{debug, warn};

/// Writes the full task list to the store location.
pub trait TaskWriter: fmt::Debug {
    fn write(&self, path: &Path, tasks: &[Task]) -> Result<(), AppError>;
}

#[derive(Debug)]
pub struct JsonFileWriter;

impl TaskWriter for JsonFileWriter {
    fn write(&self, path: &Path, tasks: &[Task]) -> Result<(), AppError> {
        json_store::save_tasks(path, tasks)
    }
}

#[derive(Debug)]
pub struct TaskStore {
    path: PathBuf,
    tasks: Vec<Task>,
    load_warning: Option<AppError>,
    backup_pending: bool,
    backup: Option<PathBuf>,
    writer: Box<dyn TaskWriter>,
}

impl TaskStore {
    /// Never fails: a missing or unreadable file yields an empty store, the
    /// latter with a warning available from [`load_warning`](Self::load_warning).
    pub fn load(path: &Path) -> Self {
        Self::load_with_writer(path, Box::new(JsonFileWriter))
    }

    pub fn load_with_writer(path: &Path, writer: Box<dyn TaskWriter>) -> Self {
        let loaded = json_store::load_tasks(path);
        let mut tasks = loaded.tasks;
        assign_missing_ids(&mut tasks);
        debug!(path = %path.display(), count = tasks.len(), "task store loaded");

        Self {
            path: path.to_path_buf(),
            tasks,
            backup_pending: loaded.warning.is_some(),
            load_warning: loaded.warning,
            backup: None,
            writer,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load_warning(&self) -> Option<&AppError> {
        self.load_warning.as_ref()
    }

    /// Where the unreadable file was copied before the first save replaced
    /// it. Returned once.
    pub fn take_backup(&mut self) -> Option<PathBuf> {
        self.backup.take()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.tasks.iter().filter(|task| !task.done).count()
    }

    pub fn get(&self, id: &str) -> Result<&Task, AppError> {
        let index = self.position(id)?;
        Ok(&self.tasks[index])
    }

    /// Blank or whitespace-only text is ignored and nothing is written.
    /// Anything else is stored exactly as given.
    pub fn add(&mut self, text: &str) -> Result<Option<Task>, AppError> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        let task = Task::new(next_task_id(&self.tasks), text);
        self.tasks.push(task.clone());
        debug!(id = %task.id, "task added");
        self.persist()?;

        Ok(Some(task))
    }

    pub fn toggle(&mut self, id: &str) -> Result<Task, AppError> {
        let index = self.position(id)?;
        self.toggle_index(index)
    }

    pub fn remove(&mut self, id: &str) -> Result<Task, AppError> {
        let index = self.position(id)?;
        self.remove_index(index)
    }

    /// Positional toggle. An index outside the list is a stale reference and
    /// leaves the store untouched.
    pub fn toggle_at(&mut self, index: usize) -> Result<Option<Task>, AppError> {
        if index >= self.tasks.len() {
            debug!(index, len = self.tasks.len(), "ignoring stale toggle");
            return Ok(None);
        }
        self.toggle_index(index).map(Some)
    }

    /// Positional delete; later tasks shift down by one.
    pub fn remove_at(&mut self, index: usize) -> Result<Option<Task>, AppError> {
        if index >= self.tasks.len() {
            debug!(index, len = self.tasks.len(), "ignoring stale delete");
            return Ok(None);
        }
        self.remove_index(index).map(Some)
    }

    /// Writes the full list, retrying once. A second failure is returned and
    /// the in-memory list keeps the change.
    ///
    /// A file that failed to load is copied aside before it is first
    /// overwritten; if that copy fails nothing is written.
    pub fn persist(&mut self) -> Result<(), AppError> {
        if self.backup_pending {
            let backup = json_store::backup_file(&self.path)?;
            debug!(path = %self.path.display(), backup = %backup.display(), "kept unreadable task file");
            self.backup = Some(backup);
            self.backup_pending = false;
        }

        match self.writer.write(&self.path, &self.tasks) {
            Ok(()) => Ok(()),
            Err(first) => {
                warn!(path = %self.path.display(), error = %first, "task save failed, retrying");
                self.writer.write(&self.path, &self.tasks)
            }
        }
    }

    fn toggle_index(&mut self, index: usize) -> Result<Task, AppError> {
        let task = &mut self.tasks[index];
        task.done = !task.done;
        let updated = task.clone();
        debug!(id = %updated.id, done = updated.done, "task toggled");
        self.persist()?;

        Ok(updated)
    }

    fn remove_index(&mut self, index: usize) -> Result<Task, AppError> {
        let removed = self.tasks.remove(index);
        debug!(id = %removed.id, "task removed");
        self.persist()?;

        Ok(removed)
    }

    fn position(&self, id: &str) -> Result<usize, AppError> {
        let trimmed_id = id.trim();
        if trimmed_id.is_empty() {
            return Err(AppError::invalid_input("id is required"));
        }

        self.tasks
            .iter()
            .position(|task| task.id == trimmed_id)
            .ok_or_else(|| AppError::not_found(format!("task not found: {trimmed_id}")))
    }
}

fn next_task_id(existing: &[Task]) -> String {
    let mut nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
    loop {
        let candidate = format!("task-{nanos}");
        if !existing.iter().any(|task| task.id == candidate) {
            return candidate;
        }
        nanos += 1;
    }
}

fn assign_missing_ids(tasks: &mut [Task]) {
    for index in 0..tasks.len() {
        if tasks[index].id.trim().is_empty() {
            let id = next_task_id(tasks);
            tasks[index].id = id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{TaskStore, TaskWriter};
    use crate::error::AppError;
    use crate::model::Task;
    use crate::storage::json_store;
    use std::cell::{Cell, RefCell};
    use std::collections::HashSet;
    use std::path::Path;
    use std::rc::Rc;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(file_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("deskapp-{nanos}-{file_name}"))
    }

    /// Fails the first `failures` writes, then records what it is given.
    #[derive(Debug)]
    struct FlakyWriter {
        failures: usize,
        attempts: Rc<Cell<usize>>,
        written: Rc<RefCell<Vec<Task>>>,
    }

    impl TaskWriter for FlakyWriter {
        fn write(&self, _path: &Path, tasks: &[Task]) -> Result<(), AppError> {
            let attempt = self.attempts.get() + 1;
            self.attempts.set(attempt);
            if attempt <= self.failures {
                return Err(AppError::io("disk busy"));
            }
            *self.written.borrow_mut() = tasks.to_vec();
            Ok(())
        }
    }

    fn flaky_store(
        path: &Path,
        failures: usize,
    ) -> (TaskStore, Rc<Cell<usize>>, Rc<RefCell<Vec<Task>>>) {
        let attempts = Rc::new(Cell::new(0));
        let written = Rc::new(RefCell::new(Vec::new()));
        let writer = FlakyWriter {
            failures,
            attempts: Rc::clone(&attempts),
            written: Rc::clone(&written),
        };
        let store = TaskStore::load_with_writer(path, Box::new(writer));
        (store, attempts, written)
    }

    fn texts(store: &TaskStore) -> Vec<&str> {
        store.tasks().iter().map(|task| task.text.as_str()).collect()
    }

    #[test]
    fn add_then_reload_keeps_order_and_flags() {
        let path = temp_path("add-reload.json");
        let mut store = TaskStore::load(&path);
        store.add("Write report").unwrap();
        store.add("Call client").unwrap();
        store.persist().unwrap();

        let reloaded = TaskStore::load(&path);
        fs::remove_file(&path).ok();

        assert_eq!(texts(&reloaded), vec!["Write report", "Call client"]);
        assert!(reloaded.tasks().iter().all(|task| !task.done));
        assert_eq!(reloaded.tasks(), store.tasks());
    }

    #[test]
    fn add_ignores_blank_text() {
        let path = temp_path("blank.json");
        let mut store = TaskStore::load(&path);

        assert_eq!(store.add("").unwrap(), None);
        assert_eq!(store.add("   ").unwrap(), None);
        let written = path.exists();

        assert_eq!(store.len(), 0);
        assert!(!written);
    }

    #[test]
    fn add_keeps_text_as_given() {
        let path = temp_path("as-given.json");
        let mut store = TaskStore::load(&path);
        let task = store.add("  Stretch  ").unwrap().unwrap();
        let reloaded = TaskStore::load(&path);
        fs::remove_file(&path).ok();

        assert_eq!(task.text, "  Stretch  ");
        assert_eq!(reloaded.tasks()[0].text, "  Stretch  ");
        assert!(!task.done);
    }

    #[test]
    fn add_generates_unique_ids() {
        let path = temp_path("ids.json");
        let mut store = TaskStore::load(&path);
        for n in 0..20 {
            store.add(&format!("task {n}")).unwrap();
        }
        fs::remove_file(&path).ok();

        let ids: HashSet<&str> = store.tasks().iter().map(|task| task.id.as_str()).collect();
        assert_eq!(ids.len(), 20);
    }

    #[test]
    fn toggle_flips_done_and_persists() {
        let path = temp_path("toggle.json");
        let mut store = TaskStore::load(&path);
        let task = store.add("A").unwrap().unwrap();

        let toggled = store.toggle(&task.id).unwrap();
        let reloaded = TaskStore::load(&path);
        let toggled_back = store.toggle(&task.id).unwrap();
        fs::remove_file(&path).ok();

        assert!(toggled.done);
        assert!(reloaded.tasks()[0].done);
        assert!(!toggled_back.done);
    }

    #[test]
    fn toggle_unknown_id_reports_not_found() {
        let path = temp_path("toggle-missing.json");
        let mut store = TaskStore::load(&path);
        store.add("A").unwrap();

        let err = store.toggle("task-missing").unwrap_err();
        let blank = store.toggle("  ").unwrap_err();
        fs::remove_file(&path).ok();

        assert_eq!(err.code(), "not_found");
        assert_eq!(blank.code(), "invalid_input");
        assert!(!store.tasks()[0].done);
    }

    #[test]
    fn remove_by_id_keeps_other_tasks() {
        let path = temp_path("remove.json");
        let mut store = TaskStore::load(&path);
        let a = store.add("A").unwrap().unwrap();
        let b = store.add("B").unwrap().unwrap();

        let removed = store.remove(&a.id).unwrap();
        let reloaded = TaskStore::load(&path);
        fs::remove_file(&path).ok();

        assert_eq!(removed.text, "A");
        assert_eq!(reloaded.tasks(), &[b]);
        assert_eq!(store.remove(&a.id).unwrap_err().code(), "not_found");
    }

    #[test]
    fn remove_at_shifts_indices() {
        let path = temp_path("remove-at.json");
        let mut store = TaskStore::load(&path);
        store.add("A").unwrap();
        store.add("B").unwrap();

        let removed = store.remove_at(0).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(removed.map(|task| task.text), Some("A".to_string()));
        assert_eq!(texts(&store), vec!["B"]);
    }

    #[test]
    fn stale_indices_leave_store_unchanged() {
        let path = temp_path("stale.json");
        let mut store = TaskStore::load(&path);
        store.add("A").unwrap();
        let before = store.tasks().to_vec();

        assert_eq!(store.toggle_at(1).unwrap(), None);
        assert_eq!(store.toggle_at(usize::MAX).unwrap(), None);
        assert_eq!(store.remove_at(5).unwrap(), None);
        fs::remove_file(&path).ok();

        assert_eq!(store.tasks(), before.as_slice());
    }

    #[test]
    fn toggle_at_flips_in_place() {
        let path = temp_path("toggle-at.json");
        let mut store = TaskStore::load(&path);
        store.add("A").unwrap();
        store.add("B").unwrap();

        let toggled = store.toggle_at(1).unwrap().unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(toggled.text, "B");
        assert!(store.tasks()[1].done);
        assert_eq!(store.pending_count(), 1);
    }

    #[test]
    fn legacy_entries_get_ids_on_load() {
        let path = temp_path("legacy.json");
        fs::write(
            &path,
            "[{\"task\": \"Write report\", \"done\": false}, {\"task\": \"Call client\", \"done\": true}]",
        )
        .unwrap();

        let mut store = TaskStore::load(&path);
        let first_id = store.tasks()[0].id.clone();
        store.toggle(&first_id).unwrap();
        let stored = json_store::load_tasks(&path);
        fs::remove_file(&path).ok();

        assert!(store.load_warning().is_none());
        assert!(first_id.starts_with("task-"));
        assert_ne!(store.tasks()[0].id, store.tasks()[1].id);
        assert_eq!(stored.tasks[0].id, first_id);
        assert!(stored.tasks[0].done);
    }

    #[test]
    fn corrupt_file_loads_empty_with_warning() {
        let path = temp_path("corrupt.json");
        fs::write(&path, "not json at all").unwrap();

        let store = TaskStore::load(&path);
        fs::remove_file(&path).ok();

        assert!(store.is_empty());
        assert_eq!(store.load_warning().map(|err| err.code()), Some("invalid_data"));
    }

    #[test]
    fn failed_write_is_reported_and_memory_keeps_change() {
        let dir = temp_path("store-dir");
        fs::create_dir_all(&dir).unwrap();
        let mut store = TaskStore::load(&dir);

        let err = store.add("A").unwrap_err();
        fs::remove_dir_all(&dir).ok();

        assert_eq!(err.code(), "io_error");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn get_returns_task_by_id() {
        let path = temp_path("get.json");
        let mut store = TaskStore::load(&path);
        let added = store.add("A").unwrap().unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(store.get(&added.id).unwrap(), &added);
        assert_eq!(
            store.get("task-0").unwrap_err(),
            crate::error::AppError::not_found("task not found: task-0")
        );
    }

    #[test]
    fn new_task_defaults_to_pending() {
        let task = Task::new("task-1", "demo");
        assert!(!task.done);
    }

    #[test]
    fn persist_retries_once_after_a_failed_write() {
        let path = temp_path("retry.json");
        let (mut store, attempts, written) = flaky_store(&path, 1);

        let added = store.add("Write report").unwrap();

        assert!(added.is_some());
        assert_eq!(attempts.get(), 2);
        assert_eq!(written.borrow().len(), 1);
        assert_eq!(written.borrow()[0].text, "Write report");
    }

    #[test]
    fn persist_gives_up_after_second_failure() {
        let path = temp_path("retry-fail.json");
        let (mut store, attempts, written) = flaky_store(&path, 2);

        let err = store.add("Write report").unwrap_err();

        assert_eq!(err.code(), "io_error");
        assert_eq!(attempts.get(), 2);
        assert!(written.borrow().is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn corrupt_file_is_kept_aside_before_first_save() {
        let path = temp_path("corrupt-backup.json");
        let original = "[{\"task\":\"keep me\",\"done\":false},";
        fs::write(&path, original).unwrap();

        let mut store = TaskStore::load(&path);
        store.add("new").unwrap();
        let backup = store.take_backup().expect("backup path");
        let kept = fs::read_to_string(&backup).unwrap();
        let current = TaskStore::load(&path);
        store.add("another").unwrap();
        let second_backup = store.take_backup();
        fs::remove_file(&path).ok();
        fs::remove_file(&backup).ok();

        assert_eq!(kept, original);
        assert!(current.load_warning().is_none());
        assert_eq!(current.tasks()[0].text, "new");
        assert!(second_backup.is_none());
    }

    #[test]
    fn readable_file_is_not_backed_up() {
        let path = temp_path("no-backup.json");
        let mut store = TaskStore::load(&path);
        store.add("A").unwrap();
        let backup = store.take_backup();
        fs::remove_file(&path).ok();

        assert!(backup.is_none());
    }
}
