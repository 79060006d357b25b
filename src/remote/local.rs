//! JSON-file-backed store for the CLI.
//!
//! Each collection lives in one JSON document under the data directory:
//!
//! ```text
//! <data dir>/
//!   tasks.json
//!   users.json
//!   events.json
//!   session          # persisted operator identity (see the identity module)
//! ```
//!
//! Writes take the sidecar file lock, rewrite the document atomically, and
//! then broadcast the fresh ordered snapshot to in-process observers. The
//! first subscription also starts a filesystem watcher on the data
//! directory, so a write through any other handle on the same directory,
//! in this process or another, re-reads the document and broadcasts too.
//! A store's own write may therefore deliver more than once; snapshots
//! replace wholesale, so duplicate deliveries are harmless.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::{NaiveDate, Utc};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use ulid::Ulid;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::lock::{self, FileLock, DEFAULT_LOCK_TIMEOUT_MS};
use crate::model::{EventRecord, Task, TaskDraft, TaskPatch, UserRecord};
use crate::remote::memory::{sort_events, sort_tasks};
use crate::remote::{
    EventCollection, SnapshotObserver, Subscription, TaskCollection, UserCollection,
};

const TASKS_FILE: &str = "tasks.json";
const USERS_FILE: &str = "users.json";
const EVENTS_FILE: &str = "events.json";

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Document store backed by JSON files under a data directory.
#[derive(Clone)]
pub struct JsonStore {
    inner: Arc<JsonInner>,
}

struct JsonInner {
    root: PathBuf,
    task_observers: Mutex<HashMap<Uuid, SnapshotObserver<Task>>>,
    event_observers: Mutex<HashMap<Uuid, SnapshotObserver<EventRecord>>>,
    watcher: Mutex<Option<RecommendedWatcher>>,
}

impl JsonStore {
    /// Open (creating if needed) a store rooted at the given directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            inner: Arc::new(JsonInner {
                root,
                task_observers: Mutex::new(HashMap::new()),
                event_observers: Mutex::new(HashMap::new()),
                watcher: Mutex::new(None),
            }),
        })
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    fn tasks_path(&self) -> PathBuf {
        self.inner.root.join(TASKS_FILE)
    }

    fn users_path(&self) -> PathBuf {
        self.inner.root.join(USERS_FILE)
    }

    fn events_path(&self) -> PathBuf {
        self.inner.root.join(EVENTS_FILE)
    }

    fn read_collection<T: DeserializeOwned>(&self, path: &Path) -> Result<Vec<T>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let _lock = FileLock::acquire(lock::lock_path_for(path), DEFAULT_LOCK_TIMEOUT_MS)?;
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    /// Read-modify-write one collection document under its file lock.
    fn update_collection<T, R, F>(&self, path: &Path, mutator: F) -> Result<R>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut Vec<T>) -> Result<R>,
    {
        let _lock = FileLock::acquire(lock::lock_path_for(path), DEFAULT_LOCK_TIMEOUT_MS)?;
        let mut records: Vec<T> = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            Vec::new()
        };

        let result = mutator(&mut records)?;

        let json = serde_json::to_string_pretty(&records)?;
        lock::write_atomic(path, json.as_bytes())?;
        Ok(result)
    }

    /// Start the data-directory watcher if it is not already running. Any
    /// rename of a collection document, including writes by other handles
    /// and other processes, re-reads the document and broadcasts it.
    fn ensure_watcher(&self) -> Result<()> {
        let mut slot = guard(&self.inner.watcher);
        if slot.is_some() {
            return Ok(());
        }

        // Holds a weak handle so the watcher thread never keeps the store
        // alive; dropping the last store handle stops delivery.
        let weak: Weak<JsonInner> = Arc::downgrade(&self.inner);
        let mut watcher = notify::recommended_watcher(
            move |event: notify::Result<notify::Event>| {
                let Ok(event) = event else { return };
                let Some(inner) = weak.upgrade() else { return };
                let store = JsonStore { inner };
                for path in &event.paths {
                    match path.file_name().and_then(|name| name.to_str()) {
                        Some(TASKS_FILE) => {
                            if let Err(err) = store.notify_tasks() {
                                tracing::warn!(%err, "task snapshot broadcast failed");
                            }
                        }
                        Some(EVENTS_FILE) => {
                            if let Err(err) = store.notify_events() {
                                tracing::warn!(%err, "event snapshot broadcast failed");
                            }
                        }
                        _ => {}
                    }
                }
            },
        )
        .map_err(|err| Error::OperationFailed(format!("file watch: {err}")))?;
        watcher
            .watch(&self.inner.root, RecursiveMode::NonRecursive)
            .map_err(|err| Error::OperationFailed(format!("file watch: {err}")))?;
        *slot = Some(watcher);
        Ok(())
    }

    fn notify_tasks(&self) -> Result<()> {
        let mut snapshot: Vec<Task> = self.read_collection(&self.tasks_path())?;
        sort_tasks(&mut snapshot);
        let observers: Vec<SnapshotObserver<Task>> = guard(&self.inner.task_observers)
            .values()
            .cloned()
            .collect();
        for observer in observers {
            observer(&snapshot);
        }
        Ok(())
    }

    fn notify_events(&self) -> Result<()> {
        let mut snapshot: Vec<EventRecord> = self.read_collection(&self.events_path())?;
        sort_events(&mut snapshot);
        let observers: Vec<SnapshotObserver<EventRecord>> = guard(&self.inner.event_observers)
            .values()
            .cloned()
            .collect();
        for observer in observers {
            observer(&snapshot);
        }
        Ok(())
    }
}

impl TaskCollection for JsonStore {
    fn create(&self, draft: TaskDraft) -> Result<Task> {
        let task = draft.into_task(Ulid::new().to_string(), Utc::now());
        let created = task.clone();
        self.update_collection(&self.tasks_path(), move |records: &mut Vec<Task>| {
            records.push(task);
            Ok(())
        })?;
        self.notify_tasks()?;
        Ok(created)
    }

    fn update(&self, id: &str, patch: TaskPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }
        let target = id.to_string();
        self.update_collection(&self.tasks_path(), move |records: &mut Vec<Task>| {
            let task = records
                .iter_mut()
                .find(|task| task.id == target)
                .ok_or_else(|| Error::NotFound(format!("task {target}")))?;
            patch.apply(task);
            Ok(())
        })?;
        self.notify_tasks()
    }

    fn delete(&self, id: &str) -> Result<()> {
        let target = id.to_string();
        self.update_collection(&self.tasks_path(), move |records: &mut Vec<Task>| {
            let before = records.len();
            records.retain(|task| task.id != target);
            if records.len() == before {
                return Err(Error::NotFound(format!("task {target}")));
            }
            Ok(())
        })?;
        self.notify_tasks()
    }

    fn read_all(&self) -> Result<Vec<Task>> {
        let mut tasks: Vec<Task> = self.read_collection(&self.tasks_path())?;
        sort_tasks(&mut tasks);
        Ok(tasks)
    }

    fn subscribe(&self, observer: SnapshotObserver<Task>) -> Result<Subscription> {
        self.ensure_watcher()?;
        let token = Uuid::new_v4();
        guard(&self.inner.task_observers).insert(token, Arc::clone(&observer));
        observer(&TaskCollection::read_all(self)?);

        let weak: Weak<JsonInner> = Arc::downgrade(&self.inner);
        Ok(Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                guard(&inner.task_observers).remove(&token);
            }
        }))
    }
}

impl UserCollection for JsonStore {
    fn create(&self, record: UserRecord) -> Result<()> {
        self.update_collection(&self.users_path(), move |records: &mut Vec<UserRecord>| {
            if let Some(existing) = records.iter_mut().find(|user| user.id == record.id) {
                *existing = record;
            } else {
                records.push(record);
            }
            Ok(())
        })
    }

    fn get(&self, id: &str) -> Result<Option<UserRecord>> {
        let records: Vec<UserRecord> = self.read_collection(&self.users_path())?;
        Ok(records.into_iter().find(|user| user.id == id))
    }

    fn read_all(&self) -> Result<Vec<UserRecord>> {
        self.read_collection(&self.users_path())
    }
}

impl EventCollection for JsonStore {
    fn create(&self, title: &str, event_date: NaiveDate) -> Result<EventRecord> {
        let record = EventRecord {
            id: Ulid::new().to_string(),
            title: title.to_string(),
            event_date,
        };
        let created = record.clone();
        self.update_collection(&self.events_path(), move |records: &mut Vec<EventRecord>| {
            records.push(record);
            Ok(())
        })?;
        self.notify_events()?;
        Ok(created)
    }

    fn read_all(&self) -> Result<Vec<EventRecord>> {
        let mut events: Vec<EventRecord> = self.read_collection(&self.events_path())?;
        sort_events(&mut events);
        Ok(events)
    }

    fn subscribe(&self, observer: SnapshotObserver<EventRecord>) -> Result<Subscription> {
        self.ensure_watcher()?;
        let token = Uuid::new_v4();
        guard(&self.inner.event_observers).insert(token, Arc::clone(&observer));
        observer(&EventCollection::read_all(self)?);

        let weak: Weak<JsonInner> = Arc::downgrade(&self.inner);
        Ok(Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                guard(&inner.event_observers).remove(&token);
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Role, TaskStatus};
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    /// Filesystem watch delivery is asynchronous; poll until the condition
    /// holds or the deadline passes.
    fn wait_until(what: &str, condition: impl Fn() -> bool) {
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
        while std::time::Instant::now() < deadline {
            if condition() {
                return;
            }
            std::thread::sleep(std::time::Duration::from_millis(20));
        }
        panic!("timed out waiting for {what}");
    }

    fn draft(title: &str) -> TaskDraft {
        TaskDraft {
            title: title.to_string(),
            description: String::new(),
            event_name: "Event".to_string(),
            event_date: "2025-05-01".parse().expect("date"),
            due_date: None,
            requirements: Vec::new(),
            faculty_name: "Faculty".to_string(),
            faculty_contact: "555".to_string(),
        }
    }

    #[test]
    fn create_persists_and_survives_reopen() {
        let temp = TempDir::new().expect("tempdir");
        let created = {
            let store = JsonStore::open(temp.path()).expect("open");
            TaskCollection::create(&store, draft("persisted")).expect("create")
        };

        let reopened = JsonStore::open(temp.path()).expect("reopen");
        let tasks = TaskCollection::read_all(&reopened).expect("read");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, created.id);
        assert_eq!(tasks[0].status, TaskStatus::Todo);
    }

    #[test]
    fn partial_update_keeps_other_fields() {
        let temp = TempDir::new().expect("tempdir");
        let store = JsonStore::open(temp.path()).expect("open");
        let task = TaskCollection::create(&store, draft("patchable")).expect("create");

        store
            .update(
                &task.id,
                TaskPatch::union_assignees(BTreeSet::from(["u1".to_string()])),
            )
            .expect("claim");
        store
            .update(&task.id, TaskPatch::status(TaskStatus::InDev))
            .expect("move");

        let tasks = TaskCollection::read_all(&store).expect("read");
        assert_eq!(tasks[0].status, TaskStatus::InDev);
        assert!(tasks[0].assigned_to.contains("u1"));
        assert_eq!(tasks[0].title, "patchable");
    }

    #[test]
    fn delete_removes_the_record() {
        let temp = TempDir::new().expect("tempdir");
        let store = JsonStore::open(temp.path()).expect("open");
        let task = TaskCollection::create(&store, draft("to delete")).expect("create");

        store.delete(&task.id).expect("delete");
        assert!(TaskCollection::read_all(&store).expect("read").is_empty());
        assert!(matches!(
            store.delete(&task.id),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn another_handle_on_the_same_dir_sees_writes() {
        let temp = TempDir::new().expect("tempdir");
        let writer = JsonStore::open(temp.path()).expect("open writer");
        let reader = JsonStore::open(temp.path()).expect("open reader");

        TaskCollection::create(&writer, draft("shared")).expect("create");
        let tasks = TaskCollection::read_all(&reader).expect("read");
        assert_eq!(tasks.len(), 1);
    }

    #[test]
    fn user_create_upserts_by_id() {
        let temp = TempDir::new().expect("tempdir");
        let store = JsonStore::open(temp.path()).expect("open");

        let user = UserRecord {
            id: "u1".to_string(),
            name: "Asha".to_string(),
            email: None,
            role: Role::Member,
            admin: false,
        };
        UserCollection::create(&store, user.clone()).expect("create");
        UserCollection::create(
            &store,
            UserRecord {
                admin: true,
                ..user
            },
        )
        .expect("upsert");

        let users = UserCollection::read_all(&store).expect("read");
        assert_eq!(users.len(), 1);
        assert!(users[0].admin);
    }

    #[test]
    fn subscription_fires_on_local_writes() {
        let temp = TempDir::new().expect("tempdir");
        let store = JsonStore::open(temp.path()).expect("open");

        let latest: Arc<Mutex<usize>> = Arc::new(Mutex::new(usize::MAX));
        let cell = Arc::clone(&latest);
        let _sub = TaskCollection::subscribe(
            &store,
            Arc::new(move |snapshot: &[Task]| {
                *guard(&cell) = snapshot.len();
            }) as SnapshotObserver<Task>)
            .expect("subscribe");
        assert_eq!(*guard(&latest), 0);

        TaskCollection::create(&store, draft("watched")).expect("create");
        assert_eq!(*guard(&latest), 1);
    }

    #[test]
    fn subscription_fires_on_writes_from_another_handle() {
        let temp = TempDir::new().expect("tempdir");
        let watching = JsonStore::open(temp.path()).expect("open watching");
        let writing = JsonStore::open(temp.path()).expect("open writing");

        let latest: Arc<Mutex<Vec<Task>>> = Arc::new(Mutex::new(Vec::new()));
        let cell = Arc::clone(&latest);
        let _sub = TaskCollection::subscribe(
            &watching,
            Arc::new(move |snapshot: &[Task]| {
                *guard(&cell) = snapshot.to_vec();
            }) as SnapshotObserver<Task>)
            .expect("subscribe");
        assert!(guard(&latest).is_empty());

        TaskCollection::create(&writing, draft("from elsewhere")).expect("create");
        wait_until("the other handle's write to arrive", || {
            guard(&latest).len() == 1
        });
        assert_eq!(guard(&latest)[0].title, "from elsewhere");
    }
}
