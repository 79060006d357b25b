//! In-memory store and identity provider.
//!
//! Reference implementation of the collaborator contracts: every write
//! broadcasts the full ordered snapshot to all live observers, mirroring the
//! push model of the real document store. Shared freely across clones, so a
//! test can stand up two "clients" over the same collections and assert
//! convergence after reconciliation.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use ulid::Ulid;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::{EventRecord, Task, TaskDraft, TaskPatch, UserRecord};
use crate::remote::{
    EventCollection, IdentityProvider, SnapshotObserver, Subscription, TaskCollection,
    UserCollection,
};

/// How long after sign-in a password change is still accepted.
const REAUTH_WINDOW_MINUTES: i64 = 5;

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn new_record_id() -> String {
    Ulid::new().to_string()
}

/// Shared in-memory document store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    tasks: Mutex<BTreeMap<String, Task>>,
    users: Mutex<BTreeMap<String, UserRecord>>,
    events: Mutex<BTreeMap<String, EventRecord>>,
    task_observers: Mutex<HashMap<Uuid, SnapshotObserver<Task>>>,
    event_observers: Mutex<HashMap<Uuid, SnapshotObserver<EventRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ordered_tasks(&self) -> Vec<Task> {
        let mut tasks: Vec<Task> = guard(&self.inner.tasks).values().cloned().collect();
        sort_tasks(&mut tasks);
        tasks
    }

    fn ordered_events(&self) -> Vec<EventRecord> {
        let mut events: Vec<EventRecord> = guard(&self.inner.events).values().cloned().collect();
        sort_events(&mut events);
        events
    }

    /// Deliver the current task snapshot to every live observer. Observers
    /// are invoked outside the collection lock so a callback may read the
    /// store again.
    fn notify_tasks(&self) {
        let snapshot = self.ordered_tasks();
        let observers: Vec<SnapshotObserver<Task>> = guard(&self.inner.task_observers)
            .values()
            .cloned()
            .collect();
        for observer in observers {
            observer(&snapshot);
        }
    }

    fn notify_events(&self) {
        let snapshot = self.ordered_events();
        let observers: Vec<SnapshotObserver<EventRecord>> = guard(&self.inner.event_observers)
            .values()
            .cloned()
            .collect();
        for observer in observers {
            observer(&snapshot);
        }
    }
}

/// Newest first; ids are ULIDs, so the id tiebreak preserves insertion order
/// for records created within the same millisecond.
pub(crate) fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

pub(crate) fn sort_events(events: &mut [EventRecord]) {
    events.sort_by(|a, b| {
        a.event_date
            .cmp(&b.event_date)
            .then_with(|| a.id.cmp(&b.id))
    });
}

impl TaskCollection for MemoryStore {
    fn create(&self, draft: TaskDraft) -> Result<Task> {
        let task = draft.into_task(new_record_id(), Utc::now());
        guard(&self.inner.tasks).insert(task.id.clone(), task.clone());
        self.notify_tasks();
        Ok(task)
    }

    fn update(&self, id: &str, patch: TaskPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }
        {
            let mut tasks = guard(&self.inner.tasks);
            let task = tasks
                .get_mut(id)
                .ok_or_else(|| Error::NotFound(format!("task {id}")))?;
            patch.apply(task);
        }
        self.notify_tasks();
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        let removed = guard(&self.inner.tasks).remove(id);
        if removed.is_none() {
            return Err(Error::NotFound(format!("task {id}")));
        }
        self.notify_tasks();
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<Task>> {
        Ok(self.ordered_tasks())
    }

    fn subscribe(&self, observer: SnapshotObserver<Task>) -> Result<Subscription> {
        let token = Uuid::new_v4();
        guard(&self.inner.task_observers).insert(token, Arc::clone(&observer));
        observer(&self.ordered_tasks());

        let weak: Weak<StoreInner> = Arc::downgrade(&self.inner);
        Ok(Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                guard(&inner.task_observers).remove(&token);
            }
        }))
    }
}

impl UserCollection for MemoryStore {
    fn create(&self, record: UserRecord) -> Result<()> {
        guard(&self.inner.users).insert(record.id.clone(), record);
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<UserRecord>> {
        Ok(guard(&self.inner.users).get(id).cloned())
    }

    fn read_all(&self) -> Result<Vec<UserRecord>> {
        Ok(guard(&self.inner.users).values().cloned().collect())
    }
}

impl EventCollection for MemoryStore {
    fn create(&self, title: &str, event_date: NaiveDate) -> Result<EventRecord> {
        let record = EventRecord {
            id: new_record_id(),
            title: title.to_string(),
            event_date,
        };
        guard(&self.inner.events).insert(record.id.clone(), record.clone());
        self.notify_events();
        Ok(record)
    }

    fn read_all(&self) -> Result<Vec<EventRecord>> {
        Ok(self.ordered_events())
    }

    fn subscribe(&self, observer: SnapshotObserver<EventRecord>) -> Result<Subscription> {
        let token = Uuid::new_v4();
        guard(&self.inner.event_observers).insert(token, Arc::clone(&observer));
        observer(&self.ordered_events());

        let weak: Weak<StoreInner> = Arc::downgrade(&self.inner);
        Ok(Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                guard(&inner.event_observers).remove(&token);
            }
        }))
    }
}

/// In-memory identity provider for tests and local experimentation.
#[derive(Clone, Default)]
pub struct MemoryIdentity {
    state: Arc<Mutex<IdentityState>>,
}

#[derive(Default)]
struct IdentityState {
    /// email -> (password, identity id)
    accounts: HashMap<String, (String, String)>,
    current: Option<String>,
    signed_in_at: Option<DateTime<Utc>>,
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install an account with a fixed id, without signing it in. Useful for
    /// exercising the path where authentication succeeds but the directory
    /// has no matching record.
    pub fn seed_account(&self, email: &str, password: &str, id: &str) {
        let mut state = guard(&self.state);
        state
            .accounts
            .insert(email.to_string(), (password.to_string(), id.to_string()));
    }

    /// Age out the reauthentication window, so tests can exercise the stale
    /// path of `change_password`.
    pub fn expire_reauthentication(&self) {
        let mut state = guard(&self.state);
        state.signed_in_at = state
            .signed_in_at
            .map(|at| at - Duration::minutes(REAUTH_WINDOW_MINUTES + 1));
    }
}

impl IdentityProvider for MemoryIdentity {
    fn register(&self, email: &str, password: &str) -> Result<String> {
        let mut state = guard(&self.state);
        if state.accounts.contains_key(email) {
            return Err(Error::RegistrationConflict(email.to_string()));
        }
        let id = new_record_id();
        state
            .accounts
            .insert(email.to_string(), (password.to_string(), id.clone()));
        state.current = Some(id.clone());
        state.signed_in_at = Some(Utc::now());
        Ok(id)
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<String> {
        let mut state = guard(&self.state);
        let id = match state.accounts.get(email) {
            Some((stored, id)) if stored == password => id.clone(),
            _ => return Err(Error::InvalidCredentials),
        };
        state.current = Some(id.clone());
        state.signed_in_at = Some(Utc::now());
        Ok(id)
    }

    fn sign_out(&self) {
        let mut state = guard(&self.state);
        state.current = None;
        state.signed_in_at = None;
    }

    fn change_password(&self, new_password: &str) -> Result<()> {
        let mut state = guard(&self.state);
        let current = state.current.clone().ok_or(Error::NotSignedIn)?;
        let fresh = state
            .signed_in_at
            .map(|at| Utc::now() - at < Duration::minutes(REAUTH_WINDOW_MINUTES))
            .unwrap_or(false);
        if !fresh {
            return Err(Error::StaleReauthentication);
        }
        for (password, id) in state.accounts.values_mut() {
            if *id == current {
                *password = new_password.to_string();
                return Ok(());
            }
        }
        Err(Error::NotSignedIn)
    }
}
