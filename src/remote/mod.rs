//! Collaborator contracts for the remote document store and the identity
//! provider.
//!
//! The portal core never talks to a concrete database. Reads flow through
//! one-shot snapshots (`read_all`) or live subscriptions that push the full
//! current ordered snapshot of a collection on every change; writes are
//! targeted partial updates. Two backends ship with the crate:
//!
//! - [`memory::MemoryStore`] - in-process reference implementation, used by
//!   tests and as the contract's executable documentation
//! - [`local::JsonStore`] - JSON files under a data directory with file
//!   locking and atomic writes, used by the CLI

use std::sync::Arc;

use chrono::NaiveDate;

use crate::error::Result;
use crate::model::{EventRecord, Task, TaskDraft, TaskPatch, UserRecord};

pub mod local;
pub mod memory;

/// Callback receiving the full ordered snapshot of a collection on every
/// change. The remote layer is trusted to deliver complete state each time;
/// observers replace, never merge.
pub type SnapshotObserver<T> = Arc<dyn Fn(&[T]) + Send + Sync>;

/// Handle to a live subscription. Unsubscribing is idempotent: the first
/// call releases the listener, later calls and the eventual drop are no-ops.
/// This guards the double-listener bug class where a dashboard remount
/// re-subscribes while a stale listener still fires.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Release the subscription. Safe to call more than once.
    pub fn unsubscribe(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Whether the subscription still holds a live listener.
    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// The task collection. Snapshots are ordered by creation time descending.
pub trait TaskCollection: Send + Sync {
    /// Create a record; the store assigns the id and creation timestamp.
    fn create(&self, draft: TaskDraft) -> Result<Task>;

    /// Apply a targeted partial update to one record.
    fn update(&self, id: &str, patch: TaskPatch) -> Result<()>;

    /// Remove a record permanently. There is no tombstone or undo tier.
    fn delete(&self, id: &str) -> Result<()>;

    /// One-shot ordered snapshot of the whole collection.
    fn read_all(&self) -> Result<Vec<Task>>;

    /// Live subscription; the observer receives the current snapshot
    /// immediately and again after every subsequent change by any client.
    fn subscribe(&self, observer: SnapshotObserver<Task>) -> Result<Subscription>;
}

/// The user directory collection. Read-mostly: records are created at
/// registration and looked up by id.
pub trait UserCollection: Send + Sync {
    fn create(&self, record: UserRecord) -> Result<()>;

    fn get(&self, id: &str) -> Result<Option<UserRecord>>;

    /// One-shot snapshot of every user record.
    fn read_all(&self) -> Result<Vec<UserRecord>>;
}

/// The event collection. Snapshots are ordered by event date ascending.
pub trait EventCollection: Send + Sync {
    fn create(&self, title: &str, event_date: NaiveDate) -> Result<EventRecord>;

    fn read_all(&self) -> Result<Vec<EventRecord>>;

    fn subscribe(&self, observer: SnapshotObserver<EventRecord>) -> Result<Subscription>;
}

/// External identity provider. Authentication protocol internals are the
/// provider's concern; the portal only consumes resolved identity ids.
pub trait IdentityProvider: Send + Sync {
    /// Create an identity; fails with `RegistrationConflict` when the email
    /// is already registered.
    fn register(&self, email: &str, password: &str) -> Result<String>;

    /// Fails with `InvalidCredentials` on a bad email/password pair.
    fn sign_in(&self, email: &str, password: &str) -> Result<String>;

    fn sign_out(&self);

    /// Fails with `StaleReauthentication` when the last sign-in is too old.
    fn change_password(&self, new_password: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn unsubscribe_is_idempotent() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut subscription = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(subscription.is_active());
        subscription.unsubscribe();
        subscription.unsubscribe();
        assert!(!subscription.is_active());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_releases_at_most_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        {
            let mut subscription = Subscription::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
            subscription.unsubscribe();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
