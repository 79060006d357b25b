//! Live snapshot reconciliation.
//!
//! A [`Feed`] is the single mutable "latest snapshot" cell behind a store
//! subscription: every delivery swaps the whole in-memory list atomically
//! (full replace, never an incremental patch) and then fires the registered
//! change listeners. The feed is eventually consistent with the remote
//! collection; a mutation's effect becomes visible no earlier than the next
//! delivery.
//!
//! Detaching releases the underlying subscription exactly once; the handle
//! is idempotent, so a feed dropped after an explicit detach does not
//! double-release.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use crate::error::Result;
use crate::model::{EventRecord, Task};
use crate::remote::{SnapshotObserver, Subscription};

type ChangeListener = Arc<dyn Fn() + Send + Sync>;

/// A live-reconciled view of one collection.
pub struct Feed<T> {
    latest: Arc<RwLock<Vec<T>>>,
    generation: Arc<AtomicU64>,
    listeners: Arc<Mutex<Vec<ChangeListener>>>,
    subscription: Arc<Mutex<Subscription>>,
}

/// Clonable handle that releases a feed's subscription from outside its
/// owner, e.g. an auth-state observer tearing a dashboard down. A no-op
/// once the feed itself is gone.
#[derive(Clone)]
pub struct DetachHandle {
    subscription: Weak<Mutex<Subscription>>,
}

impl DetachHandle {
    pub fn detach(&self) {
        if let Some(subscription) = self.subscription.upgrade() {
            subscription
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .unsubscribe();
        }
    }
}

pub type TaskFeed = Feed<Task>;
pub type EventFeed = Feed<EventRecord>;

impl<T: Clone + Send + Sync + 'static> Feed<T> {
    /// Attach to a collection. The `subscribe` closure wires the feed's
    /// observer into the store; the initial delivery populates the cell
    /// before this returns.
    pub fn attach<F>(subscribe: F) -> Result<Self>
    where
        F: FnOnce(SnapshotObserver<T>) -> Result<Subscription>,
    {
        let latest: Arc<RwLock<Vec<T>>> = Arc::new(RwLock::new(Vec::new()));
        let generation = Arc::new(AtomicU64::new(0));
        let listeners: Arc<Mutex<Vec<ChangeListener>>> = Arc::new(Mutex::new(Vec::new()));

        let cell = Arc::clone(&latest);
        let counter = Arc::clone(&generation);
        let notify = Arc::clone(&listeners);
        let observer: SnapshotObserver<T> = Arc::new(move |snapshot: &[T]| {
            {
                let mut latest = cell.write().unwrap_or_else(PoisonError::into_inner);
                *latest = snapshot.to_vec();
            }
            counter.fetch_add(1, Ordering::SeqCst);
            // Invoke outside the lock: a listener may mutate the store and
            // re-enter this observer with a nested delivery.
            let snapshot_listeners: Vec<ChangeListener> = notify
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .cloned()
                .collect();
            for listener in snapshot_listeners {
                listener();
            }
        });

        let subscription = Arc::new(Mutex::new(subscribe(observer)?));

        Ok(Self {
            latest,
            generation,
            listeners,
            subscription,
        })
    }

    /// Clone of the latest delivered snapshot.
    pub fn snapshot(&self) -> Vec<T> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of deliveries received so far (including the initial one).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Register a listener fired after every snapshot swap. A listener that
    /// mutates the store sees the resulting delivery as a nested call.
    pub fn on_change(&self, listener: impl Fn() + Send + Sync + 'static) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(listener));
    }

    /// Release the subscription. Idempotent; also runs on drop.
    pub fn detach(&mut self) {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .unsubscribe();
    }

    /// Handle that detaches this feed from outside its owner.
    pub fn detach_handle(&self) -> DetachHandle {
        DetachHandle {
            subscription: Arc::downgrade(&self.subscription),
        }
    }

    pub fn is_live(&self) -> bool {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_active()
    }
}
