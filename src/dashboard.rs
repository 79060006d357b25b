//! Dashboard view models.
//!
//! A dashboard owns the live feeds and directory for as long as it is
//! mounted; nothing here persists across mounts, and unmounting releases the
//! subscriptions so a later mount never receives duplicate deliveries.
//! Mounting against a session also watches its auth state: a sign-out from
//! any surface detaches the feeds without waiting for an explicit unmount.
//!
//! Store failures during a mutation are logged, pushed onto the notice
//! queue, and otherwise dropped: the next subscription delivery is what
//! corrects the visible state, and for a failed write it simply never
//! arrives. Policy rejections propagate to the caller instead.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::board::{self, Board};
use crate::config::BoardConfig;
use crate::directory::Directory;
use crate::error::{Error, Result};
use crate::feed::{EventFeed, TaskFeed};
use crate::model::{Role, Task, TaskDraft, TaskStatus};
use crate::mutate::TaskActions;
use crate::remote::{EventCollection, Subscription, TaskCollection, UserCollection};
use crate::session::{Session, SessionUser};

/// Remote collection handles a dashboard mounts against.
#[derive(Clone)]
pub struct Stores {
    pub tasks: Arc<dyn TaskCollection>,
    pub users: Arc<dyn UserCollection>,
    pub events: Arc<dyn EventCollection>,
}

/// Member board: live task and event feeds, claim/move/reassign/delete.
pub struct MemberDashboard {
    stores: Stores,
    user: SessionUser,
    directory: Directory,
    tasks: TaskFeed,
    events: EventFeed,
    board_config: BoardConfig,
    selected: Option<String>,
    notices: Vec<String>,
    auth: Option<Subscription>,
}

impl MemberDashboard {
    /// Mount for the session's current identity. An anonymous session is a
    /// redirect-to-login signal, reported as `NotSignedIn`; a later
    /// sign-out, from any surface, detaches the feeds.
    pub fn mount(stores: Stores, session: &Session, board_config: BoardConfig) -> Result<Self> {
        let user = session.current().ok_or(Error::NotSignedIn)?.clone();
        let mut dashboard = Self::mount_as(stores, user, board_config)?;

        let tasks = dashboard.tasks.detach_handle();
        let events = dashboard.events.detach_handle();
        dashboard.auth = Some(session.subscribe(Arc::new(
            move |user: Option<&SessionUser>| {
                if user.is_none() {
                    tasks.detach();
                    events.detach();
                }
            },
        )));
        Ok(dashboard)
    }

    /// Mount for an already-resolved identity.
    pub fn mount_as(stores: Stores, user: SessionUser, board_config: BoardConfig) -> Result<Self> {
        if user.role != Role::Member {
            return Err(Error::PermissionDenied {
                operation: "open member board".to_string(),
                requirement: "the member role".to_string(),
            });
        }

        let directory = Directory::load(stores.users.as_ref(), Some(&user))?;
        let tasks = {
            let collection = Arc::clone(&stores.tasks);
            TaskFeed::attach(move |observer| collection.subscribe(observer))?
        };
        let events = {
            let collection = Arc::clone(&stores.events);
            EventFeed::attach(move |observer| collection.subscribe(observer))?
        };
        debug!(user = %user.id, "member dashboard mounted");

        Ok(Self {
            stores,
            user,
            directory,
            tasks,
            events,
            board_config,
            selected: None,
            notices: Vec::new(),
            auth: None,
        })
    }

    pub fn user(&self) -> &SessionUser {
        &self.user
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Recompute the projection from the latest snapshots.
    pub fn board(&self) -> Board {
        board::project(
            &self.tasks.snapshot(),
            &self.events.snapshot(),
            &self.user.id,
            &self.directory,
            &self.board_config,
        )
    }

    pub fn tasks(&self) -> &TaskFeed {
        &self.tasks
    }

    pub fn select(&mut self, task_id: Option<String>) {
        self.selected = task_id;
    }

    pub fn selected_task(&self) -> Option<Task> {
        let id = self.selected.as_deref()?;
        self.tasks.snapshot().into_iter().find(|t| t.id == id)
    }

    /// Current assignees of the selected task, the reassignment dialog's
    /// starting set. Empty when nothing is selected.
    pub fn reassignment_seed(&self) -> std::collections::BTreeSet<String> {
        self.selected_task()
            .map(|t| t.assigned_to)
            .unwrap_or_default()
    }

    pub fn move_task(&mut self, task_id: &str, direction: i32) -> Result<Option<TaskStatus>> {
        let task = self.find(task_id)?;
        let actions = TaskActions::new(self.stores.tasks.as_ref(), &self.user);
        match actions.move_status(&task, direction) {
            Ok(moved) => Ok(moved),
            Err(err) => self.absorb(err).map(|()| None),
        }
    }

    pub fn take_task(&mut self, task_id: &str) -> Result<()> {
        let task = self.find(task_id)?;
        let actions = TaskActions::new(self.stores.tasks.as_ref(), &self.user);
        match actions.claim_self(&task) {
            Ok(()) => Ok(()),
            Err(err) => self.absorb(err),
        }
    }

    pub fn update_assignees(
        &mut self,
        task_id: &str,
        assignees: std::collections::BTreeSet<String>,
    ) -> Result<()> {
        let task = self.find(task_id)?;
        let actions = TaskActions::new(self.stores.tasks.as_ref(), &self.user);
        match actions.update_assignees(&task, assignees) {
            Ok(()) => Ok(()),
            Err(err) => self.absorb(err),
        }
    }

    /// Delete and clear the detail view if it referenced the record.
    pub fn delete_task(&mut self, task_id: &str) -> Result<()> {
        let task = self.find(task_id)?;
        let actions = TaskActions::new(self.stores.tasks.as_ref(), &self.user);
        match actions.delete(&task) {
            Ok(()) => {
                if self.selected.as_deref() == Some(task_id) {
                    self.selected = None;
                }
                Ok(())
            }
            Err(err) => self.absorb(err),
        }
    }

    /// Drain queued transient notices.
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    /// Release the live subscriptions. Idempotent; also runs on drop.
    pub fn unmount(&mut self) {
        if let Some(auth) = self.auth.as_mut() {
            auth.unsubscribe();
        }
        self.tasks.detach();
        self.events.detach();
        debug!(user = %self.user.id, "member dashboard unmounted");
    }

    fn find(&self, task_id: &str) -> Result<Task> {
        self.tasks
            .snapshot()
            .into_iter()
            .find(|t| t.id == task_id)
            .ok_or_else(|| Error::NotFound(format!("task {task_id}")))
    }

    fn absorb(&mut self, err: Error) -> Result<()> {
        match err {
            Error::MutationRejected(reason) => {
                warn!(user = %self.user.id, %reason, "task write rejected");
                self.notices.push(format!("Task update failed: {reason}"));
                Ok(())
            }
            other => Err(other),
        }
    }
}

impl Drop for MemberDashboard {
    fn drop(&mut self) {
        self.unmount();
    }
}

/// Faculty board: live task feed plus task creation; no task edits.
pub struct FacultyDashboard {
    stores: Stores,
    user: SessionUser,
    directory: Directory,
    tasks: TaskFeed,
    board_config: BoardConfig,
    auth: Option<Subscription>,
}

impl FacultyDashboard {
    pub fn mount(stores: Stores, session: &Session, board_config: BoardConfig) -> Result<Self> {
        let user = session.current().ok_or(Error::NotSignedIn)?.clone();
        let mut dashboard = Self::mount_as(stores, user, board_config)?;

        let tasks = dashboard.tasks.detach_handle();
        dashboard.auth = Some(session.subscribe(Arc::new(
            move |user: Option<&SessionUser>| {
                if user.is_none() {
                    tasks.detach();
                }
            },
        )));
        Ok(dashboard)
    }

    /// Mount for an already-resolved identity.
    pub fn mount_as(stores: Stores, user: SessionUser, board_config: BoardConfig) -> Result<Self> {
        if user.role != Role::Faculty {
            return Err(Error::PermissionDenied {
                operation: "open faculty board".to_string(),
                requirement: "the faculty role".to_string(),
            });
        }

        let directory = Directory::load(stores.users.as_ref(), Some(&user))?;
        let tasks = {
            let collection = Arc::clone(&stores.tasks);
            TaskFeed::attach(move |observer| collection.subscribe(observer))?
        };
        debug!(user = %user.id, "faculty dashboard mounted");

        Ok(Self {
            stores,
            user,
            directory,
            tasks,
            board_config,
            auth: None,
        })
    }

    pub fn user(&self) -> &SessionUser {
        &self.user
    }

    pub fn create_task(&self, draft: TaskDraft) -> Result<Task> {
        TaskActions::new(self.stores.tasks.as_ref(), &self.user).create(draft)
    }

    pub fn board(&self) -> Board {
        board::project(
            &self.tasks.snapshot(),
            &[],
            &self.user.id,
            &self.directory,
            &self.board_config,
        )
    }

    pub fn unmount(&mut self) {
        if let Some(auth) = self.auth.as_mut() {
            auth.unsubscribe();
        }
        self.tasks.detach();
        debug!(user = %self.user.id, "faculty dashboard unmounted");
    }
}

impl Drop for FacultyDashboard {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UserRecord;
    use crate::remote::memory::{MemoryIdentity, MemoryStore};
    use std::collections::BTreeSet;

    fn stores(store: &MemoryStore) -> Stores {
        Stores {
            tasks: Arc::new(store.clone()),
            users: Arc::new(store.clone()),
            events: Arc::new(store.clone()),
        }
    }

    fn register(session: &mut Session, email: &str, name: &str, role: Role, admin: bool) -> SessionUser {
        session
            .register(name, email, "pw", role, admin)
            .expect("register")
    }

    fn session_for(store: &MemoryStore, identity: &Arc<MemoryIdentity>) -> Session {
        Session::new(
            Arc::clone(identity) as Arc<dyn crate::remote::IdentityProvider>,
            Arc::new(store.clone()),
        )
    }

    fn draft(title: &str) -> TaskDraft {
        TaskDraft {
            title: title.to_string(),
            description: String::new(),
            event_name: "Event".to_string(),
            event_date: "2025-05-01".parse().expect("date"),
            due_date: None,
            requirements: Vec::new(),
            faculty_name: "Dr. Rao".to_string(),
            faculty_contact: "555".to_string(),
        }
    }

    #[test]
    fn mount_requires_a_signed_in_identity() {
        let store = MemoryStore::new();
        let identity = Arc::new(MemoryIdentity::new());
        let session = session_for(&store, &identity);

        let err = MemberDashboard::mount(stores(&store), &session, BoardConfig::default())
            .err()
            .expect("anonymous mount fails");
        assert!(matches!(err, Error::NotSignedIn));
    }

    #[test]
    fn faculty_cannot_mount_the_member_board() {
        let store = MemoryStore::new();
        let identity = Arc::new(MemoryIdentity::new());
        let mut session = session_for(&store, &identity);
        register(&mut session, "rao@example.edu", "Dr. Rao", Role::Faculty, false);

        let err = MemberDashboard::mount(stores(&store), &session, BoardConfig::default())
            .err()
            .expect("faculty mount fails");
        assert!(matches!(err, Error::PermissionDenied { .. }));
    }

    #[test]
    fn board_reflects_writes_made_through_other_handles() {
        let store = MemoryStore::new();
        let identity = Arc::new(MemoryIdentity::new());

        let mut faculty_session = session_for(&store, &identity);
        register(&mut faculty_session, "rao@example.edu", "Dr. Rao", Role::Faculty, false);
        let faculty = FacultyDashboard::mount(stores(&store), &faculty_session, BoardConfig::default())
            .expect("faculty mount");

        let mut member_session = session_for(&store, &identity);
        register(&mut member_session, "asha@example.edu", "Asha", Role::Member, false);
        let member = MemberDashboard::mount(stores(&store), &member_session, BoardConfig::default())
            .expect("member mount");

        assert!(member.board().columns[0].tasks.is_empty());
        faculty.create_task(draft("poster design")).expect("create");

        let board = member.board();
        assert_eq!(board.columns[0].tasks.len(), 1);
        assert_eq!(board.columns[0].tasks[0].title, "poster design");
    }

    #[test]
    fn delete_clears_the_detail_view() {
        let store = MemoryStore::new();
        let identity = Arc::new(MemoryIdentity::new());

        let mut faculty_session = session_for(&store, &identity);
        register(&mut faculty_session, "rao@example.edu", "Dr. Rao", Role::Faculty, false);
        let task = TaskActions::new(
            &store,
            faculty_session.current().expect("signed in"),
        )
        .create(draft("poster design"))
        .expect("create");

        let mut member_session = session_for(&store, &identity);
        register(&mut member_session, "asha@example.edu", "Asha", Role::Member, true);
        let mut member = MemberDashboard::mount(stores(&store), &member_session, BoardConfig::default())
            .expect("member mount");

        member.select(Some(task.id.clone()));
        assert!(member.selected_task().is_some());
        member.delete_task(&task.id).expect("delete");
        assert!(member.selected_task().is_none());
        assert!(member.board().columns[0].tasks.is_empty());
    }

    #[test]
    fn rejected_writes_become_notices_not_errors() {
        let store = MemoryStore::new();
        let identity = Arc::new(MemoryIdentity::new());

        let mut faculty_session = session_for(&store, &identity);
        register(&mut faculty_session, "rao@example.edu", "Dr. Rao", Role::Faculty, false);
        let task = TaskActions::new(&store, faculty_session.current().expect("signed in"))
            .create(draft("poster design"))
            .expect("create");

        let mut member_session = session_for(&store, &identity);
        register(&mut member_session, "asha@example.edu", "Asha", Role::Member, true);
        let mut member = MemberDashboard::mount(stores(&store), &member_session, BoardConfig::default())
            .expect("member mount");

        // Another client deletes the record while it is still in this
        // dashboard's last-delivered snapshot.
        let snapshot_before = member.tasks().generation();
        store.delete(&task.id).expect("delete");
        assert!(member.tasks().generation() > snapshot_before);

        // Act on the stale detail view anyway.
        member.select(Some(task.id.clone()));
        let err = member.take_task(&task.id).expect_err("record is gone");
        assert!(matches!(err, Error::NotFound(_)));
        assert!(member.take_notices().is_empty());
    }

    #[test]
    fn reassignment_seed_tracks_the_selected_task() {
        let store = MemoryStore::new();
        let identity = Arc::new(MemoryIdentity::new());

        let mut faculty_session = session_for(&store, &identity);
        register(&mut faculty_session, "rao@example.edu", "Dr. Rao", Role::Faculty, false);
        let task = TaskActions::new(&store, faculty_session.current().expect("signed in"))
            .create(draft("poster design"))
            .expect("create");

        let mut member_session = session_for(&store, &identity);
        let me = register(&mut member_session, "asha@example.edu", "Asha", Role::Member, false);
        let mut member = MemberDashboard::mount(stores(&store), &member_session, BoardConfig::default())
            .expect("member mount");

        member.select(Some(task.id.clone()));
        assert!(member.reassignment_seed().is_empty());
        member.take_task(&task.id).expect("claim");
        assert_eq!(member.reassignment_seed(), BTreeSet::from([me.id]));
    }

    #[test]
    fn unmount_stops_reconciliation() {
        let store = MemoryStore::new();
        let identity = Arc::new(MemoryIdentity::new());

        let mut member_session = session_for(&store, &identity);
        register(&mut member_session, "asha@example.edu", "Asha", Role::Member, false);
        let mut member = MemberDashboard::mount(stores(&store), &member_session, BoardConfig::default())
            .expect("member mount");

        member.unmount();
        assert!(!member.tasks().is_live());

        let mut faculty_session = session_for(&store, &identity);
        register(&mut faculty_session, "rao@example.edu", "Dr. Rao", Role::Faculty, false);
        TaskActions::new(&store, faculty_session.current().expect("signed in"))
            .create(draft("poster design"))
            .expect("create");

        // Last-known-good snapshot stays; no further deliveries arrive.
        assert!(member.board().columns[0].tasks.is_empty());
    }

    #[test]
    fn external_sign_out_tears_down_a_mounted_dashboard() {
        let store = MemoryStore::new();
        let identity = Arc::new(MemoryIdentity::new());

        let mut member_session = session_for(&store, &identity);
        register(&mut member_session, "asha@example.edu", "Asha", Role::Member, false);
        let member = MemberDashboard::mount(stores(&store), &member_session, BoardConfig::default())
            .expect("member mount");
        assert!(member.tasks().is_live());

        // Sign out from the session, not through the dashboard.
        member_session.sign_out();
        assert!(!member.tasks().is_live());

        // Later writes no longer reach the detached board.
        let mut faculty_session = session_for(&store, &identity);
        register(&mut faculty_session, "rao@example.edu", "Dr. Rao", Role::Faculty, false);
        TaskActions::new(&store, faculty_session.current().expect("signed in"))
            .create(draft("poster design"))
            .expect("create");
        assert!(member.board().columns[0].tasks.is_empty());
    }

    #[test]
    fn missing_user_record_is_unrecoverable_for_the_session() {
        let store = MemoryStore::new();
        let identity = Arc::new(MemoryIdentity::new());
        identity.seed_account("ghost@example.edu", "pw", "ghost-id");

        let mut session = session_for(&store, &identity);
        let err = session
            .sign_in("ghost@example.edu", "pw")
            .expect_err("no role record");
        assert!(matches!(err, Error::NoRoleRecord(_)));
        assert!(session.current().is_none());
    }
}
