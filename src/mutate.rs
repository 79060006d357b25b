//! Task mutation API.
//!
//! Every operation is a targeted partial update against the remote task
//! collection; the visible result always comes from the next subscription
//! delivery, never from a local patch. Authorization runs through one guard
//! function so the policy tests independently of any wiring.
//!
//! Store failures are wrapped as `MutationRejected` for call sites to log
//! and surface as a transient notice; there is no automatic retry and no
//! local rollback.

use std::collections::BTreeSet;
use std::fmt;

use crate::error::{Error, Result};
use crate::model::{Role, Task, TaskDraft, TaskPatch, TaskStatus};
use crate::remote::TaskCollection;
use crate::session::SessionUser;

/// Operations subject to the permission guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOperation {
    Create,
    MoveStatus,
    ClaimSelf,
    Reassign,
    Delete,
}

impl fmt::Display for TaskOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskOperation::Create => "create task",
            TaskOperation::MoveStatus => "move task",
            TaskOperation::ClaimSelf => "claim task",
            TaskOperation::Reassign => "reassign task",
            TaskOperation::Delete => "delete task",
        };
        f.write_str(name)
    }
}

/// Allow/deny decision for an operation under the given session identity.
///
/// Faculty create tasks and never edit them; members move, claim and
/// reassign; deletion needs the admin flag on a member identity. The flag is
/// client-readable, so this is a courtesy gate, not a security boundary --
/// the store's own access rules are the real enforcement point.
pub fn authorize(user: &SessionUser, operation: TaskOperation) -> Result<()> {
    let allowed = match operation {
        TaskOperation::Create => user.role == Role::Faculty,
        TaskOperation::MoveStatus | TaskOperation::ClaimSelf | TaskOperation::Reassign => {
            user.role == Role::Member
        }
        TaskOperation::Delete => user.role == Role::Member && user.admin,
    };

    if allowed {
        Ok(())
    } else {
        let requirement = match operation {
            TaskOperation::Create => "the faculty role",
            TaskOperation::Delete => "an admin member identity",
            _ => "the member role",
        };
        Err(Error::PermissionDenied {
            operation: operation.to_string(),
            requirement: requirement.to_string(),
        })
    }
}

/// Mutation entry points bound to a task collection and a session identity.
pub struct TaskActions<'a> {
    tasks: &'a dyn TaskCollection,
    user: &'a SessionUser,
}

impl<'a> TaskActions<'a> {
    pub fn new(tasks: &'a dyn TaskCollection, user: &'a SessionUser) -> Self {
        Self { tasks, user }
    }

    /// Faculty-only: create a task with status todo and no assignees.
    pub fn create(&self, draft: TaskDraft) -> Result<Task> {
        authorize(self.user, TaskOperation::Create)?;
        self.tasks.create(draft).map_err(reject)
    }

    /// Move one step along the workflow. Returns the new status, or `None`
    /// for a silent no-op when the move would leave the sequence bounds.
    pub fn move_status(&self, task: &Task, direction: i32) -> Result<Option<TaskStatus>> {
        authorize(self.user, TaskOperation::MoveStatus)?;
        let Some(next) = task.status.step(direction) else {
            return Ok(None);
        };
        self.tasks
            .update(&task.id, TaskPatch::status(next))
            .map_err(reject)?;
        Ok(Some(next))
    }

    /// Add the session identity to the assignee set via set union.
    /// Idempotent, and commutative with concurrent claims by other users.
    pub fn claim_self(&self, task: &Task) -> Result<()> {
        authorize(self.user, TaskOperation::ClaimSelf)?;
        let claim = BTreeSet::from([self.user.id.clone()]);
        self.tasks
            .update(&task.id, TaskPatch::union_assignees(claim))
            .map_err(reject)
    }

    /// Replace the whole assignee set. Last writer wins on concurrent
    /// reassignment; the dialog seeds its working set from the task's
    /// current assignees on open.
    pub fn update_assignees(&self, task: &Task, assignees: BTreeSet<String>) -> Result<()> {
        authorize(self.user, TaskOperation::Reassign)?;
        self.tasks
            .update(&task.id, TaskPatch::replace_assignees(assignees))
            .map_err(reject)
    }

    /// Hard delete, admin members only. Rejected before any remote call
    /// when the session lacks the admin flag.
    pub fn delete(&self, task: &Task) -> Result<()> {
        authorize(self.user, TaskOperation::Delete)?;
        self.tasks.delete(&task.id).map_err(reject)
    }
}

/// Wrap store failures so call sites can report them uniformly. Policy
/// rejections pass through untouched.
fn reject(err: Error) -> Error {
    match err {
        Error::PermissionDenied { .. } => err,
        other => Error::MutationRejected(other.to_string()),
    }
}
