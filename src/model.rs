//! Record types shared by the portal core and the store backends.
//!
//! A task moves through a fixed 4-state workflow and carries an unordered
//! assignee set. Mutations are expressed as [`TaskPatch`] values so every
//! write stays a targeted partial update rather than a full-record overwrite.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Fixed workflow sequence a task progresses through.
pub const STATUS_FLOW: [TaskStatus; 4] = [
    TaskStatus::Todo,
    TaskStatus::InDev,
    TaskStatus::InTest,
    TaskStatus::Completed,
];

/// Workflow status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Todo,
    InDev,
    InTest,
    Completed,
}

impl TaskStatus {
    /// Position of this status in [`STATUS_FLOW`].
    pub fn position(self) -> usize {
        STATUS_FLOW
            .iter()
            .position(|status| *status == self)
            .unwrap_or(0)
    }

    /// Neighbor status in the given direction, or `None` when the move
    /// would leave the sequence bounds.
    pub fn step(self, direction: i32) -> Option<TaskStatus> {
        let target = self.position() as i64 + i64::from(direction);
        if target < 0 || target >= STATUS_FLOW.len() as i64 {
            return None;
        }
        Some(STATUS_FLOW[target as usize])
    }

    /// Human label used by rendered views.
    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::Todo => "To Do",
            TaskStatus::InDev => "In Development",
            TaskStatus::InTest => "In Test",
            TaskStatus::Completed => "Completed",
        }
    }

    /// Wire name, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InDev => "in-dev",
            TaskStatus::InTest => "in-test",
            TaskStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "todo" => Ok(TaskStatus::Todo),
            "in-dev" => Ok(TaskStatus::InDev),
            "in-test" => Ok(TaskStatus::InTest),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(Error::InvalidArgument(format!(
                "unknown task status '{other}' (expected todo, in-dev, in-test, completed)"
            ))),
        }
    }
}

/// A task record as materialized from the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub event_name: String,
    pub event_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requirements: Vec<String>,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub assigned_to: BTreeSet<String>,
    pub faculty_name: String,
    pub faculty_contact: String,
    /// Ordering key only, never displayed as identity.
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn is_assigned_to(&self, user_id: &str) -> bool {
        self.assigned_to.contains(user_id)
    }
}

/// Fields a faculty actor supplies when creating a task. The store assigns
/// the id and the creation timestamp; status starts at todo with no
/// assignees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub event_name: String,
    pub event_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requirements: Vec<String>,
    pub faculty_name: String,
    pub faculty_contact: String,
}

impl TaskDraft {
    /// Materialize the draft into a fresh record.
    pub fn into_task(self, id: String, created_at: DateTime<Utc>) -> Task {
        Task {
            id,
            title: self.title,
            description: self.description,
            event_name: self.event_name,
            event_date: self.event_date,
            due_date: self.due_date,
            requirements: dedup_preserving_order(self.requirements),
            status: TaskStatus::Todo,
            assigned_to: BTreeSet::new(),
            faculty_name: self.faculty_name,
            faculty_contact: self.faculty_contact,
            created_at,
        }
    }
}

fn dedup_preserving_order(values: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    values
        .into_iter()
        .filter(|value| seen.insert(value.clone()))
        .collect()
}

/// How a patch writes the assignee set.
#[derive(Debug, Clone, PartialEq)]
pub enum AssigneeWrite {
    /// Full overwrite: last writer wins.
    Replace(BTreeSet<String>),
    /// Commutative set union: concurrent claims never lose either side.
    Union(BTreeSet<String>),
}

/// A targeted partial update to a single task record. Only the fields set
/// here are touched; concurrent edits to other fields are never clobbered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub status: Option<TaskStatus>,
    pub assignees: Option<AssigneeWrite>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn replace_assignees(assignees: BTreeSet<String>) -> Self {
        Self {
            assignees: Some(AssigneeWrite::Replace(assignees)),
            ..Self::default()
        }
    }

    pub fn union_assignees(assignees: BTreeSet<String>) -> Self {
        Self {
            assignees: Some(AssigneeWrite::Union(assignees)),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.assignees.is_none()
    }

    /// Apply the patch to a record. Shared by the store backends so both
    /// implement identical field semantics.
    pub fn apply(&self, task: &mut Task) {
        if let Some(status) = self.status {
            task.status = status;
        }
        match &self.assignees {
            Some(AssigneeWrite::Replace(set)) => {
                task.assigned_to = set.clone();
            }
            Some(AssigneeWrite::Union(set)) => {
                task.assigned_to.extend(set.iter().cloned());
            }
            None => {}
        }
    }
}

/// Role of a portal user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Faculty,
    Member,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Faculty => f.write_str("faculty"),
            Role::Member => f.write_str("member"),
        }
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "faculty" => Ok(Role::Faculty),
            "member" => Ok(Role::Member),
            other => Err(Error::InvalidArgument(format!(
                "unknown role '{other}' (expected faculty or member)"
            ))),
        }
    }
}

/// A user directory record. The id matches the authentication identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: Role,
    /// Capability marker permitting destructive operations; meaningful only
    /// for members.
    #[serde(default)]
    pub admin: bool,
}

/// A calendar event tasks originate from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: String,
    pub title: String,
    pub event_date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().expect("date")
    }

    #[test]
    fn status_step_respects_bounds() {
        assert_eq!(TaskStatus::Todo.step(-1), None);
        assert_eq!(TaskStatus::Todo.step(1), Some(TaskStatus::InDev));
        assert_eq!(TaskStatus::InTest.step(1), Some(TaskStatus::Completed));
        assert_eq!(TaskStatus::Completed.step(1), None);
        assert_eq!(TaskStatus::Completed.step(-1), Some(TaskStatus::InTest));
    }

    #[test]
    fn status_round_trips_through_wire_names() {
        for status in STATUS_FLOW {
            let parsed: TaskStatus = status.as_str().parse().expect("parse");
            assert_eq!(parsed, status);
        }
        assert!("done".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn status_serde_uses_kebab_case() {
        let json = serde_json::to_string(&TaskStatus::InDev).expect("json");
        assert_eq!(json, "\"in-dev\"");
        let back: TaskStatus = serde_json::from_str("\"in-test\"").expect("parse");
        assert_eq!(back, TaskStatus::InTest);
    }

    #[test]
    fn draft_materializes_with_todo_and_no_assignees() {
        let draft = TaskDraft {
            title: "Posters".to_string(),
            description: String::new(),
            event_name: "Tech fest".to_string(),
            event_date: date("2025-03-10"),
            due_date: Some(date("2025-03-01")),
            requirements: vec![
                "design".to_string(),
                "print".to_string(),
                "design".to_string(),
            ],
            faculty_name: "Dr. Rao".to_string(),
            faculty_contact: "555-0101".to_string(),
        };

        let task = draft.into_task("t1".to_string(), Utc::now());
        assert_eq!(task.status, TaskStatus::Todo);
        assert!(task.assigned_to.is_empty());
        assert_eq!(task.requirements, vec!["design", "print"]);
    }

    #[test]
    fn patch_union_is_idempotent() {
        let mut task = sample_task();
        let patch = TaskPatch::union_assignees(BTreeSet::from(["u1".to_string()]));
        patch.apply(&mut task);
        patch.apply(&mut task);
        assert_eq!(task.assigned_to, BTreeSet::from(["u1".to_string()]));
    }

    #[test]
    fn patch_replace_overwrites_even_with_subset() {
        let mut task = sample_task();
        TaskPatch::union_assignees(BTreeSet::from(["u1".to_string(), "u2".to_string()]))
            .apply(&mut task);

        let subset = BTreeSet::from(["u2".to_string()]);
        TaskPatch::replace_assignees(subset.clone()).apply(&mut task);
        assert_eq!(task.assigned_to, subset);
    }

    #[test]
    fn patch_touches_only_named_fields() {
        let mut task = sample_task();
        let before_assignees = task.assigned_to.clone();
        TaskPatch::status(TaskStatus::InDev).apply(&mut task);
        assert_eq!(task.status, TaskStatus::InDev);
        assert_eq!(task.assigned_to, before_assignees);
    }

    fn sample_task() -> Task {
        TaskDraft {
            title: "Sample".to_string(),
            description: String::new(),
            event_name: "Event".to_string(),
            event_date: date("2025-01-01"),
            due_date: None,
            requirements: Vec::new(),
            faculty_name: "Faculty".to_string(),
            faculty_contact: "555".to_string(),
        }
        .into_task("t0".to_string(), Utc::now())
    }
}
