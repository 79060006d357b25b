//! Board projection.
//!
//! A pure derivation over the latest task and event snapshots; it holds no
//! state of its own and is recomputed from scratch on every feed delivery or
//! session change. Column order follows the workflow sequence; within a
//! column, tasks keep the store's delivered order (newest first).

use serde::Serialize;

use crate::config::BoardConfig;
use crate::directory::Directory;
use crate::model::{EventRecord, Task, TaskStatus, STATUS_FLOW};

#[derive(Debug, Clone, Serialize)]
pub struct Board {
    pub columns: Vec<Column>,
    /// Tasks the viewer has not claimed.
    pub available: Vec<Task>,
    /// Tasks with a due date, ascending, capped.
    pub due_soon: Vec<Task>,
    /// Completed tasks with assignees resolved to display names.
    pub completed: Vec<CompletedEntry>,
    /// Events on or after their stored order, capped.
    pub upcoming_events: Vec<EventRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Column {
    pub status: TaskStatus,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletedEntry {
    #[serde(flatten)]
    pub task: Task,
    pub assignee_names: Vec<String>,
}

/// Project the full board for one viewer.
///
/// `tasks` must already carry the store's delivered order (creation time
/// descending); the projection never re-sorts columns. Due-soon uses a
/// stable sort so equal due dates keep store order, and tasks without a due
/// date are excluded outright rather than sorted to either end.
pub fn project(
    tasks: &[Task],
    events: &[EventRecord],
    viewer_id: &str,
    directory: &Directory,
    config: &BoardConfig,
) -> Board {
    let columns = STATUS_FLOW
        .iter()
        .map(|&status| Column {
            status,
            tasks: tasks
                .iter()
                .filter(|t| t.status == status)
                .cloned()
                .collect(),
        })
        .collect();

    let available = tasks
        .iter()
        .filter(|t| !t.is_assigned_to(viewer_id))
        .cloned()
        .collect();

    let mut due_soon: Vec<Task> = tasks
        .iter()
        .filter(|t| t.due_date.is_some())
        .cloned()
        .collect();
    due_soon.sort_by_key(|t| t.due_date);
    due_soon.truncate(config.due_soon_limit);

    let completed = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .map(|t| CompletedEntry {
            assignee_names: t
                .assigned_to
                .iter()
                .map(|id| directory.display_name(id).to_string())
                .collect(),
            task: t.clone(),
        })
        .collect();

    let upcoming_events = events
        .iter()
        .take(config.upcoming_limit)
        .cloned()
        .collect();

    Board {
        columns,
        available,
        due_soon,
        completed,
        upcoming_events,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::UNKNOWN_USER;
    use crate::model::Role;
    use chrono::{NaiveDate, TimeZone, Utc};
    use std::collections::BTreeSet;

    fn task(id: &str, status: TaskStatus, due: Option<&str>, assignees: &[&str]) -> Task {
        Task {
            id: id.to_string(),
            title: format!("task {id}"),
            description: String::new(),
            event_name: "Event".to_string(),
            event_date: NaiveDate::from_ymd_opt(2025, 5, 1).expect("date"),
            due_date: due.map(|d| d.parse().expect("due date")),
            requirements: Vec::new(),
            status,
            assigned_to: assignees.iter().map(|s| s.to_string()).collect(),
            faculty_name: "Dr. Rao".to_string(),
            faculty_contact: "555".to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).single().expect("ts"),
        }
    }

    fn directory_with(entries: &[(&str, &str)]) -> Directory {
        let mut dir = Directory::empty();
        for (id, name) in entries {
            dir.insert_for_tests(id, name, Role::Member);
        }
        dir
    }

    #[test]
    fn columns_partition_by_status_preserving_order() {
        let tasks = vec![
            task("c", TaskStatus::Todo, None, &[]),
            task("b", TaskStatus::InDev, None, &[]),
            task("a", TaskStatus::Todo, None, &[]),
        ];
        let board = project(&tasks, &[], "u1", &Directory::empty(), &BoardConfig::default());

        assert_eq!(board.columns.len(), 4);
        let todo: Vec<&str> = board.columns[0].tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(todo, ["c", "a"]);
        assert_eq!(board.columns[1].tasks[0].id, "b");
        assert!(board.columns[2].tasks.is_empty());
    }

    #[test]
    fn available_excludes_the_viewers_claims() {
        let tasks = vec![
            task("a", TaskStatus::Todo, None, &["u1"]),
            task("b", TaskStatus::Todo, None, &["u2"]),
            task("c", TaskStatus::Todo, None, &[]),
        ];
        let board = project(&tasks, &[], "u1", &Directory::empty(), &BoardConfig::default());
        let ids: Vec<&str> = board.available.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["b", "c"]);
    }

    #[test]
    fn due_soon_excludes_undated_and_caps_at_the_limit() {
        let tasks = vec![
            task("a", TaskStatus::Todo, Some("2025-06-03"), &[]),
            task("b", TaskStatus::Todo, None, &[]),
            task("c", TaskStatus::Todo, Some("2025-06-01"), &[]),
            task("d", TaskStatus::Todo, Some("2025-06-02"), &[]),
        ];
        let config = BoardConfig {
            due_soon_limit: 2,
            ..BoardConfig::default()
        };
        let board = project(&tasks, &[], "u1", &Directory::empty(), &config);
        let ids: Vec<&str> = board.due_soon.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["c", "d"]);
    }

    #[test]
    fn equal_due_dates_keep_store_order() {
        let tasks = vec![
            task("newer", TaskStatus::Todo, Some("2025-06-01"), &[]),
            task("older", TaskStatus::Todo, Some("2025-06-01"), &[]),
        ];
        let board = project(&tasks, &[], "u1", &Directory::empty(), &BoardConfig::default());
        let ids: Vec<&str> = board.due_soon.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["newer", "older"]);
    }

    #[test]
    fn completed_resolves_names_with_unknown_fallback() {
        let tasks = vec![
            task("a", TaskStatus::Completed, None, &["u1", "u9"]),
            task("b", TaskStatus::InTest, None, &["u1"]),
        ];
        let dir = directory_with(&[("u1", "Priya")]);
        let board = project(&tasks, &[], "u1", &dir, &BoardConfig::default());

        assert_eq!(board.completed.len(), 1);
        assert_eq!(board.completed[0].task.id, "a");
        assert_eq!(board.completed[0].assignee_names, ["Priya", UNKNOWN_USER]);
    }

    #[test]
    fn upcoming_events_respect_the_cap() {
        let events: Vec<EventRecord> = (1..=4)
            .map(|n| EventRecord {
                id: format!("e{n}"),
                title: format!("event {n}"),
                event_date: NaiveDate::from_ymd_opt(2025, 6, n).expect("date"),
            })
            .collect();
        let config = BoardConfig {
            upcoming_limit: 3,
            ..BoardConfig::default()
        };
        let board = project(&[], &events, "u1", &Directory::empty(), &config);
        assert_eq!(board.upcoming_events.len(), 3);
        assert_eq!(board.upcoming_events[0].id, "e1");
    }
}
