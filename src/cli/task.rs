//! Task commands: create, list, show, move, take, assign, delete.
//!
//! Mutations go through the authorization guard with the resolved operator
//! identity; reads work for any operator, signed in or not.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::NaiveDate;

use crate::cli::{Context, MoveDirection};
use crate::directory::Directory;
use crate::error::{Error, Result};
use crate::model::{Task, TaskDraft, TaskStatus};
use crate::mutate::TaskActions;
use crate::output::{emit_success, OutputOptions, Report};
use crate::remote::TaskCollection;

pub struct NewOptions {
    pub title: String,
    pub event: String,
    pub event_date: String,
    pub description: String,
    pub due: Option<String>,
    pub requirements: Vec<String>,
    pub contact: Option<String>,
    pub dir: Option<PathBuf>,
    pub user: Option<String>,
    pub output: OutputOptions,
}

pub struct MoveOptions {
    pub id: String,
    pub direction: MoveDirection,
    pub dir: Option<PathBuf>,
    pub user: Option<String>,
    pub output: OutputOptions,
}

#[derive(serde::Serialize)]
struct TaskSummary {
    id: String,
    title: String,
    status: TaskStatus,
    event_name: String,
    due_date: Option<NaiveDate>,
    assigned_to: Vec<String>,
}

impl TaskSummary {
    fn of(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            status: task.status,
            event_name: task.event_name.clone(),
            due_date: task.due_date,
            assigned_to: task.assigned_to.iter().cloned().collect(),
        }
    }
}

pub fn run_new(options: NewOptions) -> Result<()> {
    let ctx = Context::open(options.dir)?;
    let operator = ctx.operator(options.user.as_deref())?;

    let draft = TaskDraft {
        title: options.title,
        description: options.description,
        event_name: options.event,
        event_date: parse_date(&options.event_date)?,
        due_date: options.due.as_deref().map(parse_date).transpose()?,
        requirements: options.requirements,
        faculty_name: operator.name.clone(),
        faculty_contact: options.contact.unwrap_or_default(),
    };

    let task = TaskActions::new(&ctx.store, &operator).create(draft)?;

    let mut report = Report::new("Task created");
    report
        .field("id", &task.id)
        .field("title", &task.title)
        .field("event", format!("{} ({})", task.event_name, task.event_date));
    if let Some(due) = task.due_date {
        report.field("due", due.to_string());
    }

    emit_success(options.output, "task new", &task, Some(&report))
}

pub fn run_list(
    dir: Option<PathBuf>,
    status: Option<String>,
    output: OutputOptions,
) -> Result<()> {
    let ctx = Context::open(dir)?;
    let filter = status.as_deref().map(str::parse::<TaskStatus>).transpose()?;

    let tasks: Vec<Task> = ctx
        .store
        .read_all()?
        .into_iter()
        .filter(|t| filter.map_or(true, |s| t.status == s))
        .collect();

    let summaries: Vec<TaskSummary> = tasks.iter().map(TaskSummary::of).collect();

    let mut report = Report::new(match filter {
        Some(status) => format!("Tasks ({})", status.label()),
        None => format!("Tasks ({})", tasks.len()),
    });
    for task in &tasks {
        let due = task
            .due_date
            .map(|d| format!("  due {d}"))
            .unwrap_or_default();
        report.line(format!(
            "{}  [{}] {}{}",
            short_id(&task.id),
            task.status,
            task.title,
            due
        ));
    }
    if tasks.is_empty() {
        report.line("(none)");
    }

    emit_success(output, "task list", &summaries, Some(&report))
}

pub fn run_show(dir: Option<PathBuf>, id: String, output: OutputOptions) -> Result<()> {
    let ctx = Context::open(dir)?;
    let task = resolve_task(&ctx, &id)?;
    let directory = Directory::load(&ctx.store, None)?;

    let mut report = Report::new(format!("{} [{}]", task.title, task.status));
    report
        .field("id", &task.id)
        .field("event", format!("{} ({})", task.event_name, task.event_date))
        .field("faculty", format!("{} {}", task.faculty_name, task.faculty_contact));
    if !task.description.is_empty() {
        report.field("description", &task.description);
    }
    if let Some(due) = task.due_date {
        report.field("due", due.to_string());
    }
    if !task.requirements.is_empty() {
        report.field("requirements", task.requirements.join(", "));
    }
    let assignees: Vec<String> = task
        .assigned_to
        .iter()
        .map(|id| format!("{} ({id})", directory.display_name(id)))
        .collect();
    report.field(
        "assigned to",
        if assignees.is_empty() {
            "(unassigned)".to_string()
        } else {
            assignees.join(", ")
        },
    );

    emit_success(output, "task show", &task, Some(&report))
}

pub fn run_move(options: MoveOptions) -> Result<()> {
    let ctx = Context::open(options.dir)?;
    let operator = ctx.operator(options.user.as_deref())?;
    let task = resolve_task(&ctx, &options.id)?;

    let moved =
        TaskActions::new(&ctx.store, &operator).move_status(&task, options.direction.delta())?;

    #[derive(serde::Serialize)]
    struct MoveReport {
        id: String,
        from: TaskStatus,
        to: TaskStatus,
        moved: bool,
    }

    let data = MoveReport {
        id: task.id.clone(),
        from: task.status,
        to: moved.unwrap_or(task.status),
        moved: moved.is_some(),
    };

    let mut report = Report::new(match moved {
        Some(next) => format!("Task moved to {}", next.label()),
        None if options.direction.delta() < 0 => {
            "Task already at the start of the workflow".to_string()
        }
        None => "Task already at the end of the workflow".to_string(),
    });
    report.field("task", &task.title);

    emit_success(options.output, "task move", &data, Some(&report))
}

pub fn run_take(
    dir: Option<PathBuf>,
    user: Option<String>,
    id: String,
    output: OutputOptions,
) -> Result<()> {
    let ctx = Context::open(dir)?;
    let operator = ctx.operator(user.as_deref())?;
    let task = resolve_task(&ctx, &id)?;

    TaskActions::new(&ctx.store, &operator).claim_self(&task)?;
    let task = resolve_task(&ctx, &task.id)?;

    let mut report = Report::new("Task claimed");
    report
        .field("task", &task.title)
        .field("assignees", task.assigned_to.len().to_string());

    emit_success(output, "task take", &TaskSummary::of(&task), Some(&report))
}

pub fn run_assign(
    dir: Option<PathBuf>,
    user: Option<String>,
    id: String,
    assignees: Vec<String>,
    output: OutputOptions,
) -> Result<()> {
    let ctx = Context::open(dir)?;
    let operator = ctx.operator(user.as_deref())?;
    let task = resolve_task(&ctx, &id)?;

    let new_set: BTreeSet<String> = assignees.into_iter().collect();
    TaskActions::new(&ctx.store, &operator).update_assignees(&task, new_set)?;
    let task = resolve_task(&ctx, &task.id)?;

    let mut report = Report::new("Assignees replaced");
    report
        .field("task", &task.title)
        .field("assignees", task.assigned_to.len().to_string());

    emit_success(output, "task assign", &TaskSummary::of(&task), Some(&report))
}

pub fn run_delete(
    dir: Option<PathBuf>,
    user: Option<String>,
    id: String,
    output: OutputOptions,
) -> Result<()> {
    let ctx = Context::open(dir)?;
    let operator = ctx.operator(user.as_deref())?;
    let task = resolve_task(&ctx, &id)?;

    TaskActions::new(&ctx.store, &operator).delete(&task)?;

    #[derive(serde::Serialize)]
    struct DeleteReport {
        id: String,
        title: String,
        deleted: bool,
    }

    let mut report = Report::new("Task deleted");
    report.field("task", &task.title);
    report.notice("deletion is permanent; there is no undo");

    emit_success(
        output,
        "task delete",
        &DeleteReport {
            id: task.id,
            title: task.title,
            deleted: true,
        },
        Some(&report),
    )
}

/// Resolve a task by exact id or unique prefix.
fn resolve_task(ctx: &Context, id: &str) -> Result<Task> {
    let tasks = TaskCollection::read_all(&ctx.store)?;
    if let Some(task) = tasks.iter().find(|t| t.id == id) {
        return Ok(task.clone());
    }

    let mut matches = tasks.iter().filter(|t| t.id.starts_with(id));
    match (matches.next(), matches.next()) {
        (Some(task), None) => Ok(task.clone()),
        (Some(_), Some(_)) => Err(Error::InvalidArgument(format!(
            "task id prefix '{id}' is ambiguous"
        ))),
        (None, _) => Err(Error::NotFound(format!("task {id}"))),
    }
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::InvalidArgument(format!("invalid date '{value}' (expected YYYY-MM-DD)")))
}

fn short_id(id: &str) -> &str {
    // ULIDs are 26 chars; the first 10 carry the timestamp and enough
    // entropy to stay unique on a small board.
    &id[..id.len().min(10)]
}
