//! teamboard board command implementation
//!
//! Mounts the dashboard for the operator's role, renders the projection
//! from the freshly delivered snapshots, and unmounts.

use std::path::PathBuf;

use crate::board::Board;
use crate::cli::Context;
use crate::dashboard::{FacultyDashboard, MemberDashboard};
use crate::error::Result;
use crate::model::Role;
use crate::output::{emit_success, OutputOptions, Report};

pub fn run(dir: Option<PathBuf>, user: Option<String>, output: OutputOptions) -> Result<()> {
    let ctx = Context::open(dir)?;
    let operator = ctx.operator(user.as_deref())?;

    let board = match operator.role {
        Role::Member => {
            let mut dashboard =
                MemberDashboard::mount_as(ctx.stores(), operator.clone(), ctx.config.board.clone())?;
            let board = dashboard.board();
            dashboard.unmount();
            board
        }
        Role::Faculty => {
            let mut dashboard =
                FacultyDashboard::mount_as(ctx.stores(), operator.clone(), ctx.config.board.clone())?;
            let board = dashboard.board();
            dashboard.unmount();
            board
        }
    };

    let report = render(&board, &operator.name);
    emit_success(output, "board", &board, Some(&report))
}

fn render(board: &Board, operator_name: &str) -> Report {
    let mut report = Report::new(format!("Board for {operator_name}"));

    for column in &board.columns {
        report.line(format!("\n{}:", column.status.label()));
        if column.tasks.is_empty() {
            report.line("  (empty)");
        }
        for task in &column.tasks {
            let assignees = if task.assigned_to.is_empty() {
                String::new()
            } else {
                format!("  ({} assigned)", task.assigned_to.len())
            };
            report.line(format!("  - {}{}", task.title, assignees));
        }
    }

    if !board.due_soon.is_empty() {
        report.line("\nDue soon:".to_string());
        for task in &board.due_soon {
            let due = task.due_date.map(|d| d.to_string()).unwrap_or_default();
            report.line(format!("  - {due}  {}", task.title));
        }
    }

    if !board.upcoming_events.is_empty() {
        report.line("\nUpcoming events:".to_string());
        for event in &board.upcoming_events {
            report.line(format!("  - {}  {}", event.event_date, event.title));
        }
    }

    report
}
