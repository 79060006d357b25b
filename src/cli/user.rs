//! teamboard user commands

use std::path::PathBuf;

use crate::cli::Context;
use crate::error::Result;
use crate::model::{Role, UserRecord};
use crate::output::{emit_success, OutputOptions, Report};
use crate::remote::UserCollection;

pub fn run_list(dir: Option<PathBuf>, output: OutputOptions) -> Result<()> {
    let ctx = Context::open(dir)?;
    let mut records: Vec<UserRecord> = ctx.store.read_all()?;
    records.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

    let mut report = Report::new(format!("Users ({})", records.len()));
    for record in &records {
        let tag = match (record.role, record.admin) {
            (Role::Member, true) => "member, admin",
            (Role::Member, false) => "member",
            (Role::Faculty, _) => "faculty",
        };
        report.line(format!("{}  {} ({tag})", record.id, record.name));
    }
    if records.is_empty() {
        report.line("(none)");
    }

    emit_success(output, "user list", &records, Some(&report))
}
