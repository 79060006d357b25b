//! teamboard event commands

use std::path::PathBuf;

use chrono::NaiveDate;

use crate::cli::Context;
use crate::error::{Error, Result};
use crate::model::EventRecord;
use crate::output::{emit_success, OutputOptions, Report};
use crate::remote::EventCollection;

pub fn run_new(
    dir: Option<PathBuf>,
    title: String,
    date: String,
    output: OutputOptions,
) -> Result<()> {
    let ctx = Context::open(dir)?;
    let date: NaiveDate = date
        .trim()
        .parse()
        .map_err(|_| Error::InvalidArgument(format!("invalid date '{date}' (expected YYYY-MM-DD)")))?;

    let event = ctx.store.create(&title, date)?;

    let mut report = Report::new("Event created");
    report
        .field("id", &event.id)
        .field("title", &event.title)
        .field("date", event.event_date.to_string());

    emit_success(output, "event new", &event, Some(&report))
}

pub fn run_list(dir: Option<PathBuf>, output: OutputOptions) -> Result<()> {
    let ctx = Context::open(dir)?;
    let events: Vec<EventRecord> = ctx.store.read_all()?;

    let mut report = Report::new(format!("Events ({})", events.len()));
    for event in &events {
        report.line(format!("{}  {}", event.event_date, event.title));
    }
    if events.is_empty() {
        report.line("(none)");
    }

    emit_success(output, "event list", &events, Some(&report))
}
