//! Shared output formatting for teamboard CLI commands.
//!
//! Every command renders either a human report or a JSON envelope keyed by
//! `schema_version`, so scripts can parse output without sniffing shapes.

use serde::Serialize;

use crate::error::{Error, Result};

pub const SCHEMA_VERSION: &str = "teamboard.v1";

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

/// Builder for the human rendering of a command result: a header line, then
/// optional labelled lines, body lines, and trailing notice/next-step
/// sections.
#[derive(Debug, Clone, Default)]
pub struct Report {
    header: String,
    fields: Vec<(String, String)>,
    lines: Vec<String>,
    notices: Vec<String>,
    next_steps: Vec<String>,
}

impl Report {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            ..Self::default()
        }
    }

    pub fn field(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    pub fn line(&mut self, value: impl Into<String>) -> &mut Self {
        self.lines.push(value.into());
        self
    }

    pub fn notice(&mut self, value: impl Into<String>) -> &mut Self {
        self.notices.push(value.into());
        self
    }

    pub fn next_step(&mut self, value: impl Into<String>) -> &mut Self {
        self.next_steps.push(value.into());
        self
    }

    pub fn render(&self) -> String {
        let mut out = self.header.clone();
        for (key, value) in &self.fields {
            out.push_str(&format!("\n  {key}: {value}"));
        }
        for line in &self.lines {
            out.push('\n');
            out.push_str(line);
        }
        if !self.notices.is_empty() {
            out.push_str("\n\nNotices:");
            for notice in &self.notices {
                out.push_str(&format!("\n- {notice}"));
            }
        }
        if !self.next_steps.is_empty() {
            out.push_str("\n\nNext steps:");
            for step in &self.next_steps {
                out.push_str(&format!("\n- {step}"));
            }
        }
        out
    }
}

#[derive(Serialize)]
struct SuccessEnvelope<'a, T: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    status: &'static str,
    data: &'a T,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    notices: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    next_steps: Vec<String>,
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    report: Option<&Report>,
) -> Result<()> {
    if options.json {
        let payload = SuccessEnvelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "success",
            data,
            notices: report.map(|r| r.notices.clone()).unwrap_or_default(),
            next_steps: report.map(|r| r.next_steps.clone()).unwrap_or_default(),
        };
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if !options.quiet {
        if let Some(report) = report {
            println!("{}", report.render());
        }
    }
    Ok(())
}

pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let next_steps = error_next_steps(err);

    if json {
        #[derive(Serialize)]
        struct ErrorBody<'a> {
            message: String,
            code: i32,
            kind: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<serde_json::Value>,
        }

        #[derive(Serialize)]
        struct ErrorEnvelope<'a> {
            schema_version: &'static str,
            command: &'a str,
            status: &'static str,
            error: ErrorBody<'a>,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            next_steps: Vec<String>,
        }

        let payload = ErrorEnvelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "error",
            error: ErrorBody {
                message: err.to_string(),
                code: err.exit_code(),
                kind: error_kind(err),
                details: err.details(),
            },
            next_steps,
        };
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    eprintln!("error: {err}");
    if let Some(hint) = next_steps.first() {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

/// Best-effort command name for the error envelope when clap parsing itself
/// fails, taken from the raw argument list.
pub fn infer_command_name_from_args() -> String {
    let mut args = std::env::args().skip(1).filter(|arg| !arg.starts_with('-'));
    let Some(command) = args.next() else {
        return "teamboard".to_string();
    };

    match command.as_str() {
        "task" | "user" | "event" => match args.next() {
            Some(sub) => format!("{command} {sub}"),
            None => command,
        },
        _ => command,
    }
}

fn error_kind(err: &Error) -> &'static str {
    match err.exit_code() {
        2 => "user_error",
        3 => "policy_blocked",
        _ => "operation_failed",
    }
}

fn error_next_steps(err: &Error) -> Vec<String> {
    match err {
        Error::NotSignedIn => vec!["teamboard login <user-id>".to_string()],
        Error::NoRoleRecord(_) => {
            vec!["teamboard register --name \"...\" --role member".to_string()]
        }
        Error::PermissionDenied { .. } => vec!["teamboard whoami".to_string()],
        Error::InvalidConfig(_) => vec!["fix .teamboard.toml then retry".to_string()],
        Error::NotFound(_) => vec!["teamboard task list".to_string()],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_renders_sections_in_order() {
        let mut report = Report::new("Task moved");
        report
            .field("status", "in-dev")
            .notice("another client edited this task")
            .next_step("teamboard board");

        let rendered = report.render();
        let expected = "Task moved\n  status: in-dev\n\nNotices:\n- another client edited this task\n\nNext steps:\n- teamboard board";
        assert_eq!(rendered, expected);
    }

    #[test]
    fn empty_sections_are_omitted() {
        let report = Report::new("Signed out");
        assert_eq!(report.render(), "Signed out");
    }

    #[test]
    fn error_kind_tracks_exit_codes() {
        assert_eq!(error_kind(&Error::NotSignedIn), "user_error");
        assert_eq!(
            error_kind(&Error::PermissionDenied {
                operation: "delete task".to_string(),
                requirement: "an admin member identity".to_string(),
            }),
            "policy_blocked"
        );
        assert_eq!(
            error_kind(&Error::MutationRejected("offline".to_string())),
            "operation_failed"
        );
    }
}
