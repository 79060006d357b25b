//! Session commands: register, login, logout, whoami.
//!
//! The CLI's signed-in identity is a persisted user id in the data
//! directory; password authentication belongs to the external identity
//! provider and is out of the CLI's hands. Login verifies the id against
//! the user directory so a signed-in operator always has a role record.

use std::path::PathBuf;

use crate::cli::Context;
use crate::error::{Error, Result};
use crate::identity;
use crate::model::{Role, UserRecord};
use crate::output::{emit_success, OutputOptions, Report};
use crate::remote::UserCollection;

pub struct RegisterOptions {
    pub name: String,
    pub role: Role,
    pub admin: bool,
    pub email: Option<String>,
    pub dir: Option<PathBuf>,
    pub output: OutputOptions,
}

#[derive(serde::Serialize)]
struct IdentityReport {
    user_id: String,
    name: String,
    role: Role,
    admin: bool,
}

pub fn run_register(options: RegisterOptions) -> Result<()> {
    if options.admin && options.role != Role::Member {
        return Err(Error::InvalidArgument(
            "the admin flag applies to members only".to_string(),
        ));
    }

    let ctx = Context::open(options.dir)?;
    let record = UserRecord {
        id: ulid::Ulid::new().to_string(),
        name: options.name,
        email: options.email,
        role: options.role,
        admin: options.admin,
    };
    ctx.store.create(record.clone())?;
    identity::persist_operator(&ctx.data_dir, &record.id)?;

    let data = IdentityReport {
        user_id: record.id.clone(),
        name: record.name.clone(),
        role: record.role,
        admin: record.admin,
    };
    let mut report = Report::new("Registered and signed in");
    report
        .field("user", format!("{} ({})", record.name, record.id))
        .field("role", record.role.to_string());
    if record.admin {
        report.field("admin", "yes");
    }

    emit_success(options.output, "register", &data, Some(&report))
}

pub fn run_login(dir: Option<PathBuf>, user_id: String, output: OutputOptions) -> Result<()> {
    let ctx = Context::open(dir)?;
    let record = ctx
        .store
        .get(&user_id)?
        .ok_or(Error::NoRoleRecord(user_id))?;
    identity::persist_operator(&ctx.data_dir, &record.id)?;

    let data = IdentityReport {
        user_id: record.id.clone(),
        name: record.name.clone(),
        role: record.role,
        admin: record.admin,
    };
    let mut report = Report::new("Signed in");
    report
        .field("user", format!("{} ({})", record.name, record.id))
        .field("role", record.role.to_string());

    emit_success(output, "login", &data, Some(&report))
}

pub fn run_logout(dir: Option<PathBuf>, output: OutputOptions) -> Result<()> {
    let ctx = Context::open(dir)?;
    identity::clear_operator(&ctx.data_dir)?;

    #[derive(serde::Serialize)]
    struct LogoutReport {
        signed_out: bool,
    }

    let report = Report::new("Signed out");
    emit_success(output, "logout", &LogoutReport { signed_out: true }, Some(&report))
}

pub fn run_whoami(
    dir: Option<PathBuf>,
    cli_user: Option<String>,
    output: OutputOptions,
) -> Result<()> {
    let ctx = Context::open(dir)?;
    let user = ctx.operator(cli_user.as_deref())?;

    let data = IdentityReport {
        user_id: user.id.clone(),
        name: user.name.clone(),
        role: user.role,
        admin: user.admin,
    };
    let mut report = Report::new("Operator identity");
    report
        .field("user", format!("{} ({})", user.name, user.id))
        .field("role", user.role.to_string());
    if user.admin {
        report.field("admin", "yes");
    }

    emit_success(output, "whoami", &data, Some(&report))
}
