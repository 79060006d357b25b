//! Command-line interface for teamboard
//!
//! This module defines the CLI structure using clap derive macros.
//! Each subcommand is defined in its own submodule.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::Config;
use crate::dashboard::Stores;
use crate::error::{Error, Result};
use crate::identity;
use crate::model::Role;
use crate::output::OutputOptions;
use crate::remote::local::JsonStore;
use crate::remote::UserCollection;
use crate::session::SessionUser;

mod board;
mod event;
mod init;
mod session;
mod task;
mod user;

/// teamboard - shared task board for event teams
///
/// Faculty post tasks tied to events; members claim them and move them
/// through the workflow. All state lives in a shared JSON store that every
/// invocation reconciles against.
#[derive(Parser, Debug)]
#[command(name = "teamboard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory holding the board collections (defaults to the
    /// platform data dir)
    #[arg(long, global = true, env = "TEAMBOARD_DIR")]
    pub dir: Option<PathBuf>,

    /// Operator user id
    #[arg(long, global = true, env = "TEAMBOARD_USER")]
    pub user: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a board data directory
    Init,

    /// Create a user record and sign in as it
    Register {
        /// Display name
        #[arg(long)]
        name: String,

        /// Role: faculty or member
        #[arg(long)]
        role: Role,

        /// Grant the admin flag (members only)
        #[arg(long)]
        admin: bool,

        /// Contact email
        #[arg(long)]
        email: Option<String>,
    },

    /// Sign in as an existing user
    Login {
        /// User id to sign in as
        user_id: String,
    },

    /// Sign out
    Logout,

    /// Show the resolved operator identity
    Whoami,

    /// Show the board for the operator
    Board,

    /// Task management commands
    #[command(subcommand)]
    Task(TaskCommands),

    /// User directory commands
    #[command(subcommand)]
    User(UserCommands),

    /// Event commands
    #[command(subcommand)]
    Event(EventCommands),
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a task (faculty only)
    New {
        /// Task title
        title: String,

        /// Originating event name
        #[arg(long)]
        event: String,

        /// Event date (YYYY-MM-DD)
        #[arg(long)]
        event_date: String,

        /// Longer description
        #[arg(long, default_value = "")]
        description: String,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,

        /// Requirement tags, repeatable
        #[arg(long = "req")]
        requirements: Vec<String>,

        /// Faculty contact shown on the task
        #[arg(long)]
        contact: Option<String>,
    },

    /// List tasks, newest first
    List {
        /// Filter by status: todo, in-dev, in-test, completed
        #[arg(long)]
        status: Option<String>,
    },

    /// Show one task in full
    Show {
        /// Task id or unique prefix
        id: String,
    },

    /// Move a task one step through the workflow (member only)
    Move {
        /// Task id or unique prefix
        id: String,

        /// Direction to move
        #[arg(value_enum)]
        direction: MoveDirection,
    },

    /// Claim a task for yourself (member only)
    Take {
        /// Task id or unique prefix
        id: String,
    },

    /// Replace a task's assignee set (member only)
    Assign {
        /// Task id or unique prefix
        id: String,

        /// User ids forming the new assignee set (empty to unassign)
        assignees: Vec<String>,
    },

    /// Delete a task permanently (admin members only)
    Delete {
        /// Task id or unique prefix
        id: String,
    },
}

/// User directory subcommands
#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// List user records
    List,
}

/// Event subcommands
#[derive(Subcommand, Debug)]
pub enum EventCommands {
    /// Create an event
    New {
        /// Event title
        title: String,

        /// Event date (YYYY-MM-DD)
        #[arg(long)]
        date: String,
    },

    /// List events, soonest first
    List,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum MoveDirection {
    /// Toward todo
    Left,
    /// Toward completed
    Right,
}

impl MoveDirection {
    pub fn delta(self) -> i32 {
        match self {
            MoveDirection::Left => -1,
            MoveDirection::Right => 1,
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let output = OutputOptions {
            json: self.json,
            quiet: self.quiet,
        };

        match self.command {
            Commands::Init => init::run(self.dir, output),
            Commands::Register {
                name,
                role,
                admin,
                email,
            } => session::run_register(session::RegisterOptions {
                name,
                role,
                admin,
                email,
                dir: self.dir,
                output,
            }),
            Commands::Login { user_id } => session::run_login(self.dir, user_id, output),
            Commands::Logout => session::run_logout(self.dir, output),
            Commands::Whoami => session::run_whoami(self.dir, self.user, output),
            Commands::Board => board::run(self.dir, self.user, output),
            Commands::Task(cmd) => match cmd {
                TaskCommands::New {
                    title,
                    event,
                    event_date,
                    description,
                    due,
                    requirements,
                    contact,
                } => task::run_new(task::NewOptions {
                    title,
                    event,
                    event_date,
                    description,
                    due,
                    requirements,
                    contact,
                    dir: self.dir,
                    user: self.user,
                    output,
                }),
                TaskCommands::List { status } => {
                    task::run_list(self.dir, status, output)
                }
                TaskCommands::Show { id } => task::run_show(self.dir, id, output),
                TaskCommands::Move { id, direction } => task::run_move(task::MoveOptions {
                    id,
                    direction,
                    dir: self.dir,
                    user: self.user,
                    output,
                }),
                TaskCommands::Take { id } => task::run_take(self.dir, self.user, id, output),
                TaskCommands::Assign { id, assignees } => {
                    task::run_assign(self.dir, self.user, id, assignees, output)
                }
                TaskCommands::Delete { id } => {
                    task::run_delete(self.dir, self.user, id, output)
                }
            },
            Commands::User(cmd) => match cmd {
                UserCommands::List => user::run_list(self.dir, output),
            },
            Commands::Event(cmd) => match cmd {
                EventCommands::New { title, date } => {
                    event::run_new(self.dir, title, date, output)
                }
                EventCommands::List => event::run_list(self.dir, output),
            },
        }
    }
}

/// Shared per-invocation context: resolved data directory, config, and an
/// open store.
pub(crate) struct Context {
    pub data_dir: PathBuf,
    pub config: Config,
    pub store: JsonStore,
}

/// Where the collection documents live: `store.dir` from the config when
/// set (relative paths resolve against the data directory), otherwise the
/// data directory itself.
pub(crate) fn collections_dir(data_dir: &Path, config: &Config) -> PathBuf {
    match &config.store.dir {
        Some(dir) if dir.is_absolute() => dir.clone(),
        Some(dir) => data_dir.join(dir),
        None => data_dir.to_path_buf(),
    }
}

impl Context {
    pub fn open(dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = match dir {
            Some(dir) => dir,
            None => crate::config::default_data_dir()?,
        };
        let config = Config::load_from_dir(&data_dir)?;
        let store = JsonStore::open(collections_dir(&data_dir, &config))?;
        Ok(Self {
            data_dir,
            config,
            store,
        })
    }

    /// Resolve the operator's directory record. Fails with `NotSignedIn`
    /// when no identity resolves, `NoRoleRecord` when the id has no record.
    pub fn operator(&self, cli_user: Option<&str>) -> Result<SessionUser> {
        let id = identity::resolve_operator(&self.data_dir, cli_user, &self.config)?
            .ok_or(Error::NotSignedIn)?;
        match self.store.get(&id)? {
            Some(record) => Ok(SessionUser::from_record(&record)),
            None => Err(Error::NoRoleRecord(id)),
        }
    }

    pub fn stores(&self) -> Stores {
        Stores {
            tasks: Arc::new(self.store.clone()),
            users: Arc::new(self.store.clone()),
            events: Arc::new(self.store.clone()),
        }
    }
}
