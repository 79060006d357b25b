//! teamboard - team task portal synchronization core
//!
//! This library keeps an in-memory task/user/event view consistent with a
//! shared document store under concurrent multi-user edits, with no
//! server-side application layer in between.
//!
//! # Core Concepts
//!
//! - **Feeds**: live-subscribed collections, fully replaced on every
//!   remote change delivery
//! - **Directory**: one-shot user lookup cache with an "Unknown" fallback
//! - **Mutations**: targeted partial updates (status step, claim by set
//!   union, assignee replace, delete) guarded by role checks
//! - **Board**: pure projection of columns, available, due-soon, and
//!   completed views from the latest snapshots
//! - **Dashboards**: role-scoped view models owning the feeds for their
//!   mount lifetime
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `.teamboard.toml`
//! - `error`: Error types and result aliases
//! - `model`: Task, user, and event records
//! - `remote`: Collection and identity collaborator contracts, plus the
//!   in-memory and JSON-file stores
//! - `feed`: Live snapshot reconciliation
//! - `directory`: User directory cache
//! - `mutate`: Task mutation API and authorization guard
//! - `board`: Board projection
//! - `dashboard`: Member and faculty view models
//! - `session`: Sign-in/out state machine
//! - `identity`: CLI operator identity resolution
//! - `lock`: File locking and atomic writes for the JSON store

pub mod board;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod directory;
pub mod error;
pub mod feed;
pub mod identity;
pub mod lock;
pub mod model;
pub mod mutate;
pub mod output;
pub mod remote;
pub mod session;

pub use error::{Error, Result};
