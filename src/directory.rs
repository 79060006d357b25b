//! User directory cache.
//!
//! One non-live snapshot of the user collection, loaded when a dashboard
//! mounts and kept as an id -> entry lookup table. An id which doesn't
//! resolve renders as "Unknown" rather than failing; an empty directory is
//! tolerated during the load window.

use std::collections::HashMap;

use crate::error::Result;
use crate::model::Role;
use crate::remote::UserCollection;
use crate::session::SessionUser;

/// Label shown for assignee ids with no directory entry.
pub const UNKNOWN_USER: &str = "Unknown";

#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryEntry {
    pub name: String,
    pub role: Role,
    pub admin: bool,
}

/// Lookup table from user id to display data.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    entries: HashMap<String, DirectoryEntry>,
}

impl Directory {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Snapshot the whole user collection. When the session's id is absent
    /// from the fetched set (the directory read can race identity
    /// resolution), an entry is synthesized from session data so
    /// self-lookups never fail.
    pub fn load(users: &dyn UserCollection, session: Option<&SessionUser>) -> Result<Self> {
        let mut entries = HashMap::new();
        for record in users.read_all()? {
            entries.insert(
                record.id.clone(),
                DirectoryEntry {
                    name: record.name,
                    role: record.role,
                    admin: record.admin,
                },
            );
        }

        if let Some(user) = session {
            entries.entry(user.id.clone()).or_insert(DirectoryEntry {
                name: user.name.clone(),
                role: user.role,
                admin: user.admin,
            });
        }

        Ok(Self { entries })
    }

    pub fn get(&self, id: &str) -> Option<&DirectoryEntry> {
        self.entries.get(id)
    }

    /// Display name for an id, falling back to "Unknown".
    pub fn display_name(&self, id: &str) -> &str {
        self.entries
            .get(id)
            .map(|entry| entry.name.as_str())
            .unwrap_or(UNKNOWN_USER)
    }

    /// Members eligible for assignment, sorted by display name. Feeds the
    /// reassignment dialog's checkbox list.
    pub fn members(&self) -> Vec<(&str, &DirectoryEntry)> {
        let mut members: Vec<(&str, &DirectoryEntry)> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.role == Role::Member)
            .map(|(id, entry)| (id.as_str(), entry))
            .collect();
        members.sort_by(|a, b| a.1.name.cmp(&b.1.name).then_with(|| a.0.cmp(b.0)));
        members
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn insert_for_tests(&mut self, id: &str, name: &str, role: Role) {
        self.entries.insert(
            id.to_string(),
            DirectoryEntry {
                name: name.to_string(),
                role,
                admin: false,
            },
        );
    }
}
