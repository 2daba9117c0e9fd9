//! User directory lookup.
//!
//! Resolves inspector ids to display names for notices and audit reports.
//! An unresolved id falls back to the raw id; lookups never fail a
//! transition.

use std::collections::HashMap;
use std::fmt;

use occ_core::UserId;

/// Resolves a user id to a display name.
pub trait Directory: Send + Sync + fmt::Debug {
    fn display_name(&self, user: &UserId) -> Option<String>;

    /// Display name, or the id itself when unknown.
    fn display_name_or_id(&self, user: &UserId) -> String {
        self.display_name(user)
            .unwrap_or_else(|| user.as_str().to_string())
    }
}

/// Fixed id → name table.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    names: HashMap<UserId, String>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry.
    pub fn with_user(mut self, user: UserId, name: impl Into<String>) -> Self {
        self.names.insert(user, name.into());
        self
    }
}

impl FromIterator<(UserId, String)> for StaticDirectory {
    fn from_iter<I: IntoIterator<Item = (UserId, String)>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}

impl Directory for StaticDirectory {
    fn display_name(&self, user: &UserId) -> Option<String> {
        self.names.get(user).cloned()
    }
}
