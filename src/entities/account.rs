//! User accounts

use crate::impl_entity;
use indexmap::IndexSet;

impl_entity!(
    Account,
    "accounts",
    {
        /// Login name, compared case-insensitively at login
        username: String,
        email: String,
        normalized_email: String,
        name: String,
        password_hash: String,
        /// Assigned roles in assignment order; the first one goes into tokens
        #[serde(default)]
        roles: IndexSet<String>,
    }
);

impl Account {
    /// The role embedded in session tokens
    pub fn primary_role(&self) -> Option<&str> {
        self.roles.first().map(String::as_str)
    }
}
