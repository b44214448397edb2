use std::collections::BTreeSet;

use super::Role;

/// An identity resolved by the provider for the current request.
///
/// Read-only here: the provider owns creation, expiry and claim changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub permissions: BTreeSet<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    /// Highest-ranked role carried by the permission claims.
    pub fn role(&self) -> Role {
        Role::resolve(self)
    }
}
