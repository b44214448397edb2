use serde::Serialize;
use utoipa::ToSchema;

use super::Session;

/// Access tier of an organisation member.
///
/// Precedence is the explicit `rank` table below; a session holding several
/// claims resolves to the highest-ranked one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    SuperAdmin,
    OrgAdmin,
    SubAdmin,
    Member,
}

impl Role {
    /// All roles, highest rank first.
    pub const BY_PRIORITY: [Role; 4] = [Role::SuperAdmin, Role::OrgAdmin, Role::SubAdmin, Role::Member];

    pub fn rank(self) -> u8 {
        match self {
            Role::SuperAdmin => 3,
            Role::OrgAdmin => 2,
            Role::SubAdmin => 1,
            Role::Member => 0,
        }
    }

    /// Permission claim that grants this role.
    pub fn permission(self) -> &'static str {
        match self {
            Role::SuperAdmin => "org:super:admin",
            Role::OrgAdmin => "org:admin",
            Role::SubAdmin => "org:sub:admin",
            Role::Member => "org:member",
        }
    }

    pub fn from_permission(permission: &str) -> Option<Self> {
        Self::BY_PRIORITY
            .into_iter()
            .find(|role| role.permission() == permission)
    }

    /// Landing page for a signed-in user of this role.
    pub fn dashboard_path(self) -> &'static str {
        match self {
            Role::SuperAdmin => "/super-admin/dashboard",
            Role::OrgAdmin => "/org-admin/dashboard",
            Role::SubAdmin => "/sub-admin/dashboard",
            Role::Member => "/dashboard",
        }
    }

    /// Whether a holder of `self` may enter an area that requires `required`.
    pub fn satisfies(self, required: Role) -> bool {
        self.rank() >= required.rank()
    }

    /// Member is the fallback and needs no claim.
    pub fn resolve(session: &Session) -> Self {
        Self::BY_PRIORITY
            .into_iter()
            .filter(|role| *role != Role::Member)
            .find(|role| session.has_permission(role.permission()))
            .unwrap_or(Role::Member)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Role::SuperAdmin => "super-admin",
            Role::OrgAdmin => "org-admin",
            Role::SubAdmin => "sub-admin",
            Role::Member => "member",
        };
        f.write_str(name)
    }
}
