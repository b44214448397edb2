//! Route access decisions.
//!
//! Pure: the middleware resolves the session and hands the outcome here.

use std::str::FromStr;

use super::IdentityError;
use crate::models::{Role, RouteCategory, RouteClassifier, Session};

pub const SIGN_IN_PATH: &str = "/sign-in";

/// What to do with authenticated traffic on paths no pattern set covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnclassifiedRoutePolicy {
    #[default]
    Allow,
    Deny,
}

impl FromStr for UnclassifiedRoutePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "allow" => Ok(UnclassifiedRoutePolicy::Allow),
            "deny" => Ok(UnclassifiedRoutePolicy::Deny),
            _ => Err(format!("Invalid unclassified route policy: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    /// Signed-in visitor on a public page: send them to their own dashboard.
    RoleDashboard(Role),
    /// Signed in, but below the tier the path requires.
    Dashboard,
    SignIn,
}

impl AccessDecision {
    pub fn redirect_target(self) -> Option<&'static str> {
        match self {
            AccessDecision::Allow => None,
            AccessDecision::RoleDashboard(role) => Some(role.dashboard_path()),
            AccessDecision::Dashboard => Some(Role::Member.dashboard_path()),
            AccessDecision::SignIn => Some(SIGN_IN_PATH),
        }
    }

    /// Metric label.
    pub fn label(self) -> &'static str {
        match self {
            AccessDecision::Allow => "allow",
            AccessDecision::RoleDashboard(_) => "role_dashboard",
            AccessDecision::Dashboard => "dashboard",
            AccessDecision::SignIn => "sign_in",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    routes: RouteClassifier,
    unclassified: UnclassifiedRoutePolicy,
}

impl AccessPolicy {
    pub fn new(routes: RouteClassifier, unclassified: UnclassifiedRoutePolicy) -> Self {
        Self {
            routes,
            unclassified,
        }
    }

    pub fn routes(&self) -> &RouteClassifier {
        &self.routes
    }

    fn is_sign_in_page(&self, path: &str) -> bool {
        path.starts_with(SIGN_IN_PATH) && self.routes.is_match(RouteCategory::Public, path)
    }

    pub fn decide(&self, path: &str, resolution: &Result<Session, IdentityError>) -> AccessDecision {
        let session = match resolution {
            Ok(session) => session,
            // Redirecting the sign-in pages to sign-in would loop.
            Err(_) if self.is_sign_in_page(path) => return AccessDecision::Allow,
            Err(_) => return AccessDecision::SignIn,
        };

        let category = self.routes.category(path);

        if category == RouteCategory::Public {
            return if session.is_authenticated() {
                AccessDecision::RoleDashboard(session.role())
            } else {
                AccessDecision::Allow
            };
        }

        if !session.is_authenticated() {
            return AccessDecision::SignIn;
        }

        match category.required_role() {
            Some(required) if !session.role().satisfies(required) => AccessDecision::Dashboard,
            Some(_) => AccessDecision::Allow,
            None => match self.unclassified {
                UnclassifiedRoutePolicy::Allow => AccessDecision::Allow,
                UnclassifiedRoutePolicy::Deny => AccessDecision::Dashboard,
            },
        }
    }
}
