//! Page view models. Rendering is the browser's job; these carry what the
//! pages show.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Role, Session};
use crate::services::SIGN_IN_PATH;

/// Claim that unlocks organisation creation from the user menu.
pub const CREATE_ORGANIZATION_PERMISSION: &str = "org:app:admin";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MenuItem {
    pub label: String,
    pub href: String,
    /// Set when the item submits instead of navigating.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl MenuItem {
    fn link(label: &str, href: &str) -> Self {
        Self {
            label: label.to_string(),
            href: href.to_string(),
            method: None,
        }
    }

    fn action(label: &str, href: &str) -> Self {
        Self {
            method: Some("POST".to_string()),
            ..Self::link(label, href)
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HeaderView {
    #[schema(example = "Dashboard")]
    pub title: String,
    pub signed_in: bool,
    /// "<Username>'s Profile" for signed-in users.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "Ada Lovelace's Profile")]
    pub profile_label: Option<String>,
    pub menu: Vec<MenuItem>,
}

impl HeaderView {
    pub fn new(title: &str, session: &Session) -> Self {
        if !session.is_authenticated() {
            return Self {
                title: title.to_string(),
                signed_in: false,
                profile_label: None,
                menu: vec![
                    MenuItem::link("Sign In", SIGN_IN_PATH),
                    MenuItem::link("Sign Up", "/sign-up"),
                ],
            };
        }

        let mut menu = Vec::with_capacity(4);
        if session.has_permission(CREATE_ORGANIZATION_PERMISSION) {
            menu.push(MenuItem::link("Create organization", "/create-organization"));
        }
        menu.push(MenuItem::link("Manage account", "/profile"));
        menu.push(MenuItem::action("Sign out", "/sign-out"));
        menu.push(MenuItem::link("Permissions", "/profile/permissions"));

        Self {
            title: title.to_string(),
            signed_in: true,
            profile_label: Some(format!(
                "{}'s Profile",
                capitalize_username(session.username.as_deref())
            )),
            menu,
        }
    }
}

/// Upper-case the first letter of each space-separated word and lower-case
/// the rest. A missing username renders as an empty string.
pub fn capitalize_username(username: Option<&str>) -> String {
    let Some(username) = username else {
        return String::new();
    };

    username
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardView {
    pub header: HeaderView,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "Welcome back, ada")]
    pub welcome: Option<String>,
    #[schema(example = "This is the dashboard page")]
    pub message: String,
    pub role: Role,
}

impl DashboardView {
    pub fn new(title: &str, message: &str, session: &Session) -> Self {
        Self {
            header: HeaderView::new(title, session),
            welcome: session
                .username
                .as_deref()
                .map(|username| format!("Welcome back, {}", username)),
            message: message.to_string(),
            role: session.role(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HomeView {
    pub header: HeaderView,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_in(username: Option<&str>, claims: &[&str]) -> Session {
        Session {
            session_id: Some("sess_1".into()),
            user_id: Some("user_1".into()),
            username: username.map(str::to_string),
            permissions: claims.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn capitalizes_each_word() {
        assert_eq!(capitalize_username(Some("ada LOVELACE")), "Ada Lovelace");
        assert_eq!(capitalize_username(Some("grace")), "Grace");
        assert_eq!(capitalize_username(Some("a  b")), "A  B");
        assert_eq!(capitalize_username(Some("")), "");
        assert_eq!(capitalize_username(None), "");
    }

    #[test]
    fn anonymous_header_offers_sign_in_and_sign_up() {
        let header = HeaderView::new("Home", &Session::anonymous());
        assert!(!header.signed_in);
        assert_eq!(header.profile_label, None);
        let labels: Vec<_> = header.menu.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, ["Sign In", "Sign Up"]);
    }

    #[test]
    fn create_organization_needs_app_admin_claim() {
        let member = HeaderView::new("Dashboard", &signed_in(Some("ada"), &["org:admin"]));
        assert!(member.menu.iter().all(|m| m.label != "Create organization"));
        assert_eq!(member.profile_label.as_deref(), Some("Ada's Profile"));

        let admin = HeaderView::new("Dashboard", &signed_in(Some("ada"), &["org:app:admin"]));
        assert_eq!(admin.menu[0], MenuItem::link("Create organization", "/create-organization"));
        assert_eq!(admin.menu.len(), 4);
    }

    #[test]
    fn sign_out_item_posts() {
        let header = HeaderView::new("Dashboard", &signed_in(Some("ada"), &[]));
        let sign_out = header.menu.iter().find(|m| m.label == "Sign out").unwrap();
        assert_eq!(sign_out.method.as_deref(), Some("POST"));
    }

    #[test]
    fn dashboard_welcomes_known_usernames_only() {
        let view = DashboardView::new("Dashboard", "This is the dashboard page", &signed_in(Some("ada"), &[]));
        assert_eq!(view.welcome.as_deref(), Some("Welcome back, ada"));

        let view = DashboardView::new("Dashboard", "This is the dashboard page", &signed_in(None, &[]));
        assert_eq!(view.welcome, None);
        assert_eq!(view.header.profile_label.as_deref(), Some("'s Profile"));
    }
}
