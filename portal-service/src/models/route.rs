//! Static route classification.
//!
//! Patterns are written the way the route table reads: a trailing `(.*)`
//! makes the pattern a plain string prefix, anything else must match exactly.

use once_cell::sync::Lazy;
use regex::Regex;

use super::Role;

/// Access tier of a path. Declaration order is evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteCategory {
    Public,
    SuperAdmin,
    OrgAdmin,
    SubAdmin,
    Member,
    Unclassified,
}

impl RouteCategory {
    /// Categories that own a pattern set, in precedence order.
    pub const CLASSIFIED: [RouteCategory; 5] = [
        RouteCategory::Public,
        RouteCategory::SuperAdmin,
        RouteCategory::OrgAdmin,
        RouteCategory::SubAdmin,
        RouteCategory::Member,
    ];

    /// Minimum role for an authenticated caller, if the tier demands one.
    pub fn required_role(self) -> Option<Role> {
        match self {
            RouteCategory::SuperAdmin => Some(Role::SuperAdmin),
            RouteCategory::OrgAdmin => Some(Role::OrgAdmin),
            RouteCategory::SubAdmin => Some(Role::SubAdmin),
            RouteCategory::Member => Some(Role::Member),
            RouteCategory::Public | RouteCategory::Unclassified => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutePattern {
    Exact(String),
    Prefix(String),
}

impl RoutePattern {
    pub fn parse(pattern: &str) -> Self {
        match pattern.strip_suffix("(.*)") {
            Some(prefix) => RoutePattern::Prefix(prefix.to_string()),
            None => RoutePattern::Exact(pattern.to_string()),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            // One trailing slash is tolerated: `/a/b/` is `/a/b`.
            RoutePattern::Exact(exact) => {
                path == exact
                    || (!exact.ends_with('/') && path.strip_suffix('/') == Some(exact.as_str()))
            }
            RoutePattern::Prefix(prefix) => path.starts_with(prefix.as_str()),
        }
    }
}

/// Per-set membership of one path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteMatches {
    pub public: bool,
    pub super_admin: bool,
    pub org_admin: bool,
    pub sub_admin: bool,
    pub member: bool,
}

#[derive(Debug, Clone)]
pub struct RouteClassifier {
    sets: Vec<(RouteCategory, Vec<RoutePattern>)>,
}

const PUBLIC_ROUTES: &[&str] = &["/", "/sign-in(.*)", "/sign-up(.*)", "/api/webhook/register"];
const SUPER_ADMIN_ROUTES: &[&str] = &["/super-admin(.*)", "/system-settings(.*)"];
const ORG_ADMIN_ROUTES: &[&str] = &["/org-admin(.*)", "/org/settings(.*)", "/org/members(.*)"];
const SUB_ADMIN_ROUTES: &[&str] = &["/sub-admin(.*)", "/department-settings(.*)"];
const MEMBER_ROUTES: &[&str] = &["/dashboard(.*)", "/profile(.*)", "/tasks(.*)"];

impl Default for RouteClassifier {
    fn default() -> Self {
        Self::empty()
            .with_set(RouteCategory::Public, PUBLIC_ROUTES)
            .with_set(RouteCategory::SuperAdmin, SUPER_ADMIN_ROUTES)
            .with_set(RouteCategory::OrgAdmin, ORG_ADMIN_ROUTES)
            .with_set(RouteCategory::SubAdmin, SUB_ADMIN_ROUTES)
            .with_set(RouteCategory::Member, MEMBER_ROUTES)
    }
}

impl RouteClassifier {
    pub fn empty() -> Self {
        Self { sets: Vec::new() }
    }

    /// Replace the pattern set of `category`.
    ///
    /// `Unclassified` owns no patterns; setting it is a no-op.
    pub fn with_set(mut self, category: RouteCategory, patterns: &[&str]) -> Self {
        if category == RouteCategory::Unclassified {
            return self;
        }
        let patterns = patterns.iter().map(|p| RoutePattern::parse(p)).collect();
        self.sets.retain(|(existing, _)| *existing != category);
        self.sets.push((category, patterns));
        self.sets.sort_by_key(|(c, _)| precedence(*c));
        self
    }

    pub fn is_match(&self, category: RouteCategory, path: &str) -> bool {
        self.sets
            .iter()
            .find(|(c, _)| *c == category)
            .is_some_and(|(_, patterns)| patterns.iter().any(|p| p.matches(path)))
    }

    pub fn classify(&self, path: &str) -> RouteMatches {
        RouteMatches {
            public: self.is_match(RouteCategory::Public, path),
            super_admin: self.is_match(RouteCategory::SuperAdmin, path),
            org_admin: self.is_match(RouteCategory::OrgAdmin, path),
            sub_admin: self.is_match(RouteCategory::SubAdmin, path),
            member: self.is_match(RouteCategory::Member, path),
        }
    }

    /// First matching category in precedence order.
    pub fn category(&self, path: &str) -> RouteCategory {
        self.sets
            .iter()
            .find(|(_, patterns)| patterns.iter().any(|p| p.matches(path)))
            .map(|(category, _)| *category)
            .unwrap_or(RouteCategory::Unclassified)
    }
}

fn precedence(category: RouteCategory) -> usize {
    RouteCategory::CLASSIFIED
        .iter()
        .position(|c| *c == category)
        .unwrap_or(RouteCategory::CLASSIFIED.len())
}

static STATIC_ASSET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\.(?:html?|css|js|jpe?g|webp|png|gif|svg|ttf|woff2?|ico|csv|docx?|xlsx?|zip|webmanifest)$",
    )
    .expect("static asset pattern is valid")
});

/// Whether the access middleware inspects `path` at all.
///
/// Framework internals and static assets are skipped; API routes never are.
pub fn applies_to(path: &str) -> bool {
    if path.starts_with("/api") || path.starts_with("/trpc") {
        return true;
    }
    if path.starts_with("/_next") {
        return false;
    }
    !STATIC_ASSET.is_match(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_pattern_matches_root_and_subpaths() {
        let pattern = RoutePattern::parse("/dashboard(.*)");
        assert_eq!(pattern, RoutePattern::Prefix("/dashboard".into()));
        assert!(pattern.matches("/dashboard"));
        assert!(pattern.matches("/dashboard/"));
        assert!(pattern.matches("/dashboard/reports/2024"));
        assert!(!pattern.matches("/dash"));
        assert!(!pattern.matches("/other/dashboard"));
    }

    #[test]
    fn plain_pattern_is_exact() {
        let root = RoutePattern::parse("/");
        assert!(root.matches("/"));
        assert!(!root.matches("/dashboard"));

        let webhook = RoutePattern::parse("/api/webhook/register");
        assert!(webhook.matches("/api/webhook/register"));
        assert!(!webhook.matches("/api/webhook/register/extra"));
    }

    #[test]
    fn exact_pattern_tolerates_one_trailing_slash() {
        let webhook = RoutePattern::parse("/api/webhook/register");
        assert!(webhook.matches("/api/webhook/register/"));
        assert!(!webhook.matches("/api/webhook/register//"));
        assert!(!RoutePattern::parse("/").matches("//"));

        let routes = RouteClassifier::default();
        assert_eq!(routes.category("/api/webhook/register/"), RouteCategory::Public);
    }

    #[test]
    fn default_table_categories() {
        let routes = RouteClassifier::default();
        assert_eq!(routes.category("/"), RouteCategory::Public);
        assert_eq!(routes.category("/sign-in"), RouteCategory::Public);
        assert_eq!(routes.category("/sign-up/verify"), RouteCategory::Public);
        assert_eq!(routes.category("/api/webhook/register"), RouteCategory::Public);
        assert_eq!(routes.category("/super-admin/dashboard"), RouteCategory::SuperAdmin);
        assert_eq!(routes.category("/system-settings"), RouteCategory::SuperAdmin);
        assert_eq!(routes.category("/org/members/42"), RouteCategory::OrgAdmin);
        assert_eq!(routes.category("/department-settings/a"), RouteCategory::SubAdmin);
        assert_eq!(routes.category("/tasks"), RouteCategory::Member);
        assert_eq!(routes.category("/create-organization"), RouteCategory::Unclassified);
        assert_eq!(routes.category("/org"), RouteCategory::Unclassified);
    }

    #[test]
    fn classify_reports_every_matching_set() {
        let routes = RouteClassifier::default()
            .with_set(RouteCategory::SubAdmin, &["/sub-admin(.*)", "/shared(.*)"])
            .with_set(RouteCategory::OrgAdmin, &["/shared(.*)"]);
        let matches = routes.classify("/shared/x");
        assert!(matches.org_admin);
        assert!(matches.sub_admin);
        assert!(!matches.public);
        assert!(!matches.super_admin);
        assert!(!matches.member);
    }

    #[test]
    fn first_category_wins_regardless_of_specificity() {
        // The member pattern is more specific, but super-admin is checked first.
        let routes = RouteClassifier::default()
            .with_set(RouteCategory::SuperAdmin, &["/reports(.*)"])
            .with_set(RouteCategory::Member, &["/reports/mine"]);
        assert_eq!(routes.category("/reports/mine"), RouteCategory::SuperAdmin);
    }

    #[test]
    fn with_set_replaces_existing_patterns() {
        let routes = RouteClassifier::default().with_set(RouteCategory::Member, &["/home(.*)"]);
        assert_eq!(routes.category("/dashboard"), RouteCategory::Unclassified);
        assert_eq!(routes.category("/home"), RouteCategory::Member);
    }

    #[test]
    fn static_assets_and_internals_are_skipped() {
        assert!(!applies_to("/_next/static/chunk.js"));
        assert!(!applies_to("/logo.png"));
        assert!(!applies_to("/fonts/inter.woff2"));
        assert!(!applies_to("/site.webmanifest"));
        assert!(!applies_to("/report.xlsx"));
        assert!(applies_to("/data.json"));
        assert!(applies_to("/dashboard"));
        assert!(applies_to("/"));
    }

    #[test]
    fn api_routes_always_apply() {
        assert!(applies_to("/api/export.csv"));
        assert!(applies_to("/trpc/user.get"));
        assert!(applies_to("/api/webhook/register"));
    }
}
