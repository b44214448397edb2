//! Domain types: roles, sessions, route classification and the identity
//! provider's attempt objects.

pub mod identity;
pub mod role;
pub mod route;
pub mod session;

pub use identity::{ActiveSession, AttemptStatus, NewSignUp, SignInAttempt, SignUpAttempt, VerificationStatus};
pub use role::Role;
pub use route::{applies_to, RouteCategory, RouteClassifier, RouteMatches, RoutePattern};
pub use session::Session;
