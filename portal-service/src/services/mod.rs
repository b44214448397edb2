//! Services layer for portal-service.
//!
//! Identity provider access, the access policy, and persistence errors.

pub mod authorization;
pub mod error;
mod hosted_identity;
mod identity;

pub use authorization::{AccessDecision, AccessPolicy, UnclassifiedRoutePolicy, SIGN_IN_PATH};
pub use error::{IdentityError, ServiceError};
pub use hosted_identity::HostedIdentityClient;
pub use identity::{IdentityProvider, MockIdentityProvider, MOCK_VERIFICATION_CODE};
