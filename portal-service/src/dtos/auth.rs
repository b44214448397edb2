use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::flows::FlowStep;

pub const SIGN_IN_TITLE: &str = "Sign in to your account";
pub const SIGN_UP_TITLE: &str = "Create an account";
pub const VERIFY_TITLE: &str = "Verify your email";

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignInRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "user@example.com")]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    #[schema(example = "password123")]
    pub password: String,
}

/// Password length is left to the provider so its wording reaches the user.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignUpRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    #[schema(example = "ada")]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "ada@example.com")]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    #[schema(example = "correct-horse-battery")]
    pub password: String,
}

/// An empty code is allowed: an address already verified elsewhere
/// finalizes without one.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct VerifyRequest {
    #[serde(default)]
    #[validate(length(max = 6, message = "Code must be 6 characters"))]
    #[schema(example = "424242")]
    pub code: String,
}

/// State of a sign-in or sign-up form after a request.
#[derive(Debug, Serialize, ToSchema)]
pub struct FlowResponse {
    #[schema(example = "Create an account")]
    pub title: String,
    pub step: FlowStep,
    /// Where the browser should go next, once the flow is done.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "/")]
    pub redirect_to: Option<String>,
}

impl FlowResponse {
    pub fn sign_in() -> Self {
        Self {
            title: SIGN_IN_TITLE.to_string(),
            step: FlowStep::Collect,
            redirect_to: None,
        }
    }

    pub fn sign_up(step: FlowStep) -> Self {
        let title = match step {
            FlowStep::Collect => SIGN_UP_TITLE,
            FlowStep::Verify => VERIFY_TITLE,
        };
        Self {
            title: title.to_string(),
            step,
            redirect_to: None,
        }
    }

    pub fn redirect(mut self, target: &str) -> Self {
        self.redirect_to = Some(target.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_up_title_follows_step() {
        assert_eq!(FlowResponse::sign_up(FlowStep::Collect).title, "Create an account");
        assert_eq!(FlowResponse::sign_up(FlowStep::Verify).title, "Verify your email");
    }

    #[test]
    fn sign_in_request_requires_email_shape() {
        let req = SignInRequest {
            email: "not-an-email".to_string(),
            password: "x".to_string(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn verify_code_defaults_to_empty() {
        let req: VerifyRequest = serde_json::from_str("{}").unwrap();
        assert!(req.code.is_empty());
        assert!(req.validate().is_ok());
    }
}
