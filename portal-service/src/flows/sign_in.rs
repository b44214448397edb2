use secrecy::{ExposeSecret, SecretString};

use super::{activate, FlowError, SubmissionTracker};
use crate::models::ActiveSession;
use crate::services::IdentityProvider;

/// Single-step password sign-in.
pub struct SignInFlow {
    pub email: String,
    password: SecretString,
    is_pending: bool,
    error: Option<String>,
}

impl SignInFlow {
    pub fn new(email: impl Into<String>, password: SecretString) -> Self {
        Self {
            email: email.into(),
            password,
            is_pending: false,
            error: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.is_pending
    }

    /// Provider message from the last failed submission.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn submission_key(&self) -> String {
        format!("sign-in:{}", self.email.trim().to_lowercase())
    }

    /// Submit the credentials. `Some` carries the session to hand to the
    /// browser; `None` means the provider wants more than a password.
    pub async fn submit(
        &mut self,
        identity: &dyn IdentityProvider,
        submissions: &SubmissionTracker,
    ) -> Result<Option<ActiveSession>, FlowError> {
        let _pending = submissions.begin(self.submission_key())?;
        self.is_pending = true;
        self.error = None;

        let result = self.run(identity).await;

        self.is_pending = false;
        if let Err(e) = &result {
            self.error = Some(e.to_string());
        }
        result
    }

    async fn run(&self, identity: &dyn IdentityProvider) -> Result<Option<ActiveSession>, FlowError> {
        let attempt = identity
            .sign_in(self.email.trim(), self.password.expose_secret())
            .await?;
        tracing::debug!(status = ?attempt.status, "Sign-in attempt answered");
        activate(identity, attempt.status, attempt.created_session_id.as_deref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MockIdentityProvider;
    use secrecy::Secret;

    fn flow(email: &str, password: &str) -> SignInFlow {
        SignInFlow::new(email, Secret::new(password.to_string()))
    }

    #[tokio::test]
    async fn valid_credentials_activate_a_session() {
        let idp = MockIdentityProvider::new().with_user("ada@example.com", "ada", "pw-123456", &[]);
        let tracker = SubmissionTracker::new();
        let mut flow = flow("ada@example.com", "pw-123456");

        let active = flow.submit(&idp, &tracker).await.unwrap().unwrap();

        assert!(idp.resolve_session(&active.token).await.unwrap().is_some());
        assert!(!flow.is_pending());
        assert_eq!(flow.error(), None);
    }

    #[tokio::test]
    async fn wrong_password_surfaces_provider_message() {
        let idp = MockIdentityProvider::new().with_user("ada@example.com", "ada", "pw-123456", &[]);
        let tracker = SubmissionTracker::new();
        let mut flow = flow("ada@example.com", "wrong");

        assert!(flow.submit(&idp, &tracker).await.is_err());
        assert_eq!(
            flow.error(),
            Some("Password is incorrect. Try again, or use another method.")
        );
        assert!(!flow.is_pending());
    }

    #[tokio::test]
    async fn resubmission_clears_previous_error() {
        let idp = MockIdentityProvider::new().with_user("ada@example.com", "ada", "pw-123456", &[]);
        let tracker = SubmissionTracker::new();
        let mut flow = flow("ada@example.com", "wrong");
        let _ = flow.submit(&idp, &tracker).await;

        flow.password = Secret::new("pw-123456".to_string());
        assert!(flow.submit(&idp, &tracker).await.unwrap().is_some());
        assert_eq!(flow.error(), None);
    }

    #[tokio::test]
    async fn concurrent_submission_for_same_account_is_refused() {
        let idp = MockIdentityProvider::new().with_user("ada@example.com", "ada", "pw-123456", &[]);
        let tracker = SubmissionTracker::new();
        let _in_flight = tracker.begin("sign-in:ada@example.com").unwrap();

        let mut flow = flow("ADA@example.com", "pw-123456");
        let err = flow.submit(&idp, &tracker).await.unwrap_err();
        assert!(matches!(err, FlowError::SubmissionPending));
        assert_eq!(idp.open_sessions(), 0);
    }
}
