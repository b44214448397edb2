use secrecy::{ExposeSecret, Secret, SecretString};

use super::{activate, is_provider_id, FlowError, FlowStep, SubmissionTracker, VERIFICATION_CODE_LEN};
use crate::models::{ActiveSession, AttemptStatus, NewSignUp, VerificationStatus};
use crate::services::IdentityProvider;

/// Two-step sign-up: collect the account fields, then verify the e-mail code.
pub struct SignUpFlow {
    pub username: String,
    pub email: String,
    password: SecretString,
    pub code: String,
    step: FlowStep,
    sign_up_id: Option<String>,
    is_pending: bool,
    error: Option<String>,
}

impl SignUpFlow {
    /// A fresh flow at the collect step.
    pub fn collect(username: impl Into<String>, email: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password,
            code: String::new(),
            step: FlowStep::Collect,
            sign_up_id: None,
            is_pending: false,
            error: None,
        }
    }

    /// Pick a flow back up at the verify step.
    pub fn resume(sign_up_id: Option<String>, code: impl Into<String>) -> Self {
        Self {
            username: String::new(),
            email: String::new(),
            password: Secret::new(String::new()),
            code: code.into(),
            step: FlowStep::Verify,
            sign_up_id,
            is_pending: false,
            error: None,
        }
    }

    pub fn step(&self) -> FlowStep {
        self.step
    }

    pub fn sign_up_id(&self) -> Option<&str> {
        self.sign_up_id.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.is_pending
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Create the sign-up and send the verification code. On success the
    /// flow moves to [`FlowStep::Verify`].
    pub async fn submit(
        &mut self,
        identity: &dyn IdentityProvider,
        submissions: &SubmissionTracker,
    ) -> Result<(), FlowError> {
        if self.step != FlowStep::Collect {
            return Err(FlowError::WrongStep);
        }
        let key = format!("sign-up:{}", self.email.trim().to_lowercase());
        let _pending = submissions.begin(key)?;
        self.is_pending = true;
        self.error = None;

        let result = self.create(identity).await;

        self.is_pending = false;
        match result {
            Ok(sign_up_id) => {
                self.sign_up_id = Some(sign_up_id);
                self.step = FlowStep::Verify;
                Ok(())
            }
            Err(e) => {
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    async fn create(&self, identity: &dyn IdentityProvider) -> Result<String, FlowError> {
        let attempt = identity
            .create_sign_up(&NewSignUp {
                username: self.username.trim().to_string(),
                email_address: self.email.trim().to_string(),
                password: Secret::new(self.password.expose_secret().clone()),
            })
            .await?;
        identity.prepare_email_verification(&attempt.id).await?;
        tracing::info!(sign_up_id = %attempt.id, "Sign-up created, verification code sent");
        Ok(attempt.id)
    }

    /// Check the code, or finalize directly when the provider already
    /// considers the address verified. `None` leaves the flow at verify.
    pub async fn verify(
        &mut self,
        identity: &dyn IdentityProvider,
        submissions: &SubmissionTracker,
    ) -> Result<Option<ActiveSession>, FlowError> {
        if self.step != FlowStep::Verify {
            return Err(FlowError::WrongStep);
        }
        let sign_up_id = self
            .sign_up_id
            .clone()
            .filter(|id| is_provider_id(id))
            .ok_or(FlowError::NoSignUpInProgress)?;
        let _pending = submissions.begin(format!("sign-up:{}", sign_up_id))?;
        self.is_pending = true;
        self.error = None;

        let result = self.attempt(identity, &sign_up_id).await;

        self.is_pending = false;
        if let Err(e) = &result {
            self.error = Some(e.to_string());
        }
        result
    }

    async fn attempt(
        &self,
        identity: &dyn IdentityProvider,
        sign_up_id: &str,
    ) -> Result<Option<ActiveSession>, FlowError> {
        let current = identity.get_sign_up(sign_up_id).await?;

        let attempt = if current.status == AttemptStatus::Complete {
            current
        } else if current.email_verification == VerificationStatus::Verified {
            tracing::info!(sign_up_id = %sign_up_id, "Email already verified, finalizing sign-up");
            identity.finalize_sign_up(sign_up_id).await?
        } else {
            let code = self.code.trim();
            if code.chars().count() != VERIFICATION_CODE_LEN {
                return Err(FlowError::InvalidCode);
            }
            identity.attempt_email_verification(sign_up_id, code).await?
        };

        activate(identity, attempt.status, attempt.created_session_id.as_deref()).await
    }
}
