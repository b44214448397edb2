//! Sign-in and sign-up form flows.
//!
//! A flow carries the form's view state (inputs, step, pending flag, last
//! error) for one submission. Between requests only the provider's sign-up
//! attempt id survives, so handlers rebuild the flow from the request.

mod sign_in;
mod sign_up;

pub use sign_in::SignInFlow;
pub use sign_up::SignUpFlow;

use portal_core::error::AppError;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Mutex;
use thiserror::Error;
use utoipa::ToSchema;

use crate::models::{ActiveSession, AttemptStatus};
use crate::services::{IdentityError, IdentityProvider};

/// Length of the e-mail verification code.
pub const VERIFICATION_CODE_LEN: usize = 6;

/// Shape of the provider's object ids (`sua_...`, `sess_...`). Anything else
/// arriving from the browser is not one of ours.
pub fn is_provider_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FlowStep {
    Collect,
    Verify,
}

#[derive(Error, Debug)]
pub enum FlowError {
    #[error(transparent)]
    Provider(#[from] IdentityError),

    #[error("Enter the 6-character code sent to your email")]
    InvalidCode,

    #[error("No sign-up in progress")]
    NoSignUpInProgress,

    #[error("A submission is already in progress")]
    SubmissionPending,

    #[error("This step is not available right now")]
    WrongStep,
}

impl From<FlowError> for AppError {
    fn from(err: FlowError) -> Self {
        match err {
            FlowError::Provider(e) => e.into(),
            e @ FlowError::SubmissionPending => AppError::Conflict(anyhow::anyhow!(e.to_string())),
            e => AppError::BadRequest(anyhow::anyhow!(e.to_string())),
        }
    }
}

/// Keys of submissions currently talking to the provider.
///
/// A second submission for the same key is refused until the first one
/// finishes or is dropped.
#[derive(Debug, Default)]
pub struct SubmissionTracker {
    keys: Mutex<HashSet<String>>,
}

impl SubmissionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self, key: impl Into<String>) -> Result<PendingSubmission<'_>, FlowError> {
        let key = key.into();
        let mut keys = self.keys.lock().unwrap_or_else(|e| e.into_inner());
        if !keys.insert(key.clone()) {
            return Err(FlowError::SubmissionPending);
        }
        Ok(PendingSubmission { tracker: self, key })
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.keys
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(key)
    }
}

/// Held for the duration of one submission.
#[derive(Debug)]
pub struct PendingSubmission<'a> {
    tracker: &'a SubmissionTracker,
    key: String,
}

impl Drop for PendingSubmission<'_> {
    fn drop(&mut self) {
        self.tracker
            .keys
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.key);
    }
}

/// Activate the session a completed attempt created.
async fn activate(
    identity: &dyn IdentityProvider,
    status: AttemptStatus,
    created_session_id: Option<&str>,
) -> Result<Option<ActiveSession>, FlowError> {
    if status != AttemptStatus::Complete {
        return Ok(None);
    }
    let session_id = created_session_id.ok_or_else(|| {
        IdentityError::InvalidResponse("completed attempt without a session".to_string())
    })?;
    Ok(Some(identity.activate_session(session_id).await?))
}
