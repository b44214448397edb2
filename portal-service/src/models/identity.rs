use secrecy::SecretString;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Complete,
    MissingRequirements,
    NeedsIdentifier,
    NeedsFirstFactor,
    NeedsSecondFactor,
    Abandoned,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    #[default]
    Unverified,
    Verified,
    Failed,
    Expired,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SignInAttempt {
    pub status: AttemptStatus,
    #[serde(default)]
    pub created_session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SignUpAttempt {
    pub id: String,
    pub status: AttemptStatus,
    #[serde(default)]
    pub email_verification: VerificationStatus,
    #[serde(default)]
    pub created_session_id: Option<String>,
}

/// Fields collected by the first sign-up step.
#[derive(Debug, Clone)]
pub struct NewSignUp {
    pub username: String,
    pub email_address: String,
    pub password: SecretString,
}

/// A session made current for the browser, with the token to store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    pub session_id: String,
    pub token: String,
}
