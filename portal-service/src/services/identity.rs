use async_trait::async_trait;
use secrecy::ExposeSecret;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use uuid::Uuid;

use super::IdentityError;
use crate::models::{
    ActiveSession, AttemptStatus, NewSignUp, Session, SignInAttempt, SignUpAttempt,
    VerificationStatus,
};

/// The hosted identity provider, as far as this service needs it.
///
/// Sessions, credentials, e-mail verification and permission claims all live
/// on the provider side; implementations only translate calls.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Look up the session behind a browser token. `Ok(None)` means the token
    /// is unknown, expired or revoked.
    async fn resolve_session(&self, token: &str) -> Result<Option<Session>, IdentityError>;

    async fn sign_in(&self, identifier: &str, password: &str) -> Result<SignInAttempt, IdentityError>;

    async fn create_sign_up(&self, sign_up: &NewSignUp) -> Result<SignUpAttempt, IdentityError>;

    async fn get_sign_up(&self, sign_up_id: &str) -> Result<SignUpAttempt, IdentityError>;

    /// Send the e-mail code for a pending sign-up.
    async fn prepare_email_verification(&self, sign_up_id: &str) -> Result<SignUpAttempt, IdentityError>;

    async fn attempt_email_verification(
        &self,
        sign_up_id: &str,
        code: &str,
    ) -> Result<SignUpAttempt, IdentityError>;

    /// Complete a sign-up whose e-mail is already verified.
    async fn finalize_sign_up(&self, sign_up_id: &str) -> Result<SignUpAttempt, IdentityError>;

    /// Make a created session current and obtain its browser token.
    async fn activate_session(&self, session_id: &str) -> Result<ActiveSession, IdentityError>;

    async fn revoke_session(&self, session_id: &str) -> Result<(), IdentityError>;

    async fn health_check(&self) -> Result<(), IdentityError>;
}

/// Code accepted by [`MockIdentityProvider`] for every e-mail verification.
pub const MOCK_VERIFICATION_CODE: &str = "424242";

struct MockUser {
    user_id: String,
    username: String,
    email: String,
    password: String,
    permissions: BTreeSet<String>,
}

struct MockSignUp {
    attempt: SignUpAttempt,
    username: String,
    email: String,
    password: String,
    code_sent: bool,
}

#[derive(Default)]
struct MockState {
    users: Vec<MockUser>,
    /// session id -> user id
    sessions: HashMap<String, String>,
    /// browser token -> session id
    tokens: HashMap<String, String>,
    sign_ups: HashMap<String, MockSignUp>,
}

impl MockState {
    fn find_user(&self, identifier: &str) -> Option<&MockUser> {
        self.users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(identifier) || u.username == identifier)
    }

    fn open_session(&mut self, user_id: &str) -> String {
        let session_id = format!("sess_{}", Uuid::new_v4().simple());
        self.sessions.insert(session_id.clone(), user_id.to_string());
        session_id
    }

    fn sign_up_mut(&mut self, sign_up_id: &str) -> Result<&mut MockSignUp, IdentityError> {
        self.sign_ups
            .get_mut(sign_up_id)
            .ok_or_else(|| IdentityError::rejected(404, "Sign up not found"))
    }

    /// Turn a verified sign-up into a user with an open session.
    fn complete_sign_up(&mut self, sign_up_id: &str) -> Result<SignUpAttempt, IdentityError> {
        let (username, email, password) = {
            let pending = self.sign_up_mut(sign_up_id)?;
            if pending.attempt.status == AttemptStatus::Complete {
                return Ok(pending.attempt.clone());
            }
            (
                pending.username.clone(),
                pending.email.clone(),
                pending.password.clone(),
            )
        };

        let user_id = format!("user_{}", Uuid::new_v4().simple());
        self.users.push(MockUser {
            user_id: user_id.clone(),
            username,
            email,
            password,
            permissions: BTreeSet::new(),
        });
        let session_id = self.open_session(&user_id);

        let pending = self.sign_up_mut(sign_up_id)?;
        pending.attempt.status = AttemptStatus::Complete;
        pending.attempt.email_verification = VerificationStatus::Verified;
        pending.attempt.created_session_id = Some(session_id);
        Ok(pending.attempt.clone())
    }
}

/// In-memory provider for tests and local runs.
///
/// Accepts [`MOCK_VERIFICATION_CODE`] for every sign-up and can be told to
/// fail or stall to exercise the fail-closed paths.
pub struct MockIdentityProvider {
    state: Mutex<MockState>,
    unavailable: AtomicBool,
    latency_ms: AtomicU64,
}

impl Default for MockIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            unavailable: AtomicBool::new(false),
            latency_ms: AtomicU64::new(0),
        }
    }

    pub fn with_user(self, email: &str, username: &str, password: &str, permissions: &[&str]) -> Self {
        self.add_user(email, username, password, permissions);
        self
    }

    /// Register a user directly, returning its id.
    pub fn add_user(&self, email: &str, username: &str, password: &str, permissions: &[&str]) -> String {
        let user_id = format!("user_{}", Uuid::new_v4().simple());
        if let Ok(mut state) = self.state.lock() {
            state.users.push(MockUser {
                user_id: user_id.clone(),
                username: username.to_string(),
                email: email.to_string(),
                password: password.to_string(),
                permissions: permissions.iter().map(|p| p.to_string()).collect(),
            });
        }
        user_id
    }

    /// Open and activate a session for an existing user, returning the token.
    pub fn issue_token(&self, identifier: &str) -> Option<String> {
        let mut state = self.state.lock().ok()?;
        let user_id = state.find_user(identifier)?.user_id.clone();
        let session_id = state.open_session(&user_id);
        let token = format!("tok_{}", Uuid::new_v4().simple());
        state.tokens.insert(token.clone(), session_id);
        Some(token)
    }

    /// Simulate the user verifying their address out of band.
    pub fn mark_email_verified(&self, sign_up_id: &str) {
        if let Ok(mut state) = self.state.lock() {
            if let Some(pending) = state.sign_ups.get_mut(sign_up_id) {
                pending.attempt.email_verification = VerificationStatus::Verified;
            }
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Delay applied to every session lookup.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn open_sessions(&self) -> usize {
        self.state.lock().map(|s| s.sessions.len()).unwrap_or(0)
    }

    fn state(&self) -> Result<MutexGuard<'_, MockState>, IdentityError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(IdentityError::Unavailable("mock provider switched off".to_string()));
        }
        self.state
            .lock()
            .map_err(|e| IdentityError::Unavailable(format!("mock state poisoned: {}", e)))
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn resolve_session(&self, token: &str) -> Result<Option<Session>, IdentityError> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        let state = self.state()?;
        let Some(session_id) = state.tokens.get(token) else {
            return Ok(None);
        };
        let Some(user_id) = state.sessions.get(session_id) else {
            return Ok(None);
        };
        let Some(user) = state.users.iter().find(|u| &u.user_id == user_id) else {
            return Ok(None);
        };

        Ok(Some(Session {
            session_id: Some(session_id.clone()),
            user_id: Some(user.user_id.clone()),
            username: Some(user.username.clone()),
            permissions: user.permissions.clone(),
        }))
    }

    async fn sign_in(&self, identifier: &str, password: &str) -> Result<SignInAttempt, IdentityError> {
        let mut state = self.state()?;
        let user = state
            .find_user(identifier)
            .ok_or_else(|| IdentityError::rejected(422, "Couldn't find your account."))?;
        if user.password != password {
            return Err(IdentityError::rejected(
                422,
                "Password is incorrect. Try again, or use another method.",
            ));
        }
        let user_id = user.user_id.clone();
        let session_id = state.open_session(&user_id);

        Ok(SignInAttempt {
            status: AttemptStatus::Complete,
            created_session_id: Some(session_id),
        })
    }

    async fn create_sign_up(&self, sign_up: &NewSignUp) -> Result<SignUpAttempt, IdentityError> {
        let mut state = self.state()?;
        if state.find_user(&sign_up.email_address).is_some() {
            return Err(IdentityError::rejected(
                422,
                "That email address is taken. Please try another.",
            ));
        }
        if state.find_user(&sign_up.username).is_some() {
            return Err(IdentityError::rejected(
                422,
                "That username is taken. Please try another.",
            ));
        }
        if sign_up.password.expose_secret().chars().count() < 8 {
            return Err(IdentityError::rejected(
                422,
                "Passwords must be 8 characters or more.",
            ));
        }

        let attempt = SignUpAttempt {
            id: format!("sua_{}", Uuid::new_v4().simple()),
            status: AttemptStatus::MissingRequirements,
            email_verification: VerificationStatus::Unverified,
            created_session_id: None,
        };
        state.sign_ups.insert(
            attempt.id.clone(),
            MockSignUp {
                attempt: attempt.clone(),
                username: sign_up.username.clone(),
                email: sign_up.email_address.clone(),
                password: sign_up.password.expose_secret().clone(),
                code_sent: false,
            },
        );
        Ok(attempt)
    }

    async fn get_sign_up(&self, sign_up_id: &str) -> Result<SignUpAttempt, IdentityError> {
        let mut state = self.state()?;
        Ok(state.sign_up_mut(sign_up_id)?.attempt.clone())
    }

    async fn prepare_email_verification(&self, sign_up_id: &str) -> Result<SignUpAttempt, IdentityError> {
        let mut state = self.state()?;
        let pending = state.sign_up_mut(sign_up_id)?;
        pending.code_sent = true;
        Ok(pending.attempt.clone())
    }

    async fn attempt_email_verification(
        &self,
        sign_up_id: &str,
        code: &str,
    ) -> Result<SignUpAttempt, IdentityError> {
        let mut state = self.state()?;
        let pending = state.sign_up_mut(sign_up_id)?;
        if !pending.code_sent {
            return Err(IdentityError::rejected(
                400,
                "Verification has not been prepared for this sign up.",
            ));
        }
        if code != MOCK_VERIFICATION_CODE {
            return Err(IdentityError::rejected(422, "Incorrect code"));
        }
        state.complete_sign_up(sign_up_id)
    }

    async fn finalize_sign_up(&self, sign_up_id: &str) -> Result<SignUpAttempt, IdentityError> {
        let mut state = self.state()?;
        let pending = state.sign_up_mut(sign_up_id)?;
        if pending.attempt.email_verification != VerificationStatus::Verified {
            return Ok(pending.attempt.clone());
        }
        state.complete_sign_up(sign_up_id)
    }

    async fn activate_session(&self, session_id: &str) -> Result<ActiveSession, IdentityError> {
        let mut state = self.state()?;
        if !state.sessions.contains_key(session_id) {
            return Err(IdentityError::rejected(404, "Session not found"));
        }
        let token = format!("tok_{}", Uuid::new_v4().simple());
        state.tokens.insert(token.clone(), session_id.to_string());
        Ok(ActiveSession {
            session_id: session_id.to_string(),
            token,
        })
    }

    async fn revoke_session(&self, session_id: &str) -> Result<(), IdentityError> {
        let mut state = self.state()?;
        state.sessions.remove(session_id);
        state.tokens.retain(|_, sid| sid.as_str() != session_id);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), IdentityError> {
        self.state().map(|_| ())
    }
}
