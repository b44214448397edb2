//! REST client for the hosted identity provider.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::instrument;

use super::{IdentityError, IdentityProvider};
use crate::config::IdentityConfig;
use crate::models::{ActiveSession, NewSignUp, Session, SignInAttempt, SignUpAttempt};

/// Provider client authenticated with the instance secret key.
#[derive(Clone)]
pub struct HostedIdentityClient {
    client: Client,
    base_url: Url,
    secret_key: SecretString,
}

/// Error envelope returned on every non-2xx answer.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct SessionClaims {
    session_id: String,
    user_id: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    permissions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SessionToken {
    jwt: String,
}

impl From<SessionClaims> for Session {
    fn from(claims: SessionClaims) -> Self {
        Session {
            session_id: Some(claims.session_id),
            user_id: Some(claims.user_id),
            username: claims.username,
            permissions: claims.permissions.into_iter().collect(),
        }
    }
}

impl HostedIdentityClient {
    pub fn new(config: &IdentityConfig) -> Result<Self, IdentityError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| IdentityError::Unavailable(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = Url::parse(&config.api_url)
            .map_err(|e| IdentityError::Unavailable(format!("Invalid identity API URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(IdentityError::Unavailable(format!(
                "Identity API URL cannot be a base: {}",
                config.api_url
            )));
        }

        tracing::info!(api_url = %base_url, "Identity provider client configured");

        Ok(Self {
            client,
            base_url,
            secret_key: config.secret_key.clone(),
        })
    }

    /// Endpoint under the base URL. Each segment is percent-encoded on its
    /// own, so ids can never add segments or a query string.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, IdentityError> {
        let response = request
            .bearer_auth(self.secret_key.expose_secret())
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(IdentityError::from);
        }

        Err(Self::rejection(status, response).await)
    }

    async fn rejection(status: StatusCode, response: reqwest::Response) -> IdentityError {
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status = %status, body = %body, "Identity provider rejected request");

        if status.is_server_error() {
            return IdentityError::Unavailable(format!("provider returned {}", status));
        }

        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .ok()
            .and_then(|envelope| envelope.errors.into_iter().next())
            .map(|e| e.message)
            .unwrap_or_else(|| "Something went wrong. Please try again.".to_string());

        IdentityError::rejected(status.as_u16(), message)
    }
}

#[async_trait]
impl IdentityProvider for HostedIdentityClient {
    #[instrument(skip_all)]
    async fn resolve_session(&self, token: &str) -> Result<Option<Session>, IdentityError> {
        let request = self
            .client
            .post(self.url(&["v1", "sessions", "verify"]))
            .json(&serde_json::json!({ "token": token }));

        match self.send::<SessionClaims>(request).await {
            Ok(claims) => Ok(Some(claims.into())),
            Err(IdentityError::Rejected { status, .. }) if status == 401 || status == 404 => Ok(None),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, password))]
    async fn sign_in(&self, identifier: &str, password: &str) -> Result<SignInAttempt, IdentityError> {
        let request = self.client.post(self.url(&["v1", "sign_ins"])).json(&serde_json::json!({
            "identifier": identifier,
            "password": password,
        }));
        self.send(request).await
    }

    #[instrument(skip(self, sign_up), fields(username = %sign_up.username))]
    async fn create_sign_up(&self, sign_up: &NewSignUp) -> Result<SignUpAttempt, IdentityError> {
        let request = self.client.post(self.url(&["v1", "sign_ups"])).json(&serde_json::json!({
            "email_address": sign_up.email_address,
            "password": sign_up.password.expose_secret(),
            "username": sign_up.username,
        }));
        self.send(request).await
    }

    #[instrument(skip(self))]
    async fn get_sign_up(&self, sign_up_id: &str) -> Result<SignUpAttempt, IdentityError> {
        let request = self.client.get(self.url(&["v1", "sign_ups", sign_up_id]));
        self.send(request).await
    }

    #[instrument(skip(self))]
    async fn prepare_email_verification(&self, sign_up_id: &str) -> Result<SignUpAttempt, IdentityError> {
        let request = self
            .client
            .post(self.url(&["v1", "sign_ups", sign_up_id, "prepare_verification"]))
            .json(&serde_json::json!({ "strategy": "email_code" }));
        self.send(request).await
    }

    #[instrument(skip(self, code))]
    async fn attempt_email_verification(
        &self,
        sign_up_id: &str,
        code: &str,
    ) -> Result<SignUpAttempt, IdentityError> {
        let request = self
            .client
            .post(self.url(&["v1", "sign_ups", sign_up_id, "attempt_verification"]))
            .json(&serde_json::json!({ "strategy": "email_code", "code": code }));
        self.send(request).await
    }

    #[instrument(skip(self))]
    async fn finalize_sign_up(&self, sign_up_id: &str) -> Result<SignUpAttempt, IdentityError> {
        let request = self
            .client
            .patch(self.url(&["v1", "sign_ups", sign_up_id]))
            .json(&serde_json::json!({}));
        self.send(request).await
    }

    #[instrument(skip(self))]
    async fn activate_session(&self, session_id: &str) -> Result<ActiveSession, IdentityError> {
        let request = self
            .client
            .post(self.url(&["v1", "sessions", session_id, "tokens"]));
        let token: SessionToken = self.send(request).await?;
        Ok(ActiveSession {
            session_id: session_id.to_string(),
            token: token.jwt,
        })
    }

    #[instrument(skip(self))]
    async fn revoke_session(&self, session_id: &str) -> Result<(), IdentityError> {
        let request = self
            .client
            .post(self.url(&["v1", "sessions", session_id, "revoke"]));
        self.send::<serde_json::Value>(request).await.map(|_| ())
    }

    async fn health_check(&self) -> Result<(), IdentityError> {
        let request = self.client.get(self.url(&["v1", "health"]));
        self.send::<serde_json::Value>(request).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttemptStatus, VerificationStatus};
    use secrecy::Secret;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> HostedIdentityClient {
        HostedIdentityClient::new(&IdentityConfig {
            api_url: server.uri(),
            secret_key: Secret::new("sk_test_123".to_string()),
            timeout_ms: 2_000,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn resolves_session_claims() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/sessions/verify"))
            .and(header("authorization", "Bearer sk_test_123"))
            .and(body_json(serde_json::json!({ "token": "tok_abc" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "session_id": "sess_1",
                "user_id": "user_1",
                "username": "ada",
                "permissions": ["org:admin"]
            })))
            .mount(&server)
            .await;

        let session = client_for(&server)
            .resolve_session("tok_abc")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(session.user_id.as_deref(), Some("user_1"));
        assert!(session.has_permission("org:admin"));
    }

    #[tokio::test]
    async fn unknown_token_resolves_to_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/sessions/verify"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "errors": [{ "message": "Session expired" }]
            })))
            .mount(&server)
            .await;

        assert_eq!(client_for(&server).resolve_session("tok_old").await.unwrap(), None);
    }

    #[tokio::test]
    async fn server_error_is_not_treated_as_anonymous() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/sessions/verify"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client_for(&server).resolve_session("tok").await.unwrap_err();
        assert!(matches!(err, IdentityError::Unavailable(_)));
    }

    #[tokio::test]
    async fn sign_in_rejection_carries_provider_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/sign_ins"))
            .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
                "errors": [{ "message": "Password is incorrect. Try again, or use another method.", "code": "form_password_incorrect" }]
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .sign_in("ada@example.com", "nope")
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Password is incorrect. Try again, or use another method."
        );
    }

    #[tokio::test]
    async fn sign_up_round_trip_parses_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/sign_ups/sua_1/attempt_verification"))
            .and(body_json(serde_json::json!({ "strategy": "email_code", "code": "123456" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "sua_1",
                "status": "complete",
                "email_verification": "verified",
                "created_session_id": "sess_9"
            })))
            .mount(&server)
            .await;

        let attempt = client_for(&server)
            .attempt_email_verification("sua_1", "123456")
            .await
            .unwrap();
        assert_eq!(attempt.status, AttemptStatus::Complete);
        assert_eq!(attempt.email_verification, VerificationStatus::Verified);
        assert_eq!(attempt.created_session_id.as_deref(), Some("sess_9"));
    }

    #[tokio::test]
    async fn ids_are_confined_to_one_path_segment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "errors": [{ "message": "Sign-up not found" }]
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_sign_up("../users/user_victim?")
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::Rejected { status: 404, .. }));

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let url = &requests[0].url;
        assert_eq!(url.query(), None);
        let segments: Vec<&str> = url.path_segments().unwrap().collect();
        assert_eq!(segments.len(), 3, "{}", url.path());
        assert_eq!(&segments[..2], &["v1", "sign_ups"]);
        assert_ne!(segments[2], "users");
    }

    #[test]
    fn base_path_is_kept_in_front_of_endpoints() {
        let client = HostedIdentityClient::new(&IdentityConfig {
            api_url: "http://idp.internal/api/".to_string(),
            secret_key: Secret::new("sk_test_123".to_string()),
            timeout_ms: 2_000,
        })
        .unwrap();
        assert_eq!(
            client.url(&["v1", "sign_ups", "sua_1"]).as_str(),
            "http://idp.internal/api/v1/sign_ups/sua_1"
        );
    }

    #[tokio::test]
    async fn activation_returns_browser_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/sessions/sess_9/tokens"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "jwt": "eyJ.token" })))
            .mount(&server)
            .await;

        let active = client_for(&server).activate_session("sess_9").await.unwrap();
        assert_eq!(active.token, "eyJ.token");
        assert_eq!(active.session_id, "sess_9");
    }
}
