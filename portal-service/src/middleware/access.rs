//! Role-based access control in front of every page.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use portal_core::error::AppError;

use crate::models::{applies_to, Session};
use crate::services::IdentityError;
use crate::AppState;

/// Resolve the caller's session and allow the request or redirect it.
///
/// Any failure to resolve the session is treated as a denial and sends the
/// caller to sign-in. The resolved session is stored in the request
/// extensions for [`CurrentSession`].
pub async fn access_middleware(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    if !applies_to(&path) {
        return next.run(req).await;
    }

    let resolution = resolve_session(&state, req.headers()).await;
    let decision = state.access.decide(&path, &resolution);

    metrics::counter!("access_decisions_total", "decision" => decision.label()).increment(1);

    if let Some(target) = decision.redirect_target() {
        tracing::debug!(path = %path, redirect_to = %target, decision = decision.label(), "Access redirect");
        return Redirect::temporary(target).into_response();
    }

    req.extensions_mut().insert(resolution.unwrap_or_default());
    next.run(req).await
}

async fn resolve_session(state: &AppState, headers: &HeaderMap) -> Result<Session, IdentityError> {
    let Some(token) = session_token(headers, &state.config.access.session_cookie) else {
        return Ok(Session::anonymous());
    };

    let lookup = state.identity.resolve_session(&token);
    let result = match tokio::time::timeout(state.config.identity.timeout(), lookup).await {
        Ok(result) => result,
        Err(_) => Err(IdentityError::Timeout),
    };

    match result {
        Ok(Some(session)) => Ok(session),
        Ok(None) => Ok(Session::anonymous()),
        Err(e) => {
            tracing::warn!(error = %e, "Session resolution failed, denying access");
            Err(e)
        }
    }
}

/// Browser token from the session cookie, else from `Authorization: Bearer`.
pub fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(cookie_name) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Session resolved by [`access_middleware`] for this request.
pub struct CurrentSession(pub Session);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts.extensions.get::<Session>().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!("Session missing from request extensions"))
        })?;

        Ok(CurrentSession(session.clone()))
    }
}
