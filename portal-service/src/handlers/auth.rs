//! Sign-in, sign-up and sign-out endpoints.

use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Redirect},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use portal_core::error::AppError;
use secrecy::Secret;

use crate::dtos::auth::{FlowResponse, SignInRequest, SignUpRequest, VerifyRequest};
use crate::flows::{FlowStep, SignInFlow, SignUpFlow};
use crate::middleware::session_token;
use crate::utils::ValidatedJson;
use crate::AppState;

/// Where a finished sign-in or sign-up sends the browser. The access
/// middleware forwards it on to the user's dashboard.
const AFTER_AUTH_PATH: &str = "/";

fn cookie(name: &str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name.to_string(), value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

fn removal(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), String::new())).path("/").build()
}

#[utoipa::path(
    get,
    path = "/sign-in",
    responses(
        (status = 200, description = "Sign-in form", body = FlowResponse),
        (status = 307, description = "Already signed in; redirected to the role dashboard")
    ),
    tag = "Authentication"
)]
pub async fn sign_in_page() -> Json<FlowResponse> {
    Json(FlowResponse::sign_in())
}

#[utoipa::path(
    post,
    path = "/sign-in",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in, or further steps required", body = FlowResponse),
        (status = 400, description = "Rejected by the identity provider", body = crate::dtos::ErrorResponse),
        (status = 409, description = "Submission already in progress", body = crate::dtos::ErrorResponse),
        (status = 422, description = "Validation error", body = crate::dtos::ErrorResponse),
        (status = 502, description = "Identity provider unavailable", body = crate::dtos::ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(payload): ValidatedJson<SignInRequest>,
) -> Result<(CookieJar, Json<FlowResponse>), AppError> {
    let mut flow = SignInFlow::new(payload.email, Secret::new(payload.password));

    let Some(active) = flow.submit(state.identity.as_ref(), &state.submissions).await? else {
        return Ok((jar, Json(FlowResponse::sign_in())));
    };

    tracing::info!(session_id = %active.session_id, "User signed in");

    let access = &state.config.access;
    let jar = jar.add(cookie(&access.session_cookie, active.token, access.secure_cookies));
    Ok((jar, Json(FlowResponse::sign_in().redirect(AFTER_AUTH_PATH))))
}

#[utoipa::path(
    get,
    path = "/sign-up",
    responses(
        (status = 200, description = "Sign-up form at its current step", body = FlowResponse)
    ),
    tag = "Authentication"
)]
pub async fn sign_up_page(State(state): State<AppState>, jar: CookieJar) -> Json<FlowResponse> {
    let step = if jar.get(&state.config.access.sign_up_cookie).is_some() {
        FlowStep::Verify
    } else {
        FlowStep::Collect
    };
    Json(FlowResponse::sign_up(step))
}

#[utoipa::path(
    post,
    path = "/sign-up",
    request_body = SignUpRequest,
    responses(
        (status = 200, description = "Sign-up created; verification code sent", body = FlowResponse),
        (status = 400, description = "Rejected by the identity provider", body = crate::dtos::ErrorResponse),
        (status = 409, description = "Submission already in progress", body = crate::dtos::ErrorResponse),
        (status = 422, description = "Validation error", body = crate::dtos::ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn sign_up(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(payload): ValidatedJson<SignUpRequest>,
) -> Result<(CookieJar, Json<FlowResponse>), AppError> {
    let mut flow = SignUpFlow::collect(payload.username, payload.email, Secret::new(payload.password));
    flow.submit(state.identity.as_ref(), &state.submissions).await?;

    let sign_up_id = flow
        .sign_up_id()
        .ok_or_else(|| AppError::InternalError(anyhow::anyhow!("sign-up created without an id")))?
        .to_string();

    let access = &state.config.access;
    let jar = jar.add(cookie(&access.sign_up_cookie, sign_up_id, access.secure_cookies));
    Ok((jar, Json(FlowResponse::sign_up(flow.step()))))
}

#[utoipa::path(
    post,
    path = "/sign-up/verify",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Verified and signed in, or still awaiting the code", body = FlowResponse),
        (status = 400, description = "Wrong code, or no sign-up in progress", body = crate::dtos::ErrorResponse),
        (status = 409, description = "Submission already in progress", body = crate::dtos::ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn verify_sign_up(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(payload): ValidatedJson<VerifyRequest>,
) -> Result<(CookieJar, Json<FlowResponse>), AppError> {
    let access = &state.config.access;
    let sign_up_id = jar
        .get(&access.sign_up_cookie)
        .map(|c| c.value().to_string())
        .filter(|id| !id.is_empty());

    let mut flow = SignUpFlow::resume(sign_up_id, payload.code);
    let Some(active) = flow.verify(state.identity.as_ref(), &state.submissions).await? else {
        return Ok((jar, Json(FlowResponse::sign_up(flow.step()))));
    };

    tracing::info!(session_id = %active.session_id, "Sign-up complete, user signed in");

    let jar = jar
        .remove(removal(&access.sign_up_cookie))
        .add(cookie(&access.session_cookie, active.token, access.secure_cookies));
    Ok((jar, Json(FlowResponse::sign_up(flow.step()).redirect(AFTER_AUTH_PATH))))
}

/// Revoke the caller's session and clear the cookie. Works without a
/// session too, so a stale browser can always get back to a clean state.
#[utoipa::path(
    post,
    path = "/sign-out",
    responses(
        (status = 303, description = "Signed out; redirected to the landing page")
    ),
    tag = "Authentication"
)]
pub async fn sign_out(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> impl IntoResponse {
    let access = &state.config.access;

    if let Some(token) = session_token(&headers, &access.session_cookie) {
        match state.identity.resolve_session(&token).await {
            Ok(Some(session)) => {
                if let Some(session_id) = session.session_id.as_deref() {
                    if let Err(e) = state.identity.revoke_session(session_id).await {
                        tracing::warn!(error = %e, "Failed to revoke session at the provider");
                    } else {
                        tracing::info!(session_id = %session_id, "User signed out");
                    }
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Could not resolve session during sign-out"),
        }
    }

    (jar.remove(removal(&access.session_cookie)), Redirect::to("/"))
}
