//! OAuth login flow and session handlers.

use actix_web::cookie::{Cookie, SameSite, time};
use actix_web::{HttpRequest, HttpResponse, http::header, web};
use serde::Deserialize;

use folio_core::ports::{AuthError, OAuthCallback};
use folio_infra::auth::pkce;
use folio_shared::ApiResponse;
use folio_shared::dto::UserResponse;

use crate::middleware::auth::{Identity, session_token};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// Cookie carrying the signed state of an in-flight login.
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";

/// Query string of the provider redirect.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub device_id: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// GET /auth/{provider}
pub async fn login(
    state: web::Data<AppState>,
    provider: web::Path<String>,
) -> AppResult<HttpResponse> {
    let name = provider.into_inner();
    let provider = state
        .provider(&name)
        .ok_or_else(|| AuthError::UnknownProvider(name.clone()))?;

    let verifier = provider.uses_pkce().then(pkce::code_verifier);
    let challenge = verifier.as_deref().map(pkce::code_challenge);
    let issued = state.oauth_state.issue(provider.name(), verifier)?;
    let auth_url = provider.authorization_url(&issued.nonce, challenge.as_deref());

    let cookie = Cookie::build(OAUTH_STATE_COOKIE, issued.token)
        .path("/auth")
        .http_only(true)
        .secure(state.config.session.cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(state.oauth_state.ttl().num_seconds()))
        .finish();

    tracing::info!(provider = %name, pkce = challenge.is_some(), "Redirecting to OAuth provider");
    Ok(HttpResponse::TemporaryRedirect()
        .insert_header((header::LOCATION, auth_url))
        .cookie(cookie)
        .finish())
}

/// GET /auth/{provider}/callback
pub async fn callback(
    req: HttpRequest,
    state: web::Data<AppState>,
    provider: web::Path<String>,
    params: web::Query<CallbackParams>,
) -> AppResult<HttpResponse> {
    let name = provider.into_inner();
    let params = params.into_inner();
    let provider = state
        .provider(&name)
        .ok_or_else(|| AuthError::UnknownProvider(name.clone()))?;

    if let Some(error) = params.error {
        tracing::warn!(provider = %name, error = %error, "Provider refused the login");
        return Err(AppError::BadRequest(
            params.error_description.unwrap_or(error),
        ));
    }

    let state_cookie = req
        .cookie(OAUTH_STATE_COOKIE)
        .ok_or_else(|| AuthError::InvalidState("login was not started here".into()))?;
    let returned_state = params
        .state
        .ok_or_else(|| AuthError::InvalidState("missing state".into()))?;
    let code_verifier =
        state
            .oauth_state
            .verify(state_cookie.value(), provider.name(), &returned_state)?;

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("missing authorization code".into()))?;

    let info = provider
        .exchange(&OAuthCallback {
            code,
            code_verifier,
            device_id: params.device_id,
        })
        .await?;
    let (user, session) = state.services.auth.login_with_oauth(info).await?;

    let redirect = format!("{}/blog", state.config.oauth.frontend_url);
    tracing::info!(provider = %name, user_id = %user.id, "Login complete");

    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, redirect))
        .cookie(session_cookie(&state, session.token))
        .cookie(expired(OAUTH_STATE_COOKIE, "/auth"))
        .finish())
}

/// GET /auth/me
pub async fn me(identity: Identity) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::ok(UserResponse::from(&identity.user)))
}

/// POST /auth/logout
///
/// Always clears the cookie, even when the session is already gone.
pub async fn logout(req: HttpRequest, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    if let Some(token) = session_token(&req, &state.config.session.cookie_name) {
        state.services.auth.logout(&token).await?;
    }

    let mut cookie = expired(&state.config.session.cookie_name, "/");
    if let Some(domain) = &state.config.session.cookie_domain {
        cookie.set_domain(domain.clone());
    }
    Ok(HttpResponse::Ok()
        .cookie(cookie)
        .json(ApiResponse::ok_with_message((), "logged out")))
}

fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    let settings = &state.config.session;
    let mut cookie = Cookie::build(settings.cookie_name.clone(), token)
        .path("/")
        .http_only(true)
        .secure(settings.cookie_secure)
        .same_site(settings.same_site)
        .max_age(time::Duration::seconds(
            state.services.auth.session_ttl().num_seconds(),
        ))
        .finish();
    if let Some(domain) = &settings.cookie_domain {
        cookie.set_domain(domain.clone());
    }
    cookie
}

fn expired(name: &str, path: &str) -> Cookie<'static> {
    let mut cookie = Cookie::build(name.to_string(), "")
        .path(path.to_string())
        .http_only(true)
        .finish();
    cookie.make_removal();
    cookie
}
