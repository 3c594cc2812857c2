//! Authentication extractors.
//!
//! The session token comes from the session cookie or, for API clients,
//! an `Authorization: Bearer <token>` header.

use actix_web::{FromRequest, HttpRequest, dev::Payload, http::header, web};
use futures::future::LocalBoxFuture;

use folio_core::domain::User;
use folio_core::ports::AuthError;

use crate::middleware::error::AppError;
use crate::state::AppState;

/// Authenticated user identity extractor.
///
/// Use this in handlers to require authentication:
/// ```ignore
/// async fn protected_route(identity: Identity) -> impl Responder {
///     format!("Hello, {}!", identity.user.name)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Identity {
    pub user: User,
    pub token: String,
}

/// Like [`Identity`], but the user must be an admin.
#[derive(Debug, Clone)]
pub struct AdminIdentity(pub User);

/// Optional identity extractor - doesn't fail if not authenticated.
#[derive(Debug, Clone)]
pub struct OptionalIdentity(pub Option<User>);

impl OptionalIdentity {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }
}

/// Read the session token from the request, cookie first.
pub fn session_token(req: &HttpRequest, cookie_name: &str) -> Option<String> {
    if let Some(cookie) = req.cookie(cookie_name) {
        let value = cookie.value().trim();
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }

    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Resolve the request's session, `Ok(None)` when there is none or it
/// is no longer valid.
async fn resolve(state: Option<web::Data<AppState>>, token: Option<String>) -> Result<Option<Identity>, AppError> {
    let state = state.ok_or_else(|| AppError::Internal("AppState not found in app data".into()))?;
    let Some(token) = token else {
        return Ok(None);
    };
    let user = state.services.auth.validate_session(&token).await?;
    Ok(user.map(|user| Identity { user, token }))
}

fn parts(req: &HttpRequest) -> (Option<web::Data<AppState>>, Option<String>) {
    let state = req.app_data::<web::Data<AppState>>().cloned();
    let token = state
        .as_ref()
        .and_then(|s| session_token(req, &s.config.session.cookie_name));
    (state, token)
}

impl FromRequest for Identity {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let (state, token) = parts(req);
        Box::pin(async move {
            resolve(state, token)
                .await?
                .ok_or(AppError::from(AuthError::MissingSession))
        })
    }
}

impl FromRequest for AdminIdentity {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let (state, token) = parts(req);
        Box::pin(async move {
            let identity = resolve(state, token)
                .await?
                .ok_or(AppError::from(AuthError::MissingSession))?;
            if !identity.user.is_admin() {
                tracing::warn!(user_id = %identity.user.id, "Admin route refused");
                return Err(AppError::from(AuthError::InsufficientPermissions));
            }
            Ok::<_, AppError>(AdminIdentity(identity.user))
        })
    }
}

impl FromRequest for OptionalIdentity {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let (state, token) = parts(req);
        Box::pin(async move {
            let identity = resolve(state, token).await?;
            Ok::<_, AppError>(OptionalIdentity(identity.map(|i| i.user)))
        })
    }
}
