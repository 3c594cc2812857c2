//! Like toggles for posts and comments.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use folio_core::domain::LikeTarget;
use folio_shared::ApiResponse;
use folio_shared::dto::LikeResponse;

use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::AppResult;
use crate::state::AppState;

async fn toggle(state: &AppState, identity: &Identity, target: LikeTarget) -> AppResult<HttpResponse> {
    let status = state.services.likes.toggle(&identity.user, target).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(LikeResponse::from(status))))
}

async fn status(state: &AppState, viewer: &OptionalIdentity, target: LikeTarget) -> AppResult<HttpResponse> {
    let status = state.services.likes.status(target, viewer.user()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(LikeResponse::from(status))))
}

/// POST /api/v1/posts/{id}/like
pub async fn toggle_post(
    state: web::Data<AppState>,
    identity: Identity,
    id: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    toggle(&state, &identity, LikeTarget::Post(id.into_inner())).await
}

/// GET /api/v1/posts/{id}/likes
pub async fn post_status(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    id: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    status(&state, &viewer, LikeTarget::Post(id.into_inner())).await
}

/// POST /api/v1/comments/{id}/like
pub async fn toggle_comment(
    state: web::Data<AppState>,
    identity: Identity,
    id: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    toggle(&state, &identity, LikeTarget::Comment(id.into_inner())).await
}

/// GET /api/v1/comments/{id}/likes
pub async fn comment_status(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    id: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    status(&state, &viewer, LikeTarget::Comment(id.into_inner())).await
}
