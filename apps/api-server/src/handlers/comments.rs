//! Comment thread handlers.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use folio_core::domain::CommentInput;
use folio_shared::ApiResponse;
use folio_shared::dto::{CommentResponse, CommentThreadResponse, UpdateCommentRequest};

use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// GET /api/v1/posts/{slug}/comments
pub async fn thread(
    state: web::Data<AppState>,
    viewer: Identity,
    slug: web::Path<String>,
) -> AppResult<HttpResponse> {
    let nodes = state
        .services
        .comments
        .thread_for_post(&slug, Some(&viewer.user))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(CommentThreadResponse::from(nodes))))
}

/// POST /api/v1/posts/{slug}/comments
pub async fn create(
    state: web::Data<AppState>,
    identity: Identity,
    slug: web::Path<String>,
    body: web::Json<CommentInput>,
) -> AppResult<HttpResponse> {
    let node = state
        .services
        .comments
        .create(&slug, &identity.user, body.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(CommentResponse::from(node))))
}

/// PUT /api/v1/comments/{id}
pub async fn update(
    state: web::Data<AppState>,
    identity: Identity,
    id: web::Path<Uuid>,
    body: web::Json<UpdateCommentRequest>,
) -> AppResult<HttpResponse> {
    let comment = state
        .services
        .comments
        .update(id.into_inner(), &identity.user, body.into_inner().into())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(CommentResponse::from(comment))))
}

/// DELETE /api/v1/comments/{id}
pub async fn delete(
    state: web::Data<AppState>,
    identity: Identity,
    id: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    state
        .services
        .comments
        .delete(id.into_inner(), &identity.user)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
