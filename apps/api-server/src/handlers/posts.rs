//! Blog post handlers.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use folio_core::domain::PostInput;
use folio_shared::ApiResponse;
use folio_shared::dto::{ListPostsParams, PostListResponse, PostResponse};

use crate::middleware::auth::{AdminIdentity, Identity};
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// GET /api/v1/posts
pub async fn list(
    state: web::Data<AppState>,
    viewer: Identity,
    params: web::Query<ListPostsParams>,
) -> AppResult<HttpResponse> {
    let page = state
        .services
        .posts
        .list(params.into_inner().into(), Some(&viewer.user))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(PostListResponse::from(page))))
}

/// GET /api/v1/posts/{slug}
pub async fn get(
    state: web::Data<AppState>,
    viewer: Identity,
    slug: web::Path<String>,
) -> AppResult<HttpResponse> {
    let view = state.services.posts.get_by_slug(&slug, Some(&viewer.user)).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(PostResponse::from(view))))
}

/// POST /api/v1/admin/posts
pub async fn create(
    state: web::Data<AppState>,
    AdminIdentity(admin): AdminIdentity,
    body: web::Json<PostInput>,
) -> AppResult<HttpResponse> {
    let post = state.services.posts.create(&admin, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(PostResponse::from(post))))
}

/// PUT /api/v1/admin/posts/{id}
pub async fn update(
    state: web::Data<AppState>,
    AdminIdentity(admin): AdminIdentity,
    id: web::Path<Uuid>,
    body: web::Json<PostInput>,
) -> AppResult<HttpResponse> {
    let post = state
        .services
        .posts
        .update(id.into_inner(), &admin, body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(PostResponse::from(post))))
}

/// DELETE /api/v1/admin/posts/{id}
pub async fn delete(
    state: web::Data<AppState>,
    AdminIdentity(admin): AdminIdentity,
    id: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    state.services.posts.delete(id.into_inner(), &admin).await?;
    Ok(HttpResponse::NoContent().finish())
}
