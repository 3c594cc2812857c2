//! Site owner profile.

use actix_web::{HttpResponse, web};

use folio_core::domain::ProfileInput;
use folio_shared::ApiResponse;
use folio_shared::dto::ProfileResponse;

use crate::middleware::auth::AdminIdentity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// GET /api/v1/profile
pub async fn get(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let profile = state.services.profile.get().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(ProfileResponse::from(profile))))
}

/// PUT /api/v1/admin/profile
pub async fn update(
    state: web::Data<AppState>,
    AdminIdentity(admin): AdminIdentity,
    body: web::Json<ProfileInput>,
) -> AppResult<HttpResponse> {
    let profile = state.services.profile.update(body.into_inner()).await?;
    tracing::info!(admin_id = %admin.id, "Profile edited");
    Ok(HttpResponse::Ok().json(ApiResponse::ok(ProfileResponse::from(profile))))
}
