//! Media uploads and file serving.

use actix_multipart::Multipart;
use actix_web::{HttpResponse, http::header, web};
use futures::TryStreamExt;
use uuid::Uuid;

use folio_shared::ApiResponse;
use folio_shared::dto::MediaResponse;

use crate::middleware::auth::AdminIdentity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// Form field holding the upload.
const FILE_FIELD: &str = "file";

/// POST /api/v1/admin/upload
pub async fn upload(
    state: web::Data<AppState>,
    AdminIdentity(admin): AdminIdentity,
    mut payload: Multipart,
) -> AppResult<HttpResponse> {
    let media = &state.services.media;
    let max_bytes = media.max_bytes();

    while let Some(mut field) = payload.try_next().await.map_err(bad_multipart)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let original_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string)
            .ok_or_else(|| AppError::BadRequest("upload has no file name".into()))?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(bad_multipart)? {
            if bytes.len() + chunk.len() > max_bytes {
                return Err(AppError::BadRequest(format!(
                    "file exceeds the {} byte limit",
                    max_bytes
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        let file = media.upload(&admin, &original_name, &bytes).await?;
        let url = media.public_url(&file);
        return Ok(HttpResponse::Created().json(ApiResponse::ok(MediaResponse::new(file, url))));
    }

    Err(AppError::BadRequest(format!(
        "multipart field '{}' is required",
        FILE_FIELD
    )))
}

/// GET /api/v1/admin/media
pub async fn list(
    state: web::Data<AppState>,
    AdminIdentity(admin): AdminIdentity,
) -> AppResult<HttpResponse> {
    let media = &state.services.media;
    let files: Vec<MediaResponse> = media
        .list_for(admin.id)
        .await?
        .into_iter()
        .map(|file| {
            let url = media.public_url(&file);
            MediaResponse::new(file, url)
        })
        .collect();
    Ok(HttpResponse::Ok().json(ApiResponse::ok(files)))
}

/// DELETE /api/v1/admin/media/{id}
pub async fn delete(
    state: web::Data<AppState>,
    AdminIdentity(admin): AdminIdentity,
    id: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    state.services.media.delete(id.into_inner(), &admin).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /media/{filename}
pub async fn serve(
    state: web::Data<AppState>,
    filename: web::Path<String>,
) -> AppResult<HttpResponse> {
    let (bytes, mime) = state.services.media.read(&filename).await?;
    Ok(HttpResponse::Ok()
        .content_type(mime)
        .insert_header((header::CACHE_CONTROL, "public, max-age=86400"))
        .insert_header(("X-Content-Type-Options", "nosniff"))
        .body(bytes))
}

fn bad_multipart(err: actix_multipart::MultipartError) -> AppError {
    AppError::BadRequest(format!("invalid multipart body: {}", err))
}
