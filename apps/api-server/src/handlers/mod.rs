//! HTTP handlers and route configuration.

pub mod auth;
mod comments;
mod health;
mod likes;
mod media;
mod posts;
mod profile;

use actix_web::web;

use crate::middleware::error::AppError;

/// Largest accepted JSON body.
const JSON_LIMIT: usize = 1024 * 1024;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(JSON_LIMIT)
            .error_handler(|err, _| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _| AppError::BadRequest(err.to_string()).into()),
    );

    cfg.route("/health", web::get().to(health::health_check))
        .route("/ready", web::get().to(health::readiness))
        .route("/media/{filename}", web::get().to(media::serve))
        // Fixed paths first so they are not taken for a provider name.
        .service(
            web::scope("/auth")
                .route("/me", web::get().to(auth::me))
                .route("/logout", web::post().to(auth::logout))
                .route("/{provider}", web::get().to(auth::login))
                .route("/{provider}/callback", web::get().to(auth::callback)),
        )
        .service(
            web::scope("/api/v1")
                .route("/profile", web::get().to(profile::get))
                // The blog itself is for signed-in readers
                .route("/posts", web::get().to(posts::list))
                .route("/posts/{slug}", web::get().to(posts::get))
                .route("/posts/{slug}/comments", web::get().to(comments::thread))
                .route("/posts/{slug}/comments", web::post().to(comments::create))
                .route("/posts/{id}/like", web::post().to(likes::toggle_post))
                .route("/posts/{id}/likes", web::get().to(likes::post_status))
                .route("/comments/{id}", web::put().to(comments::update))
                .route("/comments/{id}", web::delete().to(comments::delete))
                .route("/comments/{id}/like", web::post().to(likes::toggle_comment))
                .route("/comments/{id}/likes", web::get().to(likes::comment_status))
                // Admin routes
                .service(
                    web::scope("/admin")
                        .route("/profile", web::put().to(profile::update))
                        .route("/posts", web::post().to(posts::create))
                        .route("/posts/{id}", web::put().to(posts::update))
                        .route("/posts/{id}", web::delete().to(posts::delete))
                        .route("/upload", web::post().to(media::upload))
                        .route("/media", web::get().to(media::list))
                        .route("/media/{id}", web::delete().to(media::delete)),
                ),
        );
}
