//! HTTP-level tests against in-memory state and a stub OAuth provider.

use std::collections::HashMap;
use std::sync::Arc;

use actix_web::cookie::Cookie;
use actix_web::http::{StatusCode, header};
use actix_web::{App, test, web};
use async_trait::async_trait;
use serde_json::{Value, json};
use tempfile::TempDir;

use api_server::config::AppConfig;
use api_server::handlers;
use api_server::handlers::auth::OAUTH_STATE_COOKIE;
use api_server::observability::RequestIdMiddleware;
use api_server::state::{AppState, Repositories};
use folio_core::domain::OAuthUserInfo;
use folio_core::ports::{AuthError, OAuthCallback, OAuthProvider};
use folio_infra::{InMemoryCache, LocalMediaStorage};

const ADMIN_EMAIL: &str = "admin@example.com";
const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

/// Accepts any code; the code doubles as the user's email.
struct StubProvider;

#[async_trait]
impl OAuthProvider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    fn authorization_url(&self, state: &str, _code_challenge: Option<&str>) -> String {
        format!("https://provider.test/authorize?state={state}")
    }

    async fn exchange(&self, callback: &OAuthCallback) -> Result<OAuthUserInfo, AuthError> {
        if callback.code == "bad" {
            return Err(AuthError::Exchange("invalid_grant".into()));
        }
        Ok(user_info(&callback.code))
    }
}

fn user_info(email: &str) -> OAuthUserInfo {
    OAuthUserInfo {
        provider: "stub".into(),
        provider_user_id: email.into(),
        email: Some(email.into()),
        name: Some(email.split('@').next().unwrap_or_default().into()),
        access_token: "provider-token".into(),
        ..Default::default()
    }
}

struct Harness {
    state: AppState,
    _uploads: TempDir,
}

async fn harness() -> Harness {
    let uploads = TempDir::new().unwrap();
    let vars: HashMap<&str, String> = HashMap::from([
        ("ADMIN_EMAILS", ADMIN_EMAIL.to_string()),
        ("MEDIA_UPLOAD_PATH", uploads.path().display().to_string()),
        ("MEDIA_BASE_URL", "http://api.test".to_string()),
        ("OAUTH_FRONTEND_URL", "http://frontend.test".to_string()),
        ("RATE_LIMIT_ENABLED", "false".to_string()),
    ]);
    let config = AppConfig::from_lookup(|key| vars.get(key).cloned());
    let storage = LocalMediaStorage::new(uploads.path()).await.unwrap();

    let state = AppState::assemble(
        config,
        Repositories::in_memory(),
        Arc::new(InMemoryCache::new()),
        Arc::new(storage),
        vec![Arc::new(StubProvider)],
        None,
    );
    Harness {
        state,
        _uploads: uploads,
    }
}

/// Open a session directly and return its bearer token.
async fn sign_in(state: &AppState, email: &str) -> String {
    let (_, session) = state
        .services
        .auth
        .login_with_oauth(user_info(email))
        .await
        .unwrap();
    session.token
}

fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {token}"))
}

macro_rules! init_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .wrap(RequestIdMiddleware)
                .app_data(web::Data::new($state.clone()))
                .configure(handlers::configure_routes),
        )
        .await
    };
}

fn post_body(title: &str, published: bool) -> Value {
    json!({
        "title": title,
        "content": "Long enough content for a post body.",
        "preview": "preview",
        "published": published,
    })
}

#[actix_rt::test]
async fn test_health_and_readiness() {
    let h = harness().await;
    let app = init_app!(h.state);

    let body: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/health").to_request())
            .await;
    assert_eq!(body["status"], "ok");

    let res = test::call_service(&app, test::TestRequest::get().uri("/ready").to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["checks"]["media_storage"], "ok");
}

#[actix_rt::test]
async fn test_oauth_login_flow() {
    let h = harness().await;
    let app = init_app!(h.state);

    let res = test::call_service(&app, test::TestRequest::get().uri("/auth/stub").to_request()).await;
    assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = res.headers().get(header::LOCATION).unwrap().to_str().unwrap().to_string();
    let nonce = location.split("state=").nth(1).unwrap().to_string();
    let state_cookie = res
        .response()
        .cookies()
        .find(|c| c.name() == OAUTH_STATE_COOKIE)
        .unwrap()
        .into_owned();

    let req = test::TestRequest::get()
        .uri(&format!("/auth/stub/callback?code={ADMIN_EMAIL}&state={nonce}"))
        .cookie(state_cookie)
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.headers().get(header::LOCATION).unwrap(), "http://frontend.test/blog");
    let session = res
        .response()
        .cookies()
        .find(|c| c.name() == "session_id")
        .unwrap()
        .into_owned();
    assert!(session.http_only().unwrap_or(false));

    let req = test::TestRequest::get()
        .uri("/auth/me")
        .cookie(Cookie::new("session_id", session.value().to_string()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["email"], ADMIN_EMAIL);
    assert_eq!(body["data"]["role"], "admin");

    let req = test::TestRequest::post()
        .uri("/auth/logout")
        .cookie(Cookie::new("session_id", session.value().to_string()))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/auth/me")
        .cookie(Cookie::new("session_id", session.value().to_string()))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn test_callback_rejects_forged_state() {
    let h = harness().await;
    let app = init_app!(h.state);

    let res = test::call_service(&app, test::TestRequest::get().uri("/auth/stub").to_request()).await;
    let state_cookie = res
        .response()
        .cookies()
        .find(|c| c.name() == OAUTH_STATE_COOKIE)
        .unwrap()
        .into_owned();

    let req = test::TestRequest::get()
        .uri("/auth/stub/callback?code=someone@example.com&state=forged")
        .cookie(state_cookie)
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri("/auth/stub/callback?code=x&state=y")
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn test_unknown_provider_is_not_found() {
    let h = harness().await;
    let app = init_app!(h.state);

    let res = test::call_service(&app, test::TestRequest::get().uri("/auth/myspace").to_request()).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_post_admin_lifecycle() {
    let h = harness().await;
    let admin = sign_in(&h.state, ADMIN_EMAIL).await;
    let reader = sign_in(&h.state, "reader@example.com").await;
    let app = init_app!(h.state);

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/posts")
        .insert_header(bearer(&reader))
        .set_json(post_body("Reader Post", true))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/posts")
        .insert_header(bearer(&admin))
        .set_json(post_body("Hello World", true))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(res).await;
    let slug = created["data"]["slug"].as_str().unwrap().to_string();
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/posts")
        .insert_header(bearer(&admin))
        .set_json(post_body("Secret Draft", false))
        .to_request();
    let draft: Value = test::call_and_read_body_json(&app, req).await;
    let draft_slug = draft["data"]["slug"].as_str().unwrap().to_string();

    let res = test::call_service(&app, test::TestRequest::get().uri("/api/v1/posts").to_request()).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/api/v1/posts")
        .insert_header(bearer(&reader))
        .to_request();
    let list: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(list["data"]["total_count"], 1);
    assert_eq!(list["data"]["posts"][0]["slug"], slug.as_str());

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/posts/{slug}"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/posts/{draft_slug}"))
        .insert_header(bearer(&reader))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/posts/{draft_slug}"))
        .insert_header(bearer(&admin))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/admin/posts/{id}"))
        .insert_header(bearer(&admin))
        .set_json(post_body("Hello Again", true))
        .to_request();
    let updated: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(updated["data"]["title"], "Hello Again");

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/admin/posts/{id}"))
        .insert_header(bearer(&admin))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
}

#[actix_rt::test]
async fn test_listing_far_past_the_last_page_is_empty() {
    let h = harness().await;
    let reader = sign_in(&h.state, "reader@example.com").await;
    let app = init_app!(h.state);

    let req = test::TestRequest::get()
        .uri("/api/v1/posts?page=18446744073709551615&limit=100")
        .insert_header(bearer(&reader))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["data"]["posts"], json!([]));
}

#[actix_rt::test]
async fn test_invalid_post_reports_every_field() {
    let h = harness().await;
    let admin = sign_in(&h.state, ADMIN_EMAIL).await;
    let app = init_app!(h.state);

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/posts")
        .insert_header(bearer(&admin))
        .insert_header(("X-Request-ID", "req-42"))
        .set_json(json!({"title": "x", "content": "short"}))
        .to_request();
    let res = test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(res.headers().get("x-request-id").unwrap(), "req-42");
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["request_id"], "req-42");
    assert!(body["detail"].as_str().unwrap().contains("title"));
}

#[actix_rt::test]
async fn test_comment_thread_and_likes() {
    let h = harness().await;
    let admin = sign_in(&h.state, ADMIN_EMAIL).await;
    let reader = sign_in(&h.state, "reader@example.com").await;
    let app = init_app!(h.state);

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/posts")
        .insert_header(bearer(&admin))
        .set_json(post_body("Threads", true))
        .to_request();
    let post: Value = test::call_and_read_body_json(&app, req).await;
    let slug = post["data"]["slug"].as_str().unwrap().to_string();
    let post_id = post["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/posts/{slug}/comments"))
        .set_json(json!({"content": "anonymous"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/posts/{slug}/comments"))
        .insert_header(bearer(&reader))
        .set_json(json!({"content": "First!"}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let root: Value = test::read_body_json(res).await;
    let root_id = root["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/posts/{slug}/comments"))
        .insert_header(bearer(&admin))
        .set_json(json!({"content": "Thanks", "parent_id": root_id}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/comments/{root_id}/like"))
        .insert_header(bearer(&admin))
        .to_request();
    let like: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(like["data"], json!({"is_liked": true, "likes_count": 1}));

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/posts/{post_id}/like"))
        .insert_header(bearer(&reader))
        .to_request();
    let like: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(like["data"]["likes_count"], 1);

    let status: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/posts/{post_id}/likes"))
            .to_request(),
    )
    .await;
    assert_eq!(status["data"], json!({"is_liked": false, "likes_count": 1}));

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/comments/{root_id}"))
        .insert_header(bearer(&admin))
        .set_json(json!({"content": "hijacked"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/comments/{root_id}"))
        .insert_header(bearer(&reader))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/posts/{slug}/comments"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/posts/{slug}/comments"))
        .insert_header(bearer(&reader))
        .to_request();
    let thread: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(thread["data"]["total"], 2);
    let root = &thread["data"]["comments"][0];
    assert_eq!(root["content"], "");
    assert!(!root["deleted_at"].is_null());
    assert_eq!(root["replies"][0]["content"], "Thanks");
}

#[actix_rt::test]
async fn test_profile_write_through() {
    let h = harness().await;
    let admin = sign_in(&h.state, ADMIN_EMAIL).await;
    let app = init_app!(h.state);

    let res = test::call_service(&app, test::TestRequest::get().uri("/api/v1/profile").to_request()).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    for name in ["Jane Doe", "Jane Q. Doe"] {
        let req = test::TestRequest::put()
            .uri("/api/v1/admin/profile")
            .insert_header(bearer(&admin))
            .set_json(json!({"name": name, "description": "Engineer", "activity": "Writing"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let profile: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/v1/profile").to_request(),
        )
        .await;
        assert_eq!(profile["data"]["name"], name);
    }
}

#[actix_rt::test]
async fn test_media_upload_serve_delete() {
    let h = harness().await;
    let admin = sign_in(&h.state, ADMIN_EMAIL).await;
    let app = init_app!(h.state);

    let boundary = "folio-boundary";
    let mut payload = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"photo.png\"\r\nContent-Type: image/png\r\n\r\n"
    )
    .into_bytes();
    payload.extend_from_slice(PNG);
    payload.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/upload")
        .insert_header(bearer(&admin))
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        ))
        .set_payload(payload)
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let media: Value = test::read_body_json(res).await;
    let filename = media["data"]["filename"].as_str().unwrap().to_string();
    let id = media["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(
        media["data"]["url"],
        format!("http://api.test/media/{filename}").as_str()
    );

    let res = test::call_service(
        &app,
        test::TestRequest::get().uri(&format!("/media/{filename}")).to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers().get(header::CONTENT_TYPE).unwrap(), "image/png");
    assert_eq!(test::read_body(res).await.as_ref(), PNG);

    let req = test::TestRequest::get()
        .uri("/api/v1/admin/media")
        .insert_header(bearer(&admin))
        .to_request();
    let list: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(list["data"].as_array().unwrap().len(), 1);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/admin/media/{id}"))
        .insert_header(bearer(&admin))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

    let res = test::call_service(
        &app,
        test::TestRequest::get().uri(&format!("/media/{filename}")).to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_upload_without_file_field_is_rejected() {
    let h = harness().await;
    let admin = sign_in(&h.state, ADMIN_EMAIL).await;
    let app = init_app!(h.state);

    let boundary = "b";
    let payload = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nvalue\r\n--{boundary}--\r\n"
    );
    let req = test::TestRequest::post()
        .uri("/api/v1/admin/upload")
        .insert_header(bearer(&admin))
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        ))
        .set_payload(payload)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}
