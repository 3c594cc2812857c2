//! OAuth 2 clients for Google, GitHub and VK ID.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use folio_core::domain::OAuthUserInfo;
use folio_core::ports::{AuthError, OAuthCallback, OAuthProvider};

const USER_AGENT_VALUE: &str = concat!("folio-backend/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Google,
    GitHub,
    Vk,
}

impl ProviderKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::GitHub => "github",
            Self::Vk => "vk",
        }
    }

    fn scopes(&self) -> &'static str {
        match self {
            Self::Google => "openid email profile",
            Self::GitHub => "user:email",
            Self::Vk => "email vkid.personal_info",
        }
    }
}

/// Application credentials registered with a provider.
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
    /// Absolute callback URL, e.g. `https://example.com/auth/github/callback`.
    pub redirect_url: String,
}

#[derive(Debug, Clone)]
pub struct OAuthEndpoints {
    pub authorize: String,
    pub token: String,
    pub user_info: String,
    /// GitHub only: list of the user's addresses, used when the profile
    /// hides the email.
    pub emails: Option<String>,
}

impl OAuthEndpoints {
    pub fn defaults(kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::Google => Self {
                authorize: "https://accounts.google.com/o/oauth2/v2/auth".into(),
                token: "https://oauth2.googleapis.com/token".into(),
                user_info: "https://www.googleapis.com/oauth2/v2/userinfo".into(),
                emails: None,
            },
            ProviderKind::GitHub => Self {
                authorize: "https://github.com/login/oauth/authorize".into(),
                token: "https://github.com/login/oauth/access_token".into(),
                user_info: "https://api.github.com/user".into(),
                emails: Some("https://api.github.com/user/emails".into()),
            },
            ProviderKind::Vk => Self {
                authorize: "https://id.vk.ru/authorize".into(),
                token: "https://id.vk.com/oauth2/auth".into(),
                user_info: "https://id.vk.ru/oauth2/user_info".into(),
                emails: None,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    /// VK ID may put the email straight into the token response.
    email: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleUser {
    id: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    id: i64,
    login: String,
    name: Option<String>,
    email: Option<String>,
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

#[derive(Debug, Deserialize)]
struct VkUserEnvelope {
    user: VkUser,
}

#[derive(Debug, Deserialize)]
struct VkUser {
    user_id: Value,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    avatar: Option<String>,
    email: Option<String>,
}

/// Authorization-code client for one provider.
pub struct OAuthClient {
    kind: ProviderKind,
    credentials: OAuthCredentials,
    authorize_url: Url,
    endpoints: OAuthEndpoints,
    http: reqwest::Client,
}

impl OAuthClient {
    pub fn new(kind: ProviderKind, credentials: OAuthCredentials) -> Result<Self, AuthError> {
        Self::with_endpoints(kind, credentials, OAuthEndpoints::defaults(kind))
    }

    pub fn with_endpoints(
        kind: ProviderKind,
        credentials: OAuthCredentials,
        endpoints: OAuthEndpoints,
    ) -> Result<Self, AuthError> {
        let authorize_url = Url::parse(&endpoints.authorize)
            .map_err(|e| AuthError::Exchange(format!("invalid authorize endpoint: {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .default_headers(headers)
            .build()
            .map_err(|e| AuthError::Exchange(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            kind,
            credentials,
            authorize_url,
            endpoints,
            http,
        })
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn request_token(&self, callback: &OAuthCallback) -> Result<TokenResponse, AuthError> {
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", callback.code.as_str()),
            ("redirect_uri", self.credentials.redirect_url.as_str()),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
        ];
        if let Some(verifier) = callback.code_verifier.as_deref() {
            form.push(("code_verifier", verifier));
        }
        if let Some(device_id) = callback.device_id.as_deref() {
            form.push(("device_id", device_id));
        }

        let response = self
            .http
            .post(&self.endpoints.token)
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::Exchange(format!("token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Exchange(format!(
                "token endpoint returned HTTP {status}: {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Exchange(format!("failed to parse token response: {e}")))?;

        if let Some(error) = &token.error {
            let detail = token.error_description.as_deref().unwrap_or_default();
            return Err(AuthError::Exchange(format!("{error} {detail}").trim().to_string()));
        }
        Ok(token)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<T, AuthError> {
        let mut request = self.http.get(url).bearer_auth(access_token);
        if self.kind == ProviderKind::Vk {
            request = request.query(&[("client_id", self.credentials.client_id.as_str())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AuthError::Profile(format!("profile request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Profile(format!(
                "{} responded with HTTP {status}",
                self.kind.name()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::Profile(format!("failed to parse profile: {e}")))
    }

    async fn google_user(&self, access_token: &str) -> Result<OAuthUserInfo, AuthError> {
        let user: GoogleUser = self.get_json(&self.endpoints.user_info, access_token).await?;
        Ok(OAuthUserInfo {
            provider_user_id: user.id,
            email: user.email,
            name: user.name,
            avatar_url: user.picture,
            ..Default::default()
        })
    }

    async fn github_user(&self, access_token: &str) -> Result<OAuthUserInfo, AuthError> {
        let user: GitHubUser = self.get_json(&self.endpoints.user_info, access_token).await?;

        let email = match (user.email.filter(|e| !e.is_empty()), &self.endpoints.emails) {
            (Some(email), _) => Some(email),
            (None, Some(url)) => {
                let emails: Vec<GitHubEmail> = self.get_json(url, access_token).await?;
                emails
                    .into_iter()
                    .find(|e| e.primary && e.verified)
                    .map(|e| e.email)
            }
            (None, None) => None,
        };

        Ok(OAuthUserInfo {
            provider_user_id: user.id.to_string(),
            email,
            name: user.name.or(Some(user.login)),
            avatar_url: user.avatar_url,
            ..Default::default()
        })
    }

    async fn vk_user(&self, access_token: &str) -> Result<OAuthUserInfo, AuthError> {
        let envelope: VkUserEnvelope =
            self.get_json(&self.endpoints.user_info, access_token).await?;
        let user = envelope.user;

        let provider_user_id = match user.user_id {
            Value::String(id) => id,
            Value::Number(id) => id.to_string(),
            other => {
                return Err(AuthError::Profile(format!("unexpected vk user_id: {other}")));
            }
        };
        let name = format!("{} {}", user.first_name, user.last_name)
            .trim()
            .to_string();

        Ok(OAuthUserInfo {
            provider_user_id,
            email: user.email.filter(|e| !e.is_empty()),
            name: (!name.is_empty()).then_some(name),
            avatar_url: user.avatar.filter(|a| !a.is_empty()),
            ..Default::default()
        })
    }
}

#[async_trait]
impl OAuthProvider for OAuthClient {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn uses_pkce(&self) -> bool {
        self.kind == ProviderKind::Vk
    }

    fn authorization_url(&self, state: &str, code_challenge: Option<&str>) -> String {
        let mut url = self.authorize_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.credentials.client_id)
                .append_pair("redirect_uri", &self.credentials.redirect_url)
                .append_pair("scope", self.kind.scopes())
                .append_pair("state", state);
            if let Some(challenge) = code_challenge {
                query
                    .append_pair("code_challenge", challenge)
                    .append_pair("code_challenge_method", "S256");
            }
        }
        url.into()
    }

    async fn exchange(&self, callback: &OAuthCallback) -> Result<OAuthUserInfo, AuthError> {
        let token = self.request_token(callback).await?;
        let access_token = token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::Exchange("no access token in response".into()))?;

        let mut info = match self.kind {
            ProviderKind::Google => self.google_user(&access_token).await?,
            ProviderKind::GitHub => self.github_user(&access_token).await?,
            ProviderKind::Vk => self.vk_user(&access_token).await?,
        };

        info.provider = self.kind.name().to_string();
        if info.email.is_none() {
            info.email = token.email.filter(|e| !e.is_empty());
        }
        info.access_token = access_token;
        info.refresh_token = token.refresh_token;
        info.expires_at = token
            .expires_in
            .filter(|secs| *secs > 0)
            .map(|secs| Utc::now() + TimeDelta::seconds(secs));

        tracing::debug!(
            provider = %info.provider,
            provider_user_id = %info.provider_user_id,
            has_email = info.email.is_some(),
            "OAuth exchange completed"
        );
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> OAuthCredentials {
        OAuthCredentials {
            client_id: "client-id".into(),
            client_secret: "client-secret".into(),
            redirect_url: "http://localhost:8080/auth/test/callback".into(),
        }
    }

    fn endpoints(server: &MockServer) -> OAuthEndpoints {
        OAuthEndpoints {
            authorize: format!("{}/authorize", server.uri()),
            token: format!("{}/token", server.uri()),
            user_info: format!("{}/user", server.uri()),
            emails: Some(format!("{}/user/emails", server.uri())),
        }
    }

    #[test]
    fn test_authorization_url_includes_pkce_challenge() {
        let client = OAuthClient::new(ProviderKind::Vk, credentials()).unwrap();
        let url = Url::parse(&client.authorization_url("nonce", Some("challenge"))).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("id.vk.ru"));
        assert!(pairs.contains(&("state".into(), "nonce".into())));
        assert!(pairs.contains(&("code_challenge".into(), "challenge".into())));
        assert!(pairs.contains(&("code_challenge_method".into(), "S256".into())));
        assert!(client.uses_pkce());
    }

    #[test]
    fn test_authorization_url_without_challenge() {
        let client = OAuthClient::new(ProviderKind::GitHub, credentials()).unwrap();
        let url = client.authorization_url("nonce", None);

        assert!(url.starts_with("https://github.com/login/oauth/authorize?"));
        assert!(url.contains("scope=user%3Aemail"));
        assert!(!url.contains("code_challenge"));
    }

    #[tokio::test]
    async fn test_google_exchange() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("code=auth-code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "google-token",
                "expires_in": 3600,
                "token_type": "Bearer"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .and(header("authorization", "Bearer google-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "1234",
                "email": "jane@example.com",
                "name": "Jane Doe",
                "picture": "https://example.com/jane.png"
            })))
            .mount(&server)
            .await;

        let client =
            OAuthClient::with_endpoints(ProviderKind::Google, credentials(), endpoints(&server))
                .unwrap();
        let info = client
            .exchange(&OAuthCallback {
                code: "auth-code".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(info.provider, "google");
        assert_eq!(info.provider_user_id, "1234");
        assert_eq!(info.email.as_deref(), Some("jane@example.com"));
        assert_eq!(info.access_token, "google-token");
        assert!(info.expires_at.is_some());
    }

    #[tokio::test]
    async fn test_github_falls_back_to_primary_verified_email() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "gh-token",
                "token_type": "bearer"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 42,
                "login": "octocat",
                "name": null,
                "email": null,
                "avatar_url": "https://avatars.example.com/42"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user/emails"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"email": "old@example.com", "primary": false, "verified": true},
                {"email": "octo@example.com", "primary": true, "verified": true}
            ])))
            .mount(&server)
            .await;

        let client =
            OAuthClient::with_endpoints(ProviderKind::GitHub, credentials(), endpoints(&server))
                .unwrap();
        let info = client
            .exchange(&OAuthCallback {
                code: "code".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(info.provider_user_id, "42");
        assert_eq!(info.name.as_deref(), Some("octocat"));
        assert_eq!(info.email.as_deref(), Some("octo@example.com"));
        assert!(info.expires_at.is_none());
    }

    #[tokio::test]
    async fn test_github_error_payload_is_an_exchange_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": "bad_verification_code",
                "error_description": "The code passed is incorrect or expired."
            })))
            .mount(&server)
            .await;

        let client =
            OAuthClient::with_endpoints(ProviderKind::GitHub, credentials(), endpoints(&server))
                .unwrap();
        let result = client
            .exchange(&OAuthCallback {
                code: "stale".into(),
                ..Default::default()
            })
            .await;

        assert!(matches!(result, Err(AuthError::Exchange(msg)) if msg.contains("bad_verification_code")));
    }

    #[tokio::test]
    async fn test_vk_exchange_sends_verifier_and_device_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("code_verifier=the-verifier"))
            .and(body_string_contains("device_id=device-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "vk-token",
                "refresh_token": "vk-refresh",
                "expires_in": 3600,
                "user_id": 777,
                "email": "ivan@example.ru"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .and(query_param("client_id", "client-id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "user": {
                    "user_id": "777",
                    "first_name": "Ivan",
                    "last_name": "Petrov",
                    "avatar": "https://vk.example/a.jpg"
                }
            })))
            .mount(&server)
            .await;

        let client =
            OAuthClient::with_endpoints(ProviderKind::Vk, credentials(), endpoints(&server))
                .unwrap();
        let info = client
            .exchange(&OAuthCallback {
                code: "vk-code".into(),
                code_verifier: Some("the-verifier".into()),
                device_id: Some("device-1".into()),
            })
            .await
            .unwrap();

        assert_eq!(info.provider, "vk");
        assert_eq!(info.provider_user_id, "777");
        assert_eq!(info.name.as_deref(), Some("Ivan Petrov"));
        assert_eq!(info.email.as_deref(), Some("ivan@example.ru"));
        assert_eq!(info.refresh_token.as_deref(), Some("vk-refresh"));
    }

    #[tokio::test]
    async fn test_profile_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "token"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client =
            OAuthClient::with_endpoints(ProviderKind::Google, credentials(), endpoints(&server))
                .unwrap();
        let result = client
            .exchange(&OAuthCallback {
                code: "code".into(),
                ..Default::default()
            })
            .await;

        assert!(matches!(result, Err(AuthError::Profile(_))));
    }
}
