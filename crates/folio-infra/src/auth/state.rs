//! Signed OAuth `state`, carried in a short-lived cookie between the login
//! redirect and the provider callback.

use chrono::{TimeDelta, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use folio_core::ports::AuthError;

const DEFAULT_TTL_MINUTES: i64 = 10;

#[derive(Debug, Serialize, Deserialize)]
struct StateClaims {
    provider: String,
    nonce: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    verifier: Option<String>,
    exp: i64,
}

/// A login attempt: `nonce` goes to the provider as `state`, `token` goes
/// into the cookie.
#[derive(Debug, Clone)]
pub struct IssuedState {
    pub nonce: String,
    pub token: String,
}

pub struct OAuthStateCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: TimeDelta,
}

impl OAuthStateCodec {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl: TimeDelta::minutes(DEFAULT_TTL_MINUTES),
        }
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    pub fn issue(&self, provider: &str, verifier: Option<String>) -> Result<IssuedState, AuthError> {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        let nonce = hex::encode(bytes);

        let claims = StateClaims {
            provider: provider.to_string(),
            nonce: nonce.clone(),
            verifier,
            exp: (Utc::now() + self.ttl).timestamp(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::InvalidState(e.to_string()))?;

        Ok(IssuedState { nonce, token })
    }

    /// Check the cookie token against the callback's `state` parameter.
    /// Returns the PKCE verifier stored at login, if any.
    pub fn verify(
        &self,
        token: &str,
        provider: &str,
        state: &str,
    ) -> Result<Option<String>, AuthError> {
        let data = decode::<StateClaims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AuthError::InvalidState("login attempt expired".into())
                }
                _ => AuthError::InvalidState(e.to_string()),
            })?;

        let claims = data.claims;
        if claims.provider != provider {
            return Err(AuthError::InvalidState("provider mismatch".into()));
        }
        if claims.nonce != state {
            return Err(AuthError::InvalidState("state mismatch".into()));
        }
        Ok(claims.verifier)
    }
}
