pub mod keys;

pub use keys::{JwksKeys, KeyProvider, SharedSecret};

use std::sync::Arc;

use axum::http::HeaderMap;
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, decode_header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AppConfig;

/// Claims we read from an identity-provider ID token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtUser {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "cognito:username", default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub exp: i64,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing authentication cookie")]
    MissingToken,

    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Token header has no key id")]
    MissingKeyId,

    #[error("Unknown signing key: {0}")]
    UnknownKey(String),

    #[error("Unexpected signing algorithm: {0:?}")]
    UnexpectedAlgorithm(jsonwebtoken::Algorithm),

    #[error("Failed to fetch signing keys: {0}")]
    KeyFetch(String),

    #[error("Invalid token: {0}")]
    Invalid(String),
}

/// Verifies cookie-borne ID tokens against the configured key source.
#[derive(Clone)]
pub struct Verifier {
    keys: Arc<dyn KeyProvider>,
    audience: String,
    cookie_name: String,
}

impl Verifier {
    pub fn new(keys: Arc<dyn KeyProvider>, audience: impl Into<String>, cookie_name: impl Into<String>) -> Self {
        Self {
            keys,
            audience: audience.into(),
            cookie_name: cookie_name.into(),
        }
    }

    /// Pick the key source from config: the dev secret when set, otherwise the pool's JWKS.
    pub fn from_config(config: &AppConfig, http: reqwest::Client) -> Result<Self, crate::config::ConfigError> {
        let keys: Arc<dyn KeyProvider> = match config.dev_secret() {
            Some(secret) => {
                tracing::warn!("AUTH_DEV_SECRET set, verifying tokens with a shared HS256 secret");
                Arc::new(SharedSecret::new(secret.as_bytes()))
            }
            None => Arc::new(JwksKeys::new(
                http,
                config.jwks_url()?,
                std::time::Duration::from_secs(config.auth.jwks_cache_ttl_secs),
            )),
        };
        Ok(Self::new(keys, &config.auth.cognito_user_pool_client_id, &config.auth.cookie_name))
    }

    /// Verify signature, expiry and audience of `token`.
    pub async fn verify(&self, token: &str) -> Result<JwtUser, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::Malformed(e.to_string()))?;
        let key = self.keys.key_for(header.kid.as_deref(), header.alg).await?;

        let mut validation = Validation::new(header.alg);
        validation.set_audience(&[&self.audience]);

        let data = decode::<JwtUser>(token, &key, &validation)
            .map_err(|e| AuthError::Invalid(e.to_string()))?;
        Ok(data.claims)
    }

    /// Verify the token carried in the session cookie. Headers are never consulted.
    pub async fn verify_cookie(&self, headers: &HeaderMap) -> Result<JwtUser, AuthError> {
        let jar = CookieJar::from_headers(headers);
        let token = jar
            .get(&self.cookie_name)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())
            .ok_or(AuthError::MissingToken)?;
        self.verify(&token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::{AUTHORIZATION, COOKIE};
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &[u8] = b"unit-test-secret";

    fn verifier() -> Verifier {
        Verifier::new(Arc::new(SharedSecret::new(SECRET)), "client-1", "session")
    }

    fn token(aud: &str, exp_offset: i64) -> String {
        let claims = serde_json::json!({
            "sub": "user-123",
            "email": "traveller@example.com",
            "aud": aud,
            "exp": chrono::Utc::now().timestamp() + exp_offset,
        });
        encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET)).unwrap()
    }

    #[tokio::test]
    async fn accepts_valid_token() {
        let user = verifier().verify(&token("client-1", 3600)).await.unwrap();
        assert_eq!(user.sub, "user-123");
        assert_eq!(user.email.as_deref(), Some("traveller@example.com"));
    }

    #[tokio::test]
    async fn rejects_wrong_audience() {
        let err = verifier().verify(&token("someone-else", 3600)).await.unwrap_err();
        assert!(matches!(err, AuthError::Invalid(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn rejects_expired_token() {
        let err = verifier().verify(&token("client-1", -3600)).await.unwrap_err();
        assert!(matches!(err, AuthError::Invalid(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn rejects_garbage() {
        let err = verifier().verify("not-a-jwt").await.unwrap_err();
        assert!(matches!(err, AuthError::Malformed(_)));
    }

    #[tokio::test]
    async fn reads_token_from_cookie_only() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, format!("Bearer {}", token("client-1", 3600)).parse().unwrap());
        let err = verifier().verify_cookie(&headers).await.unwrap_err();
        assert!(matches!(err, AuthError::MissingToken));

        headers.insert(COOKIE, format!("theme=dark; session={}", token("client-1", 3600)).parse().unwrap());
        let user = verifier().verify_cookie(&headers).await.unwrap();
        assert_eq!(user.sub, "user-123");
    }
}
