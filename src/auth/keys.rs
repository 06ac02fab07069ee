use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey};
use tokio::sync::RwLock;
use url::Url;

use super::AuthError;

// An unknown kid forces a refetch, but not more often than this.
const MIN_REFETCH_INTERVAL: Duration = Duration::from_secs(10);

/// Resolves the verification key for a token header.
#[async_trait]
pub trait KeyProvider: Send + Sync {
    async fn key_for(&self, kid: Option<&str>, alg: Algorithm) -> Result<DecodingKey, AuthError>;
}

/// Public keys published by the identity provider as a JWKS document, cached by kid.
pub struct JwksKeys {
    http: reqwest::Client,
    url: Url,
    ttl: Duration,
    cache: RwLock<KeyCache>,
}

#[derive(Default)]
struct KeyCache {
    keys: HashMap<String, DecodingKey>,
    fetched_at: Option<Instant>,
}

impl KeyCache {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.is_some_and(|at| at.elapsed() < ttl)
    }

    fn may_refetch(&self) -> bool {
        self.fetched_at.map_or(true, |at| at.elapsed() >= MIN_REFETCH_INTERVAL)
    }
}

impl JwksKeys {
    pub fn new(http: reqwest::Client, url: Url, ttl: Duration) -> Self {
        Self {
            http,
            url,
            ttl,
            cache: RwLock::new(KeyCache::default()),
        }
    }

    async fn fetch(&self) -> Result<HashMap<String, DecodingKey>, AuthError> {
        tracing::debug!(url = %self.url, "fetching JWKS");
        let set: JwkSet = self
            .http
            .get(self.url.clone())
            .send()
            .await
            .and_then(|res| res.error_for_status())
            .map_err(|e| AuthError::KeyFetch(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::KeyFetch(e.to_string()))?;

        let mut keys = HashMap::with_capacity(set.keys.len());
        for jwk in &set.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                continue;
            };
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => {
                    keys.insert(kid, key);
                }
                Err(e) => tracing::warn!(kid = %kid, "skipping unusable JWK: {}", e),
            }
        }
        tracing::info!(count = keys.len(), "loaded signing keys from JWKS");
        Ok(keys)
    }
}

#[async_trait]
impl KeyProvider for JwksKeys {
    async fn key_for(&self, kid: Option<&str>, _alg: Algorithm) -> Result<DecodingKey, AuthError> {
        let kid = kid.ok_or(AuthError::MissingKeyId)?;

        {
            let cache = self.cache.read().await;
            if cache.is_fresh(self.ttl) {
                if let Some(key) = cache.keys.get(kid) {
                    return Ok(key.clone());
                }
            }
        }

        let mut cache = self.cache.write().await;
        // Another request may have refreshed while we waited for the lock
        let missing = !cache.keys.contains_key(kid);
        if !cache.is_fresh(self.ttl) || (missing && cache.may_refetch()) {
            cache.keys = self.fetch().await?;
            cache.fetched_at = Some(Instant::now());
        }

        cache
            .keys
            .get(kid)
            .cloned()
            .ok_or_else(|| AuthError::UnknownKey(kid.to_string()))
    }
}

/// A single HS256 secret, for running without an identity provider.
pub struct SharedSecret {
    key: DecodingKey,
}

impl SharedSecret {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: DecodingKey::from_secret(secret),
        }
    }
}

#[async_trait]
impl KeyProvider for SharedSecret {
    async fn key_for(&self, _kid: Option<&str>, alg: Algorithm) -> Result<DecodingKey, AuthError> {
        match alg {
            Algorithm::HS256 => Ok(self.key.clone()),
            other => Err(AuthError::UnexpectedAlgorithm(other)),
        }
    }
}
