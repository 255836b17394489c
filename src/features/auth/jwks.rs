use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    #[serde(default)]
    n: Option<String>,
    #[serde(default)]
    e: Option<String>,
}

struct CachedKeys {
    keys: HashMap<String, DecodingKey>,
    fetched_at: Instant,
}

/// Fetches and caches the identity provider's RSA signing keys
pub struct JwksClient {
    jwks_url: String,
    client: reqwest::Client,
    cache: Arc<RwLock<Option<CachedKeys>>>,
    cache_ttl: Duration,
}

impl JwksClient {
    pub fn new(jwks_url: &str, cache_ttl: Duration) -> Self {
        Self {
            jwks_url: jwks_url.to_string(),
            client: reqwest::Client::new(),
            cache: Arc::new(RwLock::new(None)),
            cache_ttl,
        }
    }

    /// Key for `kid`, refreshing the set once when it is unknown or stale
    pub async fn get_key(&self, kid: &str) -> Result<DecodingKey, JwksError> {
        if let Some(key) = self.cached_key(kid, true).await {
            return Ok(key);
        }

        self.refresh().await?;

        self.cached_key(kid, false)
            .await
            .ok_or_else(|| JwksError::KeyNotFound(kid.to_string()))
    }

    async fn cached_key(&self, kid: &str, require_fresh: bool) -> Option<DecodingKey> {
        let cache = self.cache.read().await;
        let cached = cache.as_ref()?;
        if require_fresh && cached.fetched_at.elapsed() >= self.cache_ttl {
            return None;
        }
        cached.keys.get(kid).cloned()
    }

    async fn refresh(&self) -> Result<(), JwksError> {
        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| JwksError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(JwksError::Fetch(format!("HTTP {}", response.status())));
        }

        let set: JwkSet = response
            .json()
            .await
            .map_err(|e| JwksError::Parse(e.to_string()))?;

        let mut keys = HashMap::new();
        for jwk in set.keys {
            let (Some(n), Some(e)) = (jwk.n.as_deref(), jwk.e.as_deref()) else {
                continue;
            };
            if jwk.kty != "RSA" {
                continue;
            }
            let key = DecodingKey::from_rsa_components(n, e)
                .map_err(|err| JwksError::KeyConversion(err.to_string()))?;
            keys.insert(jwk.kid, key);
        }

        tracing::debug!(count = keys.len(), "JWKS refreshed");

        *self.cache.write().await = Some(CachedKeys {
            keys,
            fetched_at: Instant::now(),
        });

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwksError {
    #[error("Failed to fetch JWKS: {0}")]
    Fetch(String),

    #[error("Failed to parse JWKS: {0}")]
    Parse(String),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Failed to convert key: {0}")]
    KeyConversion(String),
}
