//! Credential providers
//!
//! The transport asks a [`TokenProvider`] for a bearer credential before every
//! request. Minting signed tokens is left to the caller; this module only
//! decides when a new one is needed.

use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::info;

use crate::error::{ClientError, Result};

/// Default lifetime of a cached token
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(10 * 60);

/// Supplies the credential sent in the `Authorization` header
pub trait TokenProvider: Send + Sync {
    /// Returns the current token, minting a new one if required
    fn token(&self) -> Result<String>;
}

/// Presents the shared secret unchanged
#[derive(Debug, Clone)]
pub struct StaticToken {
    secret: String,
}

impl StaticToken {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl TokenProvider for StaticToken {
    fn token(&self) -> Result<String> {
        Ok(self.secret.clone())
    }
}

type MintFn = dyn Fn() -> anyhow::Result<String> + Send + Sync;

/// Caches a minted token until its TTL runs out
pub struct CachedToken {
    id: String,
    ttl: Duration,
    mint: Box<MintFn>,
    cached: Mutex<Option<(String, Instant)>>,
}

impl CachedToken {
    /// Creates a cache around a minting function
    ///
    /// # Arguments
    /// * `id` - Identifier logged when the token is refreshed (e.g. the account ID)
    /// * `ttl` - How long a minted token is reused
    /// * `mint` - Produces a fresh token
    pub fn new<F>(id: impl Into<String>, ttl: Duration, mint: F) -> Self
    where
        F: Fn() -> anyhow::Result<String> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            ttl,
            mint: Box::new(mint),
            cached: Mutex::new(None),
        }
    }
}

impl std::fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedToken")
            .field("id", &self.id)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenProvider for CachedToken {
    fn token(&self) -> Result<String> {
        let mut cached = self
            .cached
            .lock()
            .map_err(|e| ClientError::Token(format!("token cache poisoned: {}", e)))?;

        if let Some((token, minted_at)) = cached.as_ref()
            && minted_at.elapsed() < self.ttl
        {
            return Ok(token.clone());
        }

        info!(id = %self.id, "refreshing token");
        let token = (self.mint)().map_err(|e| ClientError::Token(format!("{:#}", e)))?;
        *cached = Some((token.clone(), Instant::now()));
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_static_token() {
        let provider = StaticToken::new("secret");
        assert_eq!(provider.token().unwrap(), "secret");
    }

    #[test]
    fn test_cached_token_reuses_until_expiry() {
        let minted = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&minted);
        let provider = CachedToken::new("acc", Duration::from_secs(60), move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Ok(format!("token-{}", n))
        });

        assert_eq!(provider.token().unwrap(), "token-0");
        assert_eq!(provider.token().unwrap(), "token-0");
        assert_eq!(minted.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cached_token_refreshes_after_ttl() {
        let minted = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&minted);
        let provider = CachedToken::new("acc", Duration::ZERO, move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Ok(format!("token-{}", n))
        });

        assert_eq!(provider.token().unwrap(), "token-0");
        assert_eq!(provider.token().unwrap(), "token-1");
    }

    #[test]
    fn test_mint_failure_is_not_cached() {
        let provider = CachedToken::new("acc", Duration::from_secs(60), || {
            anyhow::bail!("signing key missing")
        });

        let err = provider.token().unwrap_err();
        assert!(matches!(err, ClientError::Token(msg) if msg.contains("signing key missing")));
    }
}
