//! Bearer-token providers for remote triple sources.
//!
//! Sources hold an `Arc<dyn CredentialProvider>` and ask for a token on every
//! request. A provider may cache; an auth failure calls [`invalidate`] so the
//! next request fetches a fresh token.
//!
//! [`invalidate`]: CredentialProvider::invalidate

use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::{Result, TwinError};

/// Supplies bearer tokens to remote sources.
pub trait CredentialProvider: Send + Sync {
    /// Token for the next request. Fails when none is available.
    fn bearer_token(&self) -> Result<String>;

    /// Drop any cached token.
    fn invalidate(&self) {}
}

/// A fixed token, e.g. a personal access token.
pub struct StaticToken(String);

impl StaticToken {
    /// Wrap a token. An empty token fails on first use.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl CredentialProvider for StaticToken {
    fn bearer_token(&self) -> Result<String> {
        if self.0.is_empty() {
            return Err(TwinError::Config("empty bearer token".to_string()));
        }
        Ok(self.0.clone())
    }
}

struct CachedToken {
    value: String,
    fetched_at: Instant,
}

/// Caches the result of `fetch` for `refresh_every`.
pub struct RefreshingToken<F> {
    fetch: F,
    refresh_every: Duration,
    cached: Mutex<Option<CachedToken>>,
}

impl<F> RefreshingToken<F>
where
    F: Fn() -> Result<String> + Send + Sync,
{
    /// Cache `fetch` results for `refresh_every`.
    pub fn new(fetch: F, refresh_every: Duration) -> Self {
        Self { fetch, refresh_every, cached: Mutex::new(None) }
    }
}

impl RefreshingToken<Box<dyn Fn() -> Result<String> + Send + Sync>> {
    /// Re-read the environment variable `var` every `refresh_every`.
    pub fn from_env(var: &str, refresh_every: Duration) -> Self {
        let var = var.to_string();
        let fetch: Box<dyn Fn() -> Result<String> + Send + Sync> = Box::new(move || {
            std::env::var(&var)
                .ok()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| TwinError::Config(format!("{} is not set", var)))
        });
        Self::new(fetch, refresh_every)
    }
}

impl<F> CredentialProvider for RefreshingToken<F>
where
    F: Fn() -> Result<String> + Send + Sync,
{
    fn bearer_token(&self) -> Result<String> {
        let mut cached = self
            .cached
            .lock()
            .map_err(|_| TwinError::DataSourceUnavailable("credential cache poisoned".into()))?;

        if let Some(token) = cached.as_ref() {
            if token.fetched_at.elapsed() < self.refresh_every {
                return Ok(token.value.clone());
            }
            debug!("bearer token expired, refreshing");
        }

        let value = (self.fetch)()?;
        *cached = Some(CachedToken { value: value.clone(), fetched_at: Instant::now() });
        Ok(value)
    }

    fn invalidate(&self) {
        if let Ok(mut cached) = self.cached.lock() {
            if cached.take().is_some() {
                info!("bearer token invalidated");
            }
        }
    }
}
