//! API secrets handed to provider adapters.
//!
//! Adapters never own a raw key; they ask a [`CredentialProvider`] for the
//! current [`Secret`] on every request and call [`CredentialProvider::refresh`]
//! after the provider throttles them, so a rotated key is picked up on the
//! retry.
use async_trait::async_trait;
use std::fmt;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("credential {0} is not set")]
    Missing(String),
    #[error("invalid credential: {0}")]
    Invalid(String),
}

/// Opaque secret; `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Result<Self, CredentialError> {
        let value = value.into().trim().to_string();
        if value.is_empty() {
            return Err(CredentialError::Invalid("empty secret".into()));
        }
        Ok(Self(value))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn get(&self) -> Result<Secret, CredentialError>;

    /// Swap in a fresh secret, if the backing store has one.
    async fn refresh(&self) -> Result<(), CredentialError>;
}

/// Fixed secret, typically from an expanded config value. Refresh is a no-op.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    secret: Secret,
}

impl StaticCredentials {
    pub fn new(value: impl Into<String>) -> Result<Self, CredentialError> {
        Ok(Self {
            secret: Secret::new(value)?,
        })
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn get(&self) -> Result<Secret, CredentialError> {
        Ok(self.secret.clone())
    }

    async fn refresh(&self) -> Result<(), CredentialError> {
        tracing::debug!("credentials.static.refresh_noop");
        Ok(())
    }
}

/// Secret read from an environment variable; rotation means updating the
/// variable and letting [`CredentialProvider::refresh`] re-read it.
#[derive(Debug)]
pub struct EnvCredentials {
    var: String,
    current: RwLock<Option<Secret>>,
}

impl EnvCredentials {
    pub fn new(var: impl Into<String>) -> Self {
        Self {
            var: var.into(),
            current: RwLock::new(None),
        }
    }

    pub fn var(&self) -> &str {
        &self.var
    }

    fn read(&self) -> Result<Secret, CredentialError> {
        let raw = std::env::var(&self.var).map_err(|_| CredentialError::Missing(self.var.clone()))?;
        Secret::new(raw)
    }
}

#[async_trait]
impl CredentialProvider for EnvCredentials {
    async fn get(&self) -> Result<Secret, CredentialError> {
        if let Some(secret) = self.current.read().await.as_ref() {
            return Ok(secret.clone());
        }
        let secret = self.read()?;
        *self.current.write().await = Some(secret.clone());
        Ok(secret)
    }

    async fn refresh(&self) -> Result<(), CredentialError> {
        let fresh = self.read()?;
        let mut slot = self.current.write().await;
        let rotated = slot.as_ref() != Some(&fresh);
        *slot = Some(fresh);
        tracing::info!(var=%self.var, rotated, "credentials.env.refreshed");
        Ok(())
    }
}
