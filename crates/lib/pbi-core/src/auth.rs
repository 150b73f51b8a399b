//! Token acquisition for the Power BI REST API.
//!
//! Credential refresh mechanics live entirely behind the [`TokenProvider`]
//! trait; the client only ever asks for a bearer token string.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::PbiError;

/// OAuth resource for the Power BI REST API.
pub const POWERBI_RESOURCE: &str = "https://analysis.windows.net/powerbi/api";

/// Tokens within this window of expiry are refreshed eagerly.
const EXPIRY_SKEW: Duration = Duration::from_secs(300);

/// Source of bearer tokens for REST calls.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a bearer token valid for the Power BI resource.
    ///
    /// # Errors
    /// Returns [`PbiError::Auth`] when a token cannot be acquired.
    async fn access_token(&self) -> Result<String, PbiError>;
}

/// Fixed token supplied via configuration, never refreshed.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String, PbiError> {
        Ok(self.token.clone())
    }
}

#[derive(Deserialize)]
struct CliTokenPayload {
    #[serde(rename = "accessToken")]
    access_token: String,
    /// Unix epoch seconds.
    expires_on: Option<u64>,
}

struct CachedToken {
    token: String,
    expires_on: Option<u64>,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        let Some(expires_on) = self.expires_on else {
            // No expiry reported; treat the token as single-use.
            return false;
        };
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs();
        now + EXPIRY_SKEW.as_secs() < expires_on
    }
}

/// Acquires tokens by shelling out to `az account get-access-token`,
/// mirroring an `az login` session. Tokens are cached until shortly before
/// their reported expiry.
pub struct AzureCliTokenProvider {
    cached: Mutex<Option<CachedToken>>,
}

impl AzureCliTokenProvider {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cached: Mutex::new(None),
        }
    }

    async fn fetch(&self) -> Result<CliTokenPayload, PbiError> {
        let output = Command::new("az")
            .args([
                "account",
                "get-access-token",
                "--resource",
                POWERBI_RESOURCE,
                "--output",
                "json",
            ])
            .output()
            .await
            .map_err(|err| PbiError::Auth(format!("failed to run az cli: {err}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PbiError::Auth(format!(
                "az account get-access-token failed: {}",
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|err| PbiError::Auth(format!("unexpected az cli token payload: {err}")))
    }
}

impl Default for AzureCliTokenProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenProvider for AzureCliTokenProvider {
    async fn access_token(&self) -> Result<String, PbiError> {
        let mut cached = self.cached.lock().await;
        if let Some(entry) = cached.as_ref()
            && entry.is_fresh()
        {
            return Ok(entry.token.clone());
        }

        let payload = self.fetch().await?;
        debug!(expires_on = ?payload.expires_on, "acquired token via az cli");
        let token = payload.access_token.clone();
        *cached = Some(CachedToken {
            token: payload.access_token,
            expires_on: payload.expires_on,
        });
        Ok(token)
    }
}
