//! JWT credential provider for authenticated traffic.

use std::time::Duration;

use loadgate_core::{AuthConfig, AuthKind, TargetConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::RunnerError;

const TOKEN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct TokenRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
}

/// Obtains access tokens from the target's token endpoint.
pub struct CredentialProvider {
    client: reqwest::Client,
}

impl CredentialProvider {
    pub fn new() -> Result<Self, RunnerError> {
        let client = reqwest::Client::builder().timeout(TOKEN_TIMEOUT).build()?;
        Ok(Self { client })
    }

    /// Returns `None` when authentication is disabled.
    pub async fn acquire_token(
        &self,
        target: &TargetConfig,
        auth: &AuthConfig,
    ) -> Result<Option<String>, RunnerError> {
        if auth.kind == AuthKind::None {
            debug!("Authentication disabled, no token requested");
            return Ok(None);
        }

        let token_url = required(&auth.token_url, "token_url")?;
        let username = required(&auth.username, "username")?;
        let password = required(&auth.password, "password")?;

        let url = format!("{}{}", target.host, token_url);
        debug!(url = %url, "Requesting access token");

        let response = self
            .client
            .post(&url)
            .json(&TokenRequest { username, password })
            .send()
            .await?
            .error_for_status()?;
        let body: TokenResponse = response.json().await?;

        if body.access_token.is_empty() {
            return Err(RunnerError::MissingAccessToken);
        }

        info!("Obtained access token");
        Ok(Some(body.access_token))
    }
}

fn required<'a>(value: &'a Option<String>, key: &'static str) -> Result<&'a str, RunnerError> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or(RunnerError::AuthConfig(key))
}
