//! LINE platform over its public REST API.
//!
//! Outside the LINE app there is no LIFF SDK, but a user access token still
//! lets us read the profile and the friendship status with the official
//! account. Everything that needs the in-app client (share picker, sending
//! into the current chat, window control) is reported unsupported.

use std::time::Duration;

use anyhow::Context;
use futures::future::BoxFuture;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::bridge::{BridgeError, Capability, Friendship, MessagingPlatform};
use super::share::ShareMessage;
use crate::api::ApiError;
use crate::models::LineProfile;

const LINE_API_BASE: &str = "https://api.line.me";

#[derive(Clone)]
pub struct HttpLinePlatform {
    client: Client,
    base_url: String,
    access_token: Option<String>,
    id_token: Option<String>,
}

impl HttpLinePlatform {
    pub fn new(access_token: Option<String>, timeout_secs: u64) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: LINE_API_BASE.to_string(),
            access_token: access_token.filter(|t| !t.is_empty()),
            id_token: None,
        })
    }

    pub fn with_id_token(mut self, id_token: impl Into<String>) -> Self {
        self.id_token = Some(id_token.into());
        self
    }

    /// Point at a different host (for a LINE API mock).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, BridgeError> {
        let token = self.access_token.as_deref().ok_or(BridgeError::NotSignedIn)?;
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "GET LINE API");

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(ApiError::from)
            .with_context(|| format!("Failed to reach {}", path))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 401 {
                return Err(BridgeError::NotSignedIn);
            }
            return Err(anyhow::Error::from(ApiError::from_status(status, &body)).into());
        }

        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read response from {}", path))?;
        let parsed = serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse response from {}", path))?;
        Ok(parsed)
    }

    fn unsupported<T: Send + 'static>(capability: Capability) -> BoxFuture<'static, Result<T, BridgeError>> {
        Box::pin(async move { Err(BridgeError::Unsupported(capability)) })
    }
}

impl MessagingPlatform for HttpLinePlatform {
    fn capabilities(&self) -> Vec<Capability> {
        let mut capabilities = vec![Capability::AccessToken];
        if self.access_token.is_some() {
            capabilities.extend([Capability::Profile, Capability::Friendship]);
        }
        if self.id_token.is_some() {
            capabilities.push(Capability::IdToken);
        }
        capabilities
    }

    fn get_profile(&self) -> BoxFuture<'_, Result<LineProfile, BridgeError>> {
        Box::pin(self.get_json("/v2/profile"))
    }

    fn share_target_picker(&self, _messages: Vec<ShareMessage>) -> BoxFuture<'_, Result<bool, BridgeError>> {
        Self::unsupported(Capability::ShareTargetPicker)
    }

    fn send_messages(&self, _messages: Vec<ShareMessage>) -> BoxFuture<'_, Result<(), BridgeError>> {
        Self::unsupported(Capability::SendMessages)
    }

    fn open_window(&self, _url: String, _external: bool) -> BoxFuture<'_, Result<(), BridgeError>> {
        Self::unsupported(Capability::OpenWindow)
    }

    fn close_window(&self) -> BoxFuture<'_, Result<(), BridgeError>> {
        Self::unsupported(Capability::CloseWindow)
    }

    fn get_friendship(&self) -> BoxFuture<'_, Result<Friendship, BridgeError>> {
        Box::pin(self.get_json("/friendship/v1/status"))
    }

    fn access_token(&self) -> BoxFuture<'_, Result<Option<String>, BridgeError>> {
        let token = self.access_token.clone();
        Box::pin(async move { Ok(token) })
    }

    fn id_token(&self) -> BoxFuture<'_, Result<Option<String>, BridgeError>> {
        let token = self.id_token.clone();
        Box::pin(async move { Ok(token) })
    }
}
