//! HTTP Remote Client
//!
//! REST implementation of [`RemoteCommands`]: `POST {base}/gifts/{id}/{verb}`
//! for lifecycle verbs, `PATCH`/`DELETE`/`GET` on `{base}/gifts/{id}` for
//! update, delete and fetch.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use giftwell_models::{GiftPatch, GiftRecord};

use super::{CommandResponse, RemoteCommands, RemoteError};

/// Default timeout for remote commands (seconds)
const COMMAND_TIMEOUT_SECS: u64 = 30;

/// Remote authority configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the authority, e.g. `https://api.example.com/v1`
    pub base_url: String,
    /// Bearer token from the session provider (optional)
    pub auth_token: Option<String>,
    /// Per-command timeout in seconds (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    COMMAND_TIMEOUT_SECS
}

impl RemoteConfig {
    /// Create a new config with just the base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Set the bearer token
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Set the command timeout
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// REST client for the remote command surface.
pub struct HttpRemote {
    config: RemoteConfig,
    client: Client,
}

impl HttpRemote {
    /// Create a new remote client
    pub fn new(config: RemoteConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    /// URL of a gift resource
    fn gift_url(&self, gift_id: &str) -> String {
        format!(
            "{}/gifts/{}",
            self.config.base_url.trim_end_matches('/'),
            gift_id
        )
    }

    /// URL of a lifecycle verb on a gift
    fn verb_url(&self, gift_id: &str, verb: &str) -> String {
        format!("{}/{}", self.gift_url(gift_id), verb)
    }

    async fn execute(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<GiftRecord, RemoteError> {
        let request = match &self.config.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        let envelope: CommandResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Malformed(e.to_string()))?;
        envelope.into_result()
    }

    async fn post_verb(&self, gift_id: &str, verb: &str) -> Result<GiftRecord, RemoteError> {
        debug!(gift_id = %gift_id, verb = %verb, "Issuing remote command");
        self.execute(self.client.post(self.verb_url(gift_id, verb)))
            .await
    }
}

#[async_trait]
impl RemoteCommands for HttpRemote {
    async fn reserve(&self, gift_id: &str) -> Result<GiftRecord, RemoteError> {
        self.post_verb(gift_id, "reserve").await
    }

    async fn release(&self, gift_id: &str) -> Result<GiftRecord, RemoteError> {
        self.post_verb(gift_id, "release").await
    }

    async fn purchase(&self, gift_id: &str) -> Result<GiftRecord, RemoteError> {
        self.post_verb(gift_id, "purchase").await
    }

    async fn confirm_receipt(&self, gift_id: &str) -> Result<GiftRecord, RemoteError> {
        self.post_verb(gift_id, "confirm-receipt").await
    }

    async fn publish(&self, gift_id: &str) -> Result<GiftRecord, RemoteError> {
        self.post_verb(gift_id, "publish").await
    }

    async fn unpublish(&self, gift_id: &str) -> Result<GiftRecord, RemoteError> {
        self.post_verb(gift_id, "unpublish").await
    }

    async fn update(&self, gift_id: &str, patch: &GiftPatch) -> Result<GiftRecord, RemoteError> {
        debug!(gift_id = %gift_id, "Issuing remote update");
        self.execute(self.client.patch(self.gift_url(gift_id)).json(patch))
            .await
    }

    async fn archive(&self, gift_id: &str) -> Result<GiftRecord, RemoteError> {
        self.post_verb(gift_id, "archive").await
    }

    async fn delete(&self, gift_id: &str) -> Result<GiftRecord, RemoteError> {
        debug!(gift_id = %gift_id, "Issuing remote delete");
        self.execute(self.client.delete(self.gift_url(gift_id)))
            .await
    }

    async fn fetch(&self, gift_id: &str) -> Result<GiftRecord, RemoteError> {
        self.execute(self.client.get(self.gift_url(gift_id))).await
    }
}
