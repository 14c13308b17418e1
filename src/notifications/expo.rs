//! Expo push API client
//!
//! Messages are POSTed as a JSON array to the Expo push endpoint, which answers
//! with one ticket per message:
//!
//! ```text
//! POST /--/api/v2/push/send   [msg, msg, ...]   → 200 {"data": [ticket, ticket, ...]}
//! ```

use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, trace};

use super::push::{PushMessage, PushService, PushTicket, TokenValidator};
use crate::config::PushConfig;

/// Maximum number of messages the Expo API accepts per request
pub const EXPO_CHUNK_LIMIT: usize = 100;

pub const EXPO_PUSH_URL: &str = "https://exp.host/--/api/v2/push/send";

static UUID_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[a-z\d]{8}-[a-z\d]{4}-[a-z\d]{4}-[a-z\d]{4}-[a-z\d]{12}$")
        .expect("static token pattern is valid")
});

/// Expo push token format check, usable without a client
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpoTokenFormat;

impl TokenValidator for ExpoTokenFormat {
    fn is_valid_token(&self, token: &str) -> bool {
        is_expo_push_token(token)
    }
}

/// Accepts `ExponentPushToken[...]`, `ExpoPushToken[...]` and bare UUID-shaped tokens
pub fn is_expo_push_token(token: &str) -> bool {
    let bracketed = (token.starts_with("ExponentPushToken[") || token.starts_with("ExpoPushToken["))
        && token.ends_with(']');

    bracketed || UUID_TOKEN.is_match(token)
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    data: Vec<PushTicket>,
}

#[derive(Debug, Clone)]
pub struct ExpoPushClient {
    client: Client,
    url: String,
    access_token: Option<String>,
    chunk_size: usize,
}

impl ExpoPushClient {
    pub fn new(config: &PushConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            url: config.url.clone(),
            access_token: config.access_token.clone(),
            chunk_size: config.chunk_size.clamp(1, EXPO_CHUNK_LIMIT),
        })
    }
}

impl TokenValidator for ExpoPushClient {
    fn is_valid_token(&self, token: &str) -> bool {
        is_expo_push_token(token)
    }
}

#[async_trait]
impl PushService for ExpoPushClient {
    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    #[instrument(skip(self, chunk), fields(count = chunk.len()))]
    async fn send_chunk(&self, chunk: Vec<PushMessage>) -> Result<Vec<PushTicket>> {
        trace!("sending push chunk to {}", self.url);

        let mut request = self
            .client
            .post(&self.url)
            .header("Accept", "application/json")
            .json(&chunk);

        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .context("failed to send push request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("push API responded with {status}: {body}");
        }

        let body: SendResponse = response
            .json()
            .await
            .context("failed to parse push API response")?;

        debug!("push API returned {} tickets", body.data.len());
        Ok(body.data)
    }
}
