use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::base_url_with_slash;
use crate::error::RequestError;
use crate::models::{ChatTurn, JobListing};

/// One conversational turn against the remote language-model endpoint.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// `history` excludes `message`; the server appends it itself.
    /// `context` is forwarded as-is, whatever the selected listing holds.
    async fn send_turn(
        &self,
        message: &str,
        history: &[ChatTurn],
        context: Option<&JobListing>,
    ) -> Result<String, RequestError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    history: &'a [ChatTurn],
    context: Option<&'a JobListing>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    reply: String,
}

#[derive(Debug, Clone)]
pub struct HttpChatClient {
    endpoint: Url,
    client: reqwest::Client,
}

impl HttpChatClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let endpoint = base_url_with_slash(base_url)?
            .join("chat/")
            .context("Failed to build chat endpoint")?;
        let client = reqwest::Client::builder()
            .user_agent(concat!("jobseek/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { endpoint, client })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ChatApi for HttpChatClient {
    async fn send_turn(
        &self,
        message: &str,
        history: &[ChatTurn],
        context: Option<&JobListing>,
    ) -> Result<String, RequestError> {
        let request = ChatRequest {
            message,
            history,
            context,
        };
        debug!(
            url = %self.endpoint,
            history_len = history.len(),
            has_context = context.is_some(),
            "POST chat turn"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| RequestError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RequestError::Http(status.as_u16()));
        }

        let reply: ChatReply = response
            .json()
            .await
            .map_err(|e| RequestError::Decode(e.to_string()))?;
        Ok(reply.reply)
    }
}
