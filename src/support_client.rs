use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    response: String,
}

/// Ways a chat exchange can fail. All of them reach the user as the same
/// retry hint; the detail only goes to the log.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("failed to reach the chat backend: {0}")]
    Network(#[source] reqwest::Error),

    #[error("chat backend returned {status}")]
    Server { status: StatusCode },

    #[error("chat backend sent an unexpected reply: {0}")]
    InvalidResponse(String),
}

/// Something that answers a user message with a reply.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send_message(&self, message: &str) -> Result<String, ChatError>;
}

pub struct SupportClient {
    endpoint: Url,
    client: reqwest::Client,
}

impl SupportClient {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            client: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ChatBackend for SupportClient {
    async fn send_message(&self, message: &str) -> Result<String, ChatError> {
        debug!("Sending message to {}", self.endpoint);

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(ACCEPT, "application/json")
            .json(&ChatRequest { message })
            .send()
            .await
            .map_err(ChatError::Network)?;

        let status = response.status();
        if !status.is_success() {
            // The body is whatever the backend felt like sending; keep it for the log only.
            let body = response.text().await.unwrap_or_default();
            error!("Chat request failed with status {}: {}", status, body);
            return Err(ChatError::Server { status });
        }

        let body = response.text().await.map_err(ChatError::Network)?;
        let reply: ChatReply = serde_json::from_str(&body).map_err(|e| {
            error!("Could not decode chat reply: {}", e);
            ChatError::InvalidResponse(e.to_string())
        })?;

        debug!("Received reply of {} bytes", reply.response.len());
        Ok(reply.response)
    }
}
