use std::future::Future;

use reqwest::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use cairn_types::api::{
    CreateMessageRequest, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse,
};
use cairn_types::models::Message;

use crate::error::ClientError;
use crate::timeline::Identity;

/// Server-side message operations a chat session depends on.
pub trait MessageGateway {
    /// Every stored message, oldest first.
    fn list_messages(&self) -> impl Future<Output = Result<Vec<Message>, ClientError>> + Send;

    /// Store `content` and return the canonical record.
    fn create_message(
        &self,
        content: &str,
    ) -> impl Future<Output = Result<Message, ClientError>> + Send;
}

/// [`MessageGateway`] over the REST API.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl HttpGateway {
    /// `base_url` is the server root, e.g. `http://localhost:3000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let mut gateway = Self::new(base_url);
        gateway.token = Some(token.into());
        gateway
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Create an account and keep its token for later calls.
    pub async fn register(&mut self, username: &str, password: &str) -> Result<Identity, ClientError> {
        let response = self
            .client
            .post(self.url("/auth/register"))
            .json(&RegisterRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;
        let body: RegisterResponse = decode(response).await?;

        self.token = Some(body.token);
        Ok(Identity {
            user_id: body.user_id,
            username: username.to_string(),
        })
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<Identity, ClientError> {
        let response = self
            .client
            .post(self.url("/auth/login"))
            .json(&LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;
        let body: LoginResponse = decode(response).await?;

        self.token = Some(body.token);
        Ok(Identity {
            user_id: body.user_id,
            username: body.username,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn bearer(&self) -> Result<String, ClientError> {
        self.token
            .as_ref()
            .map(|token| format!("Bearer {}", token))
            .ok_or(ClientError::NotAuthenticated)
    }
}

impl MessageGateway for HttpGateway {
    async fn list_messages(&self) -> Result<Vec<Message>, ClientError> {
        let response = self
            .client
            .get(self.url("/messages"))
            .header(reqwest::header::AUTHORIZATION, self.bearer()?)
            .send()
            .await?;
        let messages: Vec<Message> = decode(response).await?;
        debug!("Fetched {} messages", messages.len());
        Ok(messages)
    }

    async fn create_message(&self, content: &str) -> Result<Message, ClientError> {
        let response = self
            .client
            .post(self.url("/messages"))
            .header(reqwest::header::AUTHORIZATION, self.bearer()?)
            .json(&CreateMessageRequest {
                content: content.to_string(),
            })
            .send()
            .await?;
        decode(response).await
    }
}

/// Parse a successful body, or turn an error status into `Rejected`.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or(text);
    Err(ClientError::Rejected { status, message })
}

/// Websocket address of the gateway for a server root URL.
pub fn gateway_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let ws = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base.to_string()
    };
    format!("{}/gateway", ws)
}
