// HTTP transport used by the client to fetch raw response bodies
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Url};

use crate::config::ClientConfig;
use crate::error::{ClientError, GoodreadsError, Result};

#[async_trait]
pub trait Transport: Send + Sync {
    // GET `url` and return the whole body
    async fn get(&self, url: &Url) -> Result<Bytes>;
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> std::result::Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| ClientError::InitError(e.to_string()))?;

        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &Url) -> Result<Bytes> {
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            // Drain the body so the connection goes back to the pool
            let message = response.text().await.unwrap_or_default();
            return Err(GoodreadsError::ApiResponseError {
                status_code: status.as_u16(),
                message: if message.trim().is_empty() {
                    status.to_string()
                } else {
                    message.trim().to_string()
                },
            });
        }

        Ok(response.bytes().await?)
    }
}
