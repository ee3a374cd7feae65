//! HTTP plugin transport: JSON `POST` to the plugin address.

use async_trait::async_trait;
use reqwest::StatusCode;

use super::PluginClient;
use crate::error::PluginError;
use crate::models::{PluginRequest, PluginResponse};

/// Posts the [`PluginRequest`] as JSON to [`PluginRequest::address`].
///
/// Only `200 OK` is a valid answer; any other status is an error naming the
/// plugin address.
#[derive(Debug, Clone)]
pub struct HttpPluginClient {
    client: reqwest::Client,
    token: Option<String>,
}

impl HttpPluginClient {
    /// `client` carries the shared timeout; it is cheap to clone.
    pub fn new(client: reqwest::Client, token: Option<String>) -> Self {
        Self { client, token }
    }
}

#[async_trait]
impl PluginClient for HttpPluginClient {
    async fn forward(&self, request: &PluginRequest) -> Result<PluginResponse, PluginError> {
        let mut builder = self
            .client
            .post(&request.address)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(request);

        if let Some(token) = self.token.as_deref().filter(|t| !t.is_empty()) {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(PluginError::Transport)?;

        if response.status() != StatusCode::OK {
            return Err(PluginError::Status {
                address: request.address.clone(),
                status: response.status().as_u16(),
            });
        }

        response
            .json::<PluginResponse>()
            .await
            .map_err(PluginError::Decode)
    }
}
