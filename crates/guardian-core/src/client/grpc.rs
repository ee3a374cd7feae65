//! gRPC plugin transport over a cached [`PluginConnection`].

use std::sync::Arc;

use async_trait::async_trait;
use tonic::metadata::{Ascii, MetadataValue};

use super::proto::{send_prompt_response::OptionalScore, PromptServiceClient, SendPromptRequest, SendPromptResponse};
use super::PluginClient;
use crate::connection::PluginConnection;
use crate::error::PluginError;
use crate::models::{PluginRequest, PluginResponse};

/// Calls `PromptService/SendPrompt` on the plugin's shared channel.
#[derive(Debug, Clone)]
pub struct GrpcPluginClient {
    connection: Arc<PluginConnection>,
    token: Option<String>,
}

impl GrpcPluginClient {
    pub fn new(connection: Arc<PluginConnection>, token: Option<String>) -> Self {
        Self { connection, token }
    }
}

#[async_trait]
impl PluginClient for GrpcPluginClient {
    async fn forward(&self, request: &PluginRequest) -> Result<PluginResponse, PluginError> {
        let mut rpc = tonic::Request::new(SendPromptRequest {
            prompt: request.prompt.clone(),
            chat: request.chat.clone().unwrap_or_default(),
            user_id: request.user_id.to_string(),
            target_id: request.target_id.to_string(),
        });

        if let Some(token) = self.token.as_deref().filter(|t| !t.is_empty()) {
            let value: MetadataValue<Ascii> = format!("Bearer {}", token)
                .parse()
                .map_err(|_| PluginError::InvalidCredentials(self.connection.address().to_string()))?;
            rpc.metadata_mut().insert("authorization", value);
        }

        let mut client = PromptServiceClient::new(self.connection.channel());
        let response = client.send_prompt(rpc).await?;

        Ok(into_plugin_response(response.into_inner()))
    }
}

/// An absent score reads as zero.
fn into_plugin_response(response: SendPromptResponse) -> PluginResponse {
    let score = match response.optional_score {
        Some(OptionalScore::Score(score)) => score,
        None => 0,
    };

    PluginResponse {
        status: response.status,
        score: Some(score),
    }
}
