//! Protocol-polymorphic plugin clients.
//!
//! A [`PluginClient`] forwards a prompt to one plugin. The [`ClientResolver`]
//! picks the client for a plugin from its declared protocol; the production
//! resolver is [`ProtocolDispatcher`].

pub mod grpc;
pub mod http;
pub mod proto;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::PluginClientConfig;
use crate::connection::ConnectionManager;
use crate::error::PluginError;
use crate::models::{Plugin, PluginRequest, PluginResponse, ProtocolKind};

pub use grpc::GrpcPluginClient;
pub use http::HttpPluginClient;

/// Forwards a prompt to a plugin and returns its verdict.
#[async_trait]
pub trait PluginClient: Send + Sync {
    async fn forward(&self, request: &PluginRequest) -> Result<PluginResponse, PluginError>;
}

/// Chooses the client that speaks a plugin's protocol.
pub trait ClientResolver: Send + Sync {
    /// Must fail, not skip, when the protocol is not supported.
    fn client_for(&self, plugin: &Plugin) -> Result<Arc<dyn PluginClient>, PluginError>;
}

/// Dispatches on [`Plugin::protocol`]: HTTP plugins share one timeout-bounded
/// `reqwest` client, gRPC plugins share cached channels.
pub struct ProtocolDispatcher {
    http: reqwest::Client,
    connections: Arc<ConnectionManager>,
}

impl ProtocolDispatcher {
    /// Build the shared HTTP transport from `config`.
    pub fn new(
        config: &PluginClientConfig,
        connections: Arc<ConnectionManager>,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()?;
        Ok(Self::with_http_client(http, connections))
    }

    pub fn with_http_client(http: reqwest::Client, connections: Arc<ConnectionManager>) -> Self {
        Self { http, connections }
    }

    pub fn connections(&self) -> &Arc<ConnectionManager> {
        &self.connections
    }
}

impl ClientResolver for ProtocolDispatcher {
    fn client_for(&self, plugin: &Plugin) -> Result<Arc<dyn PluginClient>, PluginError> {
        match &plugin.protocol.kind {
            ProtocolKind::Http => Ok(Arc::new(HttpPluginClient::new(
                self.http.clone(),
                plugin.token.clone(),
            ))),
            ProtocolKind::Grpc => {
                let connection = self.connections.get_client(plugin)?;
                Ok(Arc::new(GrpcPluginClient::new(connection, plugin.token.clone())))
            }
            other => Err(PluginError::UnsupportedProtocol(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Protocol;
    use uuid::Uuid;

    fn plugin(kind: ProtocolKind) -> Plugin {
        Plugin {
            id: Uuid::new_v4(),
            name: "judge".to_string(),
            provider: String::new(),
            address: "127.0.0.1:50051".to_string(),
            status: 1,
            token: None,
            protocol: Protocol::new(kind),
        }
    }

    fn dispatcher() -> ProtocolDispatcher {
        let config = PluginClientConfig::default();
        let connections = Arc::new(ConnectionManager::new(&config));
        ProtocolDispatcher::new(&config, connections).unwrap()
    }

    #[tokio::test]
    async fn test_web_socket_is_unsupported() {
        let dispatcher = dispatcher();
        let err = dispatcher
            .client_for(&plugin(ProtocolKind::WebSocket))
            .err()
            .unwrap();

        assert!(matches!(err, PluginError::UnsupportedProtocol(ref t) if t == "web_socket"));
        assert!(dispatcher.connections().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_protocol_is_named() {
        let err = dispatcher()
            .client_for(&plugin(ProtocolKind::Other("smtp".to_string())))
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "unsupported protocol type: smtp");
    }

    #[tokio::test]
    async fn test_grpc_plugin_goes_through_connection_cache() {
        let dispatcher = dispatcher();
        let grpc = plugin(ProtocolKind::Grpc);

        dispatcher.client_for(&grpc).unwrap();
        dispatcher.client_for(&grpc).unwrap();

        assert_eq!(dispatcher.connections().len(), 1);
    }

    #[tokio::test]
    async fn test_http_plugin_does_not_touch_connection_cache() {
        let dispatcher = dispatcher();
        dispatcher.client_for(&plugin(ProtocolKind::Http)).unwrap();
        assert!(dispatcher.connections().is_empty());
    }
}
