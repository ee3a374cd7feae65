//! Process-wide cache of gRPC channels to plugin backends.
//!
//! Connections are keyed by plugin id and outlive the pipeline run that
//! created them. [`ConnectionManager::close_all`] is the only teardown path.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tonic::transport::{Channel, Endpoint};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::PluginClientConfig;
use crate::error::PluginError;
use crate::models::Plugin;

/// A live channel to one plugin.
#[derive(Debug)]
pub struct PluginConnection {
    plugin_id: Uuid,
    address: String,
    channel: Channel,
}

impl PluginConnection {
    pub fn plugin_id(&self) -> Uuid {
        self.plugin_id
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// A handle onto the shared channel. Clones multiplex over the same connection.
    pub fn channel(&self) -> Channel {
        self.channel.clone()
    }
}

/// Lock-guarded connection cache shared by every gRPC plugin client.
#[derive(Debug)]
pub struct ConnectionManager {
    connections: Mutex<HashMap<Uuid, Arc<PluginConnection>>>,
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl ConnectionManager {
    pub fn new(config: &PluginClientConfig) -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            connect_timeout: config.grpc_connect_timeout(),
            request_timeout: config.grpc_timeout(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Arc<PluginConnection>>> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the cached connection for `plugin`, creating it on first use.
    ///
    /// The lock is held across lookup and creation, so concurrent callers
    /// for the same plugin share one channel. The returned connection stays
    /// open after this call.
    pub fn get_client(&self, plugin: &Plugin) -> Result<Arc<PluginConnection>, PluginError> {
        let mut connections = self.lock();

        if let Some(connection) = connections.get(&plugin.id) {
            return Ok(Arc::clone(connection));
        }

        let uri = normalize_address(&plugin.address);
        let endpoint = Endpoint::from_shared(uri).map_err(|e| PluginError::InvalidEndpoint {
            address: plugin.address.clone(),
            reason: e.to_string(),
        })?;

        // Dials on first RPC and reconnects on its own after failures.
        let channel = endpoint
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .connect_lazy();

        let connection = Arc::new(PluginConnection {
            plugin_id: plugin.id,
            address: plugin.address.clone(),
            channel,
        });
        connections.insert(plugin.id, Arc::clone(&connection));

        info!(
            plugin_id = %plugin.id,
            plugin = %plugin.name,
            address = %plugin.address,
            "gRPC connection created"
        );

        Ok(connection)
    }

    /// Tear down every cached connection and empty the cache.
    ///
    /// Returns how many connections were closed. Calls already holding a
    /// channel handle finish on it before the socket goes away.
    pub fn close_all(&self) -> usize {
        let drained: Vec<_> = self.lock().drain().collect();
        let closed = drained.len();

        for (plugin_id, connection) in drained {
            debug!(
                plugin_id = %plugin_id,
                address = %connection.address,
                in_use = Arc::strong_count(&connection) > 1,
                "closing gRPC connection"
            );
        }

        if closed > 0 {
            info!(closed, "gRPC connections closed");
        }
        closed
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Plugin records may store bare `host:port` targets.
fn normalize_address(address: &str) -> String {
    if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    }
}
