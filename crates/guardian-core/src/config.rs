//! Configuration sections consumed by the core.
//!
//! Loading and layering happen in the API crate; these are the typed
//! sections it deserializes into.

use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_worker_pool_size() -> usize {
    num_cpus::get()
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_grpc_timeout_secs() -> u64 {
    10
}

fn default_grpc_connect_timeout_secs() -> u64 {
    5
}

fn default_target_timeout_secs() -> u64 {
    120
}

/// Admission pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Concurrent workers per pipeline run. Defaults to the host's CPU count.
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: default_worker_pool_size(),
        }
    }
}

/// Plugin transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginClientConfig {
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    /// Deadline applied to every gRPC plugin call.
    #[serde(default = "default_grpc_timeout_secs")]
    pub grpc_timeout_secs: u64,
    #[serde(default = "default_grpc_connect_timeout_secs")]
    pub grpc_connect_timeout_secs: u64,
}

impl PluginClientConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn grpc_timeout(&self) -> Duration {
        Duration::from_secs(self.grpc_timeout_secs)
    }

    pub fn grpc_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.grpc_connect_timeout_secs)
    }
}

impl Default for PluginClientConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: default_http_timeout_secs(),
            grpc_timeout_secs: default_grpc_timeout_secs(),
            grpc_connect_timeout_secs: default_grpc_connect_timeout_secs(),
        }
    }
}

/// Target model forwarding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(default = "default_target_timeout_secs")]
    pub timeout_secs: u64,
}

impl TargetConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_target_timeout_secs(),
        }
    }
}
