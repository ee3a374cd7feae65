//! Shared application state.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use guardian_core::{
    ConnectionManager, InMemoryCatalog, PluginResolver, PromptService, ProtocolDispatcher,
    TargetForwarder, TargetModelResolver, TaskResolver,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

use crate::config::{AppConfig, AuthConfig};
use crate::middleware::rate_limit::{build_limiter, UserRateLimiter};

/// Everything a request handler needs. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub prompts: Arc<PromptService>,
    pub targets: Arc<dyn TargetModelResolver>,
    pub forwarder: Arc<TargetForwarder>,
    pub connections: Arc<ConnectionManager>,
    pub auth: Arc<AuthConfig>,
    pub rate_limiter: Option<Arc<UserRateLimiter>>,
    pub metrics: Option<PrometheusHandle>,
    pub request_timeout: Duration,
}

impl AppState {
    /// Build state around `catalog`, which answers all three lookups.
    pub fn new<C>(catalog: Arc<C>, config: &AppConfig) -> anyhow::Result<Self>
    where
        C: TaskResolver + PluginResolver + TargetModelResolver + 'static,
    {
        let connections = Arc::new(ConnectionManager::new(&config.plugins));
        let dispatcher = ProtocolDispatcher::new(&config.plugins, connections.clone())
            .context("failed to build plugin HTTP client")?;
        let forwarder =
            TargetForwarder::new(&config.target).context("failed to build target HTTP client")?;

        let tasks: Arc<dyn TaskResolver> = catalog.clone();
        let plugins: Arc<dyn PluginResolver> = catalog.clone();
        let prompts = PromptService::new(tasks, plugins, Arc::new(dispatcher), &config.pipeline);

        Ok(Self {
            prompts: Arc::new(prompts),
            targets: catalog,
            forwarder: Arc::new(forwarder),
            connections,
            auth: Arc::new(config.auth.clone()),
            rate_limiter: build_limiter(&config.rate_limit),
            metrics: None,
            request_timeout: config.server.request_timeout(),
        })
    }

    /// Build state from configuration, loading the catalog seed if one is set.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let catalog = match &config.catalog.path {
            Some(path) => InMemoryCatalog::from_path(path)
                .with_context(|| format!("failed to load catalog from {}", path.display()))?,
            None => InMemoryCatalog::new(),
        };

        info!(
            tasks = catalog.task_count(),
            plugins = catalog.plugin_count(),
            "catalog loaded"
        );

        Self::new(Arc::new(catalog), config)
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
