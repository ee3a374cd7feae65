//! # Guardian core
//!
//! Admission control for prompts bound to a target model.
//!
//! ## Overview
//!
//! Every prompt is checked against the tasks assigned to its caller before it
//! is forwarded:
//!
//! - **Pipeline**: [`PromptService`] evaluates all tasks concurrently with
//!   fail-fast cancellation
//! - **Plugin clients**: [`client::PluginClient`] over HTTP or gRPC, chosen
//!   per plugin by [`ProtocolDispatcher`]
//! - **Connection cache**: [`ConnectionManager`] keeps gRPC channels alive
//!   across requests
//! - **Forwarding**: [`TargetForwarder`] proxies approved requests verbatim
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use guardian_core::{
//!     ConnectionManager, InMemoryCatalog, PipelineConfig, PluginClientConfig,
//!     PluginRequest, PromptService, ProtocolDispatcher,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let catalog = Arc::new(InMemoryCatalog::from_path("catalog.json")?);
//!     let plugin_config = PluginClientConfig::default();
//!     let connections = Arc::new(ConnectionManager::new(&plugin_config));
//!     let dispatcher = ProtocolDispatcher::new(&plugin_config, connections.clone())?;
//!
//!     let service = PromptService::new(
//!         catalog.clone(),
//!         catalog,
//!         Arc::new(dispatcher),
//!         &PipelineConfig::default(),
//!     );
//!
//!     let approved = service.process_prompt(&request).await?;
//!     connections.close_all();
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod gateway;
pub mod models;
pub mod pipeline;
pub mod resolver;
pub mod token;

// Primary exports
pub use client::{ClientResolver, PluginClient, ProtocolDispatcher};
pub use config::{PipelineConfig, PluginClientConfig, TargetConfig};
pub use connection::{ConnectionManager, PluginConnection};
pub use error::{ForwardError, PipelineError, PluginError, RepositoryError, TaskError, TokenError};
pub use gateway::TargetForwarder;
pub use models::{
    Plugin, PluginRequest, PluginResponse, Protocol, ProtocolKind, SendRequest, TargetModel, Task,
    TaskResult, Verdict,
};
pub use pipeline::PromptService;
pub use resolver::{InMemoryCatalog, PluginResolver, TargetModelResolver, TaskResolver};
pub use token::UserToken;
