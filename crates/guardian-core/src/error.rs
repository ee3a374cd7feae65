//! Error types for the Guardian core.
//!
//! Only [`PipelineError`] and [`ForwardError`] cross back to the HTTP
//! boundary. [`PluginError`] and [`TaskError`] are absorbed into the
//! pipeline verdict and logged.

use uuid::Uuid;

/// Errors raised by the task/plugin/target catalog.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RepositoryError {
    /// The requested record does not exist.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: Uuid },

    /// The backing store could not be read.
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

/// Errors from forwarding a prompt to a single plugin.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// The plugin declares a protocol the dispatcher cannot speak.
    #[error("unsupported protocol type: {0}")]
    UnsupportedProtocol(String),

    /// The plugin address cannot be used as an endpoint.
    #[error("invalid plugin endpoint {address}: {reason}")]
    InvalidEndpoint { address: String, reason: String },

    /// The plugin token cannot be carried in a request header.
    #[error("invalid credentials for plugin {0}")]
    InvalidCredentials(String),

    /// Connection, DNS or timeout failure on the HTTP transport.
    #[error("failed to forward request: {0}")]
    Transport(#[source] reqwest::Error),

    /// The plugin answered with a non-200 status.
    #[error("failed to receive a response from: {address} (status {status})")]
    Status { address: String, status: u16 },

    /// The plugin answered 200 with a body that is not a plugin response.
    #[error("failed to decode response: {0}")]
    Decode(#[source] reqwest::Error),

    /// The gRPC call failed.
    #[error("failed to forward request: {0}")]
    Rpc(#[from] tonic::Status),
}

/// Reason a task failed, attached to its [`TaskResult`](crate::models::TaskResult).
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("failed to resolve plugins: {0}")]
    PluginResolution(#[source] RepositoryError),

    #[error("plugin `{plugin}` failed: {source}")]
    Plugin {
        plugin: String,
        #[source]
        source: PluginError,
    },

    /// Evaluation panicked; the payload message when it was a string.
    #[error("task evaluation panicked: {0}")]
    Panicked(String),
}

/// Errors that abort a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The caller's tasks could not be determined.
    #[error("failed to resolve tasks: {0}")]
    TaskResolution(#[source] RepositoryError),
}

/// Errors from proxying an approved request to its target model.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("invalid target address {address}: {reason}")]
    InvalidTarget { address: String, reason: String },

    #[error("failed to reach target: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Errors from creating or verifying a user token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Bad signature or missing fields.
    #[error("invalid user token: {0}")]
    Invalid(String),

    /// The token is older than its TTL.
    #[error("user token expired: {0}")]
    Expired(String),
}
