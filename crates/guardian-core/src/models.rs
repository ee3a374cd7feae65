//! Domain types shared by the pipeline, the plugin clients and the API.
//!
//! Tasks, plugins and target models are owned by the catalog and are
//! read-only here. [`PluginRequest`] and [`PluginResponse`] are the
//! per-plugin wire payloads.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TaskError;

/// Transport a plugin or target model is reached over.
///
/// Unknown labels are preserved in [`ProtocolKind::Other`] so dispatch can
/// name the offending type instead of dropping it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProtocolKind {
    Http,
    Grpc,
    WebSocket,
    Other(String),
}

impl ProtocolKind {
    pub fn as_str(&self) -> &str {
        match self {
            ProtocolKind::Http => "http",
            ProtocolKind::Grpc => "grpc",
            ProtocolKind::WebSocket => "web_socket",
            ProtocolKind::Other(other) => other,
        }
    }
}

impl From<String> for ProtocolKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "http" => ProtocolKind::Http,
            "grpc" => ProtocolKind::Grpc,
            "web_socket" => ProtocolKind::WebSocket,
            _ => ProtocolKind::Other(value),
        }
    }
}

impl From<ProtocolKind> for String {
    fn from(value: ProtocolKind) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Protocol record attached to plugins and target models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protocol {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(rename = "type")]
    pub kind: ProtocolKind,
}

impl Protocol {
    pub fn new(kind: ProtocolKind) -> Self {
        Self { id: None, kind }
    }
}

/// An external service that judges a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plugin {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub provider: String,
    pub address: String,
    #[serde(default)]
    pub status: i32,
    /// Bearer token sent to the plugin, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub protocol: Protocol,
}

/// A verification requirement assigned to a user.
///
/// A task passes only if every plugin in [`Task::plugins`] passes, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub task_type: String,
    #[serde(default)]
    pub status: i32,
    #[serde(default)]
    pub plugins: Vec<Uuid>,
}

/// The downstream model a prompt is forwarded to once admitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetModel {
    pub id: Uuid,
    #[serde(default)]
    pub provider: String,
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub status: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub protocol: Protocol,
}

/// Inbound body of a prompt-send call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat: Option<String>,
    pub prompt: String,
    pub target_id: Uuid,
}

/// Payload sent to every plugin of every task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRequest {
    pub user_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat: Option<String>,
    /// Endpoint of the plugin currently being called. Rewritten before each call.
    #[serde(default)]
    pub address: String,
    pub prompt: String,
    pub target_id: Uuid,
}

impl PluginRequest {
    /// Build the plugin payload for a caller's inbound request.
    pub fn from_send(user_id: Uuid, send: &SendRequest) -> Self {
        Self {
            user_id,
            chat: send.chat.clone(),
            address: String::new(),
            prompt: send.prompt.clone(),
            target_id: send.target_id,
        }
    }
}

/// A plugin's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PluginResponse {
    pub status: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
}

/// Outcome of one task inside a pipeline run.
#[derive(Debug)]
pub struct TaskResult {
    pub task_type: String,
    pub success: bool,
    pub error: Option<TaskError>,
}

impl TaskResult {
    pub fn passed(task: &Task) -> Self {
        Self {
            task_type: task.task_type.clone(),
            success: true,
            error: None,
        }
    }

    /// A well-formed negative verdict. Not an error.
    pub fn rejected(task: &Task) -> Self {
        Self {
            task_type: task.task_type.clone(),
            success: false,
            error: None,
        }
    }

    pub fn failed(task: &Task, error: TaskError) -> Self {
        Self {
            task_type: task.task_type.clone(),
            success: false,
            error: Some(error),
        }
    }
}

/// Aggregate of one pipeline run.
#[derive(Debug, Default)]
pub struct Verdict {
    pub approved: bool,
    /// One entry per dispatched task.
    pub results: Vec<TaskResult>,
    /// Tasks a worker dequeued before the pool stopped.
    pub dispatched: usize,
    /// Tasks resolved for the caller.
    pub task_count: usize,
}

impl Verdict {
    /// Verdict for a caller with no assigned tasks.
    pub fn vacuous() -> Self {
        Self {
            approved: true,
            ..Self::default()
        }
    }
}
