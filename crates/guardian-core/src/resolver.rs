//! Catalog interfaces the pipeline and the API consume.
//!
//! Persistence is outside Guardian. The core only sees these traits.
//! [`InMemoryCatalog`] implements all of them from a JSON seed document and
//! is what the binary runs with.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::{Plugin, TargetModel, Task};

/// Resolves the tasks assigned to a user.
#[async_trait]
pub trait TaskResolver: Send + Sync {
    /// An empty list means the user has nothing assigned. Errors mean the
    /// assignment could not be determined and must not be read as "none".
    async fn tasks_for_user(&self, user_id: Uuid) -> Result<Vec<Task>, RepositoryError>;
}

/// Resolves the plugins that implement a task, in evaluation order.
#[async_trait]
pub trait PluginResolver: Send + Sync {
    async fn plugins_for_task(&self, task: &Task) -> Result<Vec<Plugin>, RepositoryError>;
}

/// Resolves a target model by id.
#[async_trait]
pub trait TargetModelResolver: Send + Sync {
    async fn target_model(&self, target_id: Uuid) -> Result<TargetModel, RepositoryError>;
}

#[derive(Debug, Deserialize)]
struct UserAssignment {
    id: Uuid,
    #[serde(default)]
    tasks: Vec<Uuid>,
}

/// Seed document for [`InMemoryCatalog`].
#[derive(Debug, Default, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    users: Vec<UserAssignment>,
    #[serde(default)]
    tasks: Vec<Task>,
    #[serde(default)]
    plugins: Vec<Plugin>,
    #[serde(default)]
    target_models: Vec<TargetModel>,
}

/// Read-only catalog held in memory.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    user_tasks: HashMap<Uuid, Vec<Uuid>>,
    tasks: HashMap<Uuid, Task>,
    plugins: HashMap<Uuid, Plugin>,
    targets: HashMap<Uuid, TargetModel>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: CatalogSeed) -> Self {
        let mut catalog = Self::new();
        for task in seed.tasks {
            catalog.tasks.insert(task.id, task);
        }
        for plugin in seed.plugins {
            catalog.plugins.insert(plugin.id, plugin);
        }
        for target in seed.target_models {
            catalog.targets.insert(target.id, target);
        }
        for user in seed.users {
            catalog.user_tasks.insert(user.id, user.tasks);
        }
        catalog
    }

    /// Parse a seed document from JSON text.
    pub fn from_json(json: &str) -> Result<Self, RepositoryError> {
        let seed: CatalogSeed = serde_json::from_str(json)
            .map_err(|e| RepositoryError::Unavailable(format!("invalid catalog seed: {}", e)))?;
        Ok(Self::from_seed(seed))
    }

    /// Load a seed document from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            RepositoryError::Unavailable(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    pub fn with_plugin(mut self, plugin: Plugin) -> Self {
        self.plugins.insert(plugin.id, plugin);
        self
    }

    pub fn with_task(mut self, task: Task) -> Self {
        self.tasks.insert(task.id, task);
        self
    }

    pub fn with_target(mut self, target: TargetModel) -> Self {
        self.targets.insert(target.id, target);
        self
    }

    /// Assign a task to a user. Assignment order is evaluation queue order.
    pub fn assign(mut self, user_id: Uuid, task_id: Uuid) -> Self {
        self.user_tasks.entry(user_id).or_default().push(task_id);
        self
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }
}

#[async_trait]
impl TaskResolver for InMemoryCatalog {
    async fn tasks_for_user(&self, user_id: Uuid) -> Result<Vec<Task>, RepositoryError> {
        let Some(task_ids) = self.user_tasks.get(&user_id) else {
            return Ok(Vec::new());
        };

        task_ids
            .iter()
            .map(|id| {
                self.tasks
                    .get(id)
                    .cloned()
                    .ok_or(RepositoryError::NotFound { kind: "task", id: *id })
            })
            .collect()
    }
}

#[async_trait]
impl PluginResolver for InMemoryCatalog {
    async fn plugins_for_task(&self, task: &Task) -> Result<Vec<Plugin>, RepositoryError> {
        task.plugins
            .iter()
            .map(|id| {
                self.plugins
                    .get(id)
                    .cloned()
                    .ok_or(RepositoryError::NotFound { kind: "plugin", id: *id })
            })
            .collect()
    }
}

#[async_trait]
impl TargetModelResolver for InMemoryCatalog {
    async fn target_model(&self, target_id: Uuid) -> Result<TargetModel, RepositoryError> {
        self.targets
            .get(&target_id)
            .cloned()
            .ok_or(RepositoryError::NotFound {
                kind: "target model",
                id: target_id,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Protocol, ProtocolKind};

    fn plugin(id: Uuid) -> Plugin {
        Plugin {
            id,
            name: "p".to_string(),
            provider: String::new(),
            address: "http://localhost:1/".to_string(),
            status: 1,
            token: None,
            protocol: Protocol::new(ProtocolKind::Http),
        }
    }

    #[tokio::test]
    async fn test_unknown_user_has_no_tasks() {
        let catalog = InMemoryCatalog::new();
        let tasks = catalog.tasks_for_user(Uuid::new_v4()).await.unwrap();
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn test_plugins_follow_task_order() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let task = Task {
            id: Uuid::new_v4(),
            task_type: "toxicity".to_string(),
            status: 1,
            plugins: vec![b, a],
        };
        let catalog = InMemoryCatalog::new()
            .with_plugin(plugin(a))
            .with_plugin(plugin(b));

        let plugins = catalog.plugins_for_task(&task).await.unwrap();
        assert_eq!(plugins.iter().map(|p| p.id).collect::<Vec<_>>(), vec![b, a]);
    }

    #[tokio::test]
    async fn test_dangling_plugin_reference_is_an_error() {
        let task = Task {
            id: Uuid::new_v4(),
            task_type: "pii".to_string(),
            status: 1,
            plugins: vec![Uuid::new_v4()],
        };
        let result = InMemoryCatalog::new().plugins_for_task(&task).await;
        assert!(matches!(result, Err(RepositoryError::NotFound { kind: "plugin", .. })));
    }

    #[tokio::test]
    async fn test_from_json_seed() {
        let user = Uuid::new_v4();
        let task = Uuid::new_v4();
        let target = Uuid::new_v4();
        let json = serde_json::json!({
            "users": [{ "id": user, "tasks": [task] }],
            "tasks": [{ "id": task, "type": "jailbreak", "plugins": [] }],
            "target_models": [{
                "id": target,
                "name": "echo",
                "address": "http://localhost:8000/v1/chat",
                "protocol": { "type": "http" }
            }]
        })
        .to_string();

        let catalog = InMemoryCatalog::from_json(&json).unwrap();
        let tasks = catalog.tasks_for_user(user).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].task_type, "jailbreak");
        assert_eq!(catalog.target_model(target).await.unwrap().name, "echo");
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let result = InMemoryCatalog::from_json("not json");
        assert!(matches!(result, Err(RepositoryError::Unavailable(_))));
    }
}
