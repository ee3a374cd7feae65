//! Admission pipeline: evaluate every task assigned to a caller against a
//! prompt before it may reach a target model.
//!
//! ## Evaluation model
//!
//! - The caller's tasks are loaded into a bounded queue which is closed
//!   before any worker starts pulling.
//! - A fixed pool of workers drains the queue. A task is a conjunction of its
//!   plugins, called in order; the first negative verdict or error ends it.
//! - The first failed task fires a one-shot cancellation token. Workers stop
//!   taking new tasks once they see it. A worker already waiting on the queue
//!   may still pick up one more task, so the set of tasks that ran varies
//!   between runs; the verdict does not.
//! - A panic while evaluating a task is reported as that task's failure.
//! - The orchestrator joins every worker before draining results.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::ClientResolver;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, TaskError};
use crate::models::{PluginRequest, Task, TaskResult, Verdict};
use crate::resolver::{PluginResolver, TaskResolver};

type TaskQueue = Arc<Mutex<mpsc::Receiver<Task>>>;

/// Runs the admission pipeline for incoming prompts.
#[derive(Clone)]
pub struct PromptService {
    tasks: Arc<dyn TaskResolver>,
    plugins: Arc<dyn PluginResolver>,
    clients: Arc<dyn ClientResolver>,
    worker_pool_size: usize,
}

impl PromptService {
    pub fn new(
        tasks: Arc<dyn TaskResolver>,
        plugins: Arc<dyn PluginResolver>,
        clients: Arc<dyn ClientResolver>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            tasks,
            plugins,
            clients,
            worker_pool_size: config.worker_pool_size.max(1),
        }
    }

    pub fn worker_pool_size(&self) -> usize {
        self.worker_pool_size
    }

    /// Decide whether `request` may be forwarded.
    ///
    /// An empty prompt is never forwarded and is not an error. Failure to
    /// resolve the caller's tasks is an error. Plugin failures only turn
    /// the verdict negative.
    pub async fn process_prompt(&self, request: &PluginRequest) -> Result<bool, PipelineError> {
        if request.prompt.is_empty() {
            return Ok(false);
        }

        let verdict = self.evaluate(request).await?;
        Ok(verdict.approved)
    }

    /// Run the pipeline and return the full aggregate.
    pub async fn evaluate(&self, request: &PluginRequest) -> Result<Verdict, PipelineError> {
        if request.prompt.is_empty() {
            return Ok(Verdict::default());
        }

        let tasks = self
            .tasks
            .tasks_for_user(request.user_id)
            .await
            .map_err(|e| {
                error!(user_id = %request.user_id, error = %e, "failed to resolve user tasks");
                PipelineError::TaskResolution(e)
            })?;

        if tasks.is_empty() {
            debug!(user_id = %request.user_id, "no tasks assigned, prompt admitted");
            metrics::counter!("guardian_prompts_total", "verdict" => "approved").increment(1);
            return Ok(Verdict::vacuous());
        }

        let verdict = self.run_workers(tasks, request).await;

        let label = if verdict.approved { "approved" } else { "rejected" };
        metrics::counter!("guardian_prompts_total", "verdict" => label).increment(1);
        info!(
            user_id = %request.user_id,
            target_id = %request.target_id,
            approved = verdict.approved,
            tasks = verdict.task_count,
            dispatched = verdict.dispatched,
            "prompt evaluated"
        );

        Ok(verdict)
    }

    async fn run_workers(&self, tasks: Vec<Task>, request: &PluginRequest) -> Verdict {
        let task_count = tasks.len();

        let (task_tx, task_rx) = mpsc::channel(task_count);
        for task in tasks {
            // Capacity equals the task count, so this never waits.
            if task_tx.send(task).await.is_err() {
                break;
            }
        }
        drop(task_tx);

        let queue: TaskQueue = Arc::new(Mutex::new(task_rx));
        let (result_tx, mut result_rx) = mpsc::channel(task_count);
        let cancel = CancellationToken::new();
        let dispatched = Arc::new(AtomicUsize::new(0));

        let worker = Worker {
            plugins: Arc::clone(&self.plugins),
            clients: Arc::clone(&self.clients),
            request: Arc::new(request.clone()),
        };

        let mut workers = JoinSet::new();
        for id in 0..self.worker_pool_size.min(task_count) {
            workers.spawn(worker.clone().run(
                id,
                Arc::clone(&queue),
                result_tx.clone(),
                cancel.clone(),
                Arc::clone(&dispatched),
            ));
        }
        drop(result_tx);

        let mut worker_panicked = false;
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "pipeline worker terminated abnormally");
                worker_panicked = true;
            }
        }

        let mut results = Vec::with_capacity(task_count);
        while let Some(result) = result_rx.recv().await {
            results.push(result);
        }

        let mut approved = !worker_panicked;
        for result in &results {
            if let Some(err) = &result.error {
                error!(task = %result.task_type, error = %err, "task faced error");
            }
            if !result.success {
                info!(task = %result.task_type, "task failed");
                approved = false;
            }
        }

        Verdict {
            approved,
            results,
            dispatched: dispatched.load(Ordering::SeqCst),
            task_count,
        }
    }
}

/// State each worker needs, shared across the pool.
#[derive(Clone)]
struct Worker {
    plugins: Arc<dyn PluginResolver>,
    clients: Arc<dyn ClientResolver>,
    request: Arc<PluginRequest>,
}

impl Worker {
    async fn run(
        self,
        id: usize,
        queue: TaskQueue,
        results: mpsc::Sender<TaskResult>,
        cancel: CancellationToken,
        dispatched: Arc<AtomicUsize>,
    ) {
        loop {
            let task = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(worker = id, "worker stopping on cancellation");
                    return;
                }
                task = next_task(&queue) => match task {
                    Some(task) => task,
                    None => return,
                },
            };

            dispatched.fetch_add(1, Ordering::SeqCst);
            let result = match AssertUnwindSafe(self.evaluate_task(&task)).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    error!(worker = id, task = %task.task_type, panic = %message, "task evaluation panicked");
                    TaskResult::failed(&task, TaskError::Panicked(message))
                }
            };
            let failed = !result.success;

            if results.send(result).await.is_err() {
                warn!(worker = id, "result channel closed before task result was delivered");
                return;
            }

            if failed {
                metrics::counter!("guardian_task_failures_total").increment(1);
                cancel.cancel();
                return;
            }
        }
    }

    /// Call the task's plugins in order, stopping at the first one that
    /// does not pass.
    async fn evaluate_task(&self, task: &Task) -> TaskResult {
        let plugins = match self.plugins.plugins_for_task(task).await {
            Ok(plugins) => plugins,
            Err(e) => return TaskResult::failed(task, TaskError::PluginResolution(e)),
        };

        for plugin in &plugins {
            let client = match self.clients.client_for(plugin) {
                Ok(client) => client,
                Err(source) => {
                    warn!(task = %task.task_type, plugin = %plugin.name, error = %source, "plugin dispatch failed");
                    return TaskResult::failed(
                        task,
                        TaskError::Plugin {
                            plugin: plugin.name.clone(),
                            source,
                        },
                    );
                }
            };

            let mut request = (*self.request).clone();
            request.address = plugin.address.clone();

            match client.forward(&request).await {
                Ok(response) if response.status => {
                    debug!(task = %task.task_type, plugin = %plugin.name, score = ?response.score, "plugin passed");
                }
                Ok(response) => {
                    info!(task = %task.task_type, plugin = %plugin.name, score = ?response.score, "plugin rejected prompt");
                    return TaskResult::rejected(task);
                }
                Err(source) => {
                    warn!(task = %task.task_type, plugin = %plugin.name, address = %plugin.address, error = %source, "plugin call failed");
                    return TaskResult::failed(
                        task,
                        TaskError::Plugin {
                            plugin: plugin.name.clone(),
                            source,
                        },
                    );
                }
            }
        }

        TaskResult::passed(task)
    }
}

async fn next_task(queue: &TaskQueue) -> Option<Task> {
    queue.lock().await.recv().await
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
