use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, Result};

const CLOUD_TASKS_API_BASE: &str = "https://cloudtasks.googleapis.com/v2";
const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Minimum lead time granted to a task whose fire time has already passed.
const PAST_DUE_PUSH_SECS: i64 = 10;

/// Registers and cancels the delayed publish trigger for a post.
///
/// One task per post, addressed by a name derived from the post id, so that
/// re-scheduling the same post can never fan out into duplicate triggers.
#[async_trait]
pub trait TaskScheduler: Send + Sync {
    /// Registers a trigger that fires the publish callback at `run_at`.
    /// Returns an opaque handle identifying the registered task.
    async fn schedule_publish(&self, post_id: Uuid, run_at: DateTime<Utc>) -> Result<String>;

    /// Removes the trigger for a post. Returns whether a trigger existed;
    /// a missing trigger is success, it may have fired already.
    async fn cancel_publish(&self, post_id: Uuid) -> Result<bool>;

    /// Moves the trigger for a post to a new fire time. The deterministic
    /// task identity guarantees at most one trigger survives.
    async fn reschedule_publish(&self, post_id: Uuid, new_run_at: DateTime<Utc>) -> Result<String> {
        self.cancel_publish(post_id).await?;
        self.schedule_publish(post_id, new_run_at).await
    }

    /// Short backend label for startup logging.
    fn backend(&self) -> &'static str {
        "custom"
    }
}

/// Development stand-in that registers nothing. The reconciliation sweep
/// picks up due posts instead.
pub struct NoopTaskScheduler;

#[async_trait]
impl TaskScheduler for NoopTaskScheduler {
    async fn schedule_publish(&self, post_id: Uuid, run_at: DateTime<Utc>) -> Result<String> {
        info!(
            "Dev mode: skipping task creation for post {} (would fire at {})",
            post_id, run_at
        );
        Ok(format!("dev-task-{}", post_id))
    }

    async fn cancel_publish(&self, post_id: Uuid) -> Result<bool> {
        info!("Dev mode: skipping task cancellation for post {}", post_id);
        Ok(false)
    }

    fn backend(&self) -> &'static str {
        "noop"
    }
}

#[derive(Deserialize)]
struct MetadataToken {
    access_token: String,
}

#[derive(Deserialize)]
struct TaskResource {
    name: String,
}

enum CreateOutcome {
    Created(String),
    AlreadyExists,
}

/// Cloud Tasks backed scheduler. Tasks carry an HTTP target pointing back at
/// this service's publish callback.
pub struct CloudTasksScheduler {
    http: reqwest::Client,
    api_base: String,
    queue_path: String,
    target_base_url: String,
    oidc_service_account: Option<String>,
    /// Fixed bearer token. None means fetch one from the GCE metadata
    /// server per request.
    access_token: Option<String>,
}

impl CloudTasksScheduler {
    pub fn new(
        http: reqwest::Client,
        queue_path: String,
        target_base_url: String,
        oidc_service_account: Option<String>,
    ) -> Self {
        Self {
            http,
            api_base: CLOUD_TASKS_API_BASE.to_string(),
            queue_path,
            target_base_url,
            oidc_service_account,
            access_token: None,
        }
    }

    fn task_name(&self, post_id: Uuid) -> String {
        format!("{}/tasks/publish-post-{}", self.queue_path, post_id)
    }

    fn callback_url(&self, post_id: Uuid) -> String {
        format!(
            "{}/scheduler/publish-post/{}",
            self.target_base_url.trim_end_matches('/'),
            post_id
        )
    }

    async fn bearer_token(&self) -> Result<String> {
        if let Some(token) = &self.access_token {
            return Ok(token.clone());
        }

        let token: MetadataToken = self
            .http
            .get(METADATA_TOKEN_URL)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| AppError::TaskQueue(format!("Failed to reach metadata server: {}", e)))?
            .json()
            .await
            .map_err(|e| AppError::TaskQueue(format!("Invalid metadata token response: {}", e)))?;

        Ok(token.access_token)
    }

    async fn create_task(
        &self,
        token: &str,
        task_name: &str,
        post_id: Uuid,
        run_at: DateTime<Utc>,
    ) -> Result<CreateOutcome> {
        let mut http_request = serde_json::json!({
            "httpMethod": "POST",
            "url": self.callback_url(post_id),
            "headers": { "Content-Type": "application/json" },
        });
        if let Some(account) = &self.oidc_service_account {
            http_request["oidcToken"] = serde_json::json!({ "serviceAccountEmail": account });
        }

        let body = serde_json::json!({
            "task": {
                "name": task_name,
                "scheduleTime": run_at.to_rfc3339_opts(SecondsFormat::Secs, true),
                "httpRequest": http_request,
            }
        });

        let response = self
            .http
            .post(format!("{}/{}/tasks", self.api_base, self.queue_path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::TaskQueue(format!("Task creation request failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::CONFLICT {
            return Ok(CreateOutcome::AlreadyExists);
        }
        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::TaskQueue(format!(
                "Task creation returned {}: {}",
                status, detail
            )));
        }

        let task: TaskResource = response
            .json()
            .await
            .map_err(|e| AppError::TaskQueue(format!("Invalid task creation response: {}", e)))?;

        Ok(CreateOutcome::Created(task.name))
    }

    async fn delete_task(&self, token: &str, task_name: &str) -> Result<bool> {
        let response = self
            .http
            .delete(format!("{}/{}", self.api_base, task_name))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AppError::TaskQueue(format!("Task deletion request failed: {}", e)))?;

        // A missing task means there is nothing left to cancel.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if response.status().is_success() {
            return Ok(true);
        }

        let status = response.status();
        let detail = response.text().await.unwrap_or_default();
        Err(AppError::TaskQueue(format!(
            "Task deletion returned {}: {}",
            status, detail
        )))
    }
}

#[async_trait]
impl TaskScheduler for CloudTasksScheduler {
    async fn schedule_publish(&self, post_id: Uuid, run_at: DateTime<Utc>) -> Result<String> {
        let now = Utc::now();
        let effective_run_at = if run_at <= now {
            // Never hand Cloud Tasks a time in the past.
            now + Duration::seconds(PAST_DUE_PUSH_SECS)
        } else {
            run_at
        };

        let token = self.bearer_token().await?;
        let task_name = self.task_name(post_id);

        match self
            .create_task(&token, &task_name, post_id, effective_run_at)
            .await?
        {
            CreateOutcome::Created(name) => {
                info!("Created publish task {} firing at {}", name, effective_run_at);
                Ok(name)
            }
            CreateOutcome::AlreadyExists => {
                warn!(
                    "Publish task {} already exists, replacing with new schedule time",
                    task_name
                );
                self.delete_task(&token, &task_name).await?;
                match self
                    .create_task(&token, &task_name, post_id, effective_run_at)
                    .await?
                {
                    CreateOutcome::Created(name) => Ok(name),
                    CreateOutcome::AlreadyExists => Err(AppError::TaskQueue(format!(
                        "Task {} still exists after deletion",
                        task_name
                    ))),
                }
            }
        }
    }

    async fn cancel_publish(&self, post_id: Uuid) -> Result<bool> {
        let token = self.bearer_token().await?;
        let task_name = self.task_name(post_id);
        let existed = self.delete_task(&token, &task_name).await?;
        if existed {
            info!("Cancelled publish task {}", task_name);
        } else {
            info!("Publish task {} was already gone", task_name);
        }
        Ok(existed)
    }

    fn backend(&self) -> &'static str {
        "cloud-tasks"
    }
}

/// Selects the scheduler implementation by queue-config presence: Cloud
/// Tasks when a queue is configured, otherwise the logging no-op and the
/// sweep is the sole delivery mechanism.
pub fn build_task_scheduler(config: &Config, http: reqwest::Client) -> Arc<dyn TaskScheduler> {
    match &config.cloud_tasks {
        Some(tasks_config) => {
            info!("Using Cloud Tasks scheduler on queue {}", tasks_config.queue_path());
            Arc::new(CloudTasksScheduler::new(
                http,
                tasks_config.queue_path(),
                tasks_config.service_base_url.clone(),
                tasks_config.oidc_service_account.clone(),
            ))
        }
        None => {
            warn!("Cloud Tasks is not configured, falling back to the no-op scheduler");
            Arc::new(NoopTaskScheduler)
        }
    }
}
