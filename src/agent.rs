//! Browser automation agent.
//!
//! Test cases are executed by handing natural-language instructions to a
//! [`TaskExecutionService`] and awaiting the returned [`TaskHandle`].
//! [`BrowserUseClient`] implements the service against the Browser Use
//! cloud API.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::backoff::PollBackoff;
use crate::credentials::Credential;
use crate::error::{Error, Result};

/// Default Browser Use API root.
pub const DEFAULT_BASE_URL: &str = "https://api.browser-use.com";

/// Final state of an agent task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOutcome {
    /// The agent's own verdict; may be absent.
    #[serde(default)]
    pub is_success: Option<bool>,
    /// Free-text output of the agent.
    #[serde(default)]
    pub output: Option<String>,
}

/// A submitted task that can be awaited once.
#[async_trait]
pub trait TaskHandle: Send {
    /// Identifier assigned by the service.
    fn id(&self) -> &str;

    /// Waits until the task settles.
    async fn await_completion(self: Box<Self>) -> Result<TaskOutcome>;
}

/// Service that runs natural-language tasks in a browser.
#[async_trait]
pub trait TaskExecutionService: Send + Sync {
    /// Submits a task and returns a handle to await it.
    async fn submit(
        &self,
        instructions: &str,
        credential: &Credential,
    ) -> Result<Box<dyn TaskHandle>>;
}

/// Polling settings for [`BrowserUseClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// First delay between status checks; never below
    /// [`MIN_POLL_DELAY`](crate::backoff::MIN_POLL_DELAY).
    pub initial: Duration,
    /// Cap for the delay between status checks.
    pub max: Duration,
    /// Wall-clock time to wait for a task before giving up, status
    /// requests included.
    pub max_wait: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(2),
            max: Duration::from_secs(30),
            max_wait: Duration::from_secs(1800),
        }
    }
}

#[derive(Serialize)]
struct CreateTaskRequest<'a> {
    task: &'a str,
}

#[derive(Deserialize)]
struct CreateTaskResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskView {
    status: String,
    #[serde(default)]
    output: Option<String>,
    #[serde(default)]
    is_success: Option<bool>,
}

impl TaskView {
    fn is_terminal(&self) -> bool {
        matches!(self.status.as_str(), "finished" | "stopped")
    }
}

/// Browser Use REST implementation of [`TaskExecutionService`].
pub struct BrowserUseClient {
    http: reqwest::Client,
    base_url: String,
    poll: PollSettings,
}

impl BrowserUseClient {
    /// Creates a client for the given API root.
    pub fn new(base_url: impl Into<String>, poll: PollSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("preview-qa/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            poll,
        })
    }

    fn tasks_url(&self) -> String {
        format!("{}/api/v2/tasks", self.base_url)
    }
}

#[async_trait]
impl TaskExecutionService for BrowserUseClient {
    async fn submit(
        &self,
        instructions: &str,
        credential: &Credential,
    ) -> Result<Box<dyn TaskHandle>> {
        let response = self
            .http
            .post(self.tasks_url())
            .header("X-Browser-Use-API-Key", credential.expose())
            .json(&CreateTaskRequest { task: instructions })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::TaskExecution(format!(
                "task creation failed with status {}: {}",
                status.as_u16(),
                credential.redact(text.trim())
            )));
        }

        let created: CreateTaskResponse = response.json().await?;
        tracing::debug!(task_id = %created.id, "browser task created");

        Ok(Box::new(BrowserUseTask {
            http: self.http.clone(),
            url: format!("{}/{}", self.tasks_url(), created.id),
            id: created.id,
            credential: credential.clone(),
            poll: self.poll,
        }))
    }
}

/// Handle to a task running on Browser Use.
struct BrowserUseTask {
    http: reqwest::Client,
    url: String,
    id: String,
    credential: Credential,
    poll: PollSettings,
}

impl BrowserUseTask {
    async fn fetch(&self) -> Result<TaskView> {
        let response = self
            .http
            .get(&self.url)
            .header("X-Browser-Use-API-Key", self.credential.expose())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::TaskExecution(format!(
                "task {} status check failed with status {}",
                self.id,
                status.as_u16()
            )));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl TaskHandle for BrowserUseTask {
    fn id(&self) -> &str {
        &self.id
    }

    async fn await_completion(self: Box<Self>) -> Result<TaskOutcome> {
        let poll = self.poll;
        let mut backoff = PollBackoff::new(poll.initial, poll.max, poll.max_wait);

        loop {
            let view = self.fetch().await?;
            if view.is_terminal() {
                tracing::debug!(
                    task_id = %self.id,
                    status = %view.status,
                    "browser task settled"
                );
                return Ok(TaskOutcome {
                    is_success: view.is_success,
                    output: view.output,
                });
            }

            match backoff.next_delay() {
                Some(delay) => tokio::time::sleep(delay).await,
                None => {
                    return Err(Error::TaskTimeout {
                        task_id: self.id.clone(),
                        waited_secs: backoff.waited().as_secs(),
                    })
                }
            }
        }
    }
}
