//! In-memory fakes for the collaborator traits (testing only).
//!
//! [`RecordingCommentService`] stores every posted comment and
//! [`ScriptedAgent`] plays back per-test-case behavior.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::agent::{TaskExecutionService, TaskHandle, TaskOutcome};
use crate::credentials::Credential;
use crate::error::{Error, Result};
use crate::github::{CommentResponse, IssueCommentService, ThreadLocator};

// ---------------------------------------------------------------------------
// RecordingCommentService
// ---------------------------------------------------------------------------

/// A comment captured by [`RecordingCommentService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedComment {
    /// Target thread.
    pub thread: ThreadLocator,
    /// Comment body.
    pub body: String,
}

/// Comment service that records posts and answers with a fixed response.
#[derive(Debug)]
pub struct RecordingCommentService {
    posts: Mutex<Vec<PostedComment>>,
    response: CommentResponse,
}

impl RecordingCommentService {
    /// Accepts every comment.
    pub fn new() -> Self {
        Self {
            posts: Mutex::new(Vec::new()),
            response: CommentResponse::created(201),
        }
    }

    /// Rejects every comment with the given status and message.
    pub fn rejecting(status: u16, message: &str) -> Self {
        Self {
            posts: Mutex::new(Vec::new()),
            response: CommentResponse::failed(status, Some(message.to_string())),
        }
    }

    /// All posted comments in order.
    pub fn posts(&self) -> Vec<PostedComment> {
        self.posts.lock().unwrap().clone()
    }

    /// Bodies of all posted comments in order.
    pub fn bodies(&self) -> Vec<String> {
        self.posts().into_iter().map(|p| p.body).collect()
    }
}

impl Default for RecordingCommentService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IssueCommentService for RecordingCommentService {
    async fn post_comment(
        &self,
        thread: &ThreadLocator,
        body: &str,
        _credential: &Credential,
    ) -> Result<CommentResponse> {
        self.posts.lock().unwrap().push(PostedComment {
            thread: thread.clone(),
            body: body.to_string(),
        });
        Ok(self.response.clone())
    }
}

// ---------------------------------------------------------------------------
// ScriptedAgent
// ---------------------------------------------------------------------------

/// What a scripted task does.
#[derive(Debug, Clone)]
enum Behavior {
    Complete(TaskOutcome),
    FailSubmit(String),
    FailAwait(String),
}

/// Behavior of one scripted test case.
#[derive(Debug, Clone)]
pub struct TaskScript {
    behavior: Behavior,
    delay: Duration,
}

impl TaskScript {
    /// Completes with a success verdict and the given output.
    pub fn succeed(output: &str) -> Self {
        Self::verdict(Some(true), Some(output))
    }

    /// Completes with an arbitrary verdict.
    pub fn verdict(is_success: Option<bool>, output: Option<&str>) -> Self {
        Self {
            behavior: Behavior::Complete(TaskOutcome {
                is_success,
                output: output.map(str::to_string),
            }),
            delay: Duration::ZERO,
        }
    }

    /// Fails when the task is submitted.
    pub fn fail_submit(message: &str) -> Self {
        Self {
            behavior: Behavior::FailSubmit(message.to_string()),
            delay: Duration::ZERO,
        }
    }

    /// Fails while awaiting completion.
    pub fn fail_await(message: &str) -> Self {
        Self {
            behavior: Behavior::FailAwait(message.to_string()),
            delay: Duration::ZERO,
        }
    }

    /// Delays completion by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Debug, Default)]
struct AgentLog {
    submitted: Vec<String>,
    completed: Vec<String>,
}

/// Automation service keyed by test case title.
///
/// Unscripted cases succeed with no output.
#[derive(Debug, Default)]
pub struct ScriptedAgent {
    scripts: Vec<(String, TaskScript)>,
    log: Arc<Mutex<AgentLog>>,
}

impl ScriptedAgent {
    /// Creates an agent with no scripts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the case with the given title.
    pub fn script(mut self, title: &str, script: TaskScript) -> Self {
        self.scripts.push((title.to_string(), script));
        self
    }

    /// Instructions of every submission, in submission order.
    pub fn submitted(&self) -> Vec<String> {
        self.log.lock().unwrap().submitted.clone()
    }

    /// Titles of settled tasks, in settlement order.
    pub fn completed(&self) -> Vec<String> {
        self.log.lock().unwrap().completed.clone()
    }

    fn lookup(&self, instructions: &str) -> (String, TaskScript) {
        self.scripts
            .iter()
            .find(|(title, _)| instructions.contains(&format!("test case: {}.", title)))
            .cloned()
            .unwrap_or_else(|| {
                (
                    instructions.to_string(),
                    TaskScript::verdict(Some(true), None),
                )
            })
    }
}

#[async_trait]
impl TaskExecutionService for ScriptedAgent {
    async fn submit(
        &self,
        instructions: &str,
        _credential: &Credential,
    ) -> Result<Box<dyn TaskHandle>> {
        self.log.lock().unwrap().submitted.push(instructions.to_string());

        let (title, script) = self.lookup(instructions);
        if let Behavior::FailSubmit(message) = &script.behavior {
            return Err(Error::TaskExecution(message.clone()));
        }

        Ok(Box::new(ScriptedTask {
            id: format!("task-{}", title),
            title,
            script,
            log: self.log.clone(),
        }))
    }
}

struct ScriptedTask {
    id: String,
    title: String,
    script: TaskScript,
    log: Arc<Mutex<AgentLog>>,
}

#[async_trait]
impl TaskHandle for ScriptedTask {
    fn id(&self) -> &str {
        &self.id
    }

    async fn await_completion(self: Box<Self>) -> Result<TaskOutcome> {
        if !self.script.delay.is_zero() {
            tokio::time::sleep(self.script.delay).await;
        }
        self.log.lock().unwrap().completed.push(self.title.clone());

        match self.script.behavior {
            Behavior::Complete(outcome) => Ok(outcome),
            Behavior::FailAwait(message) | Behavior::FailSubmit(message) => {
                Err(Error::TaskExecution(message))
            }
        }
    }
}
