//! Runs planned test cases against the preview deployment.
//!
//! Every case is submitted to the automation service concurrently and the
//! stage waits for all of them to settle. A case that errors is recorded
//! as a failure; it never aborts its siblings.

use std::sync::Arc;

use futures::future::join_all;
use futures::stream::{self, StreamExt};

use crate::agent::{TaskExecutionService, TaskOutcome};
use crate::credentials::Credential;
use crate::error::Result;
use crate::pipeline::{PipelineContext, StepId};
use crate::plan::{
    ExecutedTestCase, ExecutionResult, PlannedTestCase, PreviewEnvironment, TestPlan, TestStatus,
};

/// Builds the agent instructions for one test case.
pub fn build_instructions(preview_url: &str, test_case: &PlannedTestCase) -> String {
    format!(
        "Navigate to {} and execute this test case: {}. {}",
        preview_url, test_case.title, test_case.description
    )
}

/// Stage that executes the plan's test cases.
pub struct TestExecutor {
    agent: Arc<dyn TaskExecutionService>,
    api_key: Credential,
    max_parallel: Option<usize>,
}

impl TestExecutor {
    /// Creates the stage with unbounded fan-out.
    pub fn new(agent: Arc<dyn TaskExecutionService>, api_key: Credential) -> Self {
        Self {
            agent,
            api_key,
            max_parallel: None,
        }
    }

    /// Bounds how many cases run at once; `None` runs all together.
    pub fn with_max_parallel(mut self, max_parallel: Option<usize>) -> Self {
        self.max_parallel = max_parallel;
        self
    }

    /// Executes every planned case and returns results in plan order.
    pub async fn run(
        &self,
        preview: &PreviewEnvironment,
        ctx: &PipelineContext,
    ) -> Result<ExecutionResult> {
        let plan: TestPlan = ctx.step_result(StepId::GenerateTestPlan)?;

        if !plan.needs_testing {
            return Ok(ExecutionResult::skipped());
        }

        tracing::info!(
            cases = plan.test_cases.len(),
            preview_url = %preview.preview_url,
            "executing test cases"
        );

        let executions = plan
            .test_cases
            .iter()
            .map(|case| self.execute_case(&preview.preview_url, case));

        let test_cases = match self.max_parallel {
            Some(limit) => {
                stream::iter(executions)
                    .buffered(limit.max(1))
                    .collect::<Vec<_>>()
                    .await
            }
            None => join_all(executions).await,
        };

        Ok(ExecutionResult {
            needs_testing: true,
            test_cases,
        })
    }

    async fn execute_case(&self, preview_url: &str, case: &PlannedTestCase) -> ExecutedTestCase {
        match self.submit_and_await(preview_url, case).await {
            Ok(outcome) => {
                let status = if outcome.is_success == Some(true) {
                    TestStatus::Success
                } else {
                    TestStatus::Fail
                };
                tracing::info!(case = %case.title, ?status, "test case completed");
                ExecutedTestCase {
                    title: case.title.clone(),
                    status,
                    result_description: outcome.output.filter(|output| !output.is_empty()),
                }
            }
            Err(e) => {
                tracing::warn!(case = %case.title, error = %e, "test case errored");
                ExecutedTestCase {
                    title: case.title.clone(),
                    status: TestStatus::Fail,
                    result_description: Some(format!("Error: {}", e)),
                }
            }
        }
    }

    async fn submit_and_await(
        &self,
        preview_url: &str,
        case: &PlannedTestCase,
    ) -> Result<TaskOutcome> {
        let instructions = build_instructions(preview_url, case);
        let handle = self.agent.submit(&instructions, &self.api_key).await?;
        tracing::debug!(case = %case.title, task_id = %handle.id(), "task submitted");
        handle.await_completion().await
    }
}
