//! Linear acceptance pipeline: announce, gate, execute, report.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use crate::agent::TaskExecutionService;
use crate::credentials::Credential;
use crate::error::{Error, Result};
use crate::github::IssueCommentService;
use crate::plan::{ExecutionResult, InitData, PreviewEnvironment, TestPlan};
use crate::stages::{AnnouncedPlan, PlanAnnouncer, ReportOutcome, ReportPublisher, TestExecutor};

/// Identifies a pipeline step whose output can be looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepId {
    /// Upstream plan generation.
    GenerateTestPlan,
    /// Upstream wait for the preview deployment.
    WaitForPreview,
    /// Plan comment.
    PlanComment,
    /// Test execution.
    ExecuteTests,
    /// Report comment.
    TestReport,
}

impl StepId {
    /// Stable identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            StepId::GenerateTestPlan => "generate-test-plan",
            StepId::WaitForPreview => "wait-for-preview",
            StepId::PlanComment => "plan-comment",
            StepId::ExecuteTests => "execute-tests",
            StepId::TestReport => "test-report",
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run-scoped data shared by every stage.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    init: InitData,
    results: HashMap<StepId, serde_json::Value>,
}

impl PipelineContext {
    /// Creates a context for one run.
    pub fn new(init: InitData) -> Self {
        Self {
            init,
            results: HashMap::new(),
        }
    }

    /// Data the run was started with.
    pub fn init_data(&self) -> &InitData {
        &self.init
    }

    /// Records the output of a step.
    pub fn record<T: Serialize>(&mut self, step: StepId, output: &T) -> Result<()> {
        self.results.insert(step, serde_json::to_value(output)?);
        Ok(())
    }

    /// Returns the recorded output of a step.
    pub fn step_result<T: DeserializeOwned>(&self, step: StepId) -> Result<T> {
        let value = self
            .results
            .get(&step)
            .ok_or(Error::MissingUpstreamResult(step))?;
        Ok(T::deserialize(value)?)
    }
}

/// What a stage tells the driver to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome<T> {
    /// Hand the payload to the next stage.
    Continue(T),
    /// Stop the run; the payload is the final result.
    Terminate(T),
}

impl<T> StageOutcome<T> {
    /// Returns the payload regardless of variant.
    pub fn into_inner(self) -> T {
        match self {
            StageOutcome::Continue(payload) | StageOutcome::Terminate(payload) => payload,
        }
    }

    /// Returns true for `Terminate`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StageOutcome::Terminate(_))
    }
}

/// Final result of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineReport {
    /// The plan needed no testing; only the plan comment was posted.
    Terminated {
        /// Run identifier.
        run_id: String,
        /// Output of the announcer.
        announced: AnnouncedPlan,
    },
    /// All stages ran.
    Completed {
        /// Run identifier.
        run_id: String,
        /// Results of every executed case.
        execution: ExecutionResult,
        /// Output of the publisher.
        report: ReportOutcome,
    },
}

impl PipelineReport {
    /// Run identifier.
    pub fn run_id(&self) -> &str {
        match self {
            PipelineReport::Terminated { run_id, .. }
            | PipelineReport::Completed { run_id, .. } => run_id,
        }
    }

    /// Execution results, if the run got that far.
    pub fn execution(&self) -> Option<&ExecutionResult> {
        match self {
            PipelineReport::Terminated { .. } => None,
            PipelineReport::Completed { execution, .. } => Some(execution),
        }
    }

    /// Returns true unless some executed case failed.
    pub fn all_passed(&self) -> bool {
        self.execution().map_or(true, ExecutionResult::all_passed)
    }
}

/// Credentials for one invocation.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Token for the commenting service.
    pub github: Credential,
    /// Key for the automation service.
    pub agent: Credential,
}

/// Drives the stages in order and interprets [`StageOutcome`].
pub struct Pipeline {
    announcer: PlanAnnouncer,
    executor: TestExecutor,
    publisher: ReportPublisher,
}

impl Pipeline {
    /// Wires the stages to the collaborator services.
    pub fn new(
        comments: Arc<dyn IssueCommentService>,
        agent: Arc<dyn TaskExecutionService>,
        credentials: Credentials,
        api_root: impl Into<String>,
    ) -> Self {
        let api_root = api_root.into();
        Self {
            announcer: PlanAnnouncer::new(
                comments.clone(),
                api_root.clone(),
                credentials.github.clone(),
            ),
            executor: TestExecutor::new(agent, credentials.agent),
            publisher: ReportPublisher::new(comments, api_root, credentials.github),
        }
    }

    /// Bounds how many test cases run at once.
    pub fn with_max_parallel(mut self, max_parallel: Option<usize>) -> Self {
        self.executor = self.executor.with_max_parallel(max_parallel);
        self
    }

    /// Runs the pipeline for one pull request.
    ///
    /// Stage failures abort the run; per-case failures end up in the report.
    pub async fn run(
        &self,
        init: InitData,
        plan: TestPlan,
        preview: PreviewEnvironment,
    ) -> Result<PipelineReport> {
        let run_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("pipeline", run_id = %run_id);
        self.run_stages(run_id, init, plan.normalized(), preview)
            .instrument(span)
            .await
    }

    async fn run_stages(
        &self,
        run_id: String,
        init: InitData,
        plan: TestPlan,
        preview: PreviewEnvironment,
    ) -> Result<PipelineReport> {
        let mut ctx = PipelineContext::new(init);
        ctx.record(StepId::GenerateTestPlan, &plan)?;
        ctx.record(StepId::WaitForPreview, &preview)?;

        tracing::info!(
            pull_request = %ctx.init_data().pull_request_url,
            cases = plan.test_cases.len(),
            "starting acceptance pipeline"
        );

        let outcome = self.announcer.run(&plan, &ctx).await?;
        if outcome.is_terminal() {
            tracing::info!("no testing needed, stopping after plan comment");
            return Ok(PipelineReport::Terminated {
                run_id,
                announced: outcome.into_inner(),
            });
        }
        let announced = outcome.into_inner();
        ctx.record(StepId::PlanComment, &announced)?;

        let execution = self.executor.run(&preview, &ctx).await?;
        ctx.record(StepId::ExecuteTests, &execution)?;

        let report = self.publisher.run(&execution, &ctx).await?;
        ctx.record(StepId::TestReport, &report)?;

        tracing::info!(
            passed = execution.passed_count(),
            failed = execution.failed_count(),
            "acceptance pipeline complete"
        );

        Ok(PipelineReport::Completed {
            run_id,
            execution,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PlannedTestCase;

    fn context() -> PipelineContext {
        PipelineContext::new(InitData {
            pull_request_url: "https://github.com/acme/shop/pull/1".to_string(),
        })
    }

    #[test]
    fn step_result_round_trips_typed_output() {
        let mut ctx = context();
        let plan = TestPlan::with_cases(vec![PlannedTestCase::new("Login", "Open page")]);
        ctx.record(StepId::GenerateTestPlan, &plan).unwrap();

        let stored: TestPlan = ctx.step_result(StepId::GenerateTestPlan).unwrap();
        assert_eq!(stored, plan);
    }

    #[test]
    fn missing_step_result_is_an_error() {
        let ctx = context();
        let result: Result<TestPlan> = ctx.step_result(StepId::GenerateTestPlan);
        assert!(matches!(
            result,
            Err(Error::MissingUpstreamResult(StepId::GenerateTestPlan))
        ));
    }

    #[test]
    fn stage_outcome_helpers() {
        let cont = StageOutcome::Continue(1);
        let term = StageOutcome::Terminate(2);
        assert!(!cont.is_terminal());
        assert!(term.is_terminal());
        assert_eq!(cont.into_inner(), 1);
        assert_eq!(term.into_inner(), 2);
    }

    #[test]
    fn step_ids_are_kebab_case() {
        assert_eq!(StepId::ExecuteTests.to_string(), "execute-tests");
        assert_eq!(
            serde_json::to_string(&StepId::WaitForPreview).unwrap(),
            "\"wait-for-preview\""
        );
    }

    #[test]
    fn terminated_report_counts_as_passed() {
        let report = PipelineReport::Terminated {
            run_id: "r".to_string(),
            announced: AnnouncedPlan::not_needed(),
        };
        assert!(report.all_passed());
        assert!(report.execution().is_none());
        assert_eq!(report.run_id(), "r");
    }
}
