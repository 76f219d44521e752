//! Preview QA - acceptance testing for pull request preview deployments
//!
//! This library posts a test plan on a pull request, runs each planned test
//! case against the preview deployment with a browser automation agent, and
//! posts the results back as a report comment.

pub mod agent;
pub mod backoff;
pub mod config;
pub mod credentials;
pub mod error;
pub mod fakes;
pub mod format;
pub mod github;
pub mod pipeline;
pub mod plan;
pub mod stages;

pub use error::{Error, Result};

pub use agent::{BrowserUseClient, PollSettings, TaskExecutionService, TaskHandle, TaskOutcome};
pub use config::{PipelineConfig, Validate, ValidationResult};
pub use credentials::{Credential, CredentialSource};
pub use format::{
    block_quote, format_test_case, format_test_plan, format_test_report, parse_description,
    ParsedDescription,
};
pub use github::{
    ensure_posted, CommentResponse, GitHubClient, IssueCommentService, ThreadLocator,
};
pub use pipeline::{Credentials, Pipeline, PipelineContext, PipelineReport, StageOutcome, StepId};
pub use plan::{
    ExecutedTestCase, ExecutionResult, InitData, PlannedTestCase, PreviewEnvironment, TestPlan,
    TestStatus,
};
pub use stages::{AnnouncedPlan, PlanAnnouncer, ReportOutcome, ReportPublisher, TestExecutor};
