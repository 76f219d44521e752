//! Test plan and execution result types.
//!
//! Field names serialize in camelCase so plans produced by the upstream
//! planning step can be read as-is.

use serde::{Deserialize, Serialize};

/// A test case as planned upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedTestCase {
    /// Short title.
    pub title: String,
    /// Free-text description, possibly containing `Steps:` / `Expected:`.
    pub description: String,
}

impl PlannedTestCase {
    /// Creates a planned test case.
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Outcome of a single executed test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    /// The agent reported success.
    Success,
    /// The agent reported failure, or execution errored.
    Fail,
}

/// A test case after execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutedTestCase {
    /// Title copied from the planned case.
    pub title: String,
    /// Final status.
    pub status: TestStatus,
    /// Agent output or error text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_description: Option<String>,
}

impl ExecutedTestCase {
    /// Returns true if the case passed.
    pub fn passed(&self) -> bool {
        self.status == TestStatus::Success
    }
}

/// Plan produced by the upstream planning step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestPlan {
    /// Whether the change needs acceptance testing at all.
    pub needs_testing: bool,
    /// Ordered test cases; empty when `needs_testing` is false.
    #[serde(default)]
    pub test_cases: Vec<PlannedTestCase>,
}

impl TestPlan {
    /// Creates a plan that requires testing.
    pub fn with_cases(test_cases: Vec<PlannedTestCase>) -> Self {
        Self {
            needs_testing: true,
            test_cases,
        }
    }

    /// Creates a plan that requires no testing.
    pub fn not_needed() -> Self {
        Self::default()
    }

    /// Drops test cases when testing is not needed.
    pub fn normalized(mut self) -> Self {
        if !self.needs_testing {
            self.test_cases.clear();
        }
        self
    }
}

/// Results produced by the test execution stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    /// Mirrors the plan's `needs_testing`.
    pub needs_testing: bool,
    /// One result per planned case, in plan order.
    #[serde(default)]
    pub test_cases: Vec<ExecutedTestCase>,
}

impl ExecutionResult {
    /// The result for a plan that needed no testing.
    pub fn skipped() -> Self {
        Self::default()
    }

    /// Number of passing cases.
    pub fn passed_count(&self) -> usize {
        self.test_cases.iter().filter(|c| c.passed()).count()
    }

    /// Number of failing cases.
    pub fn failed_count(&self) -> usize {
        self.test_cases.len() - self.passed_count()
    }

    /// Returns true if no case failed.
    pub fn all_passed(&self) -> bool {
        self.failed_count() == 0
    }
}

/// Output of the upstream step that waits for the preview deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewEnvironment {
    /// URL of the live preview deployment.
    pub preview_url: String,
}

/// Immutable data a pipeline run is started with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitData {
    /// URL of the pull request under test.
    pub pull_request_url: String,
}
