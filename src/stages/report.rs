//! Posts the closing test report.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::credentials::Credential;
use crate::error::Result;
use crate::format::format_test_report;
use crate::github::IssueCommentService;
use crate::pipeline::PipelineContext;
use crate::plan::ExecutionResult;

use super::{post_to_pull_request, NO_TESTING_NEEDED};

/// Output of the report stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportOutcome {
    /// Whether the report was posted.
    pub success: bool,
}

/// Renders the report comment body.
pub(crate) fn report_comment(result: &ExecutionResult) -> String {
    if !result.needs_testing {
        return NO_TESTING_NEEDED.to_string();
    }
    format!("## Test Report\n\n{}", format_test_report(&result.test_cases))
}

/// Stage that publishes results on the pull request.
pub struct ReportPublisher {
    comments: Arc<dyn IssueCommentService>,
    api_root: String,
    token: Credential,
}

impl ReportPublisher {
    /// Creates the stage.
    pub fn new(
        comments: Arc<dyn IssueCommentService>,
        api_root: String,
        token: Credential,
    ) -> Self {
        Self {
            comments,
            api_root,
            token,
        }
    }

    /// Posts the report. Always the last stage of a run.
    pub async fn run(
        &self,
        result: &ExecutionResult,
        ctx: &PipelineContext,
    ) -> Result<ReportOutcome> {
        let body = report_comment(result);
        post_to_pull_request(self.comments.as_ref(), ctx, &self.api_root, &body, &self.token)
            .await?;

        tracing::info!(
            passed = result.passed_count(),
            failed = result.failed_count(),
            "test report posted"
        );
        Ok(ReportOutcome { success: true })
    }
}
