//! Posts the test plan and decides whether the run continues.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::credentials::Credential;
use crate::error::Result;
use crate::format::format_test_plan;
use crate::github::IssueCommentService;
use crate::pipeline::{PipelineContext, StageOutcome};
use crate::plan::{PlannedTestCase, TestPlan};

use super::{post_to_pull_request, NO_TESTING_NEEDED};

/// Output of the plan announcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncedPlan {
    /// Whether the comment was posted.
    pub success: bool,
    /// Copied from the plan.
    pub needs_testing: bool,
    /// Cases forwarded downstream.
    pub test_cases: Vec<PlannedTestCase>,
}

impl AnnouncedPlan {
    /// The terminal output when no testing is needed.
    pub fn not_needed() -> Self {
        Self {
            success: true,
            needs_testing: false,
            test_cases: Vec::new(),
        }
    }
}

/// Renders the plan comment body.
pub(crate) fn plan_comment(plan: &TestPlan) -> String {
    if !plan.needs_testing {
        return NO_TESTING_NEEDED.to_string();
    }
    format!("## Test Plan\n\n{}", format_test_plan(&plan.test_cases))
}

/// Stage that announces the plan on the pull request.
pub struct PlanAnnouncer {
    comments: Arc<dyn IssueCommentService>,
    api_root: String,
    token: Credential,
}

impl PlanAnnouncer {
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

    /// Posts the plan; terminates the run when no testing is needed.
    pub async fn run(
        &self,
        plan: &TestPlan,
        ctx: &PipelineContext,
    ) -> Result<StageOutcome<AnnouncedPlan>> {
        let body = plan_comment(plan);
        post_to_pull_request(self.comments.as_ref(), ctx, &self.api_root, &body, &self.token)
            .await?;

        if !plan.needs_testing {
            return Ok(StageOutcome::Terminate(AnnouncedPlan::not_needed()));
        }

        tracing::info!(cases = plan.test_cases.len(), "test plan posted");
        Ok(StageOutcome::Continue(AnnouncedPlan {
            success: true,
            needs_testing: true,
            test_cases: plan.test_cases.clone(),
        }))
    }
}
