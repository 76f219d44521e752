//! Pipeline stages.
//!
//! Each stage reads what it needs from the [`PipelineContext`] and talks to
//! collaborators only through the service traits.

mod announce;
mod execute;
mod report;

pub use announce::{AnnouncedPlan, PlanAnnouncer};
pub use execute::{build_instructions, TestExecutor};
pub use report::{ReportOutcome, ReportPublisher};

use crate::credentials::Credential;
use crate::error::Result;
use crate::github::{ensure_posted, IssueCommentService, ThreadLocator};
use crate::pipeline::PipelineContext;

/// Body posted when the plan needs no testing.
pub const NO_TESTING_NEEDED: &str = "## No testing needed";

/// Posts `body` on the run's pull request, failing on any rejection.
async fn post_to_pull_request(
    comments: &dyn IssueCommentService,
    ctx: &PipelineContext,
    api_root: &str,
    body: &str,
    token: &Credential,
) -> Result<()> {
    let thread =
        ThreadLocator::from_pull_request_url(&ctx.init_data().pull_request_url, api_root)?;
    let response = comments.post_comment(&thread, body, token).await?;
    ensure_posted(response, "post comment")
}
