//! Pull request comment posting.
//!
//! The pipeline talks to GitHub only through [`IssueCommentService`];
//! [`GitHubClient`] is the REST implementation used by the binary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::credentials::Credential;
use crate::error::{Error, Result};

/// Default GitHub REST API root.
pub const DEFAULT_API_ROOT: &str = "https://api.github.com";

/// Identifies the issue comment thread of a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadLocator {
    /// Repository API base, e.g. `https://api.github.com/repos/owner/repo`.
    pub api_base: String,
    /// Pull request (issue) number.
    pub issue_number: u64,
}

impl ThreadLocator {
    /// Parses `https://github.com/{owner}/{repo}/pull/{number}[/...]`.
    ///
    /// Query strings, fragments and trailing path segments such as `/files`
    /// are ignored.
    pub fn from_pull_request_url(url: &str, api_root: &str) -> Result<Self> {
        let invalid = || Error::InvalidPullRequestUrl(url.to_string());

        let without_scheme = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .ok_or_else(invalid)?;
        let path = without_scheme
            .split(['?', '#'])
            .next()
            .unwrap_or(without_scheme);

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        // host, owner, repo, "pull", number
        if segments.len() < 5 || !matches!(segments[3], "pull" | "pulls") {
            return Err(invalid());
        }

        let issue_number: u64 = segments[4].parse().map_err(|_| invalid())?;

        Ok(Self {
            api_base: format!(
                "{}/repos/{}/{}",
                api_root.trim_end_matches('/'),
                segments[1],
                segments[2]
            ),
            issue_number,
        })
    }

    /// Endpoint for the thread's issue comments.
    pub fn comments_url(&self) -> String {
        format!("{}/issues/{}/comments", self.api_base, self.issue_number)
    }
}

/// Response from posting a comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentResponse {
    /// Whether the comment was created.
    pub success: bool,
    /// HTTP status code.
    pub status: u16,
    /// Error message returned by the service, if any.
    pub error_detail: Option<String>,
}

impl CommentResponse {
    /// A successful response with the given status.
    pub fn created(status: u16) -> Self {
        Self {
            success: true,
            status,
            error_detail: None,
        }
    }

    /// A failed response.
    pub fn failed(status: u16, error_detail: Option<String>) -> Self {
        Self {
            success: false,
            status,
            error_detail,
        }
    }
}

/// Converts a non-success response into [`Error::CommentPost`].
pub fn ensure_posted(response: CommentResponse, action: &str) -> Result<()> {
    if response.success {
        return Ok(());
    }
    Err(Error::CommentPost {
        action: action.to_string(),
        status: response.status,
        detail: response.error_detail,
    })
}

/// Service that posts comments on a pull request thread.
#[async_trait]
pub trait IssueCommentService: Send + Sync {
    /// Posts `body` as a new comment on `thread`.
    ///
    /// Transport failures are `Err`; a rejected comment is an `Ok` response
    /// with `success == false`.
    async fn post_comment(
        &self,
        thread: &ThreadLocator,
        body: &str,
        credential: &Credential,
    ) -> Result<CommentResponse>;
}

#[derive(Serialize)]
struct CommentRequest<'a> {
    body: &'a str,
}

#[derive(Deserialize)]
struct GitHubErrorBody {
    message: Option<String>,
}

/// GitHub REST implementation of [`IssueCommentService`].
pub struct GitHubClient {
    http: reqwest::Client,
}

impl GitHubClient {
    /// Creates a client sending the given user agent.
    pub fn new(user_agent: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent.into())
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl IssueCommentService for GitHubClient {
    async fn post_comment(
        &self,
        thread: &ThreadLocator,
        body: &str,
        credential: &Credential,
    ) -> Result<CommentResponse> {
        let url = thread.comments_url();
        tracing::debug!(url = %url, bytes = body.len(), "posting GitHub comment");

        let response = self
            .http
            .post(&url)
            .bearer_auth(credential.expose())
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .json(&CommentRequest { body })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(CommentResponse::created(status.as_u16()));
        }

        let text = response.text().await.unwrap_or_default();
        let detail = error_detail_from_body(&text).map(|d| credential.redact(&d));
        tracing::warn!(status = status.as_u16(), "GitHub rejected comment");

        Ok(CommentResponse::failed(status.as_u16(), detail))
    }
}

/// Extracts the `message` field from a GitHub error body, falling back to
/// the raw text.
fn error_detail_from_body(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<GitHubErrorBody>(trimmed) {
        Ok(GitHubErrorBody {
            message: Some(message),
        }) => Some(message),
        _ => Some(trimmed.to_string()),
    }
}
