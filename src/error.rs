//! Error types for the preview acceptance pipeline.

use thiserror::Error;

use crate::pipeline::StepId;

/// Top-level error type for pipeline runs.
#[derive(Error, Debug)]
pub enum Error {
    /// A prior stage's output is not recorded in the pipeline context.
    #[error("result of step '{0}' not found")]
    MissingUpstreamResult(StepId),

    /// The commenting service rejected a comment.
    #[error("failed to {action}: GitHub responded with status {status}{}", detail_suffix(.detail))]
    CommentPost {
        action: String,
        status: u16,
        detail: Option<String>,
    },

    /// The pull request URL could not be parsed into a comment thread.
    #[error("invalid pull request URL: {0}")]
    InvalidPullRequestUrl(String),

    /// The automation service failed to run a task.
    #[error("{0}")]
    TaskExecution(String),

    /// The automation task did not settle in time.
    #[error("task {task_id} did not complete within {waited_secs} seconds")]
    TaskTimeout { task_id: String, waited_secs: u64 },

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A credential could not be resolved.
    #[error("credential error: {0}")]
    Credential(String),
}

fn detail_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(detail) => format!(" ({})", detail),
        None => String::new(),
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_post_error_includes_detail() {
        let err = Error::CommentPost {
            action: "post comment".to_string(),
            status: 404,
            detail: Some("Not Found".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "failed to post comment: GitHub responded with status 404 (Not Found)"
        );
    }

    #[test]
    fn comment_post_error_without_detail() {
        let err = Error::CommentPost {
            action: "post comment".to_string(),
            status: 500,
            detail: None,
        };
        assert_eq!(
            err.to_string(),
            "failed to post comment: GitHub responded with status 500"
        );
    }

    #[test]
    fn task_execution_error_is_bare_message() {
        let err = Error::TaskExecution("timeout".to_string());
        assert_eq!(err.to_string(), "timeout");
    }

    #[test]
    fn missing_upstream_names_the_step() {
        let err = Error::MissingUpstreamResult(StepId::GenerateTestPlan);
        assert_eq!(
            err.to_string(),
            "result of step 'generate-test-plan' not found"
        );
    }
}
