//! Preview QA CLI
//!
//! Runs the acceptance pipeline for one pull request.

use std::path::PathBuf;
use std::sync::Arc;

use preview_qa::{
    BrowserUseClient, Credentials, GitHubClient, InitData, Pipeline, PipelineConfig,
    PipelineReport, PreviewEnvironment, TestPlan, Validate,
};

fn usage(program: &str) {
    eprintln!("Usage: {} <plan.json> <pull-request-url> <preview-url> [config.toml]", program);
    eprintln!("\nPosts the test plan on the pull request, runs it against the preview");
    eprintln!("deployment and posts a test report.");
    eprintln!("\nEnvironment variables (default credential sources):");
    eprintln!("  GITHUB_TOKEN          Token used to post comments");
    eprintln!("  BROWSER_USE_API_KEY   Key for the browser automation agent");
}

async fn run(args: &[String]) -> preview_qa::Result<PipelineReport> {
    let plan_path = PathBuf::from(&args[1]);
    let init = InitData {
        pull_request_url: args[2].clone(),
    };
    let preview = PreviewEnvironment {
        preview_url: args[3].clone(),
    };

    let config = match args.get(4) {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    for warning in config.validate().into_result()? {
        tracing::warn!(%warning, "configuration warning");
    }

    let plan: TestPlan = serde_json::from_str(&std::fs::read_to_string(&plan_path)?)?;

    let credentials = Credentials {
        github: config.github.token.resolve()?,
        agent: config.agent.api_key.resolve()?,
    };

    let comments = Arc::new(GitHubClient::new(config.github.user_agent.clone())?);
    let agent = Arc::new(BrowserUseClient::new(
        config.agent.base_url.clone(),
        config.agent.poll_settings(),
    )?);

    let pipeline = Pipeline::new(comments, agent, credentials, config.github.api_root.clone())
        .with_max_parallel(config.execution.max_parallel);

    pipeline.run(init, plan, preview).await
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 4 {
        usage(args.first().map(String::as_str).unwrap_or("preview-qa"));
        std::process::exit(1);
    }

    match run(&args).await {
        Ok(PipelineReport::Terminated { run_id, .. }) => {
            println!("Run {}: no testing needed", run_id);
        }
        Ok(PipelineReport::Completed {
            run_id, execution, ..
        }) => {
            println!("\n{}", "=".repeat(60));
            println!("Run Complete: {}", run_id);
            println!("{}", "=".repeat(60));
            println!();
            println!("Passed: {}", execution.passed_count());
            println!("Failed: {}", execution.failed_count());

            if !execution.all_passed() {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Pipeline failed: {}", e);
            std::process::exit(1);
        }
    }
}
