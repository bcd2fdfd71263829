//! Research queries from the command line

use crate::state::AppState;
use anyhow::Result;
use clap::Args;
use tokio_util::sync::CancellationToken;

/// Answer a research query
///
/// Usage:
///   driftwatch research "latest GenAI courses"
#[derive(Args, Debug)]
pub struct ResearchArgs {
    /// The question to answer
    pub query: String,
}

pub async fn research(app: &AppState, args: ResearchArgs) -> Result<String> {
    let outcome = app
        .research
        .answer(&args.query, &CancellationToken::new())
        .await?;

    let route = serde_json::to_value(outcome.route)?;
    Ok(format!(
        "Route: {}\n\n{}",
        route.as_str().unwrap_or_default(),
        outcome.answer
    ))
}
