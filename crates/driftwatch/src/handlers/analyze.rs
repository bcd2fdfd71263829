//! Run an analysis from the command line

use crate::state::AppState;
use anyhow::{Context, Result};
use clap::Args;
use driftwatch_core::{AnalysisRecord, RunParameters};
use driftwatch_pipeline::{Error as PipelineError, OkrWorkflow, StageObserver};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Analyze one subject's OKR history
///
/// Usage:
///   driftwatch analyze 1
///   driftwatch analyze 1 --goal "ML engineer" --level intermediate
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Subject to analyze
    pub subject_id: i64,

    /// Quarterly goal
    #[arg(short, long, default_value = RunParameters::DEFAULT_GOAL)]
    pub goal: String,

    /// Current level
    #[arg(short, long, default_value = RunParameters::DEFAULT_LEVEL)]
    pub level: String,

    /// Number of activity cycles to consider
    #[arg(short, long, default_value_t = RunParameters::DEFAULT_CYCLES)]
    pub cycles: u32,

    /// Print the full record as JSON
    #[arg(long)]
    pub json: bool,
}

/// Progress bar advanced once per finished stage
struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    fn new() -> Self {
        let bar = ProgressBar::new(OkrWorkflow::STAGE_COUNT as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }
}

impl StageObserver for ProgressObserver {
    fn stage_started(&self, stage: &'static str, _step: usize) {
        self.bar.set_message(format!("{}...", stage));
    }

    fn stage_finished(&self, stage: &'static str, _step: usize, elapsed: Duration) {
        self.bar.inc(1);
        self.bar
            .println(format!("  ✓ {} ({:.1}s)", stage, elapsed.as_secs_f64()));
    }

    fn stage_failed(&self, stage: &'static str, error: &PipelineError) {
        self.bar.abandon_with_message(format!("{} failed: {}", stage, error));
    }
}

pub async fn analyze(app: &AppState, args: AnalyzeArgs) -> Result<String> {
    let params = RunParameters::new(args.goal, args.level).with_cycles(args.cycles);

    let observer = Arc::new(ProgressObserver::new());
    let analyzer = app.observed_analyzer(observer.clone());

    // Ctrl-C stops the run between or during stages
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received; cancelling analysis");
            on_interrupt.cancel();
        }
    });

    let record = analyzer
        .run_with_cancel(args.subject_id, params, &cancel)
        .await
        .with_context(|| format!("Analysis of subject {} failed", args.subject_id))?;
    observer.bar.finish_with_message("done");

    if args.json {
        return Ok(serde_json::to_string_pretty(&record)?);
    }
    Ok(render(&record))
}

fn render(record: &AnalysisRecord) -> String {
    let drift = &record.drift_analysis;
    let mut out = format!(
        "✓ Analysis {} for {} ({})\n  Goal: {} ({})\n  Readiness: {}/100\n",
        record.id,
        record.student_info.name,
        record.student_info.register_number,
        record.goal_analysis.quarterly_goal,
        record.goal_analysis.current_level,
        record.goal_analysis.readiness_score,
    );

    if record.history.synthesized {
        out.push_str("  History: placeholder (no stored activity)\n");
    }

    out.push_str(&format!("\nTrajectory:\n  {}\n", record.trajectory_summary));
    out.push_str(&format!(
        "\nDrift: {}{}\n  {}\n",
        drift.report.drift_level,
        if drift.is_fallback() { " (fallback)" } else { "" },
        drift.report.reasoning
    ));
    for transition in &drift.report.flagged_transitions {
        out.push_str(&format!(
            "  - {} -> {}: {}\n",
            transition.from, transition.to, transition.reason
        ));
    }

    let pattern = record
        .pattern_analysis
        .primary
        .map(|p| p.name())
        .unwrap_or("Unclassified");
    out.push_str(&format!("\nPattern: {}\n", pattern));
    out.push_str(&format!(
        "\nCoaching plan: {} cells over {} months",
        record.coaching_plan.cell_count(),
        record.coaching_plan.quarterly_roadmap.len()
    ));
    out
}
