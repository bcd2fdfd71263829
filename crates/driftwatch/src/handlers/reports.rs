//! Stored analysis reports

use crate::state::AppState;
use anyhow::Result;
use clap::Args;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use driftwatch_core::RecordStore;

/// Number of reports returned when no limit is given
pub const DEFAULT_LIMIT: u32 = 5;

/// List the most recent reports for a subject
///
/// Usage:
///   driftwatch reports 1
///   driftwatch reports 1 --limit 10
#[derive(Args, Debug)]
pub struct ReportsArgs {
    /// Subject whose reports to list
    pub subject_id: i64,

    /// Maximum number of reports
    #[arg(short, long, default_value_t = DEFAULT_LIMIT)]
    pub limit: u32,
}

pub async fn reports(app: &AppState, args: ReportsArgs) -> Result<String> {
    let records = app.db.records().recent(args.subject_id, args.limit).await?;

    if records.is_empty() {
        return Ok(format!("No reports found for subject {}.", args.subject_id));
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Date").fg(Color::Green),
            Cell::new("ID").fg(Color::Green),
            Cell::new("Goal").fg(Color::Green),
            Cell::new("Drift").fg(Color::Green),
            Cell::new("Pattern").fg(Color::Green),
            Cell::new("Readiness").fg(Color::Green),
        ]);

    for record in &records {
        let drift = if record.drift_analysis.is_fallback() {
            format!("{}*", record.drift_analysis.report.drift_level)
        } else {
            record.drift_analysis.report.drift_level.to_string()
        };

        table.add_row(vec![
            record.analysis_date.format("%Y-%m-%d %H:%M").to_string(),
            record.id.to_string(),
            record.goal_analysis.quarterly_goal.clone(),
            drift,
            record
                .pattern_analysis
                .primary
                .map(|p| p.name().to_string())
                .unwrap_or_else(|| "-".to_string()),
            record.goal_analysis.readiness_score.to_string(),
        ]);
    }

    Ok(format!(
        "\n{}\n\nTotal: {} reports (* = drift output could not be parsed)",
        table,
        records.len()
    ))
}
