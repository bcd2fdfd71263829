//! Database and knowledge index status

use crate::state::AppState;
use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use driftwatch_core::{ActivityStore, Pillar, RecordStore};
use serde::Serialize;

/// Snapshot of the primary database
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DbStatus {
    pub database: String,
    pub collections: Vec<String>,
    pub student_count: u64,
    pub record_count: u64,
    pub status: String,
}

pub async fn db_status(app: &AppState) -> Result<DbStatus> {
    Ok(DbStatus {
        database: app.db.name(),
        collections: app.db.collection_names().await?,
        student_count: app.db.activity().subject_count().await?,
        record_count: app.db.records().count().await?,
        status: "connected".to_string(),
    })
}

/// Show database status and knowledge index contents
///
/// Usage:
///   driftwatch status
pub async fn status(app: &AppState) -> Result<String> {
    let db = db_status(app).await?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Pillar").fg(Color::Cyan),
            Cell::new("Knowledge items").fg(Color::Cyan),
        ]);

    for pillar in Pillar::all() {
        let count = app.knowledge.namespace_count(*pillar).await?;
        table.add_row(vec![format!("{} ({})", pillar, pillar.title()), count.to_string()]);
    }

    Ok(format!(
        "Database: {} ({})\n  Collections: {}\n  Subjects: {}\n  Records: {}\n  Knowledge index: {}\n\n{}",
        db.database,
        db.status,
        db.collections.join(", "),
        db.student_count,
        db.record_count,
        app.knowledge.path().display(),
        table
    ))
}
