//! Demo data

use crate::state::AppState;
use anyhow::Result;
use driftwatch_core::{now_millis, seed, ActivityStore};
use tracing::info;

/// Load the three demo subjects and their activity
///
/// Usage:
///   driftwatch seed-demo
pub async fn seed_demo(app: &AppState) -> Result<String> {
    let activity = app.db.activity();
    let mut lines = Vec::new();

    for demo in seed::demo_subjects(now_millis()) {
        let id = demo.profile.subject_id;
        activity.upsert_subject(&demo.profile).await?;

        // Re-running keeps the demo history from growing
        if activity.recent_activity(id, 1).await?.is_empty() {
            for item in &demo.activity {
                activity.add_activity(id, item).await?;
            }
            info!("Seeded demo subject {}", id);
            lines.push(format!(
                "✓ {} {} ({} activity items)",
                id,
                demo.profile.name,
                demo.activity.len()
            ));
        } else {
            lines.push(format!("- {} {} (already has activity)", id, demo.profile.name));
        }
    }

    Ok(lines.join("\n"))
}
