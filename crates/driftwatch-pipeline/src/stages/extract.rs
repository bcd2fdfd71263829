use crate::engine::Stage;
use crate::state::{AnalysisState, StateUpdate};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use driftwatch_core::{
    metadata, ActivityItem, ActivityStore, Error as CoreError, HistorySnapshot, Pillar,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

/// Loads the subject profile and its recent activity history
pub struct ExtractStage {
    activity: Arc<dyn ActivityStore>,
}

impl ExtractStage {
    pub const NAME: &'static str = "extract";

    pub fn new(activity: Arc<dyn ActivityStore>) -> Self {
        Self { activity }
    }
}

#[async_trait]
impl Stage<AnalysisState> for ExtractStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn run(&self, state: &AnalysisState) -> Result<StateUpdate> {
        let subject = self
            .activity
            .subject(state.subject_id)
            .await?
            .ok_or_else(|| CoreError::subject_not_found(state.subject_id))?;

        let limit = state.params.history_limit();
        let items = self
            .activity
            .recent_activity(state.subject_id, limit)
            .await?;

        let history = if items.is_empty() {
            warn!(
                "Subject {} has no activity history; using placeholder history",
                state.subject_id
            );
            HistorySnapshot {
                items: placeholder_history(state.created_at),
                synthesized: true,
            }
        } else {
            info!(
                "Loaded {} activity items for subject {}",
                items.len(),
                state.subject_id
            );
            HistorySnapshot {
                items,
                synthesized: false,
            }
        };

        Ok(StateUpdate::Extracted { subject, history })
    }
}

/// Deterministic three-cycle history for subjects with no stored activity
pub fn placeholder_history(now: DateTime<Utc>) -> Vec<ActivityItem> {
    vec![
        ActivityItem {
            cycle: "2024-Q1".to_string(),
            pillar: Pillar::Clt,
            objective: "Complete 10+ hours GenAI course on PrepInsta and build AI project"
                .to_string(),
            key_results: vec![
                "Complete GenAI fundamentals course (10+ hours)".to_string(),
                "Build chatbot using LangChain".to_string(),
                "Write technical blog about GenAI learning".to_string(),
            ],
            completion_status: 0.8,
            created_at: now - Duration::days(90),
            metadata: metadata(json!({
                "platform": "PrepInsta",
                "course_type": "GenAI",
                "hours": 12
            })),
        },
        ActivityItem {
            cycle: "2024-Q2".to_string(),
            pillar: Pillar::Cfc,
            objective: "Participate in DevPost hackathon and create BMC video".to_string(),
            key_results: vec![
                "Join DevPost hackathon with team of 4".to_string(),
                "Create Business Model Canvas video for YC company".to_string(),
                "Present GenAI-based solution".to_string(),
            ],
            completion_status: 0.6,
            created_at: now - Duration::days(60),
            metadata: metadata(json!({
                "hackathon": "DevPost",
                "team_size": 4,
                "yc_company": "OpenAI"
            })),
        },
        ActivityItem {
            cycle: "2024-Q3".to_string(),
            pillar: Pillar::Scd,
            objective: "Solve 30+ LeetCode problems and take mock competitive exam".to_string(),
            key_results: vec![
                "Solve minimum 30 new LeetCode problems".to_string(),
                "Take 1 mock SSB exam".to_string(),
                "Achieve 80%+ accuracy in problem solving".to_string(),
            ],
            completion_status: 0.9,
            created_at: now - Duration::days(30),
            metadata: metadata(json!({
                "platform": "LeetCode",
                "problems_solved": 35,
                "exam_type": "SSB"
            })),
        },
    ]
}
