use crate::engine::Stage;
use crate::model::ModelClient;
use crate::parse::parse_drift_report;
use crate::prompts;
use crate::state::{AnalysisState, StateUpdate};
use crate::Result;
use async_trait::async_trait;
use driftwatch_core::{DriftAssessment, KnowledgeStore, Pillar};
use tracing::info;

/// Rates how far the history strays from a coherent progression
pub struct DriftStage {
    knowledge: KnowledgeStore,
    model: ModelClient,
}

impl DriftStage {
    pub const NAME: &'static str = "drift";
    const CONTEXT_PER_QUERY: usize = 2;

    /// Queries run against every namespace for reference progressions
    pub const QUERIES: [&'static str; 3] = [
        "typical career progression patterns in technology",
        "coherent skill development pathways",
        "common goal drift patterns in students",
    ];

    pub fn new(knowledge: KnowledgeStore, model: ModelClient) -> Self {
        Self { knowledge, model }
    }
}

#[async_trait]
impl Stage<AnalysisState> for DriftStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn run(&self, state: &AnalysisState) -> Result<StateUpdate> {
        let trajectory = state.trajectory(Self::NAME)?;
        let history = state.history(Self::NAME)?;

        let mut context = Vec::new();
        for query in Self::QUERIES {
            for pillar in Pillar::all() {
                let hits = self
                    .knowledge
                    .query(*pillar, query, Self::CONTEXT_PER_QUERY)
                    .await?;
                context.extend(hits);
            }
        }

        let prompt = prompts::drift(trajectory, history, &state.params.goal)?;
        let response = self
            .model
            .complete(&prompts::with_context(&prompt, &context))
            .await?;

        let assessment = DriftAssessment::from(parse_drift_report(&response));
        info!(
            "Drift level for subject {}: {}{}",
            state.subject_id,
            assessment.report.drift_level,
            if assessment.is_fallback() { " (fallback)" } else { "" }
        );

        Ok(StateUpdate::Drift(assessment))
    }
}
