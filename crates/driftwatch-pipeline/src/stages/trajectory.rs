use crate::engine::Stage;
use crate::model::ModelClient;
use crate::prompts;
use crate::state::{AnalysisState, StateUpdate};
use crate::Result;
use async_trait::async_trait;
use driftwatch_core::KnowledgeStore;
use tracing::debug;

/// Summarises how the subject's goals progressed across cycles
pub struct TrajectoryStage {
    knowledge: KnowledgeStore,
    model: ModelClient,
}

impl TrajectoryStage {
    pub const NAME: &'static str = "trajectory";
    const CONTEXT_PER_ITEM: usize = 2;

    pub fn new(knowledge: KnowledgeStore, model: ModelClient) -> Self {
        Self { knowledge, model }
    }
}

#[async_trait]
impl Stage<AnalysisState> for TrajectoryStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn run(&self, state: &AnalysisState) -> Result<StateUpdate> {
        let history = state.history(Self::NAME)?;

        let mut context = Vec::new();
        for item in &history.items {
            let hits = self
                .knowledge
                .query(item.pillar, &item.objective, Self::CONTEXT_PER_ITEM)
                .await?;
            context.extend(hits);
        }
        debug!("Trajectory context: {} knowledge items", context.len());

        let prompt = prompts::trajectory(history, &state.params.goal)?;
        let summary = self
            .model
            .complete(&prompts::with_context(&prompt, &context))
            .await?;

        Ok(StateUpdate::Trajectory(summary.trim().to_string()))
    }
}
