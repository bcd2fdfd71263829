use crate::engine::Stage;
use crate::model::ModelClient;
use crate::prompts;
use crate::state::{AnalysisState, StateUpdate};
use crate::Result;
use async_trait::async_trait;
use driftwatch_core::{BehaviorPattern, KnowledgeStore, PatternClassification, Pillar};
use tracing::debug;

/// Names the behavioural pattern behind the history
pub struct PatternStage {
    knowledge: KnowledgeStore,
    model: ModelClient,
}

impl PatternStage {
    pub const NAME: &'static str = "pattern";
    const CONTEXT_ITEMS: usize = 3;

    pub fn new(knowledge: KnowledgeStore, model: ModelClient) -> Self {
        Self { knowledge, model }
    }
}

#[async_trait]
impl Stage<AnalysisState> for PatternStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn run(&self, state: &AnalysisState) -> Result<StateUpdate> {
        let drift = state.drift(Self::NAME)?;
        let trajectory = state.trajectory(Self::NAME)?;
        let goal = &state.params.goal;

        let context = self
            .knowledge
            .query(
                Pillar::Clt,
                &format!("learning behavior patterns for {}", goal),
                Self::CONTEXT_ITEMS,
            )
            .await?;

        let prompt = prompts::pattern(&drift.report, trajectory, goal)?;
        let analysis = self
            .model
            .complete(&prompts::with_context(&prompt, &context))
            .await?
            .trim()
            .to_string();

        let primary = BehaviorPattern::first_mentioned(&analysis);
        debug!("Primary pattern: {:?}", primary);

        Ok(StateUpdate::Pattern(PatternClassification { primary, analysis }))
    }
}
