use crate::catalog::{self, CatalogEntry, MONTHS};
use crate::engine::Stage;
use crate::model::ModelClient;
use crate::prompts::{self, CoachingContext};
use crate::state::{AnalysisState, StateUpdate};
use crate::Result;
use async_trait::async_trait;
use driftwatch_core::{CoachingEntry, CoachingPlan, KnowledgeStore, Recommendation};
use tracing::{debug, info};

/// Builds a three-month roadmap over the fixed activity catalog
pub struct CoachingStage {
    knowledge: KnowledgeStore,
    model: ModelClient,
}

impl CoachingStage {
    pub const NAME: &'static str = "coaching";
    const RECOMMENDATIONS_PER_CELL: usize = 3;

    pub fn new(knowledge: KnowledgeStore, model: ModelClient) -> Self {
        Self { knowledge, model }
    }

    async fn idea_cell(
        &self,
        entry: &CatalogEntry,
        month: u8,
        ctx: &CoachingContext<'_>,
    ) -> Result<CoachingEntry> {
        let response = self.model.complete(&prompts::project_ideas(ctx)).await?;

        let ideas = response
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        Ok(CoachingEntry {
            action: entry.action(month).to_string(),
            ideas,
            success_metrics: entry.metrics(),
            ..Default::default()
        })
    }

    async fn recommendation_cell(
        &self,
        entry: &CatalogEntry,
        month: u8,
        ctx: &CoachingContext<'_>,
    ) -> Result<CoachingEntry> {
        let hits = self
            .knowledge
            .query(
                entry.pillar,
                &entry.query(ctx.goal, month),
                Self::RECOMMENDATIONS_PER_CELL,
            )
            .await?;

        let prompt = prompts::coaching_guidance(entry, month, ctx);
        let guidance = self
            .model
            .complete(&prompts::with_context(&prompt, &hits))
            .await?
            .trim()
            .to_string();

        Ok(CoachingEntry {
            action: entry.action(month).to_string(),
            recommendations: hits
                .into_iter()
                .map(|item| Recommendation {
                    content: item.content,
                    metadata: item.metadata,
                })
                .collect(),
            guidance,
            success_metrics: entry.metrics(),
            ..Default::default()
        })
    }
}

#[async_trait]
impl Stage<AnalysisState> for CoachingStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn run(&self, state: &AnalysisState) -> Result<StateUpdate> {
        let ctx = CoachingContext {
            goal: state.params.goal.as_str(),
            level: state.params.level.as_str(),
            trajectory: state.trajectory(Self::NAME)?,
            drift: state.drift(Self::NAME)?,
            pattern: state.pattern(Self::NAME)?,
        };
        debug!(
            "Coaching at drift {} for pattern {:?}",
            ctx.drift.report.drift_level, ctx.pattern.primary
        );

        let (goal, level) = (ctx.goal, ctx.level);
        let mut plan = CoachingPlan {
            goal_alignment: catalog::goal_alignment(goal, level),
            cross_pillar_synergies: catalog::cross_pillar_synergies(goal),
            ..Default::default()
        };

        for month in MONTHS {
            let month_plan = plan
                .quarterly_roadmap
                .entry(format!("Month {}", month))
                .or_default();

            for entry in catalog::entries() {
                let cell = if entry.generates_ideas(month) {
                    self.idea_cell(entry, month, &ctx).await?
                } else {
                    self.recommendation_cell(entry, month, &ctx).await?
                };

                month_plan
                    .entry(entry.pillar)
                    .or_default()
                    .insert(entry.activity.to_string(), cell);
            }
        }

        info!(
            "Coaching plan for subject {}: {} cells",
            state.subject_id,
            plan.cell_count()
        );
        Ok(StateUpdate::Coaching(plan))
    }
}
