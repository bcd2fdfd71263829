//! The five OKR analysis stages and the workflow that chains them

mod coaching;
mod drift;
mod extract;
mod pattern;
mod trajectory;

pub use coaching::CoachingStage;
pub use drift::DriftStage;
pub use extract::{placeholder_history, ExtractStage};
pub use pattern::PatternStage;
pub use trajectory::TrajectoryStage;

use crate::engine::{Stage, Workflow};
use crate::model::ModelClient;
use crate::state::AnalysisState;
use driftwatch_core::{ActivityStore, KnowledgeStore};
use std::sync::Arc;

/// Nodes of the OKR workflow, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OkrStep {
    Extract,
    Trajectory,
    Drift,
    Pattern,
    Coaching,
}

impl OkrStep {
    pub const ALL: [OkrStep; 5] = [
        OkrStep::Extract,
        OkrStep::Trajectory,
        OkrStep::Drift,
        OkrStep::Pattern,
        OkrStep::Coaching,
    ];
}

/// Linear workflow: extract, trajectory, drift, pattern, coaching
pub struct OkrWorkflow {
    extract: ExtractStage,
    trajectory: TrajectoryStage,
    drift: DriftStage,
    pattern: PatternStage,
    coaching: CoachingStage,
}

impl OkrWorkflow {
    pub fn new(
        activity: Arc<dyn ActivityStore>,
        knowledge: KnowledgeStore,
        model: ModelClient,
    ) -> Self {
        Self {
            extract: ExtractStage::new(activity),
            trajectory: TrajectoryStage::new(knowledge.clone(), model.clone()),
            drift: DriftStage::new(knowledge.clone(), model.clone()),
            pattern: PatternStage::new(knowledge.clone(), model.clone()),
            coaching: CoachingStage::new(knowledge, model),
        }
    }

    /// Number of stages in a full run
    pub const STAGE_COUNT: usize = OkrStep::ALL.len();
}

impl Workflow<AnalysisState> for OkrWorkflow {
    type Node = OkrStep;

    fn entry(&self) -> OkrStep {
        OkrStep::Extract
    }

    fn stage(&self, node: OkrStep) -> &dyn Stage<AnalysisState> {
        match node {
            OkrStep::Extract => &self.extract,
            OkrStep::Trajectory => &self.trajectory,
            OkrStep::Drift => &self.drift,
            OkrStep::Pattern => &self.pattern,
            OkrStep::Coaching => &self.coaching,
        }
    }

    fn next(&self, node: OkrStep, _state: &AnalysisState) -> Option<OkrStep> {
        match node {
            OkrStep::Extract => Some(OkrStep::Trajectory),
            OkrStep::Trajectory => Some(OkrStep::Drift),
            OkrStep::Drift => Some(OkrStep::Pattern),
            OkrStep::Pattern => Some(OkrStep::Coaching),
            OkrStep::Coaching => None,
        }
    }
}
