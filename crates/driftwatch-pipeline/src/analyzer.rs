//! Runs the OKR workflow and persists the finished analysis

use crate::engine::Engine;
use crate::model::ModelClient;
use crate::stages::OkrWorkflow;
use crate::state::AnalysisState;
use crate::summary;
use crate::Result;
use driftwatch_core::{
    now_millis, ActivityStore, AnalysisRecord, GoalAnalysis, KnowledgeStore, RecordStore,
    RunParameters,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

/// OKR drift analyzer
///
/// One instance serves any number of concurrent runs; every run gets its own
/// [`AnalysisState`].
pub struct OkrAnalyzer {
    engine: Engine,
    workflow: OkrWorkflow,
    records: Arc<dyn RecordStore>,
}

impl OkrAnalyzer {
    const PERSIST: &'static str = "persist";

    pub fn new(
        activity: Arc<dyn ActivityStore>,
        records: Arc<dyn RecordStore>,
        knowledge: KnowledgeStore,
        model: ModelClient,
    ) -> Self {
        Self {
            engine: Engine::new(),
            workflow: OkrWorkflow::new(activity, knowledge, model),
            records,
        }
    }

    /// Replace the engine, e.g. to attach a progress observer
    pub fn with_engine(mut self, engine: Engine) -> Self {
        self.engine = engine;
        self
    }

    /// Run every stage for `subject_id` and persist the resulting record
    ///
    /// # Example
    ///
    /// ```no_run
    /// use driftwatch_core::{Database, KnowledgeStore, RunParameters};
    /// use driftwatch_pipeline::{AgentGenerator, ModelClient, OkrAnalyzer};
    /// use std::sync::Arc;
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let db = Database::open("~/.driftwatch/driftwatch.db").await?;
    ///     let knowledge = KnowledgeStore::open("~/.driftwatch/knowledge.db").await?;
    ///     let model = ModelClient::new(Arc::new(AgentGenerator::default()));
    ///
    ///     let analyzer = OkrAnalyzer::new(
    ///         Arc::new(db.activity()),
    ///         Arc::new(db.records()),
    ///         knowledge,
    ///         model,
    ///     );
    ///     let record = analyzer.run(1, RunParameters::default()).await?;
    ///     println!("Drift: {}", record.drift_analysis.report.drift_level);
    ///     Ok(())
    /// }
    /// ```
    pub async fn run(&self, subject_id: i64, params: RunParameters) -> Result<AnalysisRecord> {
        self.run_with_cancel(subject_id, params, &CancellationToken::new())
            .await
    }

    /// Like [`run`](Self::run), but stops between or during stages once
    /// `cancel` fires; a cancelled run persists nothing
    pub async fn run_with_cancel(
        &self,
        subject_id: i64,
        params: RunParameters,
        cancel: &CancellationToken,
    ) -> Result<AnalysisRecord> {
        info!(
            "Starting analysis for subject {} (goal: {}, level: {}, cycles: {})",
            subject_id, params.goal, params.level, params.cycles
        );

        let mut state = AnalysisState::new(subject_id, params, now_millis());
        self.engine
            .execute(&self.workflow, &mut state, cancel)
            .await?;

        let mut record = build_record(&state)?;
        let receipt = self.records.append(&mut record).await?;

        info!(
            "Analysis {} stored for subject {} at {}",
            receipt.id, subject_id, receipt.analysis_date
        );
        Ok(record)
    }
}

/// Snapshot a completed state; id and analysis date are assigned on append
fn build_record(state: &AnalysisState) -> Result<AnalysisRecord> {
    let stage = OkrAnalyzer::PERSIST;
    let history = state.history(stage)?.clone();

    Ok(AnalysisRecord {
        id: Uuid::nil(),
        subject_id: state.subject_id,
        student_info: state.subject(stage)?.clone(),
        run_parameters: state.params.clone(),
        goal_analysis: GoalAnalysis {
            quarterly_goal: state.params.goal.clone(),
            current_level: state.params.level.clone(),
            readiness_score: summary::readiness_score(&history.items),
        },
        pillar_analysis: summary::pillar_analysis(&history.items),
        history,
        trajectory_summary: state.trajectory(stage)?.to_string(),
        drift_analysis: state.drift(stage)?.clone(),
        pattern_analysis: state.pattern(stage)?.clone(),
        coaching_plan: state.coaching_plan(stage)?.clone(),
        run_started_at: state.created_at,
        analysis_date: state.created_at,
    })
}
