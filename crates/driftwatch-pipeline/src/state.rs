//! Shared analysis state and the updates stages return

use crate::engine::PipelineState;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use driftwatch_core::{
    CoachingPlan, DriftAssessment, HistorySnapshot, PatternClassification, RunParameters,
    SubjectProfile,
};

/// State of one OKR analysis run
///
/// Inputs are fixed at construction. Every derived field starts empty and can
/// be written exactly once, by the stage that owns it.
#[derive(Debug, Clone)]
pub struct AnalysisState {
    pub subject_id: i64,
    pub params: RunParameters,
    pub created_at: DateTime<Utc>,
    subject: Option<SubjectProfile>,
    history: Option<HistorySnapshot>,
    trajectory: Option<String>,
    drift: Option<DriftAssessment>,
    pattern: Option<PatternClassification>,
    coaching_plan: Option<CoachingPlan>,
}

/// Partial update produced by one stage
#[derive(Debug, Clone)]
pub enum StateUpdate {
    Extracted {
        subject: SubjectProfile,
        history: HistorySnapshot,
    },
    Trajectory(String),
    Drift(DriftAssessment),
    Pattern(PatternClassification),
    Coaching(CoachingPlan),
}

pub(crate) fn write_once<T>(
    slot: &mut Option<T>,
    value: T,
    stage: &'static str,
    field: &'static str,
) -> Result<()> {
    if slot.is_some() {
        return Err(Error::SlotAlreadyWritten { stage, field });
    }
    *slot = Some(value);
    Ok(())
}

fn read<'a, T>(slot: &'a Option<T>, stage: &'static str, field: &'static str) -> Result<&'a T> {
    slot.as_ref().ok_or(Error::MissingInput { stage, field })
}

impl AnalysisState {
    pub fn new(subject_id: i64, params: RunParameters, created_at: DateTime<Utc>) -> Self {
        Self {
            subject_id,
            params,
            created_at,
            subject: None,
            history: None,
            trajectory: None,
            drift: None,
            pattern: None,
            coaching_plan: None,
        }
    }

    pub fn subject(&self, stage: &'static str) -> Result<&SubjectProfile> {
        read(&self.subject, stage, "subject")
    }

    pub fn history(&self, stage: &'static str) -> Result<&HistorySnapshot> {
        read(&self.history, stage, "history")
    }

    pub fn trajectory(&self, stage: &'static str) -> Result<&str> {
        read(&self.trajectory, stage, "trajectory").map(String::as_str)
    }

    pub fn drift(&self, stage: &'static str) -> Result<&DriftAssessment> {
        read(&self.drift, stage, "drift")
    }

    pub fn pattern(&self, stage: &'static str) -> Result<&PatternClassification> {
        read(&self.pattern, stage, "pattern")
    }

    pub fn coaching_plan(&self, stage: &'static str) -> Result<&CoachingPlan> {
        read(&self.coaching_plan, stage, "coaching_plan")
    }

    /// Whether every derived field has been written
    pub fn is_complete(&self) -> bool {
        self.subject.is_some()
            && self.history.is_some()
            && self.trajectory.is_some()
            && self.drift.is_some()
            && self.pattern.is_some()
            && self.coaching_plan.is_some()
    }
}

impl PipelineState for AnalysisState {
    type Update = StateUpdate;

    fn apply(&mut self, stage: &'static str, update: StateUpdate) -> Result<()> {
        match update {
            StateUpdate::Extracted { subject, history } => {
                if self.history.is_some() {
                    return Err(Error::SlotAlreadyWritten {
                        stage,
                        field: "history",
                    });
                }
                write_once(&mut self.subject, subject, stage, "subject")?;
                write_once(&mut self.history, history, stage, "history")
            }
            StateUpdate::Trajectory(text) => {
                write_once(&mut self.trajectory, text, stage, "trajectory")
            }
            StateUpdate::Drift(drift) => write_once(&mut self.drift, drift, stage, "drift"),
            StateUpdate::Pattern(pattern) => {
                write_once(&mut self.pattern, pattern, stage, "pattern")
            }
            StateUpdate::Coaching(plan) => {
                write_once(&mut self.coaching_plan, plan, stage, "coaching_plan")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AnalysisState {
        AnalysisState::new(1, RunParameters::default(), driftwatch_core::now_millis())
    }

    #[test]
    fn test_missing_input_names_stage_and_field() {
        let state = state();
        let err = state.trajectory("drift").unwrap_err();
        assert!(matches!(
            err,
            Error::MissingInput {
                stage: "drift",
                field: "trajectory"
            }
        ));
    }

    #[test]
    fn test_slots_are_write_once() {
        let mut state = state();
        state
            .apply("trajectory", StateUpdate::Trajectory("first".into()))
            .unwrap();

        let err = state
            .apply("trajectory", StateUpdate::Trajectory("second".into()))
            .unwrap_err();
        assert!(matches!(err, Error::SlotAlreadyWritten { field: "trajectory", .. }));
        assert_eq!(state.trajectory("test").unwrap(), "first");
        assert!(!state.is_complete());
    }
}
