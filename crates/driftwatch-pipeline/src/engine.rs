//! Sequential stage engine
//!
//! A workflow is a small state machine: an entry node, one stage per node, and
//! a transition function that may look at the state to pick the next node.
//! The engine runs exactly one stage at a time, applies its update, and stops
//! when the workflow reports no successor.

use crate::{Error, Result};
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// State a workflow threads through its stages
pub trait PipelineState: Send + Sync {
    type Update: Send;

    /// Merge one stage's update, rejecting writes to populated fields
    fn apply(&mut self, stage: &'static str, update: Self::Update) -> Result<()>;
}

/// One asynchronous unit of work
#[async_trait]
pub trait Stage<S: PipelineState>: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, state: &S) -> Result<S::Update>;
}

/// Nodes, their stages, and the transitions between them
pub trait Workflow<S: PipelineState>: Send + Sync {
    type Node: Copy + Eq + Debug + Send + Sync;

    fn entry(&self) -> Self::Node;

    fn stage(&self, node: Self::Node) -> &dyn Stage<S>;

    /// Successor of `node`, or `None` when the run is finished
    fn next(&self, node: Self::Node, state: &S) -> Option<Self::Node>;
}

/// Progress hooks; every method defaults to a no-op
pub trait StageObserver: Send + Sync {
    fn stage_started(&self, _stage: &'static str, _step: usize) {}

    fn stage_finished(&self, _stage: &'static str, _step: usize, _elapsed: Duration) {}

    fn stage_failed(&self, _stage: &'static str, _error: &Error) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl StageObserver for NoopObserver {}

/// Runs workflows
#[derive(Clone)]
pub struct Engine {
    observer: Arc<dyn StageObserver>,
    max_steps: usize,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Upper bound on stages per run, guarding against cyclic workflows
    pub const DEFAULT_MAX_STEPS: usize = 64;

    pub fn new() -> Self {
        Self {
            observer: Arc::new(NoopObserver),
            max_steps: Self::DEFAULT_MAX_STEPS,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn StageObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    /// Run `workflow` over `state` until it finishes, fails, or is cancelled
    ///
    /// Stage failures come back as [`Error::Stage`] naming the stage.
    /// Cancellation is checked before each stage and raced against the
    /// running one; it yields [`Error::Cancelled`].
    pub async fn execute<S, W>(
        &self,
        workflow: &W,
        state: &mut S,
        cancel: &CancellationToken,
    ) -> Result<()>
    where
        S: PipelineState,
        W: Workflow<S>,
    {
        let started = Instant::now();
        let mut node = Some(workflow.entry());
        let mut step = 0;

        while let Some(current) = node {
            let stage = workflow.stage(current);
            let name = stage.name();

            if step >= self.max_steps {
                return Err(Error::Other(format!(
                    "workflow exceeded {} steps at {:?}",
                    self.max_steps, current
                )));
            }

            if cancel.is_cancelled() {
                info!("Run cancelled before stage '{}'", name);
                return Err(Error::Cancelled { stage: name });
            }

            step += 1;
            debug!("Stage {} '{}' starting", step, name);
            self.observer.stage_started(name, step);
            let stage_started = Instant::now();

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Run cancelled during stage '{}'", name);
                    return Err(Error::Cancelled { stage: name });
                }
                outcome = stage.run(&*state) => outcome,
            };

            let applied = outcome.and_then(|update| state.apply(name, update));
            if let Err(e) = applied {
                let err = e.in_stage(name);
                warn!("{}", err);
                self.observer.stage_failed(name, &err);
                return Err(err);
            }

            let elapsed = stage_started.elapsed();
            debug!("Stage '{}' finished in {:?}", name, elapsed);
            self.observer.stage_finished(name, step, elapsed);

            node = workflow.next(current, state);
        }

        debug!("Workflow finished: {} stages in {:?}", step, started.elapsed());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Trace {
        visited: Vec<&'static str>,
        value: Option<u32>,
    }

    impl PipelineState for Trace {
        type Update = (&'static str, Option<u32>);

        fn apply(&mut self, stage: &'static str, update: Self::Update) -> Result<()> {
            self.visited.push(update.0);
            if let Some(v) = update.1 {
                if self.value.is_some() {
                    return Err(Error::SlotAlreadyWritten {
                        stage,
                        field: "value",
                    });
                }
                self.value = Some(v);
            }
            Ok(())
        }
    }

    struct Step {
        name: &'static str,
        writes: Option<u32>,
        fail: bool,
    }

    #[async_trait]
    impl Stage<Trace> for Step {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn run(&self, _state: &Trace) -> Result<(&'static str, Option<u32>)> {
            if self.fail {
                return Err(Error::ExternalCall("boom".to_string()));
            }
            Ok((self.name, self.writes))
        }
    }

    struct Branching {
        steps: Vec<Step>,
    }

    impl Workflow<Trace> for Branching {
        type Node = usize;

        fn entry(&self) -> usize {
            0
        }

        fn stage(&self, node: usize) -> &dyn Stage<Trace> {
            &self.steps[node]
        }

        // 0 -> (1 if value is set, else 2) -> end
        fn next(&self, node: usize, state: &Trace) -> Option<usize> {
            match node {
                0 if state.value.is_some() => Some(1),
                0 => Some(2),
                _ => None,
            }
        }
    }

    fn step(name: &'static str, writes: Option<u32>) -> Step {
        Step {
            name,
            writes,
            fail: false,
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl StageObserver for Recorder {
        fn stage_started(&self, stage: &'static str, step: usize) {
            self.0.lock().unwrap().push(format!("start {stage} {step}"));
        }

        fn stage_finished(&self, stage: &'static str, _step: usize, _elapsed: Duration) {
            self.0.lock().unwrap().push(format!("end {stage}"));
        }
    }

    #[tokio::test]
    async fn test_transition_selects_exactly_one_branch() {
        let workflow = Branching {
            steps: vec![step("route", Some(1)), step("left", None), step("right", None)],
        };
        let mut state = Trace::default();
        Engine::new()
            .execute(&workflow, &mut state, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(state.visited, vec!["route", "left"]);

        let workflow = Branching {
            steps: vec![step("route", None), step("left", None), step("right", None)],
        };
        let mut state = Trace::default();
        Engine::new()
            .execute(&workflow, &mut state, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(state.visited, vec!["route", "right"]);
    }

    #[tokio::test]
    async fn test_failure_is_attributed_to_stage() {
        let workflow = Branching {
            steps: vec![
                step("route", None),
                step("left", None),
                Step {
                    name: "right",
                    writes: None,
                    fail: true,
                },
            ],
        };
        let mut state = Trace::default();
        let err = Engine::new()
            .execute(&workflow, &mut state, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some("right"));
        assert!(matches!(err, Error::Stage { .. }));
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_before_first_stage() {
        let workflow = Branching {
            steps: vec![step("route", None), step("left", None), step("right", None)],
        };
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut state = Trace::default();
        let err = Engine::new()
            .execute(&workflow, &mut state, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled { stage: "route" }));
        assert!(state.visited.is_empty());
    }

    #[tokio::test]
    async fn test_observer_sees_each_stage() {
        let recorder = Arc::new(Recorder::default());
        let workflow = Branching {
            steps: vec![step("route", None), step("left", None), step("right", None)],
        };
        let mut state = Trace::default();
        Engine::new()
            .with_observer(recorder.clone())
            .execute(&workflow, &mut state, &CancellationToken::new())
            .await
            .unwrap();

        let events = recorder.0.lock().unwrap().clone();
        assert_eq!(
            events,
            vec!["start route 1", "end route", "start right 2", "end right"]
        );
    }
}
