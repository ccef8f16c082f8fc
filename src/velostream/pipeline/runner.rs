//! Local runner
//!
//! Evaluates the stages of a pipeline in registration order on the current tokio runtime.
//! The first failing stage stops the run; its error becomes the run's failure.

use super::graph::{EvaluationContext, Pipeline};
use super::{PipelineError, RunMode};
use crate::velostream::observability::{CounterSet, MetricsSnapshot};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Terminal state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Done,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Done => write!(f, "DONE"),
            PipelineState::Failed => write!(f, "FAILED"),
        }
    }
}

/// Outcome of [`Pipeline::run`]
#[derive(Debug, Clone)]
pub struct PipelineResult {
    job_name: String,
    run_mode: RunMode,
    state: PipelineState,
    failure: Option<PipelineError>,
    metrics: MetricsSnapshot,
    stages_run: usize,
    duration: Duration,
}

impl PipelineResult {
    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn run_mode(&self) -> RunMode {
        self.run_mode
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn is_success(&self) -> bool {
        self.state == PipelineState::Done
    }

    /// Error of the stage that stopped the run
    pub fn failure(&self) -> Option<&PipelineError> {
        self.failure.as_ref()
    }

    pub fn metrics(&self) -> &MetricsSnapshot {
        &self.metrics
    }

    /// Counter `name` summed over every stage
    pub fn counter(&self, name: &str) -> u64 {
        self.metrics.total(name)
    }

    pub fn counter_for_stage(&self, name: &str, stage: &str) -> u64 {
        self.metrics.get(name, stage)
    }

    /// Stages evaluated before the run finished or stopped
    pub fn stages_run(&self) -> usize {
        self.stages_run
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// `Err` with the failure when the run failed
    pub fn into_result(self) -> Result<Self, PipelineError> {
        match self.failure {
            Some(failure) => Err(failure),
            None => Ok(self),
        }
    }
}

/// Runs pipelines in-process
pub struct LocalRunner;

impl LocalRunner {
    /// Execute every stage of `pipeline`
    ///
    /// Only engine faults (an unusable metrics registry, a poisoned graph) are returned as
    /// `Err`; stage failures are reported through [`PipelineResult::failure`].
    pub async fn run(pipeline: &Pipeline) -> Result<PipelineResult, PipelineError> {
        let options = pipeline.shared_options();
        let nodes = pipeline.nodes()?;
        let counters = Arc::new(CounterSet::new(&options.job_name)?);
        let mut ctx = EvaluationContext::new(Arc::clone(&options), Arc::clone(&counters));

        log::info!(
            "Running pipeline '{}' with {} stage(s) in {} mode",
            options.job_name,
            nodes.len(),
            options.run_mode
        );

        let started = Instant::now();
        let mut failure = None;
        let mut stages_run = 0;
        for (id, node) in nodes.iter().enumerate() {
            log::debug!("Evaluating {} stage '{}'", node.kind(), node.name());
            match node.evaluate(&ctx).await {
                Ok(value) => {
                    ctx.insert(id, value);
                    stages_run += 1;
                }
                Err(e) => {
                    log::error!(
                        "Pipeline '{}' failed in stage '{}': {}",
                        options.job_name,
                        node.name(),
                        e
                    );
                    failure = Some(e);
                    break;
                }
            }
        }

        let state = if failure.is_some() {
            PipelineState::Failed
        } else {
            PipelineState::Done
        };
        let duration = started.elapsed();
        log::info!(
            "Pipeline '{}' finished in state {} after {} of {} stage(s) ({:?})",
            options.job_name,
            state,
            stages_run,
            nodes.len(),
            duration
        );

        Ok(PipelineResult {
            job_name: options.job_name.clone(),
            run_mode: options.run_mode,
            state,
            failure,
            metrics: counters.snapshot(),
            stages_run,
            duration,
        })
    }
}
