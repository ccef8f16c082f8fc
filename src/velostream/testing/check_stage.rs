//! Check-execution stages
//!
//! An assertion named `Assert$<n>` expands into:
//!
//! ```text
//! Assert$<n>/CreateActual/...    actual value as a view
//! Assert$<n>/CreateExpected/...  expected value as a view (two-view checks only)
//! Assert$<n>/Trigger             one element per firing
//! Assert$<n>/RunChecks           reads the views, runs the checker, counts the outcome
//! ```
//!
//! Each trigger element is one check invocation. Exactly one of [`SUCCESS_COUNTER`] and
//! [`FAILURE_COUNTER`] is incremented per invocation.

use super::checker::{CheckFailure, Checker};
use super::materialize::ViewSource;
use super::relation::AssertRelation;
use crate::velostream::pipeline::{
    DoFn, Pipeline, PipelineError, ProcessContext, RunMode, SideInput, View,
};
use log::{debug, error, trace, warn};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

/// Counter incremented once per passing check invocation
pub const SUCCESS_COUNTER: &str = "AssertionSuccess";

/// Counter incremented once per failing check invocation
pub const FAILURE_COUNTER: &str = "AssertionFailure";

/// What a failing check does after it has been counted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Return the failure as the stage error, failing the run
    Propagate,
    /// Log and keep running
    CountOnly,
}

impl From<RunMode> for FailurePolicy {
    fn from(mode: RunMode) -> Self {
        match mode {
            RunMode::Bounded => FailurePolicy::Propagate,
            RunMode::Unbounded => FailurePolicy::CountOnly,
        }
    }
}

/// Lifecycle of a check stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    Created,
    Scheduled,
    Running,
    Resolved { success: bool },
}

impl fmt::Display for CheckState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckState::Created => write!(f, "created"),
            CheckState::Scheduled => write!(f, "scheduled"),
            CheckState::Running => write!(f, "running"),
            CheckState::Resolved { success: true } => write!(f, "resolved(success)"),
            CheckState::Resolved { success: false } => write!(f, "resolved(failure)"),
        }
    }
}

struct StateCell {
    stage: String,
    state: Mutex<CheckState>,
}

impl StateCell {
    fn new(stage: String) -> Self {
        trace!("Check stage '{}' is {}", stage, CheckState::Created);
        Self {
            stage,
            state: Mutex::new(CheckState::Created),
        }
    }

    fn transition(&self, next: CheckState) {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        trace!("Check stage '{}': {} -> {}", self.stage, *state, next);
        *state = next;
    }

    fn current(&self) -> CheckState {
        match self.state.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Handle to a registered check stage
#[derive(Clone)]
pub struct CheckHandle {
    name: String,
    policy: FailurePolicy,
    state: Arc<StateCell>,
}

impl CheckHandle {
    /// Name of the `RunChecks` stage
    pub fn stage_name(&self) -> &str {
        &self.state.stage
    }

    /// Assertion name, `Assert$<n>`
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Latest state; in unbounded mode this is the outcome of the last firing
    pub fn state(&self) -> CheckState {
        self.state.current()
    }
}

impl fmt::Debug for CheckHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckHandle")
            .field("stage", &self.stage_name())
            .field("policy", &self.policy)
            .field("state", &self.state())
            .finish()
    }
}

/// The check a `RunChecks` stage performs on every firing
trait CheckBody: Send + Sync + 'static {
    fn check(&self, ctx: &ProcessContext<'_, ()>) -> Result<(), CheckFailure>;
}

struct OneSideCheck<A> {
    actual: View<A>,
    checker: Checker<A>,
}

impl<A: Send + Sync + 'static> CheckBody for OneSideCheck<A> {
    fn check(&self, ctx: &ProcessContext<'_, ()>) -> Result<(), CheckFailure> {
        let actual = ctx.side_input(&self.actual).map_err(CheckFailure::SideInput)?;
        (self.checker)(&*actual)
    }
}

struct TwoSideCheck<A, E, R> {
    actual: View<A>,
    expected: View<E>,
    relation: Arc<R>,
}

impl<A, E, R> CheckBody for TwoSideCheck<A, E, R>
where
    A: Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    R: AssertRelation<A, E>,
{
    fn check(&self, ctx: &ProcessContext<'_, ()>) -> Result<(), CheckFailure> {
        let actual = ctx.side_input(&self.actual).map_err(CheckFailure::SideInput)?;
        let expected = ctx
            .side_input(&self.expected)
            .map_err(CheckFailure::SideInput)?;
        let checker = self.relation.assert_for(E::clone(&expected));
        checker(&*actual)
    }
}

struct RunChecks<B> {
    body: B,
    policy: FailurePolicy,
    state: Arc<StateCell>,
}

impl<B: CheckBody> DoFn<(), ()> for RunChecks<B> {
    fn process_element(
        &self,
        _trigger: &(),
        ctx: &mut ProcessContext<'_, ()>,
    ) -> Result<(), PipelineError> {
        self.state.transition(CheckState::Running);

        let view: &ProcessContext<'_, ()> = ctx;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.body.check(view)))
            .unwrap_or_else(|payload| {
                Err(CheckFailure::Panicked {
                    message: panic_message(payload.as_ref()),
                })
            });

        match outcome {
            Ok(()) => {
                ctx.counter(SUCCESS_COUNTER).inc();
                self.state.transition(CheckState::Resolved { success: true });
                debug!("Assertion '{}' passed", ctx.stage_name());
                Ok(())
            }
            Err(failure) => {
                error!("Assertion '{}' failed: {}", ctx.stage_name(), failure);
                ctx.counter(FAILURE_COUNTER).inc();
                self.state.transition(CheckState::Resolved { success: false });
                match self.policy {
                    FailurePolicy::Propagate => {
                        Err(PipelineError::stage_failed(ctx.stage_name(), failure))
                    }
                    FailurePolicy::CountOnly => {
                        warn!(
                            "Continuing after failed assertion '{}' ({} mode)",
                            ctx.stage_name(),
                            ctx.run_mode()
                        );
                        Ok(())
                    }
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic payload is not a string".to_string()
    }
}

/// Register trigger and `RunChecks` stages for a check body
fn attach_checks<B: CheckBody>(
    pipeline: &Pipeline,
    name: &str,
    body: B,
    side_inputs: &[SideInput],
) -> Result<CheckHandle, PipelineError> {
    let policy = FailurePolicy::from(pipeline.run_mode());
    let stage = format!("{}/RunChecks", name);
    let state = Arc::new(StateCell::new(stage.clone()));

    let trigger = pipeline.impulse(&format!("{}/Trigger", name))?;
    trigger.par_do(
        &stage,
        RunChecks {
            body,
            policy,
            state: Arc::clone(&state),
        },
        side_inputs,
    )?;
    state.transition(CheckState::Scheduled);
    debug!("Scheduled check stage '{}' with policy {:?}", stage, policy);

    Ok(CheckHandle {
        name: name.to_string(),
        policy,
        state,
    })
}

/// Run `build`, removing the stages it registered under `name` if it fails
fn all_or_nothing<F>(
    pipeline: &Pipeline,
    name: &str,
    build: F,
) -> Result<CheckHandle, PipelineError>
where
    F: FnOnce() -> Result<CheckHandle, PipelineError>,
{
    let checkpoint = pipeline.stage_count();
    build().map_err(|err| {
        match pipeline.discard_stages_since(checkpoint, &format!("{}/", name)) {
            Ok(0) => {}
            Ok(removed) => debug!(
                "Removed {} stage(s) of assertion '{}' after: {}",
                removed, name, err
            ),
            Err(e) => warn!("Could not remove stages of assertion '{}': {}", name, e),
        }
        err
    })
}

/// Checks one materialized value with a checker
pub struct OneSideInputAssert<A> {
    actual: Arc<dyn ViewSource<A>>,
    checker: Checker<A>,
}

impl<A: Send + Sync + 'static> OneSideInputAssert<A> {
    pub fn new(actual: Arc<dyn ViewSource<A>>, checker: Checker<A>) -> Self {
        Self { actual, checker }
    }

    pub fn apply(&self, pipeline: &Pipeline, name: &str) -> Result<CheckHandle, PipelineError> {
        all_or_nothing(pipeline, name, || {
            let actual = self
                .actual
                .expand(pipeline, &format!("{}/CreateActual", name))?;
            let side_inputs = [actual.as_side_input()];
            let body = OneSideCheck {
                actual,
                checker: Arc::clone(&self.checker),
            };
            attach_checks(pipeline, name, body, &side_inputs)
        })
    }
}

/// Checks a materialized value against a materialized expectation with a relation
pub struct TwoSideInputAssert<A, E, R> {
    actual: Arc<dyn ViewSource<A>>,
    expected: Arc<dyn ViewSource<E>>,
    relation: Arc<R>,
}

impl<A, E, R> TwoSideInputAssert<A, E, R>
where
    A: Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    R: AssertRelation<A, E>,
{
    pub fn new(
        actual: Arc<dyn ViewSource<A>>,
        expected: Arc<dyn ViewSource<E>>,
        relation: R,
    ) -> Self {
        Self {
            actual,
            expected,
            relation: Arc::new(relation),
        }
    }

    pub fn apply(&self, pipeline: &Pipeline, name: &str) -> Result<CheckHandle, PipelineError> {
        all_or_nothing(pipeline, name, || {
            let actual = self
                .actual
                .expand(pipeline, &format!("{}/CreateActual", name))?;
            let expected = self
                .expected
                .expand(pipeline, &format!("{}/CreateExpected", name))?;
            let side_inputs = [actual.as_side_input(), expected.as_side_input()];
            debug!(
                "Assertion '{}' checks '{}' {} '{}'",
                name,
                actual.name(),
                self.relation.name(),
                expected.name()
            );
            let body = TwoSideCheck {
                actual,
                expected,
                relation: Arc::clone(&self.relation),
            };
            attach_checks(pipeline, name, body, &side_inputs)
        })
    }
}
