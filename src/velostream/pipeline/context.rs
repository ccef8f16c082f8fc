//! Element-wise processing
//!
//! [`DoFn`] is the user function of a `par_do` stage. The stage splits its input into
//! `parallelism` contiguous chunks, runs each chunk on a blocking worker task and
//! concatenates the outputs in chunk order, so element order is preserved.

use super::graph::{EvaluationContext, Node, NodeId, NodeValue};
use super::view::{SideInput, View, ViewContents};
use super::window::{Window, WindowedValue};
use super::{Element, PipelineError, PipelineOptions, RunMode};
use crate::velostream::observability::CounterSet;
use async_trait::async_trait;
use futures::future::join_all;
use prometheus::IntCounter;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

/// User function applied to every element of a dataset
pub trait DoFn<I, O>: Send + Sync + 'static {
    fn process_element(&self, element: &I, ctx: &mut ProcessContext<'_, O>)
        -> Result<(), PipelineError>;
}

impl<I, O, F> DoFn<I, O> for F
where
    F: Fn(&I, &mut ProcessContext<'_, O>) -> Result<(), PipelineError> + Send + Sync + 'static,
{
    fn process_element(
        &self,
        element: &I,
        ctx: &mut ProcessContext<'_, O>,
    ) -> Result<(), PipelineError> {
        self(element, ctx)
    }
}

/// Side inputs resolved for one stage evaluation
pub(crate) struct SideInputs {
    views: HashMap<NodeId, NodeValue>,
}

impl SideInputs {
    fn resolve(
        ctx: &EvaluationContext,
        stage: &str,
        declared: &[SideInput],
    ) -> Result<Self, PipelineError> {
        let mut views = HashMap::with_capacity(declared.len());
        for side_input in declared {
            views.insert(side_input.node_id(), ctx.output(side_input.node_id(), stage)?);
        }
        Ok(Self { views })
    }
}

/// Per-element view of the running stage handed to a [`DoFn`]
pub struct ProcessContext<'a, O> {
    stage: &'a str,
    timestamp_ms: i64,
    window: Window,
    side_inputs: &'a SideInputs,
    options: &'a PipelineOptions,
    counters: &'a CounterSet,
    output: &'a mut Vec<WindowedValue<O>>,
}

impl<'a, O> ProcessContext<'a, O> {
    /// Emit an element with the timestamp and window of the current input
    pub fn output(&mut self, value: O) {
        self.output.push(WindowedValue {
            value,
            timestamp_ms: self.timestamp_ms,
            window: self.window,
        });
    }

    /// Emit an element with its own timestamp; the window is reassigned by a later
    /// `window_into`
    pub fn output_with_timestamp(&mut self, value: O, timestamp_ms: i64) {
        self.output.push(WindowedValue {
            value,
            timestamp_ms,
            window: self.window,
        });
    }

    /// Value of `view` for the window of the current element
    pub fn side_input<V: Send + Sync + 'static>(
        &self,
        view: &View<V>,
    ) -> Result<Arc<V>, PipelineError> {
        let value = self.side_inputs.views.get(&view.node_id()).ok_or_else(|| {
            PipelineError::UndeclaredSideInput {
                stage: self.stage.to_string(),
                view: view.name().to_string(),
            }
        })?;
        let contents = value.downcast_ref::<ViewContents<V>>().ok_or_else(|| {
            PipelineError::internal(format!(
                "view '{}' does not hold values of type {}",
                view.name(),
                std::any::type_name::<V>()
            ))
        })?;
        contents.read(self.window)
    }

    /// Counter `name` scoped to this stage
    pub fn counter(&self, name: &str) -> IntCounter {
        self.counters.counter(name, self.stage)
    }

    pub fn stage_name(&self) -> &str {
        self.stage
    }

    pub fn window(&self) -> Window {
        self.window
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    pub fn options(&self) -> &PipelineOptions {
        self.options
    }

    pub fn run_mode(&self) -> RunMode {
        self.options.run_mode
    }
}

pub(crate) struct ParDoNode<I, O, F> {
    name: Arc<str>,
    input: NodeId,
    do_fn: Arc<F>,
    side_inputs: Vec<SideInput>,
    _marker: PhantomData<fn(I) -> O>,
}

impl<I, O, F> ParDoNode<I, O, F>
where
    I: Element,
    O: Element,
    F: DoFn<I, O>,
{
    pub(crate) fn new(name: String, input: NodeId, do_fn: F, side_inputs: Vec<SideInput>) -> Self {
        Self {
            name: Arc::from(name),
            input,
            do_fn: Arc::new(do_fn),
            side_inputs,
            _marker: PhantomData,
        }
    }
}

struct ChunkWorker<I, F> {
    stage: Arc<str>,
    input: Arc<Vec<WindowedValue<I>>>,
    range: std::ops::Range<usize>,
    do_fn: Arc<F>,
    side_inputs: Arc<SideInputs>,
    options: Arc<PipelineOptions>,
    counters: Arc<CounterSet>,
}

impl<I, F> ChunkWorker<I, F> {
    fn process<O>(self) -> Result<Vec<WindowedValue<O>>, PipelineError>
    where
        F: DoFn<I, O>,
    {
        let mut output = Vec::with_capacity(self.range.len());
        for element in &self.input[self.range.clone()] {
            let mut ctx = ProcessContext {
                stage: &self.stage,
                timestamp_ms: element.timestamp_ms,
                window: element.window,
                side_inputs: &self.side_inputs,
                options: &self.options,
                counters: &self.counters,
                output: &mut output,
            };
            self.do_fn.process_element(&element.value, &mut ctx)?;
        }
        Ok(output)
    }
}

#[async_trait]
impl<I, O, F> Node for ParDoNode<I, O, F>
where
    I: Element,
    O: Element,
    F: DoFn<I, O>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "par_do"
    }

    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<NodeValue, PipelineError> {
        let input = ctx.dataset::<I>(self.input, &self.name)?;
        let side_inputs = Arc::new(SideInputs::resolve(ctx, &self.name, &self.side_inputs)?);

        let total = input.len();
        let workers = ctx.options().parallelism.max(1);
        let chunk_size = total.div_ceil(workers).max(1);

        let mut tasks = Vec::with_capacity(workers);
        let mut start = 0;
        while start < total {
            let end = (start + chunk_size).min(total);
            let worker = ChunkWorker {
                stage: Arc::clone(&self.name),
                input: Arc::clone(&input),
                range: start..end,
                do_fn: Arc::clone(&self.do_fn),
                side_inputs: Arc::clone(&side_inputs),
                options: Arc::clone(ctx.options()),
                counters: Arc::clone(ctx.counters()),
            };
            tasks.push(tokio::task::spawn_blocking(move || worker.process::<O>()));
            start = end;
        }

        let chunks = tasks.len();
        let mut output = Vec::with_capacity(total);
        for result in join_all(tasks).await {
            match result {
                Ok(Ok(mut chunk)) => output.append(&mut chunk),
                Ok(Err(e)) => return Err(e),
                Err(join_error) => {
                    return Err(PipelineError::internal(format!(
                        "worker of stage '{}' did not complete: {}",
                        self.name, join_error
                    )))
                }
            }
        }

        log::debug!(
            "Stage '{}' processed {} element(s) in {} chunk(s), emitted {}",
            self.name,
            total,
            chunks,
            output.len()
        );
        Ok(Arc::new(output) as NodeValue)
    }
}
