//! Pipeline graph
//!
//! A [`Pipeline`] is a cheap, cloneable handle to a shared graph of stages. Builder calls
//! append stages; nothing runs until [`Pipeline::run`]. Stages only ever reference stages
//! appended before them, so insertion order is a valid evaluation order.

use super::runner::{LocalRunner, PipelineResult};
use super::window::WindowedValue;
use super::{Element, PipelineError, PipelineOptions, RunMode};
use crate::velostream::observability::CounterSet;
use async_trait::async_trait;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

pub(crate) type NodeId = usize;

/// Output of an evaluated stage: a `Vec<WindowedValue<T>>` for datasets, a
/// `ViewContents<V>` for views
pub(crate) type NodeValue = Arc<dyn Any + Send + Sync>;

/// A stage the runner can evaluate
#[async_trait]
pub(crate) trait Node: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> &'static str;

    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<NodeValue, PipelineError>;
}

/// Outputs of the stages evaluated so far in one run
pub(crate) struct EvaluationContext {
    options: Arc<PipelineOptions>,
    counters: Arc<CounterSet>,
    outputs: HashMap<NodeId, NodeValue>,
}

impl EvaluationContext {
    pub(crate) fn new(options: Arc<PipelineOptions>, counters: Arc<CounterSet>) -> Self {
        Self {
            options,
            counters,
            outputs: HashMap::new(),
        }
    }

    pub(crate) fn options(&self) -> &Arc<PipelineOptions> {
        &self.options
    }

    pub(crate) fn counters(&self) -> &Arc<CounterSet> {
        &self.counters
    }

    pub(crate) fn insert(&mut self, node: NodeId, value: NodeValue) {
        self.outputs.insert(node, value);
    }

    pub(crate) fn output(&self, node: NodeId, consumer: &str) -> Result<NodeValue, PipelineError> {
        self.outputs.get(&node).cloned().ok_or_else(|| {
            PipelineError::internal(format!(
                "stage '{}' reads node #{} before it was evaluated",
                consumer, node
            ))
        })
    }

    /// Elements of an upstream dataset
    pub(crate) fn dataset<T: Element>(
        &self,
        node: NodeId,
        consumer: &str,
    ) -> Result<Arc<Vec<WindowedValue<T>>>, PipelineError> {
        self.output(node, consumer)?
            .downcast::<Vec<WindowedValue<T>>>()
            .map_err(|_| {
                PipelineError::internal(format!(
                    "stage '{}' expected elements of type {} from node #{}",
                    consumer,
                    std::any::type_name::<T>(),
                    node
                ))
            })
    }
}

#[derive(Default)]
struct Graph {
    nodes: Vec<Arc<dyn Node>>,
    names: HashSet<String>,
    assertions: usize,
}

struct PipelineInner {
    options: Arc<PipelineOptions>,
    graph: Mutex<Graph>,
}

/// Handle to a lazily executed pipeline
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<PipelineInner>,
}

impl Pipeline {
    /// Create an empty pipeline
    pub fn new(options: PipelineOptions) -> Result<Self, PipelineError> {
        options.validate()?;
        log::info!(
            "Created pipeline '{}' (mode={}, parallelism={})",
            options.job_name,
            options.run_mode,
            options.parallelism
        );
        Ok(Self {
            inner: Arc::new(PipelineInner {
                options: Arc::new(options),
                graph: Mutex::new(Graph::default()),
            }),
        })
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.inner.options
    }

    pub(crate) fn shared_options(&self) -> Arc<PipelineOptions> {
        Arc::clone(&self.inner.options)
    }

    pub fn run_mode(&self) -> RunMode {
        self.inner.options.run_mode
    }

    /// Whether both handles point at the same pipeline
    pub fn is_same(&self, other: &Pipeline) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Names of every registered stage, in evaluation order
    pub fn stage_names(&self) -> Vec<String> {
        match self.graph() {
            Ok(graph) => graph.nodes.iter().map(|n| n.name().to_string()).collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn stage_count(&self) -> usize {
        self.graph().map(|g| g.nodes.len()).unwrap_or(0)
    }

    /// Execute the pipeline on the local runner
    pub async fn run(&self) -> Result<PipelineResult, PipelineError> {
        LocalRunner::run(self).await
    }

    /// Register a stage for later execution
    pub(crate) fn apply_node(&self, node: Arc<dyn Node>) -> Result<NodeId, PipelineError> {
        let name = node.name().to_string();
        if name.trim().is_empty() {
            return Err(PipelineError::construction(
                name,
                "stage names must not be empty",
            ));
        }

        let mut graph = self.graph()?;
        if !graph.names.insert(name.clone()) {
            return Err(PipelineError::DuplicateStageName { name });
        }
        let id = graph.nodes.len();
        log::trace!("Registered {} stage '{}' as node #{}", node.kind(), name, id);
        graph.nodes.push(node);
        Ok(id)
    }

    /// Remove the stages registered after the first `checkpoint` ones, provided every one
    /// of them is named under `prefix`
    ///
    /// Stages registered by other builders in between are never removed, so node ids
    /// already handed out stay valid. Returns the number of stages removed.
    pub(crate) fn discard_stages_since(
        &self,
        checkpoint: usize,
        prefix: &str,
    ) -> Result<usize, PipelineError> {
        let mut graph = self.graph()?;
        if graph.nodes.len() <= checkpoint {
            return Ok(0);
        }
        if !graph.nodes[checkpoint..]
            .iter()
            .all(|node| node.name().starts_with(prefix))
        {
            log::warn!(
                "Keeping stages after node #{}: stages outside '{}' were registered in between",
                checkpoint,
                prefix
            );
            return Ok(0);
        }

        let removed: Vec<Arc<dyn Node>> = graph.nodes.drain(checkpoint..).collect();
        for node in &removed {
            graph.names.remove(node.name());
        }
        Ok(removed.len())
    }

    /// Next name in the `Assert$<n>` sequence of this pipeline
    pub(crate) fn next_assertion_name(&self) -> Result<String, PipelineError> {
        let mut graph = self.graph()?;
        let name = format!("Assert${}", graph.assertions);
        graph.assertions += 1;
        Ok(name)
    }

    pub(crate) fn nodes(&self) -> Result<Vec<Arc<dyn Node>>, PipelineError> {
        Ok(self.graph()?.nodes.clone())
    }

    fn graph(&self) -> Result<MutexGuard<'_, Graph>, PipelineError> {
        self.inner
            .graph
            .lock()
            .map_err(|_| PipelineError::internal("pipeline graph lock poisoned"))
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("job_name", &self.inner.options.job_name)
            .field("run_mode", &self.inner.options.run_mode)
            .field("stages", &self.stage_count())
            .finish()
    }
}
