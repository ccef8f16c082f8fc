//! Typed handles to the datasets of a pipeline

use super::context::{DoFn, ParDoNode, ProcessContext};
use super::graph::{EvaluationContext, Node, NodeId, NodeValue, Pipeline};
use super::view::{
    IterableViewFn, MapViewFn, MultimapViewFn, SideInput, SingletonViewFn, View, ViewFn,
    ViewNode,
};
use super::window::WindowFn;
use super::{Element, PipelineError};
use crate::velostream::serialization::{JsonCodec, SharedSerde};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

/// A distributed collection of `T` produced by one stage
pub struct Dataset<T> {
    pipeline: Pipeline,
    node: NodeId,
    name: String,
    serde: Option<SharedSerde<T>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Dataset<T> {
    fn clone(&self) -> Self {
        Self {
            pipeline: self.pipeline.clone(),
            node: self.node,
            name: self.name.clone(),
            serde: self.serde.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Dataset<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("name", &self.name)
            .field("node", &self.node)
            .field(
                "serde",
                &self.serde.as_ref().map(|s| s.format_name()).unwrap_or("unset"),
            )
            .finish()
    }
}

impl<T: Element> Dataset<T> {
    pub(crate) fn new(
        pipeline: Pipeline,
        node: NodeId,
        name: String,
        serde: Option<SharedSerde<T>>,
    ) -> Self {
        Self {
            pipeline,
            node,
            name,
            serde,
            _marker: PhantomData,
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Name of the stage that produces this dataset
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Serde of the element type, if one is known
    pub fn serde(&self) -> Option<SharedSerde<T>> {
        self.serde.clone()
    }

    pub fn with_serde(mut self, serde: SharedSerde<T>) -> Self {
        self.serde = Some(serde);
        self
    }

    /// Reassign every element to the window `window_fn` gives its timestamp
    pub fn window_into(
        &self,
        name: &str,
        window_fn: WindowFn,
    ) -> Result<Dataset<T>, PipelineError> {
        window_fn
            .validate()
            .map_err(|message| PipelineError::construction(name, message))?;
        let node = WindowIntoNode::<T> {
            name: name.to_string(),
            input: self.node,
            window_fn,
            _marker: PhantomData,
        };
        let id = self.pipeline.apply_node(Arc::new(node))?;
        Ok(Dataset::new(
            self.pipeline.clone(),
            id,
            name.to_string(),
            self.serde.clone(),
        ))
    }

    /// Apply `do_fn` to every element; `side_inputs` lists the views it may read
    pub fn par_do<O, F>(
        &self,
        name: &str,
        do_fn: F,
        side_inputs: &[SideInput],
    ) -> Result<Dataset<O>, PipelineError>
    where
        O: Element,
        F: DoFn<T, O>,
    {
        let node = ParDoNode::new(name.to_string(), self.node, do_fn, side_inputs.to_vec());
        let id = self.pipeline.apply_node(Arc::new(node))?;
        Ok(Dataset::new(self.pipeline.clone(), id, name.to_string(), None))
    }

    /// One output per element; the output dataset is JSON encoded
    pub fn map<O, F>(&self, name: &str, f: F) -> Result<Dataset<O>, PipelineError>
    where
        O: Element + Serialize + DeserializeOwned,
        F: Fn(&T) -> O + Send + Sync + 'static,
    {
        let mapped = self.par_do(name, MapFn(f), &[])?;
        Ok(mapped.with_serde(JsonCodec::shared()))
    }

    /// Keep the elements `predicate` accepts
    pub fn filter<F>(&self, name: &str, predicate: F) -> Result<Dataset<T>, PipelineError>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let filtered = self.par_do(name, FilterFn(predicate), &[])?;
        Ok(match &self.serde {
            Some(serde) => filtered.with_serde(Arc::clone(serde)),
            None => filtered,
        })
    }

    /// Materialize this dataset into a view with `view_fn`
    pub fn view<F>(&self, name: &str, view_fn: F) -> Result<View<F::Output>, PipelineError>
    where
        F: ViewFn<T>,
    {
        let shape = view_fn.shape();
        let id = self
            .pipeline
            .apply_node(Arc::new(ViewNode::new(name.to_string(), self.node, view_fn)))?;
        Ok(View::new(self.pipeline.clone(), id, name.to_string(), shape))
    }

    pub fn as_singleton(&self, name: &str) -> Result<View<T>, PipelineError> {
        self.view(name, SingletonViewFn)
    }

    pub fn as_iterable(&self, name: &str) -> Result<View<Vec<T>>, PipelineError> {
        self.view(name, IterableViewFn)
    }
}

impl<K, V> Dataset<(K, V)>
where
    K: Element + Eq + Hash,
    V: Element,
{
    /// Map view; a window holding the same key twice fails when read
    pub fn as_map(&self, name: &str) -> Result<View<HashMap<K, V>>, PipelineError> {
        self.view(name, MapViewFn)
    }

    pub fn as_multimap(&self, name: &str) -> Result<View<HashMap<K, Vec<V>>>, PipelineError> {
        self.view(name, MultimapViewFn)
    }
}

struct MapFn<F>(F);

impl<I, O, F> DoFn<I, O> for MapFn<F>
where
    F: Fn(&I) -> O + Send + Sync + 'static,
{
    fn process_element(
        &self,
        element: &I,
        ctx: &mut ProcessContext<'_, O>,
    ) -> Result<(), PipelineError> {
        ctx.output((self.0)(element));
        Ok(())
    }
}

struct FilterFn<F>(F);

impl<T, F> DoFn<T, T> for FilterFn<F>
where
    T: Clone,
    F: Fn(&T) -> bool + Send + Sync + 'static,
{
    fn process_element(
        &self,
        element: &T,
        ctx: &mut ProcessContext<'_, T>,
    ) -> Result<(), PipelineError> {
        if (self.0)(element) {
            ctx.output(element.clone());
        }
        Ok(())
    }
}

struct WindowIntoNode<T> {
    name: String,
    input: NodeId,
    window_fn: WindowFn,
    _marker: PhantomData<fn(T)>,
}

#[async_trait]
impl<T: Element> Node for WindowIntoNode<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "window_into"
    }

    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<NodeValue, PipelineError> {
        let input = ctx.dataset::<T>(self.input, &self.name)?;
        let output: Vec<_> = input
            .iter()
            .map(|element| {
                let mut windowed = element.clone();
                windowed.window = self.window_fn.assign(element.timestamp_ms);
                windowed
            })
            .collect();
        Ok(Arc::new(output) as NodeValue)
    }
}
