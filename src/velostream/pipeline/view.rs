//! Materialized views
//!
//! A view gathers every element of a dataset, per window, into one value that other stages
//! read as a side input. Materialization failures do not abort the view stage: they are
//! stored and surface as an error for whichever stage reads the affected window.

use super::graph::{EvaluationContext, Node, NodeId, NodeValue, Pipeline};
use super::window::Window;
use super::{Element, PipelineError};
use async_trait::async_trait;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

/// Shape of the value a view exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewShape {
    Singleton,
    Iterable,
    Map,
    Multimap,
}

impl fmt::Display for ViewShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewShape::Singleton => write!(f, "singleton"),
            ViewShape::Iterable => write!(f, "iterable"),
            ViewShape::Map => write!(f, "map"),
            ViewShape::Multimap => write!(f, "multimap"),
        }
    }
}

/// Why a window's elements could not be turned into a view value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewError {
    #[error("expected exactly one element, found none")]
    EmptySingleton,

    #[error("expected exactly one element, found {count}")]
    TooManyForSingleton { count: usize },

    #[error("duplicate key {key}")]
    DuplicateKey { key: String },

    #[error("{message}")]
    Element { message: String },
}

/// Folds the elements of one window into the view's value
pub trait ViewFn<T>: Send + Sync + 'static {
    type Output: Send + Sync + 'static;

    fn shape(&self) -> ViewShape;

    fn apply(&self, elements: Vec<T>) -> Result<Self::Output, ViewError>;
}

/// Exactly one element per window
#[derive(Debug, Clone, Copy, Default)]
pub struct SingletonViewFn;

impl<T: Element> ViewFn<T> for SingletonViewFn {
    type Output = T;

    fn shape(&self) -> ViewShape {
        ViewShape::Singleton
    }

    fn apply(&self, mut elements: Vec<T>) -> Result<T, ViewError> {
        match elements.len() {
            0 => Err(ViewError::EmptySingleton),
            1 => elements.pop().ok_or(ViewError::EmptySingleton),
            count => Err(ViewError::TooManyForSingleton { count }),
        }
    }
}

/// All elements of the window, in arrival order
#[derive(Debug, Clone, Copy, Default)]
pub struct IterableViewFn;

impl<T: Element> ViewFn<T> for IterableViewFn {
    type Output = Vec<T>;

    fn shape(&self) -> ViewShape {
        ViewShape::Iterable
    }

    fn apply(&self, elements: Vec<T>) -> Result<Vec<T>, ViewError> {
        Ok(elements)
    }
}

/// Key/value pairs with unique keys
#[derive(Debug, Clone, Copy, Default)]
pub struct MapViewFn;

impl<K, V> ViewFn<(K, V)> for MapViewFn
where
    K: Element + Eq + Hash,
    V: Element,
{
    type Output = HashMap<K, V>;

    fn shape(&self) -> ViewShape {
        ViewShape::Map
    }

    fn apply(&self, elements: Vec<(K, V)>) -> Result<HashMap<K, V>, ViewError> {
        let mut map = HashMap::with_capacity(elements.len());
        for (key, value) in elements {
            match map.entry(key) {
                Entry::Occupied(entry) => {
                    return Err(ViewError::DuplicateKey {
                        key: format!("{:?}", entry.key()),
                    })
                }
                Entry::Vacant(entry) => {
                    entry.insert(value);
                }
            }
        }
        Ok(map)
    }
}

/// Key/value pairs grouped by key; values keep arrival order
#[derive(Debug, Clone, Copy, Default)]
pub struct MultimapViewFn;

impl<K, V> ViewFn<(K, V)> for MultimapViewFn
where
    K: Element + Eq + Hash,
    V: Element,
{
    type Output = HashMap<K, Vec<V>>;

    fn shape(&self) -> ViewShape {
        ViewShape::Multimap
    }

    fn apply(&self, elements: Vec<(K, V)>) -> Result<HashMap<K, Vec<V>>, ViewError> {
        let mut map: HashMap<K, Vec<V>> = HashMap::new();
        for (key, value) in elements {
            map.entry(key).or_default().push(value);
        }
        Ok(map)
    }
}

/// Handle to a view registered in a pipeline
pub struct View<V> {
    pipeline: Pipeline,
    node: NodeId,
    name: String,
    shape: ViewShape,
    _marker: PhantomData<fn() -> V>,
}

impl<V> Clone for View<V> {
    fn clone(&self) -> Self {
        Self {
            pipeline: self.pipeline.clone(),
            node: self.node,
            name: self.name.clone(),
            shape: self.shape,
            _marker: PhantomData,
        }
    }
}

impl<V> fmt::Debug for View<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("name", &self.name)
            .field("shape", &self.shape)
            .finish()
    }
}

impl<V: Send + Sync + 'static> View<V> {
    pub(crate) fn new(pipeline: Pipeline, node: NodeId, name: String, shape: ViewShape) -> Self {
        Self {
            pipeline,
            node,
            name,
            shape,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> ViewShape {
        self.shape
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub(crate) fn node_id(&self) -> NodeId {
        self.node
    }

    /// Declaration to pass to `par_do` so the stage may read this view
    pub fn as_side_input(&self) -> SideInput {
        SideInput {
            node: self.node,
            name: self.name.clone(),
        }
    }
}

/// A view declared as readable by a stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideInput {
    node: NodeId,
    name: String,
}

impl SideInput {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn node_id(&self) -> NodeId {
        self.node
    }
}

/// Evaluated view: one value, or the stored failure, per window
pub(crate) struct ViewContents<V> {
    name: String,
    per_window: HashMap<Window, Result<Arc<V>, PipelineError>>,
    empty: Result<Arc<V>, PipelineError>,
}

impl<V> ViewContents<V> {
    /// Value for `window`; windows with no elements read the empty-input value
    ///
    /// A view holding interval windows only cannot be read from the global window.
    pub(crate) fn read(&self, window: Window) -> Result<Arc<V>, PipelineError> {
        if let Some(value) = self.per_window.get(&window) {
            return value.clone();
        }
        if window == Window::Global && !self.per_window.is_empty() {
            return Err(PipelineError::ViewMaterialization {
                view: self.name.clone(),
                message: format!(
                    "holds values for {} interval window(s) and cannot be read from the \
                     global window; rewindow its input with WindowFn::Global first",
                    self.per_window.len()
                ),
            });
        }
        self.empty.clone()
    }
}

pub(crate) struct ViewNode<T, F> {
    name: String,
    input: NodeId,
    view_fn: F,
    _marker: PhantomData<fn(T)>,
}

impl<T, F> ViewNode<T, F>
where
    T: Element,
    F: ViewFn<T>,
{
    pub(crate) fn new(name: String, input: NodeId, view_fn: F) -> Self {
        Self {
            name,
            input,
            view_fn,
            _marker: PhantomData,
        }
    }

    fn materialize(&self, elements: Vec<T>) -> Result<Arc<F::Output>, PipelineError> {
        self.view_fn
            .apply(elements)
            .map(Arc::new)
            .map_err(|e| match e {
                ViewError::DuplicateKey { key } => PipelineError::DuplicateKey {
                    view: self.name.clone(),
                    key,
                },
                other => PipelineError::ViewMaterialization {
                    view: self.name.clone(),
                    message: other.to_string(),
                },
            })
    }
}

#[async_trait]
impl<T, F> Node for ViewNode<T, F>
where
    T: Element,
    F: ViewFn<T>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "view"
    }

    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<NodeValue, PipelineError> {
        let input = ctx.dataset::<T>(self.input, &self.name)?;

        let mut grouped: HashMap<Window, Vec<T>> = HashMap::new();
        for element in input.iter() {
            grouped
                .entry(element.window)
                .or_default()
                .push(element.value.clone());
        }

        let windows = grouped.len();
        let mut per_window = HashMap::with_capacity(windows);
        for (window, elements) in grouped {
            let value = self.materialize(elements);
            if let Err(e) = &value {
                log::debug!("View '{}' failed for window {}: {}", self.name, window, e);
            }
            per_window.insert(window, value);
        }

        log::debug!(
            "Materialized {} view '{}' over {} window(s)",
            self.view_fn.shape(),
            self.name,
            windows
        );

        Ok(Arc::new(ViewContents {
            name: self.name.clone(),
            per_window,
            empty: self.materialize(Vec::new()),
        }) as NodeValue)
    }
}
