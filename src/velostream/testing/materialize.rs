//! Builders that turn the checked values into views
//!
//! Actual data is re-windowed into the global window and deep-copied through its serde
//! before it is materialized, so a checker never observes the instances the pipeline
//! produced. Expected data is encoded when the assertion is declared and injected as a
//! new source.

use crate::velostream::pipeline::{
    Dataset, DoFn, Element, Pipeline, PipelineError, ProcessContext, View, ViewError, ViewFn,
    ViewShape, WindowFn,
};
use crate::velostream::serialization::{clone_via, SerializationError, SharedSerde};

/// Pending fragment that materializes a checked value as a view
pub trait ViewSource<V>: Send + Sync {
    /// Register the fragment's stages under `prefix`
    fn expand(&self, pipeline: &Pipeline, prefix: &str) -> Result<View<V>, PipelineError>;
}

/// A live dataset, isolated and materialized with a view function
///
/// Elements are isolated with the dataset's own serde, or with the fallback serde when the
/// dataset has none.
pub struct ActualView<T, F> {
    dataset: Dataset<T>,
    view_fn: F,
    fallback: Option<SharedSerde<T>>,
    keyed: bool,
}

impl<T, F> ActualView<T, F>
where
    T: Element,
    F: ViewFn<T> + Clone,
{
    pub fn new(dataset: Dataset<T>, view_fn: F) -> Self {
        Self {
            dataset,
            view_fn,
            fallback: None,
            keyed: false,
        }
    }

    /// The view is built from key/value entries, so only the dataset's serde can isolate them
    pub fn keyed(mut self) -> Self {
        self.keyed = true;
        self
    }

    pub fn with_fallback_serde(mut self, serde: Option<SharedSerde<T>>) -> Self {
        self.fallback = serde;
        self
    }

    pub fn dataset(&self) -> &Dataset<T> {
        &self.dataset
    }
}

impl<T, F> ViewSource<F::Output> for ActualView<T, F>
where
    T: Element,
    F: ViewFn<T> + Clone,
{
    fn expand(&self, pipeline: &Pipeline, prefix: &str) -> Result<View<F::Output>, PipelineError> {
        if !self.dataset.pipeline().is_same(pipeline) {
            return Err(PipelineError::construction(
                prefix,
                format!(
                    "dataset '{}' belongs to a different pipeline",
                    self.dataset.name()
                ),
            ));
        }
        let serde = self
            .dataset
            .serde()
            .or_else(|| self.fallback.clone())
            .ok_or_else(|| {
                let remedy = if self.keyed {
                    "map and multimap assertions copy its entries, so give it one with \
                     Dataset::with_serde"
                } else {
                    "set one with set_serde or Dataset::with_serde before asserting on it"
                };
                PipelineError::construction(
                    prefix,
                    format!("dataset '{}' has no serde; {}", self.dataset.name(), remedy),
                )
            })?;

        let global = self
            .dataset
            .window_into(&format!("{}/RewindowActuals", prefix), WindowFn::Global)?;
        let isolated = global.par_do(&format!("{}/Isolate", prefix), IsolateFn { serde }, &[])?;
        isolated.view(
            &format!("{}/View", prefix),
            IsolatedViewFn {
                inner: self.view_fn.clone(),
            },
        )
    }
}

/// Deep copy through the serde; a failed round trip travels on as the element's error
struct IsolateFn<T> {
    serde: SharedSerde<T>,
}

impl<T: Element> DoFn<T, Result<T, SerializationError>> for IsolateFn<T> {
    fn process_element(
        &self,
        element: &T,
        ctx: &mut ProcessContext<'_, Result<T, SerializationError>>,
    ) -> Result<(), PipelineError> {
        ctx.output(clone_via(self.serde.as_ref(), element));
        Ok(())
    }
}

/// Applies `inner` once every isolated element decoded
#[derive(Clone)]
struct IsolatedViewFn<F> {
    inner: F,
}

impl<T, F> ViewFn<Result<T, SerializationError>> for IsolatedViewFn<F>
where
    T: Element,
    F: ViewFn<T>,
{
    type Output = F::Output;

    fn shape(&self) -> ViewShape {
        self.inner.shape()
    }

    fn apply(
        &self,
        elements: Vec<Result<T, SerializationError>>,
    ) -> Result<F::Output, ViewError> {
        let values = elements
            .into_iter()
            .enumerate()
            .map(|(index, element)| {
                element.map_err(|e| ViewError::Element {
                    message: format!("element {} failed to round-trip: {}", index, e),
                })
            })
            .collect::<Result<Vec<T>, ViewError>>()?;
        self.inner.apply(values)
    }
}

/// Literal values injected as a new source and materialized with a view function
pub struct ExpectedView<T, F> {
    values: Vec<T>,
    serde: Option<SharedSerde<T>>,
    view_fn: F,
}

impl<T, F> ExpectedView<T, F>
where
    T: Element,
    F: ViewFn<T> + Clone,
{
    pub fn new(values: Vec<T>, serde: Option<SharedSerde<T>>, view_fn: F) -> Self {
        Self {
            values,
            serde,
            view_fn,
        }
    }
}

impl<T, F> ViewSource<F::Output> for ExpectedView<T, F>
where
    T: Element,
    F: ViewFn<T> + Clone,
{
    fn expand(&self, pipeline: &Pipeline, prefix: &str) -> Result<View<F::Output>, PipelineError> {
        if self.view_fn.shape() == ViewShape::Singleton && self.values.len() != 1 {
            return Err(PipelineError::construction(
                prefix,
                format!(
                    "a singleton expectation needs exactly one value, got {}",
                    self.values.len()
                ),
            ));
        }
        let serde = self.serde.clone().ok_or_else(|| {
            PipelineError::construction(prefix, "expected values need a serde to be injected")
        })?;

        let created = pipeline.create_with_serde(
            &format!("{}/Values", prefix),
            self.values.iter().cloned(),
            serde,
        )?;
        created.view(&format!("{}/View", prefix), self.view_fn.clone())
    }
}

/// A view the caller already materialized
pub struct PreExisting<V> {
    view: View<V>,
}

impl<V: Send + Sync + 'static> PreExisting<V> {
    pub fn new(view: View<V>) -> Self {
        Self { view }
    }
}

impl<V: Send + Sync + 'static> ViewSource<V> for PreExisting<V> {
    fn expand(&self, pipeline: &Pipeline, prefix: &str) -> Result<View<V>, PipelineError> {
        if !self.view.pipeline().is_same(pipeline) {
            return Err(PipelineError::construction(
                prefix,
                format!("view '{}' belongs to a different pipeline", self.view.name()),
            ));
        }
        Ok(self.view.clone())
    }
}
