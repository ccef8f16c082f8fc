//! Assertion builders
//!
//! Entry points wrap a dataset or view in an assertion; every terminal call registers one
//! independent check stage named `Assert$<n>`. Nothing is checked until the pipeline runs.
//!
//! ```rust
//! use velo_assert::velostream::pipeline::{Pipeline, PipelineOptions};
//! use velo_assert::velostream::testing::{assert_that, FAILURE_COUNTER, SUCCESS_COUNTER};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), velo_assert::velostream::pipeline::PipelineError> {
//! let pipeline = Pipeline::new(PipelineOptions::bounded())?;
//! let numbers = pipeline.create("Numbers", vec![3, 1, 2])?;
//! assert_that(&numbers).contains_in_any_order(vec![1, 2, 3])?;
//!
//! let result = pipeline.run().await?;
//! assert_eq!(result.counter(SUCCESS_COUNTER), 1);
//! assert_eq!(result.counter(FAILURE_COUNTER), 0);
//! # Ok(())
//! # }
//! ```
//!
//! Assertion handles cannot be compared; `==` on handles is almost always a mistaken
//! `is_equal_to`:
//!
//! ```compile_fail
//! use velo_assert::velostream::pipeline::{Pipeline, PipelineOptions};
//! use velo_assert::velostream::testing::assert_that;
//!
//! let pipeline = Pipeline::new(PipelineOptions::bounded()).unwrap();
//! let numbers = pipeline.create("Numbers", vec![1, 2, 3]).unwrap();
//! let _ = assert_that(&numbers) == assert_that(&numbers);
//! ```

use super::check_stage::{OneSideInputAssert, TwoSideInputAssert};
use super::checker::{CheckFailure, Checker};
use super::materialize::{ActualView, ExpectedView, PreExisting, ViewSource};
use super::relation::{AssertRelation, ContainsInAnyOrder, IsEqualTo, NotEqualTo};
use crate::velostream::pipeline::{
    Dataset, Element, IterableViewFn, MapViewFn, MultimapViewFn, Pipeline, PipelineError,
    SingletonViewFn, View,
};
use crate::velostream::serialization::{
    IterableCodec, JsonCodec, KvMapCodec, KvMultimapCodec, SharedSerde,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// Assertions over all elements of a dataset
pub fn assert_that<T>(dataset: &Dataset<T>) -> IterableAssertion<T>
where
    T: Element + PartialEq,
{
    IterableAssertion {
        pipeline: dataset.pipeline().clone(),
        actual: IterableActual::Elements(dataset.clone()),
        serde: dataset.serde(),
    }
}

/// Assertions over the single `Vec<T>` a dataset holds
pub fn assert_that_singleton_iterable<T>(dataset: &Dataset<Vec<T>>) -> IterableAssertion<T>
where
    T: Element + PartialEq + Serialize + DeserializeOwned,
{
    IterableAssertion {
        pipeline: dataset.pipeline().clone(),
        actual: IterableActual::SingletonIterable(dataset.clone()),
        serde: Some(JsonCodec::shared()),
    }
}

/// Assertions over an already materialized iterable view
pub fn assert_that_iterable<T>(view: &View<Vec<T>>) -> IterableAssertion<T>
where
    T: Element + PartialEq,
{
    IterableAssertion {
        pipeline: view.pipeline().clone(),
        actual: IterableActual::View(view.clone()),
        serde: None,
    }
}

/// Assertions over the single element of a dataset
pub fn assert_that_singleton<T>(dataset: &Dataset<T>) -> SingletonAssertion<T>
where
    T: Element + PartialEq,
{
    SingletonAssertion {
        pipeline: dataset.pipeline().clone(),
        actual: SingletonActual::Element(dataset.clone()),
        serde: dataset.serde(),
    }
}

/// Assertions over a key/value dataset viewed as a map; duplicate keys fail the check
pub fn assert_that_map<K, V>(dataset: &Dataset<(K, V)>) -> SingletonAssertion<HashMap<K, V>>
where
    K: Element + Eq + Hash,
    V: Element + PartialEq,
{
    let serde = dataset
        .serde()
        .map(|entry| Arc::new(KvMapCodec::new(entry)) as SharedSerde<HashMap<K, V>>);
    let actual: Arc<dyn ViewSource<HashMap<K, V>>> =
        Arc::new(ActualView::new(dataset.clone(), MapViewFn).keyed());
    SingletonAssertion {
        pipeline: dataset.pipeline().clone(),
        actual: SingletonActual::Derived(actual),
        serde,
    }
}

/// Assertions over a key/value dataset viewed as a multimap
pub fn assert_that_multimap<K, V>(
    dataset: &Dataset<(K, V)>,
) -> SingletonAssertion<HashMap<K, Vec<V>>>
where
    K: Element + Eq + Hash,
    V: Element + PartialEq,
{
    let serde = dataset
        .serde()
        .map(|entry| Arc::new(KvMultimapCodec::new(entry)) as SharedSerde<HashMap<K, Vec<V>>>);
    let actual: Arc<dyn ViewSource<HashMap<K, Vec<V>>>> =
        Arc::new(ActualView::new(dataset.clone(), MultimapViewFn).keyed());
    SingletonAssertion {
        pipeline: dataset.pipeline().clone(),
        actual: SingletonActual::Derived(actual),
        serde,
    }
}

fn missing_serde(kind: &str, remedy: &str) -> PipelineError {
    PipelineError::Construction {
        stage: kind.to_string(),
        message: format!("the serde of this {} has not been set; {}", kind, remedy),
    }
}

enum IterableActual<T> {
    Elements(Dataset<T>),
    SingletonIterable(Dataset<Vec<T>>),
    View(View<Vec<T>>),
}

/// Assertion about an iterable of `T`
pub struct IterableAssertion<T> {
    pipeline: Pipeline,
    actual: IterableActual<T>,
    serde: Option<SharedSerde<T>>,
}

impl<T> IterableAssertion<T>
where
    T: Element + PartialEq,
{
    /// Serde for `T`, used to inject expected values
    pub fn set_serde(&mut self, serde: SharedSerde<T>) -> &mut Self {
        self.serde = Some(serde);
        self
    }

    pub fn serde(&self) -> Result<SharedSerde<T>, PipelineError> {
        self.serde
            .clone()
            .ok_or_else(|| missing_serde("IterableAssertion", "call set_serde"))
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    fn actual_source(&self) -> Arc<dyn ViewSource<Vec<T>>> {
        match &self.actual {
            IterableActual::Elements(dataset) => Arc::new(
                ActualView::new(dataset.clone(), IterableViewFn)
                    .with_fallback_serde(self.serde.clone()),
            ),
            IterableActual::SingletonIterable(dataset) => {
                let fallback = self.serde.clone().map(|element| {
                    Arc::new(IterableCodec::new(element)) as SharedSerde<Vec<T>>
                });
                Arc::new(
                    ActualView::new(dataset.clone(), SingletonViewFn)
                        .with_fallback_serde(fallback),
                )
            }
            IterableActual::View(view) => Arc::new(PreExisting::new(view.clone())),
        }
    }

    /// Check the elements with `check`
    pub fn satisfies<F>(&self, check: F) -> Result<&Self, PipelineError>
    where
        F: Fn(&[T]) -> Result<(), CheckFailure> + Send + Sync + 'static,
    {
        let checker: Checker<Vec<T>> = Arc::new(move |actual: &Vec<T>| check(actual.as_slice()));
        let name = self.pipeline.next_assertion_name()?;
        OneSideInputAssert::new(self.actual_source(), checker).apply(&self.pipeline, &name)?;
        Ok(self)
    }

    /// Check the elements against `expected` with `relation`
    pub fn satisfies_relation<R>(
        &self,
        relation: R,
        expected: impl IntoIterator<Item = T>,
    ) -> Result<&Self, PipelineError>
    where
        R: AssertRelation<Vec<T>, Vec<T>>,
    {
        let serde = self.serde()?;
        let expected: Arc<dyn ViewSource<Vec<T>>> = Arc::new(ExpectedView::new(
            expected.into_iter().collect(),
            Some(serde),
            IterableViewFn,
        ));
        let name = self.pipeline.next_assertion_name()?;
        TwoSideInputAssert::new(self.actual_source(), expected, relation)
            .apply(&self.pipeline, &name)?;
        Ok(self)
    }

    /// The elements are a permutation of `expected`
    pub fn contains_in_any_order(
        &self,
        expected: impl IntoIterator<Item = T>,
    ) -> Result<&Self, PipelineError> {
        self.satisfies_relation(ContainsInAnyOrder, expected)
    }

    pub fn empty(&self) -> Result<&Self, PipelineError> {
        self.contains_in_any_order(Vec::new())
    }
}

impl<T: Element> fmt::Debug for IterableAssertion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let actual = match &self.actual {
            IterableActual::Elements(dataset) => dataset.name().to_string(),
            IterableActual::SingletonIterable(dataset) => dataset.name().to_string(),
            IterableActual::View(view) => view.name().to_string(),
        };
        f.debug_struct("IterableAssertion")
            .field("actual", &actual)
            .field("serde", &self.serde.as_ref().map(|s| s.format_name()))
            .finish()
    }
}

enum SingletonActual<T> {
    Element(Dataset<T>),
    Derived(Arc<dyn ViewSource<T>>),
}

/// Assertion about a single value of type `T`
pub struct SingletonAssertion<T> {
    pipeline: Pipeline,
    actual: SingletonActual<T>,
    serde: Option<SharedSerde<T>>,
}

impl<T> SingletonAssertion<T>
where
    T: Element + PartialEq,
{
    /// Serde for `T`, used to inject the expected value
    pub fn set_serde(&mut self, serde: SharedSerde<T>) -> &mut Self {
        self.serde = Some(serde);
        self
    }

    pub fn serde(&self) -> Result<SharedSerde<T>, PipelineError> {
        self.serde.clone().ok_or_else(|| match self.actual {
            SingletonActual::Element(_) => missing_serde("SingletonAssertion", "call set_serde"),
            SingletonActual::Derived(_) => missing_serde(
                "SingletonAssertion",
                "give the key/value dataset a serde with Dataset::with_serde",
            ),
        })
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    fn actual_source(&self) -> Arc<dyn ViewSource<T>> {
        match &self.actual {
            SingletonActual::Element(dataset) => Arc::new(
                ActualView::new(dataset.clone(), SingletonViewFn)
                    .with_fallback_serde(self.serde.clone()),
            ),
            SingletonActual::Derived(source) => Arc::clone(source),
        }
    }

    /// Check the value with `check`
    pub fn satisfies<F>(&self, check: F) -> Result<&Self, PipelineError>
    where
        F: Fn(&T) -> Result<(), CheckFailure> + Send + Sync + 'static,
    {
        let checker: Checker<T> = Arc::new(check);
        let name = self.pipeline.next_assertion_name()?;
        OneSideInputAssert::new(self.actual_source(), checker).apply(&self.pipeline, &name)?;
        Ok(self)
    }

    /// Check the value against `expected` with `relation`
    pub fn satisfies_relation<R>(&self, relation: R, expected: T) -> Result<&Self, PipelineError>
    where
        R: AssertRelation<T, T>,
    {
        let serde = self.serde()?;
        let expected: Arc<dyn ViewSource<T>> = Arc::new(ExpectedView::new(
            vec![expected],
            Some(serde),
            SingletonViewFn,
        ));
        let name = self.pipeline.next_assertion_name()?;
        TwoSideInputAssert::new(self.actual_source(), expected, relation)
            .apply(&self.pipeline, &name)?;
        Ok(self)
    }

    pub fn is_equal_to(&self, expected: T) -> Result<&Self, PipelineError> {
        self.satisfies_relation(IsEqualTo, expected)
    }

    pub fn not_equal_to(&self, expected: T) -> Result<&Self, PipelineError> {
        self.satisfies_relation(NotEqualTo, expected)
    }

    #[deprecated(note = "use `is_equal_to`")]
    pub fn is(&self, expected: T) -> Result<&Self, PipelineError> {
        self.is_equal_to(expected)
    }
}

impl<T: Element> fmt::Debug for SingletonAssertion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let actual = match &self.actual {
            SingletonActual::Element(dataset) => dataset.name(),
            SingletonActual::Derived(_) => "derived view",
        };
        f.debug_struct("SingletonAssertion")
            .field("actual", &actual)
            .field("serde", &self.serde.as_ref().map(|s| s.format_name()))
            .finish()
    }
}
