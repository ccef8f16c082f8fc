//! Deferred assertions on pipeline contents
//!
//! Assertions are declared while a pipeline is built and checked when it runs, inside the
//! pipeline's own stages. Outcomes are counted in [`SUCCESS_COUNTER`] and
//! [`FAILURE_COUNTER`]; a failing check fails a bounded run and is only counted in an
//! unbounded one.

mod assertion;
mod check_stage;
mod checker;
mod materialize;
mod relation;

pub use assertion::{
    assert_that, assert_that_iterable, assert_that_map, assert_that_multimap,
    assert_that_singleton, assert_that_singleton_iterable, IterableAssertion,
    SingletonAssertion,
};
pub use check_stage::{
    CheckHandle, CheckState, FailurePolicy, OneSideInputAssert, TwoSideInputAssert,
    FAILURE_COUNTER, SUCCESS_COUNTER,
};
pub use checker::{
    checker, multiset_diff, CheckFailure, Checker, MultisetDiff, PREVIEW_ELEMENTS,
};
pub use materialize::{ActualView, ExpectedView, PreExisting, ViewSource};
pub use relation::{AssertRelation, ContainsInAnyOrder, IsEqualTo, NotEqualTo};
