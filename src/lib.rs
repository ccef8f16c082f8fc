//! # velo-assert
//!
//! Deferred assertions for lazily executed data pipelines. An assertion is declared while the
//! pipeline is built and checked by the pipeline's own stages when it runs; the outcome is
//! recorded in engine counters and, in bounded runs, fails the job.

// Allow certain clippy warnings for development
#![allow(clippy::derivable_impls)]
#![allow(clippy::needless_doctest_main)]
#![allow(clippy::type_complexity)]
//!
//! ## Features
//!
//! - **Deferred checks**: `contains_in_any_order`, `empty`, `is_equal_to`, `not_equal_to`
//!   and custom checkers, evaluated inside the pipeline
//! - **Isolation**: checked values are deep copies made through the dataset's serde
//! - **Run modes**: a failing check aborts a bounded run and is only counted in an
//!   unbounded one
//! - **Counters**: `AssertionSuccess` / `AssertionFailure` per check stage, backed by
//!   prometheus
//!
//! ## Quick Start
//!
//! ```rust
//! use velo_assert::{assert_that, assert_that_singleton, Pipeline, PipelineOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), velo_assert::PipelineError> {
//!     let pipeline = Pipeline::new(PipelineOptions::bounded().with_job_name("quick-start"))?;
//!
//!     let words = pipeline.create("Words", vec!["a".to_string(), "bb".to_string()])?;
//!     let lengths = words.map("Lengths", |w: &String| w.len())?;
//!     assert_that(&lengths).contains_in_any_order(vec![2, 1])?;
//!
//!     let total = pipeline.create("Total", vec![3usize])?;
//!     assert_that_singleton(&total).is_equal_to(3)?;
//!
//!     let result = pipeline.run().await?.into_result()?;
//!     assert_eq!(result.counter("AssertionSuccess"), 2);
//!     Ok(())
//! }
//! ```

pub mod velostream;

// Re-export main API at crate root for easy access
pub use velostream::pipeline::{
    Dataset, Pipeline, PipelineError, PipelineOptions, PipelineOutcome, PipelineResult,
    PipelineState, RunMode,
};
pub use velostream::serialization::{JsonCodec, Serde, SerializationError, SharedSerde};
pub use velostream::testing::{
    assert_that, assert_that_iterable, assert_that_map, assert_that_multimap,
    assert_that_singleton, assert_that_singleton_iterable, CheckFailure, IterableAssertion,
    SingletonAssertion, FAILURE_COUNTER, SUCCESS_COUNTER,
};
