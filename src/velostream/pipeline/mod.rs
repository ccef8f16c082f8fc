//! Deferred-execution pipeline engine
//!
//! Builder calls on a [`Pipeline`] register stages; [`Pipeline::run`] evaluates them on
//! the local runner.
//!
//! ```rust
//! use velo_assert::velostream::pipeline::{Pipeline, PipelineOptions};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), velo_assert::velostream::pipeline::PipelineError> {
//! let pipeline = Pipeline::new(PipelineOptions::default().with_job_name("doc"))?;
//! let words = pipeline.create("Words", vec!["a".to_string(), "bb".to_string()])?;
//! let lengths = words.map("Lengths", |w: &String| w.len())?;
//! let _view = lengths.as_iterable("LengthsView")?;
//!
//! let result = pipeline.run().await?;
//! assert!(result.is_success());
//! # Ok(())
//! # }
//! ```

mod context;
mod dataset;
mod error;
mod graph;
mod options;
mod runner;
mod sources;
mod view;
mod window;

use std::fmt::Debug;

pub use context::{DoFn, ProcessContext};
pub use dataset::Dataset;
pub use error::{PipelineError, PipelineOutcome};
pub use graph::Pipeline;
pub use options::{
    PipelineOptions, RunMode, ENV_JOB_NAME, ENV_PARALLELISM, ENV_RUN_MODE, ENV_TRIGGER_FIRINGS,
};
pub use runner::{LocalRunner, PipelineResult, PipelineState};
pub use view::{
    IterableViewFn, MapViewFn, MultimapViewFn, SideInput, SingletonViewFn, View, ViewError,
    ViewFn, ViewShape,
};
pub use window::{Window, WindowFn, WindowedValue, MIN_TIMESTAMP_MS};

/// Bounds every element type of a dataset satisfies
pub trait Element: Clone + Debug + Send + Sync + 'static {}

impl<T> Element for T where T: Clone + Debug + Send + Sync + 'static {}
