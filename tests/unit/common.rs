// Common imports and helpers shared by the unit and integration tests

pub use serde::{Deserialize, Serialize};
pub use serial_test::serial;
pub use std::sync::Arc;
pub use velo_assert::velostream::pipeline::{
    Dataset, DoFn, Pipeline, PipelineError, PipelineOptions, PipelineState, ProcessContext,
    RunMode, View, Window, WindowFn,
};
pub use velo_assert::velostream::serialization::{JsonCodec, Serde, SerializationError};
pub use velo_assert::velostream::testing::{
    assert_that, assert_that_iterable, assert_that_map, assert_that_multimap,
    assert_that_singleton, assert_that_singleton_iterable, CheckFailure, FAILURE_COUNTER,
    SUCCESS_COUNTER,
};

/// Route `log` output through the test harness
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Bounded pipeline with a job name and small parallelism
pub fn bounded_pipeline(job_name: &str) -> Pipeline {
    init_logging();
    Pipeline::new(
        PipelineOptions::bounded()
            .with_job_name(job_name)
            .with_parallelism(2),
    )
    .expect("valid bounded options")
}

/// Unbounded pipeline whose triggers fire `firings` times
pub fn unbounded_pipeline(job_name: &str, firings: u32) -> Pipeline {
    init_logging();
    Pipeline::new(
        PipelineOptions::unbounded()
            .with_job_name(job_name)
            .with_parallelism(2)
            .with_trigger_firings(firings),
    )
    .expect("valid unbounded options")
}

/// Sample record used across tests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    pub quantity: u32,
    pub price_cents: i64,
}

impl Trade {
    pub fn new(symbol: &str, quantity: u32, price_cents: i64) -> Self {
        Self {
            symbol: symbol.to_string(),
            quantity,
            price_cents,
        }
    }
}
