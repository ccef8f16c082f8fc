//! Unit tests for the local runner and its result

use crate::unit::common::*;

#[tokio::test]
async fn test_empty_pipeline_completes() {
    let pipeline = bounded_pipeline("empty");
    let result = pipeline.run().await.unwrap();
    assert_eq!(result.state(), PipelineState::Done);
    assert_eq!(result.stages_run(), 0);
    assert!(result.metrics().is_empty());
    assert_eq!(result.job_name(), "empty");
}

#[tokio::test]
async fn test_failure_stops_later_stages() {
    let pipeline = bounded_pipeline("stops");
    let numbers = pipeline.create("Numbers", vec![1i64]).unwrap();
    numbers
        .par_do(
            "Fail",
            |_: &i64, ctx: &mut ProcessContext<'_, i64>| -> Result<(), PipelineError> {
                ctx.counter("attempts").inc();
                Err(PipelineError::internal("boom"))
            },
            &[],
        )
        .unwrap();
    numbers
        .par_do(
            "After",
            |_: &i64, ctx: &mut ProcessContext<'_, i64>| -> Result<(), PipelineError> {
                ctx.counter("after").inc();
                Ok(())
            },
            &[],
        )
        .unwrap();

    let result = pipeline.run().await.unwrap();
    assert_eq!(result.state(), PipelineState::Failed);
    assert_eq!(result.stages_run(), 1);
    assert_eq!(result.counter_for_stage("attempts", "Fail"), 1);
    assert_eq!(result.counter("after"), 0);
    assert!(result.clone().into_result().is_err());
}

#[tokio::test]
async fn test_impulse_fires_per_run_mode() {
    for (pipeline, expected) in [
        (bounded_pipeline("impulse-bounded"), 1),
        (unbounded_pipeline("impulse-unbounded", 5), 5),
    ] {
        let trigger = pipeline.impulse("Trigger").unwrap();
        trigger
            .par_do(
                "Count",
                |_: &(), ctx: &mut ProcessContext<'_, ()>| -> Result<(), PipelineError> {
                    ctx.counter("fired").inc();
                    Ok(())
                },
                &[],
            )
            .unwrap();

        let result = pipeline.run().await.unwrap();
        assert_eq!(result.counter("fired"), expected);
        assert_eq!(result.run_mode(), pipeline.run_mode());
    }
}

#[tokio::test]
async fn test_pipeline_can_run_twice() {
    let pipeline = bounded_pipeline("rerun");
    let numbers = pipeline.create("Numbers", vec![1i64, 2]).unwrap();
    assert_that(&numbers).contains_in_any_order(vec![2, 1]).unwrap();

    let first = pipeline.run().await.unwrap();
    let second = pipeline.run().await.unwrap();
    assert_eq!(first.counter(SUCCESS_COUNTER), 1);
    assert_eq!(second.counter(SUCCESS_COUNTER), 1);
}
