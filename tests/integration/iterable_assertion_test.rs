//! End-to-end tests for assertions over whole datasets

use crate::unit::common::*;

async fn run_contains(actual: Vec<i32>, expected: Vec<i32>) -> velo_assert::PipelineResult {
    let pipeline = bounded_pipeline("contains-in-any-order");
    let values = pipeline.create("Values", actual).unwrap();
    assert_that(&values).contains_in_any_order(expected).unwrap();
    pipeline.run().await.unwrap()
}

#[tokio::test]
async fn test_permutations_pass() {
    let expected = vec![1, 2, 3];
    for permutation in [
        vec![1, 2, 3],
        vec![1, 3, 2],
        vec![2, 1, 3],
        vec![2, 3, 1],
        vec![3, 1, 2],
        vec![3, 2, 1],
    ] {
        let result = run_contains(permutation.clone(), expected.clone()).await;
        assert!(result.is_success(), "{:?} failed", permutation);
        assert_eq!(result.counter(SUCCESS_COUNTER), 1);
        assert_eq!(result.counter(FAILURE_COUNTER), 0);
    }
}

#[tokio::test]
async fn test_added_removed_or_substituted_element_fails() {
    let expected = vec![1, 2, 3];
    for actual in [vec![1, 2, 3, 4], vec![1, 2], vec![1, 2, 5], vec![1, 1, 2, 3]] {
        let result = run_contains(actual.clone(), expected.clone()).await;
        assert_eq!(result.state(), PipelineState::Failed, "{:?} passed", actual);
        assert_eq!(result.counter(FAILURE_COUNTER), 1);
    }
}

#[tokio::test]
async fn test_mismatch_diff_names_missing_and_unexpected() {
    let result = run_contains(vec![3, 1, 2], vec![1, 2, 2]).await;
    assert_eq!(result.counter(SUCCESS_COUNTER), 0);
    assert_eq!(result.counter(FAILURE_COUNTER), 1);

    let err = result.failure().expect("failed run");
    assert_eq!(err.stage(), Some("Assert$0/RunChecks"));
    let diff = err
        .user_error::<CheckFailure>()
        .and_then(|f| f.diff())
        .expect("multiset diff");
    assert_eq!(diff.missing_count("2"), 1);
    assert_eq!(diff.unexpected_count("3"), 1);
    assert_eq!(diff.missing_count("1"), 0);
    assert!(
        err.to_string().contains("expected: [1, 2, 2]; actual: [3, 1, 2]"),
        "{}",
        err
    );
}

#[tokio::test]
async fn test_empty() {
    let pipeline = bounded_pipeline("empty");
    let nothing = pipeline.create("Nothing", Vec::<i32>::new()).unwrap();
    assert_that(&nothing).empty().unwrap();
    let result = pipeline.run().await.unwrap();
    assert!(result.is_success());

    let pipeline = bounded_pipeline("not-empty");
    let one = pipeline.create("One", vec![7]).unwrap();
    assert_that(&one).empty().unwrap();
    let result = pipeline.run().await.unwrap();
    assert_eq!(result.state(), PipelineState::Failed);
}

#[tokio::test]
async fn test_fixed_windows_are_checked_together() {
    let pipeline = bounded_pipeline("windowed");
    let trades = pipeline
        .create_timestamped(
            "Trades",
            vec![
                (Trade::new("AAPL", 10, 150_00), 1_000),
                (Trade::new("MSFT", 5, 300_00), 61_000),
                (Trade::new("AAPL", 3, 151_00), 125_000),
            ],
        )
        .unwrap();
    let windowed = trades
        .window_into("Minutes", WindowFn::Fixed { size_ms: 60_000 })
        .unwrap();

    assert_that(&windowed)
        .contains_in_any_order(vec![
            Trade::new("AAPL", 3, 151_00),
            Trade::new("AAPL", 10, 150_00),
            Trade::new("MSFT", 5, 300_00),
        ])
        .unwrap();

    let result = pipeline.run().await.unwrap();
    assert!(result.is_success(), "{:?}", result.failure());
}

#[tokio::test]
async fn test_several_assertions_on_one_dataset() {
    let pipeline = bounded_pipeline("several");
    let numbers = pipeline.create("Numbers", vec![1, 2, 3, 4]).unwrap();
    let evens = numbers.filter("Evens", |n: &i32| n % 2 == 0).unwrap();

    assert_that(&numbers)
        .contains_in_any_order(vec![4, 3, 2, 1])
        .unwrap()
        .satisfies(|values| {
            if values.len() == 4 {
                Ok(())
            } else {
                Err(CheckFailure::custom("expected four numbers"))
            }
        })
        .unwrap();
    assert_that(&evens).contains_in_any_order(vec![2, 4]).unwrap();

    let result = pipeline.run().await.unwrap();
    assert!(result.is_success());
    assert_eq!(result.counter(SUCCESS_COUNTER), 3);
    assert_eq!(result.counter_for_stage(SUCCESS_COUNTER, "Assert$2/RunChecks"), 1);
}

#[tokio::test]
async fn test_singleton_iterable() {
    let pipeline = bounded_pipeline("singleton-iterable");
    let batches = pipeline.create("Batch", vec![vec![3, 1, 2]]).unwrap();
    assert_that_singleton_iterable(&batches)
        .contains_in_any_order(vec![1, 2, 3])
        .unwrap();

    let result = pipeline.run().await.unwrap();
    assert!(result.is_success(), "{:?}", result.failure());
}

#[tokio::test]
async fn test_singleton_iterable_with_two_batches_fails() {
    let pipeline = bounded_pipeline("singleton-iterable-two");
    let batches = pipeline
        .create("Batches", vec![vec![1], vec![2]])
        .unwrap();
    assert_that_singleton_iterable(&batches)
        .contains_in_any_order(vec![1, 2])
        .unwrap();

    let result = pipeline.run().await.unwrap();
    let failure = result
        .failure()
        .and_then(|e| e.user_error::<CheckFailure>())
        .expect("check failure");
    assert!(matches!(
        failure.side_input_error(),
        Some(PipelineError::ViewMaterialization { .. })
    ));
}

#[tokio::test]
async fn test_iterable_view_needs_serde_for_expected_values() {
    let pipeline = bounded_pipeline("iterable-view");
    let numbers = pipeline.create("Numbers", vec![5, 6]).unwrap();
    let view = numbers.as_iterable("NumbersView").unwrap();

    let err = assert_that_iterable(&view)
        .contains_in_any_order(vec![5, 6])
        .unwrap_err();
    assert!(err.is_construction_error());
    assert!(!pipeline
        .stage_names()
        .iter()
        .any(|stage| stage.starts_with("Assert$")));

    let mut assertion = assert_that_iterable(&view);
    assertion.set_serde(JsonCodec::shared());
    assertion.contains_in_any_order(vec![6, 5]).unwrap();
    assertion
        .satisfies(|values| {
            if values == [5, 6] {
                Ok(())
            } else {
                Err(CheckFailure::custom("views keep source order"))
            }
        })
        .unwrap();

    let result = pipeline.run().await.unwrap();
    assert!(result.is_success(), "{:?}", result.failure());
    assert_eq!(result.counter(SUCCESS_COUNTER), 2);
}

#[tokio::test]
async fn test_windowed_view_cannot_pass_vacuously() {
    let pipeline = bounded_pipeline("windowed-view");
    let per_minute = pipeline
        .create_timestamped("Values", vec![(1, 1_000), (2, 61_000)])
        .unwrap()
        .window_into("Minutes", WindowFn::Fixed { size_ms: 60_000 })
        .unwrap()
        .as_iterable("PerMinute")
        .unwrap();

    let mut assertion = assert_that_iterable(&per_minute);
    assertion.set_serde(JsonCodec::shared());
    assertion.empty().unwrap();

    let result = pipeline.run().await.unwrap();
    assert_eq!(result.state(), PipelineState::Failed);
    assert_eq!(result.counter(SUCCESS_COUNTER), 0);
    assert_eq!(result.counter(FAILURE_COUNTER), 1);
    let failure = result
        .failure()
        .and_then(|e| e.user_error::<CheckFailure>())
        .expect("check failure");
    assert!(matches!(
        failure.side_input_error(),
        Some(PipelineError::ViewMaterialization { view, .. }) if view == "PerMinute"
    ));
}
