//! Unit tests for user-defined relations and checkers

use crate::unit::common::*;
use velo_assert::velostream::testing::{
    checker, multiset_diff, AssertRelation, Checker, ContainsInAnyOrder,
};

/// Every actual value lies within `tolerance` of the expected one
struct WithinTolerance {
    tolerance: i64,
}

impl AssertRelation<Vec<i64>, Vec<i64>> for WithinTolerance {
    fn name(&self) -> &'static str {
        "WithinTolerance"
    }

    fn assert_for(&self, expected: Vec<i64>) -> Checker<Vec<i64>> {
        let tolerance = self.tolerance;
        checker(move |actual: &Vec<i64>| {
            let mut actual = actual.clone();
            let mut expected = expected.clone();
            actual.sort_unstable();
            expected.sort_unstable();
            if actual.len() != expected.len() {
                return Err(CheckFailure::custom(format!(
                    "expected {} values, got {}",
                    expected.len(),
                    actual.len()
                )));
            }
            match actual
                .iter()
                .zip(&expected)
                .find(|(a, e)| (*a - *e).abs() > tolerance)
            {
                None => Ok(()),
                Some((a, e)) => Err(CheckFailure::custom(format!(
                    "{} is more than {} away from {}",
                    a, tolerance, e
                ))),
            }
        })
    }
}

#[tokio::test]
async fn test_custom_relation_passes() {
    let pipeline = bounded_pipeline("custom-relation");
    let readings = pipeline.create("Readings", vec![101i64, 199, 302]).unwrap();

    assert_that(&readings)
        .satisfies_relation(WithinTolerance { tolerance: 2 }, vec![300, 100, 200])
        .unwrap();

    let result = pipeline.run().await.unwrap();
    assert!(result.is_success());
    assert_eq!(result.counter(SUCCESS_COUNTER), 1);
}

#[tokio::test]
async fn test_custom_relation_failure_message() {
    let pipeline = bounded_pipeline("custom-relation-failure");
    let readings = pipeline.create("Readings", vec![101i64, 250]).unwrap();

    assert_that(&readings)
        .satisfies_relation(WithinTolerance { tolerance: 2 }, vec![100, 200])
        .unwrap();

    let result = pipeline.run().await.unwrap();
    let failure = result
        .failure()
        .and_then(|e| e.user_error::<CheckFailure>())
        .expect("check failure");
    assert_eq!(failure.to_string(), "250 is more than 2 away from 200");
}

#[test]
fn test_builtin_relation_names() {
    let relation: &dyn AssertRelation<Vec<i32>, Vec<i32>> = &ContainsInAnyOrder;
    assert_eq!(relation.name(), "ContainsInAnyOrder");
}

#[test]
fn test_multiset_diff_for_records() {
    let expected = vec![Trade::new("AAPL", 10, 150_00), Trade::new("MSFT", 5, 300_00)];
    let actual = vec![Trade::new("MSFT", 5, 300_00), Trade::new("AAPL", 11, 150_00)];

    let diff = multiset_diff(&expected, &actual).expect("records differ");
    assert_eq!(diff.missing.len(), 1);
    assert_eq!(diff.unexpected.len(), 1);
    assert!(diff.missing[0].0.contains("quantity: 10"));
    assert!(diff.unexpected[0].0.contains("quantity: 11"));
}
