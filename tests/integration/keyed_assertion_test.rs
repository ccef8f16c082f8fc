//! End-to-end tests for map and multimap assertions

use crate::unit::common::*;
use std::collections::HashMap;
use velo_assert::velostream::serialization::{KvMapCodec, SharedSerde};

#[tokio::test]
async fn test_map_assertion_passes() {
    let pipeline = bounded_pipeline("map");
    let prices = pipeline
        .create(
            "Prices",
            vec![("AAPL".to_string(), 150), ("MSFT".to_string(), 300)],
        )
        .unwrap();

    assert_that_map(&prices)
        .is_equal_to(HashMap::from([
            ("MSFT".to_string(), 300),
            ("AAPL".to_string(), 150),
        ]))
        .unwrap();

    let result = pipeline.run().await.unwrap();
    assert!(result.is_success(), "{:?}", result.failure());
}

#[tokio::test]
async fn test_duplicate_key_fails_the_check_not_construction() {
    let pipeline = bounded_pipeline("map-duplicate-key");
    let entries = pipeline
        .create("Entries", vec![("a".to_string(), 1), ("a".to_string(), 2)])
        .unwrap();

    assert_that_map(&entries)
        .is_equal_to(HashMap::from([("a".to_string(), 1)]))
        .unwrap();

    let result = pipeline.run().await.unwrap();
    assert_eq!(result.state(), PipelineState::Failed);
    assert_eq!(result.counter(FAILURE_COUNTER), 1);
    let failure = result
        .failure()
        .and_then(|e| e.user_error::<CheckFailure>())
        .expect("check failure");
    match failure.side_input_error() {
        Some(PipelineError::DuplicateKey { key, .. }) => assert!(key.contains('a')),
        other => panic!("expected a duplicate key error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_multimap_groups_values() {
    let pipeline = bounded_pipeline("multimap");
    let fills = pipeline
        .create(
            "Fills",
            vec![
                ("AAPL".to_string(), 10),
                ("MSFT".to_string(), 5),
                ("AAPL".to_string(), 3),
            ],
        )
        .unwrap();

    assert_that_multimap(&fills)
        .satisfies(|grouped: &HashMap<String, Vec<i32>>| {
            let mut aapl = grouped.get("AAPL").cloned().unwrap_or_default();
            aapl.sort_unstable();
            if aapl == vec![3, 10] && grouped.get("MSFT") == Some(&vec![5]) {
                Ok(())
            } else {
                Err(CheckFailure::custom(format!("unexpected grouping {:?}", grouped)))
            }
        })
        .unwrap();

    let result = pipeline.run().await.unwrap();
    assert!(result.is_success(), "{:?}", result.failure());
}

#[test]
fn test_keyed_assertion_without_entry_serde_names_dataset_serde() {
    let pipeline = bounded_pipeline("map-missing-serde");
    let numbers = pipeline.create("Numbers", vec![1, 2]).unwrap();
    let entries = numbers
        .par_do(
            "Entries",
            |n: &i32, ctx: &mut ProcessContext<'_, (String, i32)>| -> Result<(), PipelineError> {
                ctx.output((n.to_string(), *n));
                Ok(())
            },
            &[],
        )
        .unwrap();

    let mut assertion = assert_that_map(&entries);
    let err = assertion
        .is_equal_to(HashMap::from([("1".to_string(), 1)]))
        .unwrap_err();
    assert!(err.is_construction_error());
    assert!(err.to_string().contains("Dataset::with_serde"), "{}", err);

    // a map-level serde injects the expected map but cannot copy the entries
    let map_serde: SharedSerde<HashMap<String, i32>> =
        Arc::new(KvMapCodec::<String, i32>::new(JsonCodec::shared()));
    assertion.set_serde(map_serde);
    let err = assertion
        .is_equal_to(HashMap::from([("1".to_string(), 1)]))
        .unwrap_err();
    assert!(err.is_construction_error());
    assert!(err.to_string().contains("Dataset::with_serde"), "{}", err);
    assert_eq!(pipeline.stage_names(), vec!["Numbers", "Entries"]);
}
