//! Unit tests for the serde round trips a checked value goes through

use crate::unit::common::*;

/// Value that counts how many times it was decoded
#[derive(Debug, Clone, PartialEq)]
struct Tracked {
    value: i64,
    decodes: u32,
}

/// Encodes `Tracked` as JSON; every decode bumps `decodes`. Decoding fails once a payload
/// has been decoded `max_decodes` times.
struct TrackingSerde {
    max_decodes: u32,
}

impl Serde<Tracked> for TrackingSerde {
    fn serialize(&self, value: &Tracked) -> Result<Vec<u8>, SerializationError> {
        serde_json::to_vec(&(value.value, value.decodes))
            .map_err(|e| SerializationError::SerializationFailed(e.to_string()))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Tracked, SerializationError> {
        let (value, decodes): (i64, u32) = serde_json::from_slice(bytes)
            .map_err(|e| SerializationError::DeserializationFailed(e.to_string()))?;
        if decodes >= self.max_decodes {
            return Err(SerializationError::DeserializationFailed(format!(
                "value {} already decoded {} times",
                value, decodes
            )));
        }
        Ok(Tracked {
            value,
            decodes: decodes + 1,
        })
    }

    fn format_name(&self) -> &'static str {
        "tracking"
    }
}

fn tracked(values: &[i64]) -> Vec<Tracked> {
    values
        .iter()
        .map(|&value| Tracked { value, decodes: 0 })
        .collect()
}

#[tokio::test]
async fn test_checker_sees_isolated_copies() {
    let pipeline = bounded_pipeline("isolation");
    let serde = Arc::new(TrackingSerde { max_decodes: 10 });
    let values = pipeline
        .create_with_serde("Values", tracked(&[1, 2, 3]), serde)
        .unwrap();

    // one decode when the source runs, one more for the isolation copy
    assert_that(&values)
        .satisfies(|actual| {
            match actual.iter().find(|t| t.decodes != 2) {
                None => Ok(()),
                Some(t) => Err(CheckFailure::custom(format!("{:?} was not isolated", t))),
            }
        })
        .unwrap();

    let result = pipeline.run().await.unwrap();
    assert!(result.is_success(), "{:?}", result.failure());
    assert_eq!(result.counter(SUCCESS_COUNTER), 1);
}

#[tokio::test]
async fn test_isolation_failure_is_a_check_failure() {
    let pipeline = bounded_pipeline("isolation-failure");
    let serde = Arc::new(TrackingSerde { max_decodes: 1 });
    let values = pipeline
        .create_with_serde("Values", tracked(&[7]), serde)
        .unwrap();

    // construction succeeds; the failed round trip is only seen by the check
    assert_that(&values).satisfies(|_| Ok(())).unwrap();

    let result = pipeline.run().await.unwrap();
    assert_eq!(result.state(), PipelineState::Failed);
    assert_eq!(result.counter(FAILURE_COUNTER), 1);

    let failure = result
        .failure()
        .and_then(|e| e.user_error::<CheckFailure>())
        .expect("check failure");
    let cause = failure.side_input_error().expect("side input error");
    assert!(matches!(cause, PipelineError::ViewMaterialization { .. }));
    assert!(cause.to_string().contains("failed to round-trip"));
}

#[test]
fn test_unencodable_expected_value_fails_construction() {
    let pipeline = bounded_pipeline("expected-encoding");
    let values = pipeline
        .create_with_serde("Values", tracked(&[1]), Arc::new(TrackingSerde { max_decodes: 10 }))
        .unwrap();

    let mut assertion = assert_that_singleton(&values);
    assertion.set_serde(Arc::new(RejectAll));
    let err = assertion.is_equal_to(tracked(&[1]).remove(0)).unwrap_err();
    assert!(err.is_construction_error());
    // the actual side was already expanded; none of its stages stay behind
    assert_eq!(pipeline.stage_names(), vec!["Values"]);

    assertion.set_serde(Arc::new(TrackingSerde { max_decodes: 10 }));
    assertion.is_equal_to(tracked(&[1]).remove(0)).unwrap();
    assert!(pipeline
        .stage_names()
        .contains(&"Assert$1/CreateActual/Isolate".to_string()));
}

struct RejectAll;

impl Serde<Tracked> for RejectAll {
    fn serialize(&self, _value: &Tracked) -> Result<Vec<u8>, SerializationError> {
        Err(SerializationError::UnsupportedType("Tracked".to_string()))
    }

    fn deserialize(&self, _bytes: &[u8]) -> Result<Tracked, SerializationError> {
        Err(SerializationError::UnsupportedType("Tracked".to_string()))
    }
}
