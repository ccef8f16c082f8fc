//! Named stage counters backed by Prometheus
//!
//! Every run gets its own [`CounterSet`]. Stages increment counters by name; the set
//! keys them by `(counter, stage)` so the same counter name can be summed across every
//! stage that uses it, or read for one stage.

use crate::velostream::pipeline::PipelineError;
use prometheus::{
    register_int_counter_vec_with_registry, Encoder, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

const COUNTER_METRIC: &str = "velo_pipeline_stage_counter_total";

/// Sum counters for one pipeline run
#[derive(Debug)]
pub struct CounterSet {
    registry: Registry,
    counters: IntCounterVec,
    // prometheus offers no label enumeration on a vec, so track what was handed out
    seen: Mutex<BTreeSet<(String, String)>>,
}

impl CounterSet {
    /// Create a counter set with a fresh registry labelled with the job name
    pub fn new(job_name: &str) -> Result<Self, PipelineError> {
        let mut labels = std::collections::HashMap::new();
        labels.insert("job".to_string(), job_name.to_string());
        let registry = Registry::new_custom(None, Some(labels)).map_err(|e| {
            PipelineError::Configuration {
                message: format!("Failed to create metrics registry: {}", e),
            }
        })?;

        let counters = register_int_counter_vec_with_registry!(
            Opts::new(COUNTER_METRIC, "Named counters incremented by pipeline stages"),
            &["counter", "stage"],
            registry
        )
        .map_err(|e| PipelineError::Configuration {
            message: format!("Failed to register stage counters: {}", e),
        })?;

        Ok(Self {
            registry,
            counters,
            seen: Mutex::new(BTreeSet::new()),
        })
    }

    /// Counter handle for `name` scoped to `stage`
    pub fn counter(&self, name: &str, stage: &str) -> IntCounter {
        if let Ok(mut seen) = self.seen.lock() {
            seen.insert((name.to_string(), stage.to_string()));
        }
        self.counters.with_label_values(&[name, stage])
    }

    /// Current value of every counter handed out so far
    pub fn snapshot(&self) -> MetricsSnapshot {
        let keys: Vec<(String, String)> = match self.seen.lock() {
            Ok(seen) => seen.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        };

        let values = keys
            .into_iter()
            .map(|(name, stage)| {
                let value = self
                    .counters
                    .with_label_values(&[name.as_str(), stage.as_str()])
                    .get();
                ((name, stage), value)
            })
            .collect();

        MetricsSnapshot { values }
    }

    /// Counters in the Prometheus text exposition format
    pub fn metrics_text(&self) -> Result<String, PipelineError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| PipelineError::Configuration {
                message: format!("Failed to encode metrics: {}", e),
            })?;
        String::from_utf8(buffer).map_err(|e| PipelineError::Internal {
            message: format!("Metrics text is not UTF-8: {}", e),
        })
    }
}

/// Frozen counter values of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    values: BTreeMap<(String, String), u64>,
}

impl MetricsSnapshot {
    /// Value of counter `name` in `stage`, 0 if it was never touched
    pub fn get(&self, name: &str, stage: &str) -> u64 {
        self.values
            .get(&(name.to_string(), stage.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Sum of counter `name` over every stage
    pub fn total(&self, name: &str) -> u64 {
        self.values
            .iter()
            .filter(|((counter, _), _)| counter == name)
            .map(|(_, value)| *value)
            .sum()
    }

    /// Stages that touched counter `name`
    pub fn stages(&self, name: &str) -> Vec<&str> {
        self.values
            .keys()
            .filter(|(counter, _)| counter == name)
            .map(|(_, stage)| stage.as_str())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
