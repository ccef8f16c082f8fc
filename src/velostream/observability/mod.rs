//! Run metrics
//!
//! Stage counters are registered in a per-run prometheus registry labelled with the job
//! name, and frozen into a [`MetricsSnapshot`] when the run ends.

mod counters;

pub use counters::{CounterSet, MetricsSnapshot};
