pub mod common;
// Configuration tests - YAML loading and environment overrides
pub mod config;
// Pipeline engine tests - datasets, views, side inputs and the runner
pub mod pipeline;
// Serialization tests - codecs and isolation copies
pub mod serialization;
