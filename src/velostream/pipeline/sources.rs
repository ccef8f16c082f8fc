//! Source stages
//!
//! In-memory values are encoded when the stage is built and decoded when it runs, so the
//! dataset a `create` stage produces never aliases the values it was given.

use super::dataset::Dataset;
use super::graph::{EvaluationContext, Node, NodeValue, Pipeline};
use super::window::{WindowedValue, MIN_TIMESTAMP_MS};
use super::{Element, PipelineError};
use crate::velostream::serialization::{JsonCodec, SharedSerde};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

impl Pipeline {
    /// In-memory source encoded with [`JsonCodec`]
    pub fn create<T>(
        &self,
        name: &str,
        values: impl IntoIterator<Item = T>,
    ) -> Result<Dataset<T>, PipelineError>
    where
        T: Element + Serialize + DeserializeOwned,
    {
        self.create_with_serde(name, values, JsonCodec::shared())
    }

    /// In-memory source encoded with `serde`
    pub fn create_with_serde<T: Element>(
        &self,
        name: &str,
        values: impl IntoIterator<Item = T>,
        serde: SharedSerde<T>,
    ) -> Result<Dataset<T>, PipelineError> {
        let timestamped = values.into_iter().map(|v| (v, MIN_TIMESTAMP_MS));
        self.create_timestamped_with_serde(name, timestamped, serde)
    }

    /// In-memory source of `(value, timestamp_ms)` pairs, in the global window
    pub fn create_timestamped<T>(
        &self,
        name: &str,
        values: impl IntoIterator<Item = (T, i64)>,
    ) -> Result<Dataset<T>, PipelineError>
    where
        T: Element + Serialize + DeserializeOwned,
    {
        self.create_timestamped_with_serde(name, values, JsonCodec::shared())
    }

    pub fn create_timestamped_with_serde<T: Element>(
        &self,
        name: &str,
        values: impl IntoIterator<Item = (T, i64)>,
        serde: SharedSerde<T>,
    ) -> Result<Dataset<T>, PipelineError> {
        let mut encoded = Vec::new();
        for (index, (value, timestamp_ms)) in values.into_iter().enumerate() {
            let bytes = serde.serialize(&value).map_err(|e| {
                PipelineError::construction(
                    name,
                    format!(
                        "element {} cannot be encoded with {}: {}",
                        index,
                        serde.format_name(),
                        e
                    ),
                )
            })?;
            encoded.push((bytes, timestamp_ms));
        }

        let node = CreateNode {
            name: name.to_string(),
            encoded,
            serde: Arc::clone(&serde),
        };
        let id = self.apply_node(Arc::new(node))?;
        Ok(Dataset::new(self.clone(), id, name.to_string(), Some(serde)))
    }

    /// Trigger source of unit elements
    ///
    /// Fires once in bounded mode and `trigger_firings` times in unbounded mode, so
    /// downstream stages run once per firing.
    pub fn impulse(&self, name: &str) -> Result<Dataset<()>, PipelineError> {
        let id = self.apply_node(Arc::new(ImpulseNode {
            name: name.to_string(),
        }))?;
        Ok(Dataset::new(
            self.clone(),
            id,
            name.to_string(),
            Some(JsonCodec::shared()),
        ))
    }
}

struct CreateNode<T> {
    name: String,
    encoded: Vec<(Vec<u8>, i64)>,
    serde: SharedSerde<T>,
}

#[async_trait]
impl<T: Element> Node for CreateNode<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "create"
    }

    async fn evaluate(&self, _ctx: &EvaluationContext) -> Result<NodeValue, PipelineError> {
        let mut output = Vec::with_capacity(self.encoded.len());
        for (bytes, timestamp_ms) in &self.encoded {
            let value = self
                .serde
                .deserialize(bytes)
                .map_err(|source| PipelineError::Serialization {
                    stage: self.name.clone(),
                    source,
                })?;
            output.push(WindowedValue::timestamped(value, *timestamp_ms));
        }
        log::debug!("Source '{}' emitted {} element(s)", self.name, output.len());
        Ok(Arc::new(output) as NodeValue)
    }
}

struct ImpulseNode {
    name: String,
}

#[async_trait]
impl Node for ImpulseNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "impulse"
    }

    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<NodeValue, PipelineError> {
        let firings = ctx.options().impulse_firings();
        let output: Vec<WindowedValue<()>> =
            (0..firings).map(|_| WindowedValue::global(())).collect();
        log::debug!(
            "Impulse '{}' fired {} time(s) ({} mode)",
            self.name,
            firings,
            ctx.options().run_mode
        );
        Ok(Arc::new(output) as NodeValue)
    }
}
