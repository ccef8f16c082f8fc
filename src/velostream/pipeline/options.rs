//! Pipeline options
//!
//! Options can be built in code, loaded from YAML, and overridden from the environment:
//!
//! ```yaml
//! job_name: orders-validation
//! run_mode: unbounded
//! parallelism: 8
//! trigger_firings: 3
//! ```
//!
//! | Variable              | Field             |
//! |-----------------------|-------------------|
//! | `VELO_JOB_NAME`       | `job_name`        |
//! | `VELO_RUN_MODE`       | `run_mode`        |
//! | `VELO_PARALLELISM`    | `parallelism`     |
//! | `VELO_TRIGGER_FIRINGS`| `trigger_firings` |

use super::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub const ENV_JOB_NAME: &str = "VELO_JOB_NAME";
pub const ENV_RUN_MODE: &str = "VELO_RUN_MODE";
pub const ENV_PARALLELISM: &str = "VELO_PARALLELISM";
pub const ENV_TRIGGER_FIRINGS: &str = "VELO_TRIGGER_FIRINGS";

/// Whether a run is finite (batch) or continuous (streaming)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Finite, one-shot run
    #[default]
    Bounded,
    /// Continuous run; trigger sources fire repeatedly
    Unbounded,
}

impl RunMode {
    pub fn is_streaming(&self) -> bool {
        matches!(self, RunMode::Unbounded)
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Bounded => write!(f, "bounded"),
            RunMode::Unbounded => write!(f, "unbounded"),
        }
    }
}

impl FromStr for RunMode {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bounded" | "batch" => Ok(RunMode::Bounded),
            "unbounded" | "streaming" => Ok(RunMode::Unbounded),
            other => Err(PipelineError::Configuration {
                message: format!(
                    "Unknown run mode '{}', expected one of: bounded, batch, unbounded, streaming",
                    other
                ),
            }),
        }
    }
}

/// Options shared by every stage of a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Name used in logs and as the `job` label of the run's metrics
    pub job_name: String,
    /// Bounded or unbounded execution
    pub run_mode: RunMode,
    /// Worker tasks per element-wise stage
    pub parallelism: usize,
    /// Number of times an impulse fires in unbounded mode
    pub trigger_firings: u32,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            job_name: "velo-pipeline".to_string(),
            run_mode: RunMode::Bounded,
            parallelism: 4,
            trigger_firings: 1,
        }
    }
}

impl PipelineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bounded() -> Self {
        Self::default()
    }

    pub fn unbounded() -> Self {
        Self {
            run_mode: RunMode::Unbounded,
            ..Self::default()
        }
    }

    pub fn with_job_name(mut self, job_name: impl Into<String>) -> Self {
        self.job_name = job_name.into();
        self
    }

    pub fn with_run_mode(mut self, run_mode: RunMode) -> Self {
        self.run_mode = run_mode;
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn with_trigger_firings(mut self, firings: u32) -> Self {
        self.trigger_firings = firings;
        self
    }

    /// Number of elements an impulse emits under these options
    pub fn impulse_firings(&self) -> u32 {
        match self.run_mode {
            RunMode::Bounded => 1,
            RunMode::Unbounded => self.trigger_firings,
        }
    }

    /// Parse options from a YAML document; missing fields take their defaults
    pub fn from_yaml_str(yaml: &str) -> Result<Self, PipelineError> {
        let options: PipelineOptions =
            serde_yaml::from_str(yaml).map_err(|e| PipelineError::Configuration {
                message: format!("Failed to parse pipeline options: {}", e),
            })?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| PipelineError::Configuration {
                message: format!("Failed to read options file '{}': {}", path.display(), e),
            })?;
        Self::from_yaml_str(&content)
    }

    /// Apply `VELO_*` environment overrides on top of these options
    pub fn with_env_overrides(self) -> Result<Self, PipelineError> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, PipelineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut overridden = false;
        if let Some(job_name) = lookup(ENV_JOB_NAME) {
            self.job_name = job_name;
            overridden = true;
        }
        if let Some(mode) = lookup(ENV_RUN_MODE) {
            self.run_mode = mode.parse()?;
            overridden = true;
        }
        if let Some(parallelism) = lookup(ENV_PARALLELISM) {
            self.parallelism = parse_env_number(ENV_PARALLELISM, &parallelism)?;
            overridden = true;
        }
        if let Some(firings) = lookup(ENV_TRIGGER_FIRINGS) {
            self.trigger_firings = parse_env_number(ENV_TRIGGER_FIRINGS, &firings)?;
            overridden = true;
        }
        if overridden {
            log::debug!(
                "Pipeline options after environment overrides: job={}, mode={}, parallelism={}, firings={}",
                self.job_name,
                self.run_mode,
                self.parallelism,
                self.trigger_firings
            );
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject option combinations the runner cannot execute
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.job_name.trim().is_empty() {
            return Err(PipelineError::Configuration {
                message: "job_name must not be empty".to_string(),
            });
        }
        if self.parallelism == 0 {
            return Err(PipelineError::Configuration {
                message: "parallelism must be at least 1".to_string(),
            });
        }
        if self.run_mode.is_streaming() && self.trigger_firings == 0 {
            return Err(PipelineError::Configuration {
                message: "trigger_firings must be at least 1 in unbounded mode".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_env_number<N: FromStr>(key: &str, raw: &str) -> Result<N, PipelineError>
where
    N::Err: fmt::Display,
{
    raw.trim()
        .parse::<N>()
        .map_err(|e: N::Err| PipelineError::Configuration {
            message: format!("Invalid value '{}' for {}: {}", raw, key, e),
        })
}
