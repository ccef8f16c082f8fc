//! Unit tests for pipeline options loading and environment overrides

use crate::unit::common::*;
use std::io::Write;
use velo_assert::velostream::pipeline::{
    ENV_JOB_NAME, ENV_PARALLELISM, ENV_RUN_MODE, ENV_TRIGGER_FIRINGS,
};

fn clear_env() {
    for key in [ENV_JOB_NAME, ENV_RUN_MODE, ENV_PARALLELISM, ENV_TRIGGER_FIRINGS] {
        std::env::remove_var(key);
    }
}

#[test]
fn test_options_from_yaml_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "job_name: orders-validation\nrun_mode: unbounded\nparallelism: 8\ntrigger_firings: 3"
    )
    .unwrap();

    let options = PipelineOptions::from_yaml_file(file.path()).unwrap();
    assert_eq!(options.job_name, "orders-validation");
    assert_eq!(options.run_mode, RunMode::Unbounded);
    assert_eq!(options.parallelism, 8);
    assert_eq!(options.impulse_firings(), 3);
}

#[test]
fn test_missing_yaml_file_is_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = PipelineOptions::from_yaml_file(dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, PipelineError::Configuration { .. }));
    assert!(err.is_construction_error());
}

#[test]
fn test_yaml_with_unknown_run_mode_rejected() {
    let err = PipelineOptions::from_yaml_str("run_mode: sometimes\n").unwrap_err();
    assert!(err.to_string().contains("Failed to parse pipeline options"));
}

#[test]
fn test_yaml_rejects_zero_firings_when_unbounded() {
    let err = PipelineOptions::from_yaml_str("run_mode: unbounded\ntrigger_firings: 0\n")
        .unwrap_err();
    assert!(err.to_string().contains("trigger_firings"));
}

#[test]
#[serial]
fn test_env_overrides_applied() {
    clear_env();
    std::env::set_var(ENV_RUN_MODE, "streaming");
    std::env::set_var(ENV_TRIGGER_FIRINGS, "4");
    std::env::set_var(ENV_JOB_NAME, "env-job");

    let options = PipelineOptions::bounded().with_env_overrides().unwrap();
    clear_env();

    assert_eq!(options.run_mode, RunMode::Unbounded);
    assert_eq!(options.trigger_firings, 4);
    assert_eq!(options.job_name, "env-job");
}

#[test]
#[serial]
fn test_env_override_with_invalid_number() {
    clear_env();
    std::env::set_var(ENV_PARALLELISM, "lots");

    let result = PipelineOptions::bounded().with_env_overrides();
    clear_env();

    let err = result.unwrap_err();
    assert!(err.to_string().contains(ENV_PARALLELISM));
}

#[test]
#[serial]
fn test_no_env_leaves_options_untouched() {
    clear_env();
    let options = PipelineOptions::bounded()
        .with_parallelism(3)
        .with_env_overrides()
        .unwrap();
    assert_eq!(options, PipelineOptions::bounded().with_parallelism(3));
}
