//! Check functions and their failures
//!
//! A checker returns `Ok(())` when the value it is given satisfies the property, and a
//! [`CheckFailure`] carrying expected and actual detail otherwise.

use crate::velostream::pipeline::PipelineError;
use std::fmt::{self, Debug};
use std::sync::Arc;

/// Property check run on a materialized value
pub type Checker<A> = Arc<dyn Fn(&A) -> Result<(), CheckFailure> + Send + Sync>;

/// Wrap a closure as a [`Checker`]
pub fn checker<A, F>(check: F) -> Checker<A>
where
    F: Fn(&A) -> Result<(), CheckFailure> + Send + Sync + 'static,
{
    Arc::new(check)
}

/// Why a checked value was rejected
#[derive(Debug, Clone, thiserror::Error)]
pub enum CheckFailure {
    #[error("Expected: {expected}, but was: {actual}")]
    NotEqual { expected: String, actual: String },

    #[error("Expected a value different from: {unexpected}")]
    UnexpectedlyEqual { unexpected: String },

    #[error("{0}")]
    Mismatch(MultisetDiff),

    #[error("{message}")]
    Custom { message: String },

    #[error("Checker panicked: {message}")]
    Panicked { message: String },

    #[error("Could not read checked value: {0}")]
    SideInput(PipelineError),
}

impl CheckFailure {
    pub fn custom(message: impl Into<String>) -> Self {
        CheckFailure::Custom {
            message: message.into(),
        }
    }

    pub fn not_equal<T: Debug>(expected: &T, actual: &T) -> Self {
        CheckFailure::NotEqual {
            expected: format!("{:?}", expected),
            actual: format!("{:?}", actual),
        }
    }

    /// Multiset diff behind a [`CheckFailure::Mismatch`]
    pub fn diff(&self) -> Option<&MultisetDiff> {
        match self {
            CheckFailure::Mismatch(diff) => Some(diff),
            _ => None,
        }
    }

    /// Pipeline error behind a [`CheckFailure::SideInput`]
    pub fn side_input_error(&self) -> Option<&PipelineError> {
        match self {
            CheckFailure::SideInput(err) => Some(err),
            _ => None,
        }
    }
}

/// Difference between an expected and an actual multiset
///
/// Elements are rendered with `Debug`; each entry carries how many copies are missing or
/// surplus. Both sides are also kept as a preview of at most [`PREVIEW_ELEMENTS`]
/// elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultisetDiff {
    pub expected_len: usize,
    pub actual_len: usize,
    pub missing: Vec<(String, usize)>,
    pub unexpected: Vec<(String, usize)>,
    pub expected: String,
    pub actual: String,
}

/// Elements shown per side in a [`MultisetDiff`]
pub const PREVIEW_ELEMENTS: usize = 10;

impl MultisetDiff {
    /// Number of copies of `element` missing from the actual side
    pub fn missing_count(&self, element: &str) -> usize {
        count_of(&self.missing, element)
    }

    /// Number of surplus copies of `element` on the actual side
    pub fn unexpected_count(&self, element: &str) -> usize {
        count_of(&self.unexpected, element)
    }
}

impl fmt::Display for MultisetDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Expected {} element(s) in any order, found {}",
            self.expected_len, self.actual_len
        )?;
        if !self.missing.is_empty() {
            write!(f, "; missing: [{}]", render_counts(&self.missing))?;
        }
        if !self.unexpected.is_empty() {
            write!(f, "; unexpected: [{}]", render_counts(&self.unexpected))?;
        }
        write!(f, "; expected: {}; actual: {}", self.expected, self.actual)
    }
}

fn count_of(entries: &[(String, usize)], element: &str) -> usize {
    entries
        .iter()
        .find(|(rendered, _)| rendered == element)
        .map(|(_, count)| *count)
        .unwrap_or(0)
}

fn render_counts(entries: &[(String, usize)]) -> String {
    entries
        .iter()
        .map(|(element, count)| format!("{} x{}", element, count))
        .collect::<Vec<_>>()
        .join(", ")
}

fn preview<T: Debug>(values: &[T]) -> String {
    let shown = values
        .iter()
        .take(PREVIEW_ELEMENTS)
        .map(|v| format!("{:?}", v))
        .collect::<Vec<_>>()
        .join(", ");
    match values.len().saturating_sub(PREVIEW_ELEMENTS) {
        0 => format!("[{}]", shown),
        more => format!("[{}, ... {} more]", shown, more),
    }
}

fn tally(entries: &mut Vec<(String, usize)>, rendered: String) {
    match entries.iter_mut().find(|(existing, _)| *existing == rendered) {
        Some((_, count)) => *count += 1,
        None => entries.push((rendered, 1)),
    }
}

/// Compare two sequences as multisets; `None` when they hold the same elements
///
/// Only `PartialEq` is required, so matching is quadratic.
pub fn multiset_diff<T: PartialEq + Debug>(expected: &[T], actual: &[T]) -> Option<MultisetDiff> {
    let mut matched = vec![false; actual.len()];
    let mut missing = Vec::new();

    for wanted in expected {
        let slot = actual
            .iter()
            .enumerate()
            .position(|(i, candidate)| !matched[i] && candidate == wanted);
        match slot {
            Some(i) => matched[i] = true,
            None => tally(&mut missing, format!("{:?}", wanted)),
        }
    }

    let mut unexpected = Vec::new();
    for (candidate, was_matched) in actual.iter().zip(&matched) {
        if !was_matched {
            tally(&mut unexpected, format!("{:?}", candidate));
        }
    }

    if missing.is_empty() && unexpected.is_empty() {
        None
    } else {
        Some(MultisetDiff {
            expected_len: expected.len(),
            actual_len: actual.len(),
            missing,
            unexpected,
            expected: preview(expected),
            actual: preview(actual),
        })
    }
}
