//! Windows and windowed elements
//!
//! Fixed windows are aligned to multiples of their size:
//!
//! ```text
//! size 5000ms:  [0-5000) [5000-10000) [10000-15000)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp given to elements that have no event time of their own
pub const MIN_TIMESTAMP_MS: i64 = i64::MIN;

/// Window an element belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Window {
    /// The single window spanning all time
    Global,
    /// Half-open interval `[start_ms, end_ms)`
    Interval { start_ms: i64, end_ms: i64 },
}

impl Window {
    pub fn contains(&self, timestamp_ms: i64) -> bool {
        match self {
            Window::Global => true,
            Window::Interval { start_ms, end_ms } => {
                timestamp_ms >= *start_ms && timestamp_ms < *end_ms
            }
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Window::Global => write!(f, "GlobalWindow"),
            Window::Interval { start_ms, end_ms } => write!(f, "[{}, {})", start_ms, end_ms),
        }
    }
}

/// Assigns windows to elements from their timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowFn {
    Global,
    Fixed { size_ms: i64 },
}

impl WindowFn {
    pub fn assign(&self, timestamp_ms: i64) -> Window {
        match self {
            WindowFn::Global => Window::Global,
            WindowFn::Fixed { size_ms } => {
                let start_ms = timestamp_ms
                    .div_euclid(*size_ms)
                    .saturating_mul(*size_ms);
                Window::Interval {
                    start_ms,
                    end_ms: start_ms.saturating_add(*size_ms),
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            WindowFn::Fixed { size_ms } if *size_ms <= 0 => {
                Err(format!("fixed window size must be positive, got {}ms", size_ms))
            }
            _ => Ok(()),
        }
    }
}

/// An element together with its event time and window
#[derive(Debug, Clone, PartialEq)]
pub struct WindowedValue<T> {
    pub value: T,
    pub timestamp_ms: i64,
    pub window: Window,
}

impl<T> WindowedValue<T> {
    /// Element in the global window with no event time
    pub fn global(value: T) -> Self {
        Self {
            value,
            timestamp_ms: MIN_TIMESTAMP_MS,
            window: Window::Global,
        }
    }

    pub fn timestamped(value: T, timestamp_ms: i64) -> Self {
        Self {
            value,
            timestamp_ms,
            window: Window::Global,
        }
    }

    /// Same timestamp and window, new value
    pub fn with_value<O>(&self, value: O) -> WindowedValue<O> {
        WindowedValue {
            value,
            timestamp_ms: self.timestamp_ms,
            window: self.window,
        }
    }
}
