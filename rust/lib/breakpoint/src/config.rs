use serde::{Deserialize, Serialize};

use crate::error::BreakpointError;
use crate::watch::WatchSpec;

/// Runtime options for a [`Breakpoints`](crate::Breakpoints) instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakpointConfig {
    /// Joins namespace and state into a class name: `nav` + `-` + `wide`.
    pub class_separator: String,
    /// Keep ticking the remaining watch sets when a callback fails.
    /// When false, the first callback error aborts the tick.
    pub isolate_callbacks: bool,
}

impl Default for BreakpointConfig {
    fn default() -> Self {
        Self {
            class_separator: "-".to_string(),
            isolate_callbacks: true,
        }
    }
}

/// Declarative bundle of options and watch sets, usually read from JSON.
///
/// ```json
/// {
///   "config": { "class_separator": "-" },
///   "watches": [
///     { "namespace": "nav", "dimension": "width",
///       "states": ["narrow", "wide"], "thresholds": [768], "selector": "#nav" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub config: BreakpointConfig,
    #[serde(default)]
    pub watches: Vec<WatchSpec>,
}

impl Manifest {
    pub fn from_json(json: &str) -> Result<Self, BreakpointError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, BreakpointError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
