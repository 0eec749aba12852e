use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::categorize;
use crate::dispatch::Transition;
use crate::error::{BreakpointError, CallbackError};
use crate::host::Measurement;

/// Which measurement a watch set tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Width,
    Height,
    #[serde(alias = "ratio")]
    AspectRatio,
}

impl Dimension {
    /// Extract this dimension's value from a measurement.
    pub fn value(self, m: &Measurement) -> f64 {
        match self {
            Dimension::Width => m.width,
            Dimension::Height => m.height,
            Dimension::AspectRatio => m.aspect_ratio(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Width => "width",
            Dimension::Height => "height",
            Dimension::AspectRatio => "aspect_ratio",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one registration. A namespace that is cancelled and
/// registered again gets a new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(pub(crate) u64);

/// Transition callback. Receives the full transition, including the watch
/// set it fired for.
pub type Callback = Arc<dyn Fn(&Transition) -> Result<(), CallbackError> + Send + Sync>;

/// What happens when a watch set changes state.
#[derive(Clone, Default)]
pub enum Effect {
    /// Track state only; `current_state` is the sole observer.
    #[default]
    None,
    Callback(Callback),
    /// Toggle `{namespace}-{state}` classes on the elements this selector matches.
    Selector(String),
    Both {
        callback: Callback,
        selector: String,
    },
}

impl Effect {
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&Transition) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        Effect::Callback(Arc::new(f))
    }

    pub fn selector(selector: impl Into<String>) -> Self {
        Effect::Selector(selector.into())
    }

    pub fn both<F>(f: F, selector: impl Into<String>) -> Self
    where
        F: Fn(&Transition) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        Effect::Both {
            callback: Arc::new(f),
            selector: selector.into(),
        }
    }

    /// Build from the loose optional pair hosts tend to carry around.
    pub fn from_parts(callback: Option<Callback>, selector: Option<String>) -> Self {
        match (callback, selector) {
            (None, None) => Effect::None,
            (Some(callback), None) => Effect::Callback(callback),
            (None, Some(selector)) => Effect::Selector(selector),
            (Some(callback), Some(selector)) => Effect::Both { callback, selector },
        }
    }

    pub fn get_callback(&self) -> Option<&Callback> {
        match self {
            Effect::Callback(cb) | Effect::Both { callback: cb, .. } => Some(cb),
            _ => None,
        }
    }

    pub fn get_selector(&self) -> Option<&str> {
        match self {
            Effect::Selector(s) | Effect::Both { selector: s, .. } => Some(s),
            _ => None,
        }
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::None => f.write_str("None"),
            Effect::Callback(_) => f.write_str("Callback(..)"),
            Effect::Selector(s) => f.debug_tuple("Selector").field(s).finish(),
            Effect::Both { selector, .. } => f
                .debug_struct("Both")
                .field("callback", &"..")
                .field("selector", selector)
                .finish(),
        }
    }
}

/// One registered threshold configuration.
///
/// Immutable once built; the registry tracks its current state separately.
#[derive(Debug)]
pub struct WatchSet {
    id: WatchId,
    namespace: String,
    dimension: Dimension,
    states: Vec<String>,
    thresholds: Vec<f64>,
    effect: Effect,
}

impl WatchSet {
    /// Validate and build a watch set.
    ///
    /// A single state with no thresholds is accepted; such a set settles
    /// once and never transitions again.
    pub(crate) fn new(
        id: WatchId,
        dimension: Dimension,
        namespace: String,
        states: Vec<String>,
        thresholds: Vec<f64>,
        effect: Effect,
    ) -> Result<Self, BreakpointError> {
        if namespace.is_empty() {
            return Err(BreakpointError::Validation("namespace is empty".into()));
        }
        if states.is_empty() {
            return Err(BreakpointError::Validation(format!(
                "'{namespace}': states are empty"
            )));
        }
        if thresholds.len() != states.len() - 1 {
            return Err(BreakpointError::Validation(format!(
                "'{namespace}': {} states need {} thresholds, got {}",
                states.len(),
                states.len() - 1,
                thresholds.len()
            )));
        }
        if effect.get_selector().is_some_and(str::is_empty) {
            return Err(BreakpointError::Validation(format!(
                "'{namespace}': selector is empty"
            )));
        }
        Ok(Self {
            id,
            namespace,
            dimension,
            states,
            thresholds,
            effect,
        })
    }

    pub fn id(&self) -> WatchId {
        self.id
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn states(&self) -> &[String] {
        &self.states
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    pub fn effect(&self) -> &Effect {
        &self.effect
    }

    pub fn selector(&self) -> Option<&str> {
        self.effect.get_selector()
    }

    /// State for a raw dimension value.
    pub fn state_for(&self, value: f64) -> &str {
        // states is non-empty by construction.
        categorize::categorize(value, &self.states, &self.thresholds).unwrap_or_default()
    }

    /// State for a full measurement, reading this set's dimension.
    pub fn state_at(&self, m: &Measurement) -> &str {
        self.state_for(self.dimension.value(m))
    }

    /// Presentational class for `state`, e.g. `nav-wide`.
    pub fn class_name(&self, state: &str, separator: &str) -> String {
        format!("{}{}{}", self.namespace, separator, state)
    }
}

/// Declarative registration, as found in a manifest. Carries no callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchSpec {
    pub namespace: String,
    pub dimension: Dimension,
    pub states: Vec<String>,
    pub thresholds: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
}
