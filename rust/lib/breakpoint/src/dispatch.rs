use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::error::BreakpointError;
use crate::host::ClassList;
use crate::watch::{Dimension, WatchSet};

/// A detected state change for one namespace.
///
/// `prior` is `None` on the first categorization after registration.
#[derive(Clone, Serialize)]
pub struct Transition {
    pub namespace: String,
    pub dimension: Dimension,
    pub prior: Option<String>,
    pub state: String,
    /// The set that fired, for callbacks that want thresholds or selector.
    #[serde(skip)]
    pub watch: Arc<WatchSet>,
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("namespace", &self.namespace)
            .field("dimension", &self.dimension)
            .field("prior", &self.prior)
            .field("state", &self.state)
            .finish()
    }
}

/// Applies a transition's side effects: class swap first, then callback.
pub struct Dispatcher {
    classes: Option<Arc<dyn ClassList>>,
    separator: String,
}

impl Dispatcher {
    pub fn new(classes: Option<Arc<dyn ClassList>>, separator: impl Into<String>) -> Self {
        Self {
            classes,
            separator: separator.into(),
        }
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Run the side effects for `t`.
    ///
    /// A callback error is returned to the caller; the class swap has
    /// already happened by then.
    pub fn dispatch(&self, t: &Transition) -> Result<(), BreakpointError> {
        if let (Some(selector), Some(classes)) = (t.watch.selector(), &self.classes) {
            if let Some(prior) = &t.prior {
                classes.remove_class(selector, &t.watch.class_name(prior, &self.separator));
            }
            classes.add_class(selector, &t.watch.class_name(&t.state, &self.separator));
        }

        if let Some(callback) = t.watch.effect().get_callback() {
            callback(t).map_err(|source| BreakpointError::Callback {
                namespace: t.namespace.clone(),
                source,
            })?;
        }
        Ok(())
    }
}
