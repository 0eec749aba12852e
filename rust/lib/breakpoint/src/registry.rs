use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::error::BreakpointError;
use crate::watch::{Dimension, Effect, WatchId, WatchSet};

/// Namespace → watch set, plus namespace → last-known state.
///
/// Both maps live behind one lock so a namespace is never half-registered
/// or half-removed. A namespace has no current state until its first
/// categorization.
pub struct Registry {
    inner: RwLock<Inner>,
    next_id: AtomicU64,
}

#[derive(Default)]
struct Inner {
    /// BTreeMap so full ticks visit namespaces in a stable order.
    sets: BTreeMap<String, Arc<WatchSet>>,
    current: HashMap<String, String>,
}

/// Outcome of recording a freshly computed state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Change {
    /// The set was cancelled (or replaced) since it was snapshotted.
    Stale,
    Unchanged,
    Changed { prior: Option<String> },
}

impl Registry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Validate and store a new watch set.
    ///
    /// Fails without touching the registry if the input is invalid or the
    /// namespace is taken under any dimension.
    pub fn register(
        &self,
        dimension: Dimension,
        namespace: String,
        states: Vec<String>,
        thresholds: Vec<f64>,
        effect: Effect,
    ) -> Result<Arc<WatchSet>, BreakpointError> {
        let id = WatchId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let set = Arc::new(WatchSet::new(
            id, dimension, namespace, states, thresholds, effect,
        )?);

        let mut inner = self.inner.write().unwrap();
        if inner.sets.contains_key(set.namespace()) {
            return Err(BreakpointError::DuplicateNamespace(
                set.namespace().to_string(),
            ));
        }
        inner
            .sets
            .insert(set.namespace().to_string(), Arc::clone(&set));
        debug!(
            namespace = set.namespace(),
            dimension = %dimension,
            states = set.states().len(),
            "watch set registered"
        );
        Ok(set)
    }

    pub fn get(&self, namespace: &str) -> Option<Arc<WatchSet>> {
        let inner = self.inner.read().unwrap();
        inner.sets.get(namespace).cloned()
    }

    /// Last-known state, or `None` if unregistered or not yet categorized.
    pub fn current_state(&self, namespace: &str) -> Option<String> {
        let inner = self.inner.read().unwrap();
        inner.current.get(namespace).cloned()
    }

    /// Remove a namespace and its current state. No-op if absent.
    pub fn remove(&self, namespace: &str) -> Option<Arc<WatchSet>> {
        let mut inner = self.inner.write().unwrap();
        inner.current.remove(namespace);
        let removed = inner.sets.remove(namespace);
        if removed.is_some() {
            debug!(namespace, "watch set cancelled");
        }
        removed
    }

    /// Remove everything. Returns how many sets were dropped.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.write().unwrap();
        let n = inner.sets.len();
        inner.sets.clear();
        inner.current.clear();
        n
    }

    /// All registered sets, in namespace order.
    pub fn snapshot(&self) -> Vec<Arc<WatchSet>> {
        let inner = self.inner.read().unwrap();
        inner.sets.values().cloned().collect()
    }

    pub fn namespaces(&self) -> Vec<String> {
        let inner = self.inner.read().unwrap();
        inner.sets.keys().cloned().collect()
    }

    /// Check whether this exact registration is still live.
    pub fn is_live(&self, set: &WatchSet) -> bool {
        let inner = self.inner.read().unwrap();
        inner
            .sets
            .get(set.namespace())
            .is_some_and(|live| live.id() == set.id())
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store `state` as the current state of `set` if it differs.
    ///
    /// Membership is checked under the same lock as the write, so a set
    /// cancelled after it was snapshotted is never resurrected.
    pub(crate) fn record(&self, set: &WatchSet, state: &str) -> Change {
        let mut inner = self.inner.write().unwrap();
        let live = inner
            .sets
            .get(set.namespace())
            .is_some_and(|live| live.id() == set.id());
        if !live {
            return Change::Stale;
        }
        if inner
            .current
            .get(set.namespace())
            .is_some_and(|prior| prior == state)
        {
            return Change::Unchanged;
        }
        let prior = inner
            .current
            .insert(set.namespace().to_string(), state.to_string());
        Change::Changed { prior }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
