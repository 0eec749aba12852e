//! Host collaborators: where measurements come from and where
//! presentational classes go.
//!
//! A host (browser shell, native window, terminal) implements [`Viewport`]
//! and optionally [`ClassList`]. The in-memory implementations here back
//! headless hosts, the replay tool, and tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Viewport size at one instant, in virtual pixels (scrollbars included).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub width: f64,
    pub height: f64,
}

impl Measurement {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// `width / height`. A zero height yields `inf` (or `NaN` for 0/0),
    /// which categorizes into the last bucket.
    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }
}

/// Measurement source. Read once per tick.
pub trait Viewport: Send + Sync {
    fn measure(&self) -> Measurement;
}

/// Selector-addressed class mutation on the host's elements.
///
/// Both operations must be idempotent and must tolerate a selector that
/// matches nothing, or removing a class that was never present.
pub trait ClassList: Send + Sync {
    fn add_class(&self, selector: &str, class: &str);
    fn remove_class(&self, selector: &str, class: &str);
}

// ============================================================================
// In-memory implementations
// ============================================================================

/// Viewport whose size is set by the host.
pub struct MemoryViewport {
    size: RwLock<Measurement>,
}

impl MemoryViewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            size: RwLock::new(Measurement::new(width, height)),
        }
    }

    /// Set the size reported by the next `measure`.
    pub fn resize(&self, width: f64, height: f64) {
        *self.size.write().unwrap() = Measurement::new(width, height);
    }
}

impl Viewport for MemoryViewport {
    fn measure(&self) -> Measurement {
        *self.size.read().unwrap()
    }
}

/// Class list keyed by selector, counting every add/remove request.
///
/// Selectors are opaque: each distinct string is its own element set.
#[derive(Default)]
pub struct MemoryClassList {
    classes: RwLock<BTreeMap<String, BTreeSet<String>>>,
    mutations: AtomicU64,
}

impl MemoryClassList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classes currently applied for `selector`, in sorted order.
    pub fn classes(&self, selector: &str) -> Vec<String> {
        let classes = self.classes.read().unwrap();
        classes
            .get(selector)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Check whether `class` is applied for `selector`.
    pub fn has_class(&self, selector: &str, class: &str) -> bool {
        let classes = self.classes.read().unwrap();
        classes.get(selector).is_some_and(|set| set.contains(class))
    }

    /// All selectors that currently carry at least one class.
    pub fn selectors(&self) -> Vec<String> {
        let classes = self.classes.read().unwrap();
        classes
            .iter()
            .filter(|(_, set)| !set.is_empty())
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Total add/remove requests received.
    pub fn mutation_count(&self) -> u64 {
        self.mutations.load(Ordering::Relaxed)
    }
}

impl ClassList for MemoryClassList {
    fn add_class(&self, selector: &str, class: &str) {
        self.mutations.fetch_add(1, Ordering::Relaxed);
        let mut classes = self.classes.write().unwrap();
        classes
            .entry(selector.to_string())
            .or_default()
            .insert(class.to_string());
    }

    fn remove_class(&self, selector: &str, class: &str) {
        self.mutations.fetch_add(1, Ordering::Relaxed);
        let mut classes = self.classes.write().unwrap();
        if let Some(set) = classes.get_mut(selector) {
            set.remove(class);
        }
    }
}
