use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tracing::debug;

use crate::config::{BreakpointConfig, Manifest};
use crate::dispatch::Dispatcher;
use crate::engine::{Engine, Scope, TickReport};
use crate::error::BreakpointError;
use crate::host::{ClassList, Viewport};
use crate::registry::Registry;
use crate::watch::{Dimension, Effect, WatchSet, WatchSpec};

/// Work waiting for the next turn of the event loop.
#[derive(Debug)]
pub(crate) enum Signal {
    /// The host reported that the viewport may have changed size.
    Resize,
    /// First categorization of a freshly registered set.
    Initial(Arc<WatchSet>),
}

/// Breakpoints — shared viewport breakpoint service.
///
/// Many independent consumers register watch sets here instead of each
/// listening for resizes on their own. One listener feeds resize
/// notifications in; each watch set maps the measured width, height or
/// aspect ratio onto a named state and fires its effect when that state
/// changes.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use openerp_breakpoint::{Breakpoints, Effect, MemoryViewport};
///
/// let viewport = Arc::new(MemoryViewport::new(1024.0, 768.0));
/// let bp = Breakpoints::new(viewport.clone());
///
/// bp.register_width("nav", ["narrow", "medium", "wide"], &[350.0, 800.0],
///     Effect::callback(|t| {
///         println!("{} is now {}", t.namespace, t.state);
///         Ok(())
///     }))?;
///
/// // First categorization happens on the next turn, not during register.
/// assert_eq!(bp.current_state("nav"), None);
/// bp.run_pending()?;
/// assert_eq!(bp.current_state("nav").as_deref(), Some("wide"));
///
/// viewport.resize(320.0, 640.0);
/// bp.notify_resize();
/// bp.run_pending()?;
/// assert_eq!(bp.current_state("nav").as_deref(), Some("narrow"));
/// # Ok::<(), openerp_breakpoint::BreakpointError>(())
/// ```
pub struct Breakpoints {
    registry: Arc<Registry>,
    viewport: Arc<dyn Viewport>,
    classes: Option<Arc<dyn ClassList>>,
    config: BreakpointConfig,
    engine: Engine,
    pending: Mutex<VecDeque<Signal>>,
    pub(crate) wake: Notify,
    pub(crate) listening: AtomicBool,
}

impl Breakpoints {
    /// Create a service measuring `viewport`, with default config and no
    /// class list.
    pub fn new(viewport: Arc<dyn Viewport>) -> Self {
        let registry = Arc::new(Registry::new());
        let config = BreakpointConfig::default();
        let engine = Self::build_engine(&registry, &viewport, None, &config);
        Self {
            registry,
            viewport,
            classes: None,
            config,
            engine,
            pending: Mutex::new(VecDeque::new()),
            wake: Notify::new(),
            listening: AtomicBool::new(false),
        }
    }

    /// Route selector effects to `classes`.
    ///
    /// Sets and signals registered so far are kept.
    pub fn with_class_list(mut self, classes: Arc<dyn ClassList>) -> Self {
        self.classes = Some(classes);
        self.engine = Self::build_engine(&self.registry, &self.viewport, self.classes.clone(), &self.config);
        self
    }

    pub fn with_config(mut self, config: BreakpointConfig) -> Self {
        self.config = config;
        self.engine = Self::build_engine(&self.registry, &self.viewport, self.classes.clone(), &self.config);
        self
    }

    fn build_engine(
        registry: &Arc<Registry>,
        viewport: &Arc<dyn Viewport>,
        classes: Option<Arc<dyn ClassList>>,
        config: &BreakpointConfig,
    ) -> Engine {
        Engine::new(
            Arc::clone(registry),
            Arc::clone(viewport),
            Dispatcher::new(classes, config.class_separator.clone()),
            config.isolate_callbacks,
        )
    }

    pub fn config(&self) -> &BreakpointConfig {
        &self.config
    }

    // ====================================================================
    // Registration
    // ====================================================================

    /// Register a watch set on any dimension.
    ///
    /// `thresholds` must be ascending and hold one fewer entry than
    /// `states`. The first categorization is deferred to the next
    /// [`run_pending`](Self::run_pending) (or listener turn), so the caller
    /// can finish setting up before any effect fires.
    pub fn register<S>(
        &self,
        dimension: Dimension,
        namespace: &str,
        states: S,
        thresholds: &[f64],
        effect: Effect,
    ) -> Result<Arc<WatchSet>, BreakpointError>
    where
        S: IntoIterator,
        S::Item: Into<String>,
    {
        let set = self.registry.register(
            dimension,
            namespace.to_string(),
            states.into_iter().map(Into::into).collect(),
            thresholds.to_vec(),
            effect,
        )?;
        self.enqueue(Signal::Initial(Arc::clone(&set)));
        Ok(set)
    }

    pub fn register_width<S>(
        &self,
        namespace: &str,
        states: S,
        thresholds: &[f64],
        effect: Effect,
    ) -> Result<Arc<WatchSet>, BreakpointError>
    where
        S: IntoIterator,
        S::Item: Into<String>,
    {
        self.register(Dimension::Width, namespace, states, thresholds, effect)
    }

    pub fn register_height<S>(
        &self,
        namespace: &str,
        states: S,
        thresholds: &[f64],
        effect: Effect,
    ) -> Result<Arc<WatchSet>, BreakpointError>
    where
        S: IntoIterator,
        S::Item: Into<String>,
    {
        self.register(Dimension::Height, namespace, states, thresholds, effect)
    }

    /// Register on `width / height`.
    pub fn register_aspect_ratio<S>(
        &self,
        namespace: &str,
        states: S,
        thresholds: &[f64],
        effect: Effect,
    ) -> Result<Arc<WatchSet>, BreakpointError>
    where
        S: IntoIterator,
        S::Item: Into<String>,
    {
        self.register(Dimension::AspectRatio, namespace, states, thresholds, effect)
    }

    /// Register a declarative spec. Its selector (if any) is the only effect.
    pub fn register_spec(&self, spec: WatchSpec) -> Result<Arc<WatchSet>, BreakpointError> {
        let effect = Effect::from_parts(None, spec.selector);
        self.register(
            spec.dimension,
            &spec.namespace,
            spec.states,
            &spec.thresholds,
            effect,
        )
    }

    /// Register every watch in `manifest`, in order.
    ///
    /// Stops at the first failure; sets registered before it stay.
    /// The manifest's config is not applied here, see
    /// [`with_config`](Self::with_config).
    pub fn load(&self, manifest: Manifest) -> Result<Vec<Arc<WatchSet>>, BreakpointError> {
        manifest
            .watches
            .into_iter()
            .map(|spec| self.register_spec(spec))
            .collect()
    }

    // ====================================================================
    // Query / cancel
    // ====================================================================

    /// Current state of `namespace`. `None` if unknown or not yet
    /// categorized.
    pub fn current_state(&self, namespace: &str) -> Option<String> {
        self.registry.current_state(namespace)
    }

    pub fn watch(&self, namespace: &str) -> Option<Arc<WatchSet>> {
        self.registry.get(namespace)
    }

    pub fn namespaces(&self) -> Vec<String> {
        self.registry.namespaces()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Stop watching `namespace`. Unknown namespaces are ignored.
    ///
    /// A pending initial pass for it becomes a no-op.
    pub fn cancel(&self, namespace: &str) {
        self.registry.remove(namespace);
    }

    /// Drop every watch set and any pending work.
    pub fn reset(&self) {
        let dropped = self.registry.clear();
        self.pending.lock().unwrap().clear();
        debug!(dropped, "breakpoints reset");
    }

    // ====================================================================
    // Event loop
    // ====================================================================

    /// Report that the viewport may have changed size.
    ///
    /// Cheap; the actual re-evaluation happens on the next turn.
    pub fn notify_resize(&self) {
        self.enqueue(Signal::Resize);
    }

    /// Number of signals waiting to be processed.
    pub fn pending(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Process queued signals in order until the queue is empty.
    ///
    /// Signals queued by callbacks while draining are processed in the
    /// same call. With callback isolation off, the first callback error
    /// stops the drain; signals behind it stay queued.
    pub fn run_pending(&self) -> Result<TickReport, BreakpointError> {
        let mut report = TickReport::default();
        loop {
            // Lock released before the tick so callbacks can register.
            let next = self.pending.lock().unwrap().pop_front();
            let Some(signal) = next else {
                break;
            };
            let scope = match signal {
                Signal::Resize => Scope::All,
                Signal::Initial(set) => {
                    if !self.registry.is_live(&set) {
                        debug!(namespace = set.namespace(), "initial pass for cancelled watch set dropped");
                        continue;
                    }
                    Scope::One(set)
                }
            };
            report.merge(self.engine.tick(scope)?);
        }
        Ok(report)
    }

    /// Re-evaluate every watch set now, bypassing the queue.
    pub fn tick(&self) -> Result<TickReport, BreakpointError> {
        self.engine.tick(Scope::All)
    }

    fn enqueue(&self, signal: Signal) {
        self.pending.lock().unwrap().push_back(signal);
        self.wake.notify_one();
    }
}
