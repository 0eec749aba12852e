use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::dispatch::{Dispatcher, Transition};
use crate::error::BreakpointError;
use crate::host::{Measurement, Viewport};
use crate::registry::{Change, Registry};
use crate::watch::WatchSet;

/// Which watch sets a tick re-evaluates.
#[derive(Debug, Clone)]
pub enum Scope {
    /// Every set registered when the tick starts.
    All,
    /// One set; skipped if it was cancelled in the meantime.
    One(Arc<WatchSet>),
}

/// What a tick did.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Measurements taken, one per tick that had sets to process.
    pub measurements: Vec<Measurement>,
    /// Transitions dispatched, in processing order.
    pub transitions: Vec<Transition>,
    /// Callback failures swallowed under callback isolation.
    pub failures: Vec<BreakpointError>,
}

impl TickReport {
    pub fn is_quiet(&self) -> bool {
        self.transitions.is_empty() && self.failures.is_empty()
    }

    pub fn merge(&mut self, other: TickReport) {
        self.measurements.extend(other.measurements);
        self.transitions.extend(other.transitions);
        self.failures.extend(other.failures);
    }
}

/// Re-categorizes watch sets against the viewport and dispatches changes.
pub struct Engine {
    registry: Arc<Registry>,
    viewport: Arc<dyn Viewport>,
    dispatcher: Dispatcher,
    isolate_callbacks: bool,
}

impl Engine {
    pub fn new(
        registry: Arc<Registry>,
        viewport: Arc<dyn Viewport>,
        dispatcher: Dispatcher,
        isolate_callbacks: bool,
    ) -> Self {
        Self {
            registry,
            viewport,
            dispatcher,
            isolate_callbacks,
        }
    }

    /// Run one tick.
    ///
    /// The viewport is measured once and shared by every set in the tick.
    /// Sets whose state did not change produce no side effects. The stored
    /// state is updated before the set's callback runs.
    pub fn tick(&self, scope: Scope) -> Result<TickReport, BreakpointError> {
        let sets = match scope {
            Scope::All => self.registry.snapshot(),
            Scope::One(set) => vec![set],
        };
        let mut report = TickReport::default();
        if sets.is_empty() {
            return Ok(report);
        }

        let m = self.viewport.measure();
        trace!(width = m.width, height = m.height, sets = sets.len(), "tick");
        report.measurements.push(m);

        for set in sets {
            let state = set.state_at(&m);
            let prior = match self.registry.record(&set, state) {
                Change::Stale => {
                    debug!(namespace = set.namespace(), "skipping cancelled watch set");
                    continue;
                }
                Change::Unchanged => continue,
                Change::Changed { prior } => prior,
            };

            debug!(
                namespace = set.namespace(),
                prior = prior.as_deref().unwrap_or("-"),
                state,
                "breakpoint transition"
            );
            let t = Transition {
                namespace: set.namespace().to_string(),
                dimension: set.dimension(),
                prior,
                state: state.to_string(),
                watch: Arc::clone(&set),
            };

            match self.dispatcher.dispatch(&t) {
                Ok(()) => report.transitions.push(t),
                Err(e) if self.isolate_callbacks => {
                    warn!(namespace = %t.namespace, error = %e, "transition callback failed");
                    report.transitions.push(t);
                    report.failures.push(e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MemoryClassList, MemoryViewport};
    use crate::watch::{Dimension, Effect};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct Fixture {
        registry: Arc<Registry>,
        viewport: Arc<MemoryViewport>,
        classes: Arc<MemoryClassList>,
        engine: Engine,
    }

    fn fixture(isolate: bool) -> Fixture {
        let registry = Arc::new(Registry::new());
        let viewport = Arc::new(MemoryViewport::new(499.0, 700.0));
        let classes = Arc::new(MemoryClassList::new());
        let engine = Engine::new(
            registry.clone(),
            viewport.clone(),
            Dispatcher::new(Some(classes.clone()), "-"),
            isolate,
        );
        Fixture {
            registry,
            viewport,
            classes,
            engine,
        }
    }

    fn register(
        f: &Fixture,
        dimension: Dimension,
        ns: &str,
        states: &[&str],
        thresholds: &[f64],
        effect: Effect,
    ) -> Arc<WatchSet> {
        f.registry
            .register(
                dimension,
                ns.into(),
                states.iter().map(|s| s.to_string()).collect(),
                thresholds.to_vec(),
                effect,
            )
            .unwrap()
    }

    type Calls = Arc<Mutex<Vec<(String, String, Option<String>)>>>;

    fn recording() -> (Calls, Effect) {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let c = calls.clone();
        let effect = Effect::both(
            move |t| {
                c.lock()
                    .unwrap()
                    .push((t.namespace.clone(), t.state.clone(), t.prior.clone()));
                Ok(())
            },
            "#w",
        );
        (calls, effect)
    }

    // ========================================================================
    // Transition scenario
    // ========================================================================

    #[test]
    fn width_scenario() {
        let f = fixture(true);
        let (calls, effect) = recording();
        let set = register(&f, Dimension::Width, "w", &["narrow", "medium", "wide"], &[350.0, 800.0], effect);

        // Initial pass for the new set only.
        let r = f.engine.tick(Scope::One(set)).unwrap();
        assert_eq!(r.transitions.len(), 1);
        assert_eq!(f.registry.current_state("w").as_deref(), Some("medium"));

        // 500 is still <= 800.
        f.viewport.resize(500.0, 700.0);
        assert!(f.engine.tick(Scope::All).unwrap().is_quiet());

        f.viewport.resize(801.0, 700.0);
        let r = f.engine.tick(Scope::All).unwrap();
        assert_eq!(r.transitions.len(), 1);
        assert_eq!(r.transitions[0].prior.as_deref(), Some("medium"));
        assert_eq!(r.transitions[0].state, "wide");

        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                ("w".to_string(), "medium".to_string(), None),
                ("w".to_string(), "wide".to_string(), Some("medium".to_string())),
            ]
        );
        assert_eq!(f.classes.classes("#w"), vec!["w-wide".to_string()]);
    }

    // ========================================================================
    // Idempotence
    // ========================================================================

    #[test]
    fn unchanged_measurement_has_no_side_effects() {
        let f = fixture(true);
        let (calls, effect) = recording();
        register(&f, Dimension::Width, "w", &["narrow", "wide"], &[600.0], effect);

        f.engine.tick(Scope::All).unwrap();
        let mutations = f.classes.mutation_count();
        let invocations = calls.lock().unwrap().len();

        let r = f.engine.tick(Scope::All).unwrap();
        assert!(r.is_quiet());
        assert_eq!(f.classes.mutation_count(), mutations);
        assert_eq!(calls.lock().unwrap().len(), invocations);
    }

    // ========================================================================
    // Measurement sharing and dimensions
    // ========================================================================

    struct CountingViewport {
        inner: MemoryViewport,
        reads: AtomicU64,
    }

    impl Viewport for CountingViewport {
        fn measure(&self) -> Measurement {
            self.reads.fetch_add(1, Ordering::Relaxed);
            self.inner.measure()
        }
    }

    #[test]
    fn viewport_measured_once_per_tick() {
        let registry = Arc::new(Registry::new());
        let viewport = Arc::new(CountingViewport {
            inner: MemoryViewport::new(1600.0, 800.0),
            reads: AtomicU64::new(0),
        });
        let engine = Engine::new(registry.clone(), viewport.clone(), Dispatcher::new(None, "-"), true);
        for (ns, dim) in [("a", Dimension::Width), ("b", Dimension::Height), ("c", Dimension::AspectRatio)] {
            registry
                .register(dim, ns.into(), vec!["lo".into(), "hi".into()], vec![1.5], Effect::None)
                .unwrap();
        }

        let r = engine.tick(Scope::All).unwrap();
        assert_eq!(viewport.reads.load(Ordering::Relaxed), 1);
        assert_eq!(r.measurements, vec![Measurement::new(1600.0, 800.0)]);
        assert_eq!(r.transitions.len(), 3);
    }

    #[test]
    fn empty_registry_does_not_measure() {
        let f = fixture(true);
        let r = f.engine.tick(Scope::All).unwrap();
        assert!(r.measurements.is_empty());
    }

    #[test]
    fn aspect_ratio_uses_width_over_height() {
        let f = fixture(true);
        register(&f, Dimension::AspectRatio, "shape", &["portrait", "square", "wide"], &[1.0, 1.99], Effect::None);

        f.viewport.resize(1600.0, 800.0);
        f.engine.tick(Scope::All).unwrap();
        assert_eq!(f.registry.current_state("shape").as_deref(), Some("wide"));

        f.viewport.resize(1600.0, 1600.0);
        f.engine.tick(Scope::All).unwrap();
        assert_eq!(f.registry.current_state("shape").as_deref(), Some("portrait"));
    }

    #[test]
    fn zero_height_ratio_lands_in_top_bucket() {
        let f = fixture(true);
        register(&f, Dimension::AspectRatio, "shape", &["portrait", "landscape"], &[1.0], Effect::None);

        f.viewport.resize(1200.0, 0.0);
        f.engine.tick(Scope::All).unwrap();
        assert_eq!(f.registry.current_state("shape").as_deref(), Some("landscape"));
    }

    #[test]
    fn height_dimension_reads_height() {
        let f = fixture(true);
        register(&f, Dimension::Height, "h", &["short", "tall"], &[600.0], Effect::None);

        f.viewport.resize(2000.0, 500.0);
        f.engine.tick(Scope::All).unwrap();
        assert_eq!(f.registry.current_state("h").as_deref(), Some("short"));
    }

    // ========================================================================
    // Cancellation
    // ========================================================================

    #[test]
    fn cancelled_set_is_not_dispatched() {
        let f = fixture(true);
        let (calls, effect) = recording();
        let set = register(&f, Dimension::Width, "w", &["narrow", "wide"], &[600.0], effect);
        f.registry.remove("w");

        let r = f.engine.tick(Scope::One(set)).unwrap();
        assert!(r.is_quiet());
        assert!(calls.lock().unwrap().is_empty());
        assert!(f.registry.current_state("w").is_none());
        assert_eq!(f.classes.mutation_count(), 0);
    }

    #[test]
    fn single_state_set_settles_once() {
        let f = fixture(true);
        let (calls, effect) = recording();
        register(&f, Dimension::Width, "solo", &["any"], &[], effect);

        f.engine.tick(Scope::All).unwrap();
        f.viewport.resize(10_000.0, 10.0);
        f.engine.tick(Scope::All).unwrap();
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    // ========================================================================
    // Callback failures
    // ========================================================================

    fn register_failing(f: &Fixture, ns: &str) {
        register(
            f,
            Dimension::Width,
            ns,
            &["narrow", "wide"],
            &[600.0],
            Effect::callback(|_| Err("boom".into())),
        );
    }

    #[test]
    fn isolated_failure_does_not_starve_others() {
        let f = fixture(true);
        register_failing(&f, "a-bad");
        let (calls, effect) = recording();
        register(&f, Dimension::Width, "b-good", &["narrow", "wide"], &[600.0], effect);

        let r = f.engine.tick(Scope::All).unwrap();
        assert_eq!(r.failures.len(), 1);
        assert_eq!(r.transitions.len(), 2);
        assert_eq!(calls.lock().unwrap().len(), 1);
        // State was stored before the callback failed.
        assert_eq!(f.registry.current_state("a-bad").as_deref(), Some("narrow"));
    }

    #[test]
    fn unisolated_failure_aborts_tick() {
        let f = fixture(false);
        register_failing(&f, "a-bad");
        let (calls, effect) = recording();
        register(&f, Dimension::Width, "b-good", &["narrow", "wide"], &[600.0], effect);

        let err = f.engine.tick(Scope::All).unwrap_err();
        assert!(matches!(err, BreakpointError::Callback { ref namespace, .. } if namespace == "a-bad"));
        assert!(calls.lock().unwrap().is_empty());
        assert!(f.registry.current_state("b-good").is_none());
    }

    #[test]
    fn report_merge_concatenates() {
        let mut a = TickReport::default();
        a.measurements.push(Measurement::new(1.0, 1.0));
        let mut b = TickReport::default();
        b.measurements.push(Measurement::new(2.0, 2.0));
        b.failures.push(BreakpointError::AlreadyListening);

        a.merge(b);
        assert_eq!(a.measurements.len(), 2);
        assert!(!a.is_quiet());
    }
}
