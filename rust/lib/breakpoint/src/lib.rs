//! Breakpoint — shared viewport breakpoint engine.
//!
//! Maps the host window's width, height, or aspect ratio onto named states
//! and notifies observers when a state changes. Many consumers share one
//! measurement source and one resize listener instead of each attaching
//! their own.
//!
//! # Pieces
//!
//! - [`categorize()`] — pure threshold bucketing, boundary values go low
//! - [`Registry`] — namespace → watch set, plus last-known state
//! - [`Engine`] — one tick: measure once, re-categorize, diff, dispatch
//! - [`Dispatcher`] — swap `{namespace}-{state}` classes, then run the callback
//! - [`Breakpoints`] — the facade hosts and consumers talk to
//! - [`listener::start`] — the single resize listener on a tokio runtime
//!
//! # Buckets
//!
//! With states `[narrow, medium, wide]` and thresholds `[350, 800]`:
//! - `narrow`: `value <= 350`
//! - `medium`: `350 < value <= 800`
//! - `wide`: `value > 800` (also `NaN`)
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use openerp_breakpoint::{BreakpointError, Breakpoints, Effect, MemoryViewport, listener};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), BreakpointError> {
//!     let viewport = Arc::new(MemoryViewport::new(1024.0, 768.0));
//!     let bp = Arc::new(Breakpoints::new(viewport.clone()));
//!     let stop = listener::start(bp.clone())?;
//!
//!     bp.register_width("nav", ["narrow", "medium", "wide"], &[350.0, 800.0],
//!         Effect::callback(|t| {
//!             println!("{}: {:?} -> {}", t.namespace, t.prior, t.state);
//!             Ok(())
//!         }))?;
//!
//!     // From the host's resize handler:
//!     viewport.resize(320.0, 640.0);
//!     bp.notify_resize();
//!
//!     stop.cancel();
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod categorize;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod host;
pub mod listener;
pub mod registry;
pub mod watch;

// Re-export primary types at crate root.
pub use app::Breakpoints;
pub use categorize::categorize;
pub use config::{BreakpointConfig, Manifest};
pub use dispatch::{Dispatcher, Transition};
pub use engine::{Engine, Scope, TickReport};
pub use error::{BreakpointError, CallbackError};
pub use host::{ClassList, Measurement, MemoryClassList, MemoryViewport, Viewport};
pub use registry::Registry;
pub use watch::{Callback, Dimension, Effect, WatchId, WatchSet, WatchSpec};
