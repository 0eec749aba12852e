use std::sync::Arc;
use std::sync::atomic::Ordering;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::app::Breakpoints;
use crate::error::BreakpointError;

/// Start the resize listener on the current tokio runtime.
///
/// The listener wakes whenever a signal is queued (a resize notification
/// or a registration) and drains the queue. Only one listener may run per
/// `Breakpoints`; a second call fails with `AlreadyListening` until the
/// first is cancelled and has exited.
///
/// Returns a CancellationToken that stops the listener when cancelled.
pub fn start(breakpoints: Arc<Breakpoints>) -> Result<CancellationToken, BreakpointError> {
    if breakpoints
        .listening
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        return Err(BreakpointError::AlreadyListening);
    }

    let cancel = CancellationToken::new();
    let token = cancel.clone();

    tokio::spawn(async move {
        // Released on every exit path, including a panicking callback.
        let attached = Attached(breakpoints);
        let breakpoints = &attached.0;
        info!("breakpoint listener started");
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("breakpoint listener stopped");
                    break;
                }
                _ = breakpoints.wake.notified() => {
                    match breakpoints.run_pending() {
                        Ok(report) if report.is_quiet() => {}
                        Ok(report) => debug!(
                            transitions = report.transitions.len(),
                            failures = report.failures.len(),
                            "listener turn"
                        ),
                        Err(e) => {
                            error!("breakpoint listener error: {e}");
                            // The failed drain left later signals queued.
                            if breakpoints.pending() > 0 {
                                breakpoints.wake.notify_one();
                            }
                        }
                    }
                }
            }
        }
    });

    Ok(cancel)
}

/// Holds the listener slot for as long as the task is alive.
struct Attached(Arc<Breakpoints>);

impl Drop for Attached {
    fn drop(&mut self) {
        self.0.listening.store(false, Ordering::Release);
    }
}
