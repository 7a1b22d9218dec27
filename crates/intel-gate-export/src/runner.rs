// crates/intel-gate-export/src/runner.rs
// ============================================================================
// Module: Export Runner
// Description: Periodic single-flight driver for export cycles.
// Purpose: Run cycles on an interval without overlap and stop cleanly.
// Dependencies: intel-gate-export::orchestrator, tokio
// ============================================================================

//! ## Overview
//! The runner fires one cycle per interval tick. Cycles run on the blocking
//! pool; if a tick arrives while a cycle is still running, the tick is
//! dropped and audited rather than queued. A cycle that errors out is
//! audited as `cycle_failed` so storage problems are never silent. Shutdown
//! stops new launches immediately and asks the in-flight cycle to stop at
//! the next audience boundary.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::audit::ExportAuditEvent;
use crate::audit::ExportAuditSink;
use crate::orchestrator::ExportOrchestrator;

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Periodic export driver with single-flight cycles.
pub struct ExportRunner {
    /// Orchestrator shared with in-flight cycle tasks.
    orchestrator: Arc<ExportOrchestrator>,
    /// Interval between cycle launches.
    interval: Duration,
    /// Audit sink for overlap events.
    audit: Arc<dyn ExportAuditSink>,
    /// Set while a cycle is in flight.
    running: Arc<AtomicBool>,
}

impl ExportRunner {
    /// Creates a runner for the given orchestrator and interval.
    #[must_use]
    pub fn new(
        orchestrator: Arc<ExportOrchestrator>,
        interval: Duration,
        audit: Arc<dyn ExportAuditSink>,
    ) -> Self {
        Self {
            orchestrator,
            interval,
            audit,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Runs cycles until the shutdown channel signals or closes.
    ///
    /// The first cycle launches immediately; later cycles follow the
    /// configured interval.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.launch_cycle();
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        self.orchestrator.request_shutdown();
                        break;
                    }
                }
            }
        }
    }

    /// Launches one cycle unless another is still in flight.
    fn launch_cycle(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            self.audit.record(&ExportAuditEvent::cycle_skipped_overlap());
            return;
        }
        let orchestrator = Arc::clone(&self.orchestrator);
        let running = Arc::clone(&self.running);
        let audit = Arc::clone(&self.audit);
        tokio::spawn(async move {
            // Fetch and per-audience outcomes are audited by the orchestrator;
            // whole-cycle failures, including manifest write errors and a
            // panicked blocking task, surface here.
            let failure = match tokio::task::spawn_blocking(move || orchestrator.run_cycle()).await
            {
                Ok(Ok(_report)) => None,
                Ok(Err(error)) => Some(error.to_string()),
                Err(error) => Some(error.to_string()),
            };
            if let Some(reason) = failure {
                audit.record(&ExportAuditEvent::cycle_failed(&reason));
            }
            running.store(false, Ordering::SeqCst);
        });
    }
}
