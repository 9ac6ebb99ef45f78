//! Run-level coordination: the shared call budget, OS signal handling and end-of-run cleanup
// Runtime module - one per top-level command invocation
use crate::budget::{CallBudget, CancelReason};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Owns the call budget for one run and the task listening for interrupts.
///
/// Both Ctrl+C and (on Unix) SIGTERM cancel the run the same way a budget
/// threshold breach does.
pub struct RunRuntime {
    budget: Arc<CallBudget>,
    signal_task: Option<JoinHandle<()>>,
}

impl RunRuntime {
    /// Create a runtime with a fresh budget. Must be called inside a tokio runtime
    /// when `listen_for_signals` is true.
    pub fn new(threshold: u64, listen_for_signals: bool) -> Self {
        let budget = Arc::new(CallBudget::new(threshold));
        let signal_task = listen_for_signals.then(|| {
            let budget = Arc::clone(&budget);
            tokio::spawn(async move {
                let token = budget.token().clone();
                tokio::select! {
                    _ = shutdown_signal() => {
                        budget.interrupt();
                    }
                    _ = token.cancelled() => {}
                }
            })
        });
        Self {
            budget,
            signal_task,
        }
    }

    /// Shared budget handle, to be passed to the API client
    pub fn budget(&self) -> Arc<CallBudget> {
        Arc::clone(&self.budget)
    }

    /// Trigger a programmatic interrupt
    pub fn interrupt(&self) {
        self.budget.interrupt();
    }

    /// Reason the run was stopped early, if it was.
    ///
    /// `Finished` is not an early stop and is reported as `None`.
    pub fn stop_reason(&self) -> Option<CancelReason> {
        self.budget
            .reason()
            .filter(|reason| *reason != CancelReason::Finished)
    }

    /// Finish the run: cancel everything still pending and wait for the signal listener.
    ///
    /// Returns the early stop reason, if any, so the caller can report it as fatal.
    pub async fn shutdown(mut self) -> Option<CancelReason> {
        let reason = self.stop_reason();
        self.budget.finish();
        if let Some(task) = self.signal_task.take()
            && let Err(e) = task.await
            && !e.is_cancelled()
        {
            log::warn!("Signal listener task error: {}", e);
        }
        reason
    }
}

/// Future resolving on the first interrupt or terminate signal
fn shutdown_signal() -> impl Future<Output = ()> + Send + 'static {
    async {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut term) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = term.recv() => {}
                    }
                }
                Err(e) => {
                    log::debug!("SIGTERM handler unavailable: {}", e);
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}
