//! Definition of the single fire gate that wakes parked readers.

use std::sync::Arc;
use tokio::sync::Semaphore;

/// A broadcast gate that fires exactly once in its lifetime.
///
/// Built on a closed semaphore: the semaphore starts with zero permits and
/// none are ever added, so waiters can only resume when the semaphore is
/// closed. Closing wakes every waiter currently parked on this instance and
/// lets every later waiter fall through immediately, which is exactly the
/// behavior readers need: a wake is edge-triggered and carries no payload,
/// so woken readers always re-check the buffer rather than trust the wake.
#[derive(Debug)]
pub(crate) struct Gate(Arc<Semaphore>);

impl Gate {
    /// Create a fresh gate that has not fired yet.
    pub(crate) fn new() -> Self {
        Self(Arc::new(Semaphore::new(0)))
    }

    /// Get a handle that can wait for this gate to fire.
    ///
    /// Handles stay valid after the gate itself is consumed by [`Gate::fire`].
    #[inline]
    pub(crate) fn handle(&self) -> GateHandle {
        GateHandle(Arc::clone(&self.0))
    }

    /// Fire the gate, waking all current and future waiters.
    ///
    /// Consumes the gate, a fired gate can never be reused.
    pub(crate) fn fire(self) {
        self.0.close();
    }
}

/// A waiter-side handle to a [`Gate`].
#[derive(Debug)]
pub(crate) struct GateHandle(Arc<Semaphore>);

impl GateHandle {
    /// Resolve once the gate has fired.
    ///
    /// Resolves immediately if the gate fired before this call.
    pub(crate) async fn fired(&self) {
        // The semaphore has no permits and never will, so acquire can only
        // return once the semaphore is closed by fire().
        let _ = self.0.acquire().await;
    }
}
