use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;

/// Lazily established "server reachable" state.
///
/// The flag only moves to true through a successful handshake. Concurrent callers that
/// find it false queue on the gate, so at most one handshake runs at a time and callers
/// that waited behind a successful one do not repeat it.
#[derive(Debug, Default)]
pub struct AvailabilityGuard {
    available: AtomicBool,
    gate: Mutex<()>,
}

impl AvailabilityGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    /// Returns true when available, running `handshake` at most once for this call.
    pub async fn ensure<F, Fut>(&self, handshake: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = bool>,
    {
        if self.is_available() {
            return true;
        }

        let _gate = self.gate.lock().await;
        if self.is_available() {
            return true;
        }

        let ok = handshake().await;
        self.available.store(ok, Ordering::Release);
        ok
    }
}
