//! One-shot completion synchronization
//!
//! A dispatch parks its caller thread here until a terminal event arrives
//! from an engine worker thread or the timeout elapses. The first terminal
//! transition wins; every later signal against the same dispatch is a no-op,
//! which is what keeps a straggling callback from overwriting the result of
//! a request that already completed or timed out.

use std::sync::Mutex;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};

/// Outcome of the current dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestProgress {
    #[default]
    Waiting,
    Done,
    Error,
    Closed,
}

impl RequestProgress {
    #[inline]
    pub fn is_terminal(self) -> bool {
        self != RequestProgress::Waiting
    }
}

struct GateInner {
    progress: RequestProgress,
    tx: Sender<()>,
    rx: Receiver<()>,
}

/// Waitable one-shot completion signal plus the authoritative
/// [`RequestProgress`] field.
///
/// `RequestProgress` is only ever written through [`CompletionGate::reset`]
/// and the signal methods; no other code path may touch it.
pub struct CompletionGate {
    inner: Mutex<GateInner>,
}

impl CompletionGate {
    pub fn new() -> Self {
        let (tx, rx) = bounded(1);
        Self {
            inner: Mutex::new(GateInner {
                progress: RequestProgress::Waiting,
                tx,
                rx,
            }),
        }
    }

    /// Clear the waitable signal and set progress back to `Waiting`.
    ///
    /// Must run before every new dispatch. Swapping the channel out discards
    /// any buffered wake from a previous dispatch.
    pub fn reset(&self) {
        let mut inner = self.lock();
        let (tx, rx) = bounded(1);
        inner.tx = tx;
        inner.rx = rx;
        inner.progress = RequestProgress::Waiting;
    }

    pub fn progress(&self) -> RequestProgress {
        self.lock().progress
    }

    /// Attempt the terminal transition to `outcome`.
    ///
    /// Callable from any thread. Returns `true` if this call won the
    /// transition; a dispatch that already reached a terminal state is left
    /// untouched and `false` is returned.
    pub fn signal(&self, outcome: RequestProgress) -> bool {
        self.signal_with(outcome, || {})
    }

    /// Like [`CompletionGate::signal`], additionally running `capture`
    /// if and only if the transition wins.
    ///
    /// `capture` runs before the waiter wakes, so anything it publishes
    /// (the response snapshot) is visible once `await_completion` returns.
    pub fn signal_with<F: FnOnce()>(&self, outcome: RequestProgress, capture: F) -> bool {
        debug_assert!(outcome.is_terminal());

        let mut inner = self.lock();
        if inner.progress.is_terminal() {
            return false;
        }
        inner.progress = outcome;
        capture();
        let _ = inner.tx.try_send(());
        true
    }

    /// Block until signaled or until `timeout` elapses.
    ///
    /// A zero `timeout` waits forever. Returns `true` when the wait ended
    /// because of a signal, `false` on timeout. Channel-based, so there are
    /// no spurious wakeups to loop around.
    pub fn await_completion(&self, timeout: Duration) -> bool {
        let rx = self.lock().rx.clone();

        if timeout.is_zero() {
            rx.recv().is_ok()
        } else {
            rx.recv_timeout(timeout).is_ok()
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GateInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for CompletionGate {
    fn default() -> Self {
        Self::new()
    }
}
