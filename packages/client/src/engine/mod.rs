//! External collaborator contracts
//!
//! The façade sits on top of an asynchronous transport engine that performs
//! connection establishment, socket I/O and TLS handshakes on its own worker
//! threads. This module defines the trait seam the façade drives the engine
//! through, plus the small vocabulary types shared between the engine, the
//! parser callbacks and the façade's state machine.

use std::fmt;

/// Lifecycle state reported by the transport engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Starting,
    Started,
    Stopping,
    Stopped,
}

impl EngineState {
    /// Whether the engine is past the point of `stop()` having fully settled.
    #[inline]
    pub fn has_started(self) -> bool {
        self != EngineState::Stopped
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EngineState::Starting => "starting",
            EngineState::Started => "started",
            EngineState::Stopping => "stopping",
            EngineState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Error reported by the transport engine for a start or send operation.
#[derive(Debug, Clone, thiserror::Error)]
#[error("engine {op} failed with code {code}")]
pub struct EngineError {
    pub op: &'static str,
    pub code: i32,
}

impl EngineError {
    pub fn new(op: &'static str, code: i32) -> Self {
        Self { op, code }
    }
}

/// Verdict returned by an event consumer.
///
/// `Abort` tells the façade to skip its own reaction to the event; two event
/// kinds (close, parse error) signal regardless, see `crate::events`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Ok,
    Abort,
}

impl Verdict {
    #[inline]
    pub fn is_abort(self) -> bool {
        self == Verdict::Abort
    }
}

/// Which side of the socket a close originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Unknown,
    Connect,
    Send,
    Receive,
    Close,
}

/// Protocol upgrade negotiated by a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpgradeKind {
    #[default]
    None,
    WebSocket,
    HttpTunnel,
    Unknown,
}

/// Contract the asynchronous transport engine must satisfy.
///
/// The engine owns all sockets and worker threads; the façade only issues
/// control operations and hands it buffers to transmit. Callbacks flow back
/// through an `Arc<crate::events::EventAdapter>` the integrator wires up via
/// [`crate::HttpSyncClient::handler`].
pub trait Transport: Send + Sync {
    /// Begin establishing a connection. Completion is reported through the
    /// handshake or close callbacks, not by this call returning.
    fn start(&self, host: &str, port: u16, bind_addr: Option<&str>) -> Result<(), EngineError>;

    /// Tear the connection down. Idempotent.
    fn stop(&self);

    fn is_connected(&self) -> bool;

    fn state(&self) -> EngineState;

    /// Queue the given buffers for transmission as one logical unit.
    fn send(&self, buffers: &[&[u8]]) -> Result<(), EngineError>;

    /// Host name and port of the current (or last) remote endpoint.
    fn remote_host(&self) -> Option<(String, u16)>;
}
