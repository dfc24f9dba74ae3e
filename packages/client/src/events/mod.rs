//! Event listener adapter
//!
//! The transport engine and response parser deliver every callback to one
//! [`EventAdapter`]. For each event the adapter first forwards it to the
//! optional external observer and captures its verdict, then applies the
//! façade's own fixed transition table gated on that verdict. Two events are
//! not gated: a close always signals `Closed` (the connection is gone no
//! matter what the observer thinks) and a parse error always signals
//! `Error`.

use std::sync::{Mutex, MutexGuard, Weak};

use bytes::BytesMut;
use http::StatusCode;

use crate::engine::{CloseReason, UpgradeKind, Verdict};
use crate::gate::{CompletionGate, RequestProgress};
use crate::response::{ResponseSnapshot, ResponseState, WsContext};

/// Full transport + parser callback surface.
///
/// Every method defaults to a no-op returning [`Verdict::Ok`]; an external
/// observer overrides only what it cares about. Returning [`Verdict::Abort`]
/// asks the façade to skip its own reaction to that event (close and parse
/// error excepted, see the module docs).
#[allow(unused_variables)]
pub trait HttpObserver: Send + Sync {
    fn on_prepare_connect(&self) -> Verdict {
        Verdict::Ok
    }
    fn on_connect(&self) -> Verdict {
        Verdict::Ok
    }
    fn on_handshake(&self) -> Verdict {
        Verdict::Ok
    }
    fn on_send(&self, data: &[u8]) -> Verdict {
        Verdict::Ok
    }
    fn on_receive(&self, data: &[u8]) -> Verdict {
        Verdict::Ok
    }
    fn on_close(&self, reason: CloseReason, code: i32) -> Verdict {
        Verdict::Ok
    }
    fn on_message_begin(&self) -> Verdict {
        Verdict::Ok
    }
    fn on_status_line(&self, status: u16, reason: &str) -> Verdict {
        Verdict::Ok
    }
    fn on_header(&self, name: &str, value: &str) -> Verdict {
        Verdict::Ok
    }
    fn on_headers_complete(&self) -> Verdict {
        Verdict::Ok
    }
    fn on_chunk_header(&self, len: usize) -> Verdict {
        Verdict::Ok
    }
    fn on_body(&self, data: &[u8]) -> Verdict {
        Verdict::Ok
    }
    fn on_chunk_complete(&self) -> Verdict {
        Verdict::Ok
    }
    fn on_message_complete(&self) -> Verdict {
        Verdict::Ok
    }
    fn on_upgrade(&self, kind: UpgradeKind) -> Verdict {
        Verdict::Ok
    }
    fn on_parse_error(&self, code: i32, desc: &str) -> Verdict {
        Verdict::Ok
    }
    fn on_ws_message_header(
        &self,
        fin: bool,
        reserved: u8,
        opcode: u8,
        mask: [u8; 4],
        body_len: u64,
    ) -> Verdict {
        Verdict::Ok
    }
    fn on_ws_message_body(&self, data: &[u8]) -> Verdict {
        Verdict::Ok
    }
    fn on_ws_message_complete(&self) -> Verdict {
        Verdict::Ok
    }
}

/// Multiplexes engine callbacks into façade state transitions while
/// forwarding every event to the external observer.
///
/// One adapter per façade instance; the engine integrator hands an
/// `Arc<EventAdapter>` to the transport as its callback sink.
pub struct EventAdapter {
    pub(crate) gate: CompletionGate,
    body: Mutex<BytesMut>,
    live: Mutex<ResponseState>,
    snapshot: Mutex<Option<ResponseSnapshot>>,
    observer: Mutex<Option<Weak<dyn HttpObserver>>>,
    last_close: Mutex<Option<(CloseReason, i32)>>,
}

impl EventAdapter {
    pub(crate) fn new(observer: Option<Weak<dyn HttpObserver>>) -> Self {
        Self {
            gate: CompletionGate::new(),
            body: Mutex::new(BytesMut::new()),
            live: Mutex::new(ResponseState::default()),
            snapshot: Mutex::new(None),
            observer: Mutex::new(observer),
            last_close: Mutex::new(None),
        }
    }

    /// Replace the external observer. The adapter holds only a weak
    /// reference; a dropped observer silently degrades to no forwarding.
    pub fn set_observer(&self, observer: Weak<dyn HttpObserver>) {
        *lock(&self.observer) = Some(observer);
    }

    /// Current progress of the in-flight dispatch.
    pub fn progress(&self) -> RequestProgress {
        self.gate.progress()
    }

    /// Snapshot of the most recently completed response, if any.
    pub fn snapshot(&self) -> Option<ResponseSnapshot> {
        lock(&self.snapshot).clone()
    }

    /// Reset per-dispatch state. The previous snapshot is left in place
    /// until a terminal transition of the new dispatch overwrites it.
    pub(crate) fn reset_dispatch(&self) {
        self.gate.reset();
        lock(&self.body).clear();
        lock(&self.live).reset();
        *lock(&self.last_close) = None;
    }

    pub(crate) fn last_close(&self) -> Option<(CloseReason, i32)> {
        *lock(&self.last_close)
    }

    fn forward<F>(&self, f: F) -> Verdict
    where
        F: FnOnce(&dyn HttpObserver) -> Verdict,
    {
        let observer = lock(&self.observer).as_ref().and_then(Weak::upgrade);
        match observer {
            Some(observer) => f(observer.as_ref()),
            None => Verdict::Ok,
        }
    }

    /// Attempt the terminal transition, copying the live response and body
    /// into the snapshot when the transition wins and asks for one.
    fn complete(&self, outcome: RequestProgress, with_snapshot: bool) {
        let won = if with_snapshot {
            self.gate.signal_with(outcome, || {
                let live = lock(&self.live);
                let body = lock(&self.body);
                *lock(&self.snapshot) = Some(ResponseSnapshot::capture(&live, &body));
            })
        } else {
            self.gate.signal(outcome)
        };

        if won {
            tracing::debug!(?outcome, snapshot = with_snapshot, "dispatch reached terminal state");
        }
    }
}

impl HttpObserver for EventAdapter {
    fn on_prepare_connect(&self) -> Verdict {
        self.forward(|o| o.on_prepare_connect())
    }

    fn on_connect(&self) -> Verdict {
        self.forward(|o| o.on_connect())
    }

    fn on_handshake(&self) -> Verdict {
        let verdict = self.forward(|o| o.on_handshake());
        if !verdict.is_abort() {
            // Handshake alone carries no body; no snapshot to take.
            self.complete(RequestProgress::Done, false);
        }
        verdict
    }

    fn on_send(&self, data: &[u8]) -> Verdict {
        self.forward(|o| o.on_send(data))
    }

    fn on_receive(&self, data: &[u8]) -> Verdict {
        self.forward(|o| o.on_receive(data))
    }

    fn on_close(&self, reason: CloseReason, code: i32) -> Verdict {
        let verdict = self.forward(|o| o.on_close(reason, code));
        *lock(&self.last_close) = Some((reason, code));
        // The connection is gone regardless of the observer's verdict; the
        // pending dispatch must not hang until its timeout.
        self.complete(RequestProgress::Closed, false);
        verdict
    }

    fn on_message_begin(&self) -> Verdict {
        self.forward(|o| o.on_message_begin())
    }

    fn on_status_line(&self, status: u16, reason: &str) -> Verdict {
        let verdict = self.forward(|o| o.on_status_line(status, reason));
        let mut live = lock(&self.live);
        live.status = StatusCode::from_u16(status).ok();
        live.reason = Some(reason.to_string());
        verdict
    }

    fn on_header(&self, name: &str, value: &str) -> Verdict {
        let verdict = self.forward(|o| o.on_header(name, value));
        lock(&self.live)
            .headers
            .push((name.to_string(), value.to_string()));
        verdict
    }

    fn on_headers_complete(&self) -> Verdict {
        self.forward(|o| o.on_headers_complete())
    }

    fn on_chunk_header(&self, len: usize) -> Verdict {
        self.forward(|o| o.on_chunk_header(len))
    }

    fn on_body(&self, data: &[u8]) -> Verdict {
        let verdict = self.forward(|o| o.on_body(data));
        if !verdict.is_abort() {
            lock(&self.body).extend_from_slice(data);
        }
        verdict
    }

    fn on_chunk_complete(&self) -> Verdict {
        self.forward(|o| o.on_chunk_complete())
    }

    fn on_message_complete(&self) -> Verdict {
        let verdict = self.forward(|o| o.on_message_complete());
        if !verdict.is_abort() {
            let upgrading = lock(&self.live).upgrade != UpgradeKind::None;
            // An upgrade response completes through on_upgrade instead.
            if !upgrading {
                self.complete(RequestProgress::Done, true);
            }
        }
        verdict
    }

    fn on_upgrade(&self, kind: UpgradeKind) -> Verdict {
        let mut verdict = self.forward(|o| o.on_upgrade(kind));
        lock(&self.live).upgrade = kind;
        if !verdict.is_abort() {
            if kind == UpgradeKind::WebSocket {
                self.complete(RequestProgress::Done, true);
                verdict = Verdict::Ok;
            } else {
                // Only WebSocket upgrades are understood here.
                tracing::warn!(?kind, "unsupported protocol upgrade");
                self.complete(RequestProgress::Error, true);
                verdict = Verdict::Abort;
            }
        }
        verdict
    }

    fn on_parse_error(&self, code: i32, desc: &str) -> Verdict {
        let verdict = self.forward(|o| o.on_parse_error(code, desc));
        tracing::warn!(code, desc, "response parse error");
        self.complete(RequestProgress::Error, false);
        verdict
    }

    fn on_ws_message_header(
        &self,
        fin: bool,
        reserved: u8,
        opcode: u8,
        mask: [u8; 4],
        body_len: u64,
    ) -> Verdict {
        let verdict = self.forward(|o| o.on_ws_message_header(fin, reserved, opcode, mask, body_len));
        lock(&self.live).ws = Some(WsContext {
            fin,
            reserved,
            opcode,
            mask,
            body_len,
        });
        verdict
    }

    fn on_ws_message_body(&self, data: &[u8]) -> Verdict {
        let verdict = self.forward(|o| o.on_ws_message_body(data));
        if !verdict.is_abort() {
            lock(&self.body).extend_from_slice(data);
        }
        verdict
    }

    fn on_ws_message_complete(&self) -> Verdict {
        let verdict = self.forward(|o| o.on_ws_message_complete());
        if !verdict.is_abort() {
            self.complete(RequestProgress::Done, true);
        }
        verdict
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
