//! Response state: the live working object and the caller-safe snapshot
//!
//! The live [`ResponseState`] is fed by parser callbacks and is reset the
//! moment the next dispatch begins. Callers never read it directly; a
//! terminal transition that needs a result copies it, together with the
//! accumulated body, into an owned [`ResponseSnapshot`].

use bytes::{Bytes, BytesMut};
use http::StatusCode;

use crate::engine::UpgradeKind;

/// WebSocket frame header context recorded from the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WsContext {
    pub fin: bool,
    pub reserved: u8,
    pub opcode: u8,
    pub mask: [u8; 4],
    pub body_len: u64,
}

/// Mutable working response, owned by the parsing pipeline's event sink.
#[derive(Debug, Default)]
pub(crate) struct ResponseState {
    pub status: Option<StatusCode>,
    pub reason: Option<String>,
    pub headers: Vec<(String, String)>,
    pub upgrade: UpgradeKind,
    pub ws: Option<WsContext>,
}

impl ResponseState {
    pub fn reset(&mut self) {
        self.status = None;
        self.reason = None;
        self.headers.clear();
        self.upgrade = UpgradeKind::None;
        self.ws = None;
    }
}

/// Isolated, immutable copy of a completed response.
///
/// Taken at the terminal transition of a dispatch and overwritten wholesale
/// by the next dispatch that completes with a result. Owning the copy is
/// what lets a caller drain the previous response while a new dispatch
/// resets the live state underneath.
#[derive(Debug, Clone)]
pub struct ResponseSnapshot {
    status: Option<StatusCode>,
    reason: Option<String>,
    headers: Vec<(String, String)>,
    upgrade: UpgradeKind,
    ws: Option<WsContext>,
    body: Bytes,
}

impl ResponseSnapshot {
    pub(crate) fn capture(state: &ResponseState, body: &BytesMut) -> Self {
        Self {
            status: state.status,
            reason: state.reason.clone(),
            headers: state.headers.clone(),
            upgrade: state.upgrade,
            ws: state.ws,
            body: Bytes::copy_from_slice(body),
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First header value matching `name`, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn upgrade(&self) -> UpgradeKind {
        self.upgrade
    }

    /// WebSocket frame context, when the completed message was a frame.
    pub fn ws_context(&self) -> Option<&WsContext> {
        self.ws.as_ref()
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }
}
