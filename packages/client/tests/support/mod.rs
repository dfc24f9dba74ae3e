//! Shared test doubles: a scriptable transport engine and a recording
//! observer.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use waitwire::{
    ClientConfig, EngineError, EngineState, EventAdapter, HttpObserver, HttpSyncClient, Transport,
    Verdict,
};

type Script = Box<dyn FnOnce(&EventAdapter) + Send>;

/// Transport double. `start` succeeds synchronously and (by default) fires
/// the handshake callback; `send` records the transmitted bytes and runs
/// the next queued script against the client's event adapter, standing in
/// for the engine's worker threads delivering response events.
pub struct MockTransport {
    state: Mutex<EngineState>,
    connected: AtomicBool,
    sent: Mutex<Vec<Vec<u8>>>,
    remote: Mutex<Option<(String, u16)>>,
    pub start_calls: AtomicUsize,
    pub stop_calls: AtomicUsize,
    handler: Mutex<Option<Arc<EventAdapter>>>,
    scripts: Mutex<VecDeque<Script>>,
    pub auto_handshake: AtomicBool,
    pub fail_send: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(EngineState::Stopped),
            connected: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
            remote: Mutex::new(None),
            start_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
            handler: Mutex::new(None),
            scripts: Mutex::new(VecDeque::new()),
            auto_handshake: AtomicBool::new(true),
            fail_send: AtomicBool::new(false),
        })
    }

    pub fn set_handler(&self, handler: Arc<EventAdapter>) {
        *self.handler.lock().unwrap() = Some(handler);
    }

    /// Put the mock directly into a connected state, bypassing `start`.
    pub fn connect_to(&self, host: &str, port: u16) {
        *self.state.lock().unwrap() = EngineState::Started;
        *self.remote.lock().unwrap() = Some((host.to_string(), port));
        self.connected.store(true, Ordering::SeqCst);
    }

    /// Queue events to fire (on the sending thread) for the next `send`.
    pub fn push_script<F>(&self, script: F)
    where
        F: FnOnce(&EventAdapter) + Send + 'static,
    {
        self.scripts.lock().unwrap().push_back(Box::new(script));
    }

    pub fn sent_packets(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_text(&self, index: usize) -> String {
        String::from_utf8(self.sent.lock().unwrap()[index].clone())
            .expect("sent packet should be utf-8")
    }

    pub fn current_remote(&self) -> Option<(String, u16)> {
        self.remote.lock().unwrap().clone()
    }

    fn adapter(&self) -> Option<Arc<EventAdapter>> {
        self.handler.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    fn start(&self, host: &str, port: u16, _bind_addr: Option<&str>) -> Result<(), EngineError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        self.connect_to(host, port);
        if self.auto_handshake.load(Ordering::SeqCst) {
            if let Some(adapter) = self.adapter() {
                adapter.on_handshake();
            }
        }
        Ok(())
    }

    fn stop(&self) {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        *self.state.lock().unwrap() = EngineState::Stopped;
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn state(&self) -> EngineState {
        *self.state.lock().unwrap()
    }

    fn send(&self, buffers: &[&[u8]]) -> Result<(), EngineError> {
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(EngineError::new("send", -1));
        }
        let packet: Vec<u8> = buffers.concat();
        self.sent.lock().unwrap().push(packet);

        let script = self.scripts.lock().unwrap().pop_front();
        if let (Some(script), Some(adapter)) = (script, self.adapter()) {
            script(&adapter);
        }
        Ok(())
    }

    fn remote_host(&self) -> Option<(String, u16)> {
        self.remote.lock().unwrap().clone()
    }
}

/// Observer double: records every event name in order and returns `Abort`
/// for event names registered via [`RecordingObserver::abort_on`].
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<String>>,
    aborts: Mutex<Vec<&'static str>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn abort_on(&self, event: &'static str) {
        self.aborts.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn verdict(&self, event: &'static str) -> Verdict {
        self.events.lock().unwrap().push(event.to_string());
        if self.aborts.lock().unwrap().contains(&event) {
            Verdict::Abort
        } else {
            Verdict::Ok
        }
    }
}

impl HttpObserver for RecordingObserver {
    fn on_handshake(&self) -> Verdict {
        self.verdict("handshake")
    }
    fn on_close(&self, _reason: waitwire::CloseReason, _code: i32) -> Verdict {
        self.verdict("close")
    }
    fn on_message_begin(&self) -> Verdict {
        self.verdict("message_begin")
    }
    fn on_status_line(&self, _status: u16, _reason: &str) -> Verdict {
        self.verdict("status_line")
    }
    fn on_header(&self, _name: &str, _value: &str) -> Verdict {
        self.verdict("header")
    }
    fn on_headers_complete(&self) -> Verdict {
        self.verdict("headers_complete")
    }
    fn on_chunk_header(&self, _len: usize) -> Verdict {
        self.verdict("chunk_header")
    }
    fn on_body(&self, _data: &[u8]) -> Verdict {
        self.verdict("body")
    }
    fn on_chunk_complete(&self) -> Verdict {
        self.verdict("chunk_complete")
    }
    fn on_message_complete(&self) -> Verdict {
        self.verdict("message_complete")
    }
    fn on_upgrade(&self, _kind: waitwire::UpgradeKind) -> Verdict {
        self.verdict("upgrade")
    }
    fn on_parse_error(&self, _code: i32, _desc: &str) -> Verdict {
        self.verdict("parse_error")
    }
    fn on_ws_message_header(
        &self,
        _fin: bool,
        _reserved: u8,
        _opcode: u8,
        _mask: [u8; 4],
        _body_len: u64,
    ) -> Verdict {
        self.verdict("ws_message_header")
    }
    fn on_ws_message_body(&self, _data: &[u8]) -> Verdict {
        self.verdict("ws_message_body")
    }
    fn on_ws_message_complete(&self) -> Verdict {
        self.verdict("ws_message_complete")
    }
}

/// Façade over a mock that is already connected to `example.com:80`.
pub fn connected_client(config: ClientConfig) -> (Arc<HttpSyncClient>, Arc<MockTransport>) {
    let mock = MockTransport::new();
    let engine: Arc<dyn Transport> = mock.clone();
    let client = Arc::new(HttpSyncClient::new(engine, config).expect("config should validate"));
    mock.set_handler(client.handler());
    mock.connect_to("example.com", 80);
    (client, mock)
}

/// Façade over a mock that starts disconnected, for `open_url` flows.
pub fn idle_client(config: ClientConfig) -> (Arc<HttpSyncClient>, Arc<MockTransport>) {
    let mock = MockTransport::new();
    let engine: Arc<dyn Transport> = mock.clone();
    let client = Arc::new(HttpSyncClient::new(engine, config).expect("config should validate"));
    mock.set_handler(client.handler());
    (client, mock)
}

/// Script helper: a minimal 200 response with the given body.
pub fn respond_ok(adapter: &EventAdapter, body: &[u8]) {
    adapter.on_message_begin();
    adapter.on_status_line(200, "OK");
    adapter.on_header("Content-Length", &body.len().to_string());
    adapter.on_headers_complete();
    if !body.is_empty() {
        adapter.on_body(body);
    }
    adapter.on_message_complete();
}
