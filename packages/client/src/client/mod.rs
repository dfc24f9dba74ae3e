//! The synchronous façade
//!
//! Public blocking surface over the asynchronous engine: connection
//! lifecycle (`start`, `stop`, `open_url`) and request dispatch
//! (`send_request`, `send_file_backed_request`, `send_chunk`,
//! `send_websocket_message`). Every dispatch follows the same shape:
//! reset the completion gate, build wire bytes through the codec, hand
//! them to the transport, then block until a terminal event or timeout.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::Method;
use url::Url;

use crate::codec::{self, WsOpcode};
use crate::config::ClientConfig;
use crate::engine::{EngineState, Transport};
use crate::error::{Error, Result};
use crate::events::{EventAdapter, HttpObserver};
use crate::gate::RequestProgress;
use crate::response::ResponseSnapshot;

/// Interval between connection-state polls while waiting out an
/// in-progress start or stop driven by another thread.
const STATE_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Body argument for [`HttpSyncClient::open_url`].
#[derive(Debug, Clone, Copy)]
pub enum RequestBody<'a> {
    None,
    Bytes(&'a [u8]),
    /// Send the contents of a local file as the entity body.
    File(&'a Path),
}

/// Blocking HTTP/WebSocket client over an asynchronous transport engine.
///
/// Exactly one request may be outstanding at a time per instance; a
/// concurrent dispatch attempt fails with [`Error::Busy`]. The instance is
/// long-lived across many sequential requests.
pub struct HttpSyncClient {
    config: ClientConfig,
    engine: Arc<dyn Transport>,
    adapter: Arc<EventAdapter>,
    in_flight: AtomicBool,
}

impl HttpSyncClient {
    /// Create a façade over `engine` with no external observer.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when the configuration fails validation.
    pub fn new(engine: Arc<dyn Transport>, config: ClientConfig) -> Result<Self> {
        Self::build(engine, config, None)
    }

    /// Create a façade bound to an external observer.
    ///
    /// The observer is held weakly; the façade never extends its lifetime.
    pub fn with_observer(
        engine: Arc<dyn Transport>,
        config: ClientConfig,
        observer: Weak<dyn HttpObserver>,
    ) -> Result<Self> {
        Self::build(engine, config, Some(observer))
    }

    fn build(
        engine: Arc<dyn Transport>,
        config: ClientConfig,
        observer: Option<Weak<dyn HttpObserver>>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            engine,
            adapter: Arc::new(EventAdapter::new(observer)),
            in_flight: AtomicBool::new(false),
        })
    }

    /// The callback sink a transport engine must deliver events to.
    pub fn handler(&self) -> Arc<EventAdapter> {
        Arc::clone(&self.adapter)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Replace the external observer for subsequent events.
    pub fn set_observer(&self, observer: Weak<dyn HttpObserver>) {
        self.adapter.set_observer(observer);
    }

    /// Snapshot of the most recently completed response.
    pub fn response(&self) -> Option<ResponseSnapshot> {
        self.adapter.snapshot()
    }

    /// Body bytes of the most recently completed response.
    pub fn response_body(&self) -> Option<Bytes> {
        self.adapter.snapshot().map(|s| s.body().clone())
    }

    // ---- connection lifecycle -------------------------------------------

    /// Establish a connection and block until the handshake completes.
    ///
    /// # Errors
    ///
    /// `Error::ConnectTimeout` when the engine does not hand back a
    /// handshake within the connect timeout (the connection is stopped
    /// before returning); `Error::ConnectRefused` when it reports closure
    /// first; `Error::Engine` when the start call itself is rejected.
    pub fn start(&self, host: &str, port: u16, bind_addr: Option<&str>) -> Result<()> {
        let _guard = self.begin_dispatch()?;

        tracing::debug!(host, port, "starting connection");
        self.engine.start(host, port, bind_addr)?;

        let signaled = self
            .adapter
            .gate
            .await_completion(self.config.connect_timeout);

        match self.adapter.gate.progress() {
            RequestProgress::Done => Ok(()),
            RequestProgress::Waiting => {
                debug_assert!(!signaled);
                tracing::warn!(host, port, "connect timed out; stopping engine");
                self.engine.stop();
                Err(Error::ConnectTimeout)
            }
            _ => Err(Error::ConnectRefused),
        }
    }

    /// Tear the connection down. The only cancellation primitive: a pending
    /// dispatch observes the resulting close signal or its own timeout.
    pub fn stop(&self) {
        self.engine.stop();
    }

    // ---- request dispatch -----------------------------------------------

    /// Send one request and block until its response completes.
    pub fn send_request(
        &self,
        method: &Method,
        path: &str,
        headers: &[(&str, &str)],
        body: &[u8],
    ) -> Result<()> {
        if !self.engine.is_connected() {
            return Err(Error::NotConnected);
        }
        let _guard = self.begin_dispatch()?;

        let packet = self.encode_request(method, path, headers, body);
        tracing::debug!(method = %method, path, len = packet.len(), "dispatching request");
        self.engine.send(&[&packet])?;

        self.finish_request()
    }

    /// Send a request whose body is the contents of a local file.
    ///
    /// # Errors
    ///
    /// `Error::Io` when the file cannot be read; otherwise as
    /// [`HttpSyncClient::send_request`].
    pub fn send_file_backed_request(
        &self,
        file: &Path,
        method: &Method,
        path: &str,
        headers: &[(&str, &str)],
    ) -> Result<()> {
        let body = std::fs::read(file)?;
        self.send_request(method, path, headers, &body)
    }

    /// Send one chunked-transfer segment; empty `data` sends the terminal
    /// chunk. Blocks like every other dispatch.
    pub fn send_chunk(&self, data: &[u8], extensions: Option<&str>) -> Result<()> {
        if !self.engine.is_connected() {
            return Err(Error::NotConnected);
        }
        let _guard = self.begin_dispatch()?;

        let packet = codec::build_chunk(data, extensions);
        tracing::debug!(len = data.len(), terminal = data.is_empty(), "dispatching chunk");
        self.engine.send(&[&packet])?;

        self.finish_request()
    }

    /// Send one WebSocket frame and block until the reply completes.
    ///
    /// The payload is masked into a private copy; `data` is never mutated.
    pub fn send_websocket_message(
        &self,
        fin: bool,
        reserved: u8,
        opcode: WsOpcode,
        mask: [u8; 4],
        data: &[u8],
    ) -> Result<()> {
        if !self.engine.is_connected() {
            return Err(Error::NotConnected);
        }
        let _guard = self.begin_dispatch()?;

        let frame = codec::build_ws_frame(fin, reserved, opcode, Some(mask), data, None);
        tracing::debug!(?opcode, len = data.len(), "dispatching websocket frame");
        self.engine.send(&[&frame])?;

        self.finish_request()
    }

    // ---- url-driven convenience -----------------------------------------

    /// Dispatch a request against a URL, reusing or re-establishing the
    /// connection as needed.
    ///
    /// Requires `auto_start` in the configuration. An existing connection
    /// is reused when it already points at the same host (case-insensitive)
    /// and port; otherwise, or when `force_reconnect` is set, it is stopped
    /// and a fresh one established.
    pub fn open_url(
        &self,
        method: &Method,
        url: &str,
        headers: &[(&str, &str)],
        body: RequestBody<'_>,
        force_reconnect: bool,
    ) -> Result<()> {
        if !self.config.auto_start {
            return Err(Error::NotSupported);
        }

        let parsed = Url::parse(url)?;
        let secure = match parsed.scheme() {
            "http" | "ws" => false,
            "https" | "wss" => true,
            _ => return Err(Error::SchemeMismatch),
        };
        if secure != self.config.secure {
            return Err(Error::SchemeMismatch);
        }

        let host = parsed.host_str().ok_or(Error::BadUrl(url::ParseError::EmptyHost))?;
        let port = parsed.port().unwrap_or_else(|| self.config.default_port());
        let mut path = parsed.path().to_string();
        if let Some(query) = parsed.query() {
            path.push('?');
            path.push_str(query);
        }

        if self.engine.state().has_started() {
            let reconnect = force_reconnect || !self.can_reuse_connection(host, port);
            if reconnect {
                tracing::debug!(host, port, force_reconnect, "stopping connection before redial");
                self.engine.stop();
            }
        }

        if self.wait_for_stable_state()? == EngineState::Stopped {
            self.start(host, port, None)?;
            if self.engine.state() == EngineState::Stopped {
                return Err(Error::ConnectRefused);
            }
        }

        match body {
            RequestBody::File(file) => self.send_file_backed_request(file, method, &path, headers),
            RequestBody::Bytes(bytes) => self.send_request(method, &path, headers, bytes),
            RequestBody::None => self.send_request(method, &path, headers, &[]),
        }
    }

    fn can_reuse_connection(&self, host: &str, port: u16) -> bool {
        match self.engine.remote_host() {
            Some((current_host, current_port)) => {
                current_port == port && current_host.eq_ignore_ascii_case(host)
            }
            None => false,
        }
    }

    /// Sleep-and-recheck until the engine leaves its transitional phase.
    ///
    /// Bounded by the connect timeout so a wedged engine cannot park the
    /// caller forever; a zero connect timeout waits indefinitely.
    fn wait_for_stable_state(&self) -> Result<EngineState> {
        let deadline = (!self.config.connect_timeout.is_zero())
            .then(|| Instant::now() + self.config.connect_timeout);

        loop {
            let state = self.engine.state();
            if matches!(state, EngineState::Started | EngineState::Stopped) {
                return Ok(state);
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(Error::ConnectTimeout);
            }
            thread::sleep(STATE_POLL_INTERVAL);
        }
    }

    // ---- dispatch plumbing ----------------------------------------------

    /// Claim the single dispatch slot and reset per-dispatch state.
    fn begin_dispatch(&self) -> Result<DispatchGuard<'_>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::Busy);
        }
        self.adapter.reset_dispatch();
        Ok(DispatchGuard {
            slot: &self.in_flight,
        })
    }

    /// Block on the gate and translate the outcome.
    fn finish_request(&self) -> Result<()> {
        let signaled = self
            .adapter
            .gate
            .await_completion(self.config.request_timeout);

        match self.adapter.gate.progress() {
            RequestProgress::Done => Ok(()),
            RequestProgress::Waiting => {
                debug_assert!(!signaled);
                // Stop so a stale completion can never arrive after the
                // caller has moved on.
                tracing::warn!("request timed out; stopping engine");
                self.engine.stop();
                Err(Error::RequestTimeout)
            }
            RequestProgress::Closed => {
                let code = self.adapter.last_close().map_or(0, |(_, code)| code);
                Err(Error::ConnectionAborted { code })
            }
            RequestProgress::Error => Err(Error::InvalidData),
        }
    }

    fn encode_request(
        &self,
        method: &Method,
        path: &str,
        headers: &[(&str, &str)],
        body: &[u8],
    ) -> Bytes {
        let remote;
        let host = if *method == Method::CONNECT {
            None
        } else {
            remote = self.engine.remote_host();
            remote.as_ref().map(|(name, port)| {
                let port = (*port != self.config.default_port()).then_some(*port);
                (name.as_str(), port)
            })
        };

        let mut all_headers: Vec<(&str, &str)> = Vec::with_capacity(headers.len() + 1);
        all_headers.extend_from_slice(headers);
        if let Some(agent) = self.config.user_agent.as_deref() {
            let has_agent = headers
                .iter()
                .any(|(name, _)| name.eq_ignore_ascii_case("user-agent"));
            if !has_agent {
                all_headers.push(("User-Agent", agent));
            }
        }

        codec::build_request(
            method,
            path,
            self.config.http_version,
            &all_headers,
            body,
            host,
        )
    }
}

/// Releases the dispatch slot when the operation returns.
struct DispatchGuard<'a> {
    slot: &'a AtomicBool,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.slot.store(false, Ordering::Release);
    }
}
