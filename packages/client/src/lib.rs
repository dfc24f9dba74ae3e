//! # waitwire
//!
//! Synchronous request/response façade over an asynchronous, callback-driven
//! HTTP/WebSocket transport engine. The engine delivers connection, parsing
//! and upgrade events on arbitrary worker threads; this crate turns that
//! event stream into ordinary blocking calls with one well-defined outcome
//! per request.
//!
//! ## What it provides
//!
//! - **Blocking dispatch**: `send_request`, `send_chunk` and
//!   `send_websocket_message` park the caller until a terminal event or
//!   timeout
//! - **First-terminal-event-wins completion**: a late straggler callback
//!   can never overwrite the result of a request that already finished or
//!   timed out
//! - **Connection reuse**: `open_url` decides per URL whether the current
//!   connection can serve the request or must be re-established
//! - **Observer pass-through**: every engine event is forwarded to an
//!   optional external observer whose verdict gates the façade's own
//!   reaction
//! - **Owned response snapshots**: callers read an isolated copy of the
//!   completed response, safe against the next dispatch's reset
//!
//! The transport engine itself (sockets, TLS, parsing) is a collaborator
//! behind the [`Transport`] trait; wire one up by handing it the callback
//! sink from [`HttpSyncClient::handler`].

#![deny(unsafe_code)]
#![warn(clippy::all)]

pub mod client;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod gate;
pub mod response;

pub use client::{HttpSyncClient, RequestBody};
pub use codec::WsOpcode;
pub use config::{ClientConfig, ConfigError, HttpVersion};
pub use engine::{CloseReason, EngineError, EngineState, Transport, UpgradeKind, Verdict};
pub use error::{Error, Result};
pub use events::{EventAdapter, HttpObserver};
pub use gate::{CompletionGate, RequestProgress};
pub use response::{ResponseSnapshot, WsContext};
