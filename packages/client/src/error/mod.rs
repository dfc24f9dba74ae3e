//! Error taxonomy for the synchronous façade
//!
//! Every failure is surfaced synchronously as the result of the invoking
//! operation; nothing is swallowed or retried. Timeout variants imply the
//! façade already tore the connection down before reporting.

use crate::config::ConfigError;
use crate::engine::EngineError;

/// A `Result` alias where the `Err` case is [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by façade operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration, detected before any I/O.
    #[error("invalid configuration")]
    Config(#[from] ConfigError),

    /// Operation requires an established connection.
    #[error("connection is not established")]
    NotConnected,

    /// `open_url` called while automatic connection management is disabled.
    #[error("automatic connection management is disabled")]
    NotSupported,

    /// A dispatch is already in flight; exactly one is permitted at a time.
    #[error("a request is already in flight")]
    Busy,

    /// The engine never reached `Started` within the connect timeout.
    #[error("connect timed out")]
    ConnectTimeout,

    /// The engine reported closure or an error before the handshake finished.
    #[error("connection refused or dropped during connect")]
    ConnectRefused,

    /// No terminal event arrived within the request timeout.
    #[error("request timed out")]
    RequestTimeout,

    /// The connection closed before the response completed.
    #[error("connection aborted before the response completed (engine code {code})")]
    ConnectionAborted { code: i32 },

    /// Parse error, observer-forced abort, or an unsupported upgrade.
    #[error("malformed or unexpected response data")]
    InvalidData,

    /// The URL could not be parsed.
    #[error("malformed url")]
    BadUrl(#[from] url::ParseError),

    /// URL scheme inconsistent with this instance's fixed protocol.
    #[error("url scheme does not match this client's protocol")]
    SchemeMismatch,

    /// Local file for a file-backed request could not be read.
    #[error("file error")]
    Io(#[from] std::io::Error),

    /// The transport engine rejected a start or send operation.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl Error {
    /// Whether this error is one of the two timeout dispositions.
    #[inline]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::ConnectTimeout | Error::RequestTimeout)
    }

    /// Whether the caller can fix this by correcting usage rather than
    /// by retrying.
    #[inline]
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Error::Config(_) | Error::NotConnected | Error::NotSupported | Error::Busy
        )
    }
}
