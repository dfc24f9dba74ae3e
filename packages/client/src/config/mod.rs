//! Client configuration and validation

use std::time::Duration;

/// Configuration validation result type
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Unsupported HTTP version: {0}.{1}")]
    InvalidVersion(u8, u8),

    #[error("Invalid timeout value: {0}")]
    InvalidTimeout(String),

    #[error("Invalid configuration parameter: {0}")]
    InvalidParameter(String),
}

/// HTTP protocol version spoken by the client.
///
/// Only 1.0 and 1.1 exist; [`HttpVersion::from_parts`] is the validation
/// gate for version numbers arriving from external configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpVersion {
    Http10,
    #[default]
    Http11,
}

impl HttpVersion {
    /// Map a `major.minor` pair onto a supported version.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidVersion` for anything other than
    /// 1.0 or 1.1.
    pub fn from_parts(major: u8, minor: u8) -> ConfigResult<Self> {
        match (major, minor) {
            (1, 0) => Ok(HttpVersion::Http10),
            (1, 1) => Ok(HttpVersion::Http11),
            _ => Err(ConfigError::InvalidVersion(major, minor)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HttpVersion::Http10 => "HTTP/1.0",
            HttpVersion::Http11 => "HTTP/1.1",
        }
    }
}

/// Common configuration defaults
pub struct ConfigDefaults;

impl ConfigDefaults {
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    pub const USER_AGENT: &'static str = concat!("waitwire/", env!("CARGO_PKG_VERSION"));
    pub const HTTP_DEFAULT_PORT: u16 = 80;
    pub const HTTPS_DEFAULT_PORT: u16 = 443;
    /// Upper bound accepted for a non-infinite timeout.
    pub const MAX_TIMEOUT: Duration = Duration::from_secs(3600);
}

/// Configuration for one façade instance.
///
/// A `Duration::ZERO` timeout means wait forever.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Fixed protocol of this instance; decides the default port (80/443)
    /// and which URL schemes `open_url` accepts.
    pub secure: bool,
    pub http_version: HttpVersion,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Allow `open_url` to establish and re-establish connections implicitly.
    pub auto_start: bool,
    pub user_agent: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            secure: false,
            http_version: HttpVersion::default(),
            connect_timeout: ConfigDefaults::CONNECT_TIMEOUT,
            request_timeout: ConfigDefaults::REQUEST_TIMEOUT,
            auto_start: true,
            user_agent: Some(ConfigDefaults::USER_AGENT.to_string()),
        }
    }
}

impl ClientConfig {
    /// Default remote port implied by this instance's fixed protocol.
    #[inline]
    pub fn default_port(&self) -> u16 {
        if self.secure {
            ConfigDefaults::HTTPS_DEFAULT_PORT
        } else {
            ConfigDefaults::HTTP_DEFAULT_PORT
        }
    }

    /// Validates the configuration settings
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` variant if any validation fails:
    /// - `InvalidTimeout` - if a finite timeout exceeds the supported maximum
    /// - `InvalidParameter` - if the user agent is present but empty
    pub fn validate(&self) -> ConfigResult<()> {
        Self::validate_timeout(self.connect_timeout, "connect_timeout")?;
        Self::validate_timeout(self.request_timeout, "request_timeout")?;

        if let Some(ua) = &self.user_agent {
            if ua.trim().is_empty() {
                return Err(ConfigError::InvalidParameter(
                    "user_agent cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    fn validate_timeout(timeout: Duration, name: &str) -> ConfigResult<()> {
        // Zero is the infinite-wait sentinel, not an error.
        if !timeout.is_zero() && timeout > ConfigDefaults::MAX_TIMEOUT {
            return Err(ConfigError::InvalidTimeout(format!(
                "{name} cannot exceed 1 hour"
            )));
        }

        Ok(())
    }
}
