//! Socket layer configuration
//!
//! The socket mode is a build/configuration-time choice, not a per-call one.
//! Everything the socket layer needs besides its collaborators lives in
//! [`NetConfig`], which can be built fluently or loaded from JSON.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Default trusted root CA file on the device file system
pub const DEFAULT_ROOT_CA_FILE: &str = "/cert/rootCA.pem";

/// Default internal wait slice for one select call
pub const DEFAULT_POLL_SLICE: Duration = Duration::from_secs(1);

/// Plain or TLS sockets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocketMode {
    /// Plain TCP
    #[default]
    Plain,
    /// TLS handled by the on-device secure socket engine
    Secure,
}

impl SocketMode {
    /// Whether TLS options are applied
    pub fn is_secure(&self) -> bool {
        matches!(self, Self::Secure)
    }

    /// Lowercase name, also used as metrics label value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Secure => "secure",
        }
    }
}

impl fmt::Display for SocketMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SocketMode {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "plain" => Ok(Self::Plain),
            "secure" => Ok(Self::Secure),
            _ => Err(Error::Config(format!(
                "invalid socket mode '{}': expected plain or secure",
                s
            ))),
        }
    }
}

/// TLS protocol version requested from the secure socket engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TlsVersion {
    /// TLS 1.0
    #[serde(rename = "tls1.0")]
    Tls1_0,
    /// TLS 1.1
    #[serde(rename = "tls1.1")]
    Tls1_1,
    /// TLS 1.2
    #[default]
    #[serde(rename = "tls1.2")]
    Tls1_2,
}

impl fmt::Display for TlsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tls1_0 => write!(f, "tls1.0"),
            Self::Tls1_1 => write!(f, "tls1.1"),
            Self::Tls1_2 => write!(f, "tls1.2"),
        }
    }
}

impl FromStr for TlsVersion {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "tls1.0" => Ok(Self::Tls1_0),
            "tls1.1" => Ok(Self::Tls1_1),
            "tls1.2" => Ok(Self::Tls1_2),
            _ => Err(Error::Config(format!(
                "invalid TLS version '{}': expected tls1.0, tls1.1, or tls1.2",
                s
            ))),
        }
    }
}

/// How a caller's poll timeout combines with the internal wait slice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// One select call waiting `min(timeout, slice)`
    #[default]
    SingleSlice,
    /// Repeated select calls of at most one slice each until an event fires or
    /// the caller's timeout is used up
    UntilDeadline,
}

impl fmt::Display for TimeoutPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SingleSlice => write!(f, "single_slice"),
            Self::UntilDeadline => write!(f, "until_deadline"),
        }
    }
}

impl FromStr for TimeoutPolicy {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "single_slice" => Ok(Self::SingleSlice),
            "until_deadline" => Ok(Self::UntilDeadline),
            _ => Err(Error::Config(format!(
                "invalid timeout policy '{}': expected single_slice or until_deadline",
                s
            ))),
        }
    }
}

/// Socket layer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// Plain or secure sockets
    pub mode: SocketMode,
    /// Trusted root CA file used by secure sockets
    pub root_ca_file: String,
    /// TLS protocol version for secure sockets
    pub tls_version: TlsVersion,
    /// Bypass the on-board certificate catalog (development only)
    pub danger_disable_certificate_store: bool,
    /// Internal wait slice for one select call
    #[serde(rename = "poll_slice_ms", with = "duration_ms")]
    pub poll_slice: Duration,
    /// Caller timeout handling in poll
    pub timeout_policy: TimeoutPolicy,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            mode: SocketMode::default(),
            root_ca_file: DEFAULT_ROOT_CA_FILE.to_string(),
            tls_version: TlsVersion::default(),
            danger_disable_certificate_store: false,
            poll_slice: DEFAULT_POLL_SLICE,
            timeout_policy: TimeoutPolicy::default(),
        }
    }
}

impl NetConfig {
    /// Create a builder
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let config = NetConfig::builder()
    ///     .mode(SocketMode::Secure)
    ///     .root_ca_file("/cert/roots.pem")
    ///     .build()?;
    /// ```
    pub fn builder() -> NetConfigBuilder {
        NetConfigBuilder::default()
    }

    /// Secure configuration with the given trusted root file
    pub fn secure(root_ca_file: impl Into<String>) -> Self {
        Self {
            mode: SocketMode::Secure,
            root_ca_file: root_ca_file.into(),
            ..Self::default()
        }
    }

    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self> {
        let config: NetConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&data)
    }

    /// Check the configuration for values the socket layer cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.mode.is_secure() && self.root_ca_file.trim().is_empty() {
            return Err(Error::Config(
                "secure mode requires a root CA file".into(),
            ));
        }
        if self.poll_slice.is_zero() {
            return Err(Error::Config("poll slice must be non-zero".into()));
        }
        Ok(())
    }
}

/// Builder for [`NetConfig`]
#[derive(Debug, Clone, Default)]
pub struct NetConfigBuilder {
    config: NetConfig,
}

impl NetConfigBuilder {
    /// Set the socket mode
    pub fn mode(mut self, mode: SocketMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Set the trusted root CA file
    pub fn root_ca_file(mut self, path: impl Into<String>) -> Self {
        self.config.root_ca_file = path.into();
        self
    }

    /// Set the TLS protocol version
    ///
    /// Default: TLS 1.2
    pub fn tls_version(mut self, version: TlsVersion) -> Self {
        self.config.tls_version = version;
        self
    }

    /// ⚠️ **DANGER**: Bypass the on-board certificate catalog (development only).
    ///
    /// Also disables the catalog's revocation list. Never enable in production.
    pub fn danger_disable_certificate_store(mut self, disable: bool) -> Self {
        self.config.danger_disable_certificate_store = disable;
        self
    }

    /// Set the internal wait slice
    ///
    /// Default: 1 second
    pub fn poll_slice(mut self, slice: Duration) -> Self {
        self.config.poll_slice = slice;
        self
    }

    /// Set how poll treats the caller's timeout
    pub fn timeout_policy(mut self, policy: TimeoutPolicy) -> Self {
        self.config.timeout_policy = policy;
        self
    }

    /// Validate and build the configuration
    pub fn build(self) -> Result<NetConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
