//! Deployment target types for the readiness gate.

use std::num::NonZeroU16;

use serde::{Deserialize, Serialize};

/// Host probed when the configuration does not name one.
pub const DEFAULT_HOST: &str = "192.168.1.101";

/// Port the device's web server listens on once it is back up.
pub const READINESS_PORT: u16 = 80;

/// Upload protocol configured for the primary deployment step.
///
/// Only `espota` (network OTA) reboots the device out from under the next
/// step; every other protocol is wired and needs no readiness gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UploadProtocol {
    Espota,
    Other(String),
}

impl UploadProtocol {
    /// Parse a protocol identifier, case-insensitively.
    pub fn parse(id: &str) -> Self {
        let id = id.trim();
        if id.eq_ignore_ascii_case("espota") {
            UploadProtocol::Espota
        } else {
            UploadProtocol::Other(id.to_ascii_lowercase())
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, UploadProtocol::Espota)
    }

    pub fn as_str(&self) -> &str {
        match self {
            UploadProtocol::Espota => "espota",
            UploadProtocol::Other(id) => id,
        }
    }
}

impl Default for UploadProtocol {
    fn default() -> Self {
        UploadProtocol::Other(String::new())
    }
}

impl From<String> for UploadProtocol {
    fn from(id: String) -> Self {
        UploadProtocol::parse(&id)
    }
}

impl From<UploadProtocol> for String {
    fn from(protocol: UploadProtocol) -> Self {
        protocol.as_str().to_string()
    }
}

impl std::fmt::Display for UploadProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadProtocol::Other(id) if id.is_empty() => write!(f, "<unset>"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// Where the readiness probe connects after an upload.
///
/// Immutable for the duration of one gate invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentTarget {
    pub protocol: UploadProtocol,
    pub host: String,
    pub port: NonZeroU16,
}

impl DeploymentTarget {
    /// Build a target, falling back to [`DEFAULT_HOST`] for a missing or blank host.
    pub fn new(protocol: UploadProtocol, host: Option<&str>, port: NonZeroU16) -> Self {
        let host = host
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .unwrap_or(DEFAULT_HOST)
            .to_string();
        Self {
            protocol,
            host,
            port,
        }
    }

    /// Target probing [`READINESS_PORT`].
    pub fn with_readiness_port(protocol: UploadProtocol, host: Option<&str>) -> Self {
        let port = NonZeroU16::new(READINESS_PORT).unwrap_or(NonZeroU16::MIN);
        Self::new(protocol, host, port)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Result of one readiness gate run that actually probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollOutcome {
    Ready,
    TimedOut,
}

impl std::fmt::Display for PollOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PollOutcome::Ready => write!(f, "ready"),
            PollOutcome::TimedOut => write!(f, "timed_out"),
        }
    }
}
