//! Custom error types for sparkpost-relay.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Main error type for relay operations.
#[derive(Debug)]
pub enum Error {
    /// An attachment file could not be read
    AttachmentRead { path: PathBuf, source: io::Error },
    /// Network or HTTP-layer failure reported by the transport
    Transport(String),
    /// The provider answered but refused the message (or some recipients)
    ProviderRejection(Rejection),
    /// The provider response was not JSON or lacked the expected fields
    MalformedResponse(String),
    /// An address could not be used for SMTP relaying
    InvalidAddress(String),
    /// SMTP relay errors
    Smtp(String),
    /// Request body could not be serialized
    Serialize(String),
}

/// Details of a provider-side refusal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// HTTP status of the provider response
    pub status: u16,
    pub accepted: u64,
    pub rejected: u64,
    /// Provider error messages, or a generic description
    pub detail: String,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AttachmentRead { path, source } => {
                write!(f, "could not read attachment {}: {source}", path.display())
            }
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::ProviderRejection(r) => write!(f, "provider rejection: {r}"),
            Self::MalformedResponse(msg) => write!(f, "malformed provider response: {msg}"),
            Self::InvalidAddress(addr) => write!(f, "invalid email address: {addr}"),
            Self::Smtp(msg) => write!(f, "SMTP error: {msg}"),
            Self::Serialize(msg) => write!(f, "serialization error: {msg}"),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (status {}, {} accepted, {} rejected)",
            self.detail, self.status, self.accepted, self.rejected
        )
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::AttachmentRead { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<Rejection> for Error {
    fn from(r: Rejection) -> Self {
        Self::ProviderRejection(r)
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

impl From<lettre::transport::smtp::Error> for Error {
    fn from(e: lettre::transport::smtp::Error) -> Self {
        Self::Smtp(e.to_string())
    }
}

impl From<lettre::error::Error> for Error {
    fn from(e: lettre::error::Error) -> Self {
        Self::Smtp(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialize(e.to_string())
    }
}

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, Error>;
