//! Error types for avatar generation.

use std::error::Error as StdError;
use std::fmt;
use std::io;

use thiserror::Error;

/// Why a request never produced an HTTP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Dns,
    ConnectionRefused,
    Timeout,
    Unreachable,
    Other,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportKind::Dns => "dns",
            TransportKind::ConnectionRefused => "connection refused",
            TransportKind::Timeout => "timeout",
            TransportKind::Unreachable => "unreachable",
            TransportKind::Other => "transport",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while producing an avatar.
///
/// Cloneable so that every caller waiting on the same in-flight build can
/// receive the result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AvatarError {
    #[error("invalid avatar request: {0}")]
    Validation(String),

    #[error("invalid style: {0:?}")]
    InvalidStyle(String),

    #[error("{kind} error: {message}")]
    Transport { kind: TransportKind, message: String },

    #[error("avatar service returned status {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("unexpected response format: {0}")]
    Format(String),

    #[error("conversion produced empty character art")]
    EmptyResult,

    #[error("avatar cache error: {0}")]
    Cache(String),
}

impl AvatarError {
    /// Whether the failure means the avatar service could not be reached.
    pub fn is_network(&self) -> bool {
        match self {
            AvatarError::Transport { .. } => true,
            AvatarError::Validation(_)
            | AvatarError::InvalidStyle(_)
            | AvatarError::Upstream { .. }
            | AvatarError::Format(_)
            | AvatarError::EmptyResult
            | AvatarError::Cache(_) => false,
        }
    }

    pub fn transport(kind: TransportKind, message: impl Into<String>) -> Self {
        AvatarError::Transport {
            kind,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for AvatarError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return AvatarError::Upstream {
                status: status.as_u16(),
                message: err.to_string(),
            };
        }
        if err.is_decode() {
            return AvatarError::Format(err.to_string());
        }
        AvatarError::transport(classify_transport(&err), err.to_string())
    }
}

impl From<termonaut_cache::CacheError> for AvatarError {
    fn from(err: termonaut_cache::CacheError) -> Self {
        AvatarError::Cache(err.to_string())
    }
}

/// Assign a transport kind by walking the error's source chain.
fn classify_transport(err: &reqwest::Error) -> TransportKind {
    if err.is_timeout() {
        return TransportKind::Timeout;
    }

    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            match io_err.kind() {
                io::ErrorKind::ConnectionRefused => return TransportKind::ConnectionRefused,
                io::ErrorKind::TimedOut => return TransportKind::Timeout,
                io::ErrorKind::NetworkUnreachable | io::ErrorKind::HostUnreachable => {
                    return TransportKind::Unreachable;
                }
                _ => {}
            }
        }
        // hyper-util wraps resolver failures in a private type; its display
        // text is the only stable marker.
        if cause.to_string().starts_with("dns error") {
            return TransportKind::Dns;
        }
        source = cause.source();
    }

    TransportKind::Other
}
