use std::fmt;

use crate::contact::ValidationError;

/// Error type returned by this crate.
///
/// Transport failures are classified once the retry budget is spent, so
/// callers never see a raw `reqwest` error.
#[derive(Debug, thiserror::Error)]
pub enum SheetbotError {
    /// Every attempt ran out of time.
    #[error("request timed out after {attempts} attempt(s)")]
    Timeout { attempts: u32 },
    /// The remote host could not be reached.
    #[error("network unavailable after {attempts} attempt(s): {message}")]
    NetworkUnavailable { attempts: u32, message: String },
    /// 4xx response. Never retried.
    #[error("client error {status}: {body}")]
    ClientError { status: u16, body: String },
    /// 5xx response on the last allowed attempt.
    #[error("server error {status} after {attempts} attempt(s): {body}")]
    ServerError {
        status: u16,
        attempts: u32,
        body: String,
    },
    /// Response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
    /// The caller cancelled the call before a response arrived.
    #[error("request cancelled")]
    Cancelled,
    /// Input rejected before any request was sent.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
    /// Missing or malformed client configuration.
    #[error("configuration error: {0}")]
    Config(String),
    /// Any failure that fits none of the above.
    #[error("unknown error: {0}")]
    Unknown(String),
}

impl SheetbotError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::NetworkUnavailable { .. } => ErrorKind::NetworkUnavailable,
            Self::ClientError { status, .. } => ErrorKind::ClientError(*status),
            Self::ServerError { status, .. } => ErrorKind::ServerError(*status),
            Self::Decode(_) => ErrorKind::Decode,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Validation(_) | Self::Config(_) => ErrorKind::Invalid,
            Self::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// Operator-facing message for this error.
    pub fn user_message(&self) -> &'static str {
        self.kind().user_message()
    }
}

/// Coarse classification of a [`SheetbotError`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorKind {
    Timeout,
    NetworkUnavailable,
    ClientError(u16),
    ServerError(u16),
    Decode,
    Cancelled,
    Invalid,
    Unknown,
}

impl ErrorKind {
    /// Classifies an HTTP status code that was not a success.
    pub fn from_status(status: u16) -> Self {
        match status {
            400..=499 => Self::ClientError(status),
            500..=599 => Self::ServerError(status),
            _ => Self::Unknown,
        }
    }

    pub fn user_message(self) -> &'static str {
        match self {
            Self::Timeout => "The request took too long. Please try again.",
            Self::NetworkUnavailable => "Connection error. Check your internet connection.",
            Self::ClientError(_) => "Authorization error or invalid data.",
            Self::ServerError(_) => "Internal server error. Please try again later.",
            Self::Decode => "Unexpected response from the server.",
            Self::Cancelled => "The request was cancelled.",
            Self::Invalid => "Invalid input.",
            Self::Unknown => "Unknown error. Please try again.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("timeout"),
            Self::NetworkUnavailable => f.write_str("network unavailable"),
            Self::ClientError(status) => write!(f, "client error {status}"),
            Self::ServerError(status) => write!(f, "server error {status}"),
            Self::Decode => f.write_str("decode"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::Invalid => f.write_str("invalid"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}
