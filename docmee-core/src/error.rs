//! # Client error types
//!
//! Every fallible operation in this crate returns [`ClientError`]. Two kinds
//! matter to callers of the docmee API:
//!
//! - [`ClientError::Transport`]: the HTTP exchange itself failed (status outside
//!   2xx, connection refused, body cut off mid-stream). Carries a
//!   [`TransportError`] with enough context to diagnose the call.
//! - [`ClientError::Service`]: HTTP succeeded but the envelope reported a
//!   non-zero `code`, or a field the operation returns was missing.
//!
//! The remaining variants cover undecodable payloads and local problems
//! (bad configuration, unreadable files, invalid input).

use std::fmt;

use thiserror::Error;

/// Result alias used throughout the client.
pub type ClientResult<T> = Result<T, ClientError>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Diagnostics for a failed HTTP exchange.
///
/// `request` is a summary of what was sent with secrets redacted; `body` is the
/// raw response body when one could be read.
#[derive(Debug)]
pub struct TransportError {
    pub method: String,
    pub url: String,
    pub request: String,
    pub status: Option<u16>,
    pub body: Option<String>,
    pub source: Option<BoxError>,
}

impl TransportError {
    /// The service answered with a status outside 2xx.
    pub fn status(
        method: impl Into<String>,
        url: impl Into<String>,
        request: impl Into<String>,
        status: u16,
        body: Option<String>,
    ) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            request: request.into(),
            status: Some(status),
            body,
            source: None,
        }
    }

    /// The connection failed before or while the response was read.
    pub fn connection(
        method: impl Into<String>,
        url: impl Into<String>,
        request: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            request: request.into(),
            status: None,
            body: None,
            source: Some(source.into()),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} failed", self.method, self.url)?;
        if let Some(status) = self.status {
            write!(f, " with status {status}")?;
        }
        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }
        write!(f, " (request: {})", self.request)?;
        if let Some(body) = &self.body {
            write!(f, " (response: {body})")?;
        }
        Ok(())
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Error taxonomy for the docmee client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// `code` is `None` when the envelope was successful but a required field
    /// was absent.
    #[error("service error{}: {message}", code.map(|c| format!(" (code {c})")).unwrap_or_default())]
    Service { code: Option<i64>, message: String },

    #[error("failed to decode {context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Envelope reported a non-zero `code`.
    pub fn service(code: i64, message: Option<String>) -> Self {
        Self::Service {
            code: Some(code),
            message: message.unwrap_or_else(|| "no message supplied".to_string()),
        }
    }

    /// A successful envelope lacked a field the operation returns.
    pub fn missing_field(field: &str) -> Self {
        Self::Service {
            code: None,
            message: format!("response data has no usable `{field}` field"),
        }
    }

    pub fn decode(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            context: context.into(),
            source,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    #[must_use]
    pub fn is_service(&self) -> bool {
        matches!(self, Self::Service { .. })
    }

    /// The service-supplied (or generated) message of a [`ClientError::Service`].
    pub fn service_message(&self) -> Option<&str> {
        match self {
            Self::Service { message, .. } => Some(message),
            _ => None,
        }
    }

    /// The HTTP status of a transport failure, if the service answered at all.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Transport(t) => t.status,
            _ => None,
        }
    }
}
