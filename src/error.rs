//! Error types for the ILS gateway.
//!
//! Two layers: [`TransportError`] covers everything that goes wrong before a
//! decoded payload exists (the bus is unreachable, timed out, or answered with
//! something that is not a bus envelope). [`GatewayError`] wraps it together
//! with the protocol-level failures: in-band events and codec misuse.

use crate::event::Event;

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Failures of the underlying bus call itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The transport gave up waiting for a response.
    #[error("bus call timed out")]
    Timeout,

    /// Could not reach the bus endpoint.
    #[error("connection failed: {0}")]
    Connection(String),

    /// HTTP-level failure from the bus gateway endpoint.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The bus envelope carried a non-success status (e.g. method not found).
    #[error("bus status {status}: {debug}")]
    Status { status: u16, debug: String },

    /// The response could not be read as a bus envelope.
    #[error("malformed bus response: {0}")]
    Framing(String),

    /// The caller cancelled the call before a response arrived.
    #[error("bus call cancelled")]
    Cancelled,
}

impl TransportError {
    /// Whether a caller may reasonably retry the same call.
    ///
    /// Timeouts, connection failures, rate limiting and 5xx responses are
    /// transient. Bus status errors and framing errors are not: the same
    /// request will produce the same answer.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Timeout | TransportError::Connection(_) => true,
            TransportError::Http { status, .. } => *status == 429 || *status >= 500,
            TransportError::Status { .. }
            | TransportError::Framing(_)
            | TransportError::Cancelled => false,
        }
    }

    /// True when the bus was reached and the method itself raised.
    ///
    /// The envelope was well framed, so the bus is up; only the call was
    /// rejected (bad arguments, unknown method, server-side exception).
    pub fn is_method_exception(&self) -> bool {
        matches!(self, TransportError::Status { .. })
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() || err.is_request() {
            TransportError::Connection(err.to_string())
        } else if err.is_decode() || err.is_body() {
            TransportError::Framing(err.to_string())
        } else if let Some(status) = err.status() {
            TransportError::Http {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            TransportError::Connection(err.to_string())
        }
    }
}

/// Errors surfaced by the gateway to calling orchestrators.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Bus unreachable, timed out, or malformed framing.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The remote method answered with an in-band error event.
    #[error("remote event {}: {}", .0.code, .0.message_or("no description"))]
    RemoteEvent(Event),

    /// Attempted to encode a field the class table does not define.
    #[error("unknown field '{field}' for class '{class}'")]
    UnknownField { class: String, field: String },

    /// Attempted to set a mutation flag field directly instead of stating intent.
    #[error("field '{field}' of class '{class}' is a mutation flag; pass a Mutation instead")]
    ReservedField { class: String, field: String },

    /// No field table is registered for the class tag.
    #[error("unknown fieldmapper class '{0}'")]
    UnknownClass(String),

    /// The wire value is tagged with a different class than requested.
    #[error("expected class '{expected}', found '{found}'")]
    ClassMismatch { expected: String, found: String },

    /// The value handed to the decoder is not an entity in either wire form.
    #[error("not a fieldmapper entity: {0}")]
    NotAnEntity(String),

    /// Invalid gateway or field table configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl GatewayError {
    /// Returns true if this is a transport-level failure.
    pub fn is_transport(&self) -> bool {
        matches!(self, GatewayError::Transport(_))
    }

    /// Returns true if the caller may retry the call that produced this error.
    ///
    /// Only transient transport failures qualify; remote events never do.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Transport(e) if e.is_retryable())
    }

    /// Returns the remote event if this error carries one.
    pub fn event(&self) -> Option<&Event> {
        match self {
            GatewayError::RemoteEvent(event) => Some(event),
            _ => None,
        }
    }

    /// Returns true if this is a programming error in how the codec was used.
    pub fn is_codec_misuse(&self) -> bool {
        matches!(
            self,
            GatewayError::UnknownField { .. }
                | GatewayError::ReservedField { .. }
                | GatewayError::UnknownClass(_)
        )
    }
}
