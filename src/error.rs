//! Error taxonomy for the AMQP 1.0 value model, codec, frame layer, and
//! transport.
//!
//! Names are chosen to match the semantic categories a caller needs to
//! branch on (a local value error vs. a decode error vs. a transport
//! error that just disconnected me) rather than to mirror any particular
//! wire error condition.

use thiserror::Error;

/// Errors raised by the value model, codec, frame layer, and transport.
#[derive(Error, Debug)]
pub enum AmqpError {
    /// A constructor received a value outside the declared variant's range.
    #[error("value out of range: {0}")]
    RangeError(String),

    /// An operation required matching AMQP type tags and didn't get them.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// A positional list/array access was out of bounds.
    #[error("index out of range: {0}")]
    IndexOutOfRange(String),

    /// A map lookup found no entry for the given key.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The decoder read a format code it does not recognize.
    #[error("unknown format code: 0x{0:02x}")]
    UnknownFormatCode(u8),

    /// The decoder read a frame or value that does not conform to the
    /// AMQP 1.0 binary encoding (bad UTF-8, odd map count, truncated
    /// payload, inconsistent declared size, `doff < 2`, etc).
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// A frame's performative descriptor did not match any known
    /// performative.
    #[error("unknown performative descriptor: {0}")]
    UnknownPerformative(u64),

    /// Protocol header negotiation did not agree on a protocol id/version.
    #[error("protocol mismatch: {0}")]
    ProtocolMismatch(String),

    /// `receive_frame` got a frame whose type didn't match what the
    /// caller asked for.
    #[error("unexpected frame type: expected {expected:?}, got {actual}")]
    UnexpectedFrame { expected: Option<u8>, actual: u8 },

    /// The transport observed EOF or an unrecoverable I/O error and is
    /// now permanently disconnected.
    #[error("connection closed")]
    ConnectionClosed,

    /// A bounded I/O operation exceeded its configured timeout.
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// Any other I/O failure not covered by the categories above.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS handshake or configuration failure.
    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),
}

/// Result type for AMQP operations.
pub type AmqpResult<T> = Result<T, AmqpError>;

impl AmqpError {
    pub fn range(msg: impl Into<String>) -> Self {
        AmqpError::RangeError(msg.into())
    }

    pub fn type_mismatch(msg: impl Into<String>) -> Self {
        AmqpError::TypeMismatch(msg.into())
    }

    pub fn index_out_of_range(msg: impl Into<String>) -> Self {
        AmqpError::IndexOutOfRange(msg.into())
    }

    pub fn key_not_found(msg: impl Into<String>) -> Self {
        AmqpError::KeyNotFound(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        AmqpError::MalformedFrame(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        AmqpError::Timeout(msg.into())
    }

    /// Whether this error should flip a transport to the disconnected
    /// state. `Timeout` is excluded: a timed-out read or write leaves the
    /// connection usable per the transport's retry contract (§5).
    pub fn disconnects_transport(&self) -> bool {
        !matches!(self, AmqpError::Timeout(_))
    }
}
