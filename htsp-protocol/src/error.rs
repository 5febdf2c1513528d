//! Error types for the HTSP codec and client.

use thiserror::Error;

use crate::value::ValueKind;

/// Errors raised while decoding htsmsg bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A fixed-size header or a frame body does not fit in the input.
    #[error("Truncated input: expected {expected} bytes, got {actual}")]
    TruncatedInput { expected: usize, actual: usize },

    /// Field type tag is unknown.
    #[error("Unknown type tag: {0}")]
    UnknownTypeTag(u8),

    /// A declared length runs past the end of its enclosing region.
    #[error("Declared length {declared} exceeds remaining {remaining} bytes")]
    LengthOverflow { declared: usize, remaining: usize },

    /// Integer payload is wider than 64 bits.
    #[error("Integer field is {0} bytes wide (max 8)")]
    IntegerTooWide(usize),

    /// Field name or string value is not valid UTF-8.
    #[error("Invalid UTF-8: {0}")]
    InvalidUtf8(String),

    /// The same field name appears twice in one map.
    #[error("Duplicate field: {0:?}")]
    DuplicateField(String),

    /// Nested lists/maps are deeper than the decoder accepts.
    #[error("Nesting deeper than {0} levels")]
    DepthLimitExceeded(usize),
}

/// Errors raised while encoding a map.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The value cannot be expressed on the wire.
    #[error("Unsupported value: {0}")]
    UnsupportedValue(String),

    /// Field names are limited to 255 bytes.
    #[error("Field name is {0} bytes long (max 255)")]
    NameTooLong(usize),

    /// A payload does not fit its 32-bit length field or the frame limit.
    #[error("Payload too large: {0} bytes")]
    PayloadTooLarge(usize),
}

/// Errors raised while splitting a byte stream into frames.
///
/// Any framing error is fatal to the connection: the protocol has no
/// resynchronization marker.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FramingError {
    /// The frame payload could not be decoded.
    #[error("Frame decode failed: {0}")]
    Decode(#[from] DecodeError),

    /// The length prefix announces more than the configured maximum.
    #[error("Frame too large: {0} bytes (max: {1})")]
    FrameTooLarge(u32, u32),
}

/// A value was read through an accessor for a different variant.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Type mismatch: expected {expected}, found {found}")]
pub struct TypeMismatch {
    pub expected: ValueKind,
    pub found: ValueKind,
}

/// A typed field lookup on a map failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// Required field is absent.
    #[error("Missing field {0:?}")]
    Missing(String),

    /// Field is present with the wrong type or out of range.
    #[error("Field {field:?}: {source}")]
    Mistyped {
        field: String,
        #[source]
        source: TypeMismatch,
    },

    /// Integer field does not fit the target width.
    #[error("Field {field:?}: value {value} out of range")]
    OutOfRange { field: String, value: i64 },
}

/// Client-side errors that can occur during operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Connection could not be established.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection was closed while the call was outstanding (or before it started).
    #[error("Connection closed")]
    ConnectionClosed,

    /// No response arrived within the caller's timeout.
    #[error("Request {method} (seq {seq}) timed out")]
    Timeout { method: String, seq: u32 },

    /// The byte stream could not be split into frames.
    #[error("Framing error: {0}")]
    Framing(#[from] FramingError),

    /// A request could not be encoded.
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    /// The reply lacks an expected field or carries it with the wrong type.
    #[error("Protocol violation in {method} reply: {source}")]
    ProtocolViolation {
        method: String,
        #[source]
        source: FieldError,
    },

    /// Server answered with an `error` field.
    #[error("Server error in {method}: {message}")]
    ServerError { method: String, message: String },

    /// Server answered with `noaccess`.
    #[error("Access denied for {0}")]
    AccessDenied(String),

    /// The operation needs a newer protocol version than the server offers.
    #[error("HTSP version {required} required, server supports {server}")]
    UnsupportedVersion { required: u32, server: u32 },

    /// `hello` has not completed yet.
    #[error("Handshake not performed")]
    NotConnected,

    /// I/O error on the underlying stream.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Io(err.to_string())
    }
}

impl ClientError {
    /// Attach the method name to a field lookup failure.
    pub fn violation(method: &str, source: FieldError) -> Self {
        ClientError::ProtocolViolation {
            method: method.to_string(),
            source,
        }
    }

    /// Returns true if this error ended the connection rather than a single call.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ClientError::ConnectionClosed | ClientError::Framing(_) | ClientError::Io(_)
        )
    }
}
