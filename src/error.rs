//! Error types.
//!
//! Nothing here is fatal to the host process: protocol and dispatch errors
//! drop a single frame or event, client errors are returned to the caller
//! of [`crate::Client::connect`].

use thiserror::Error;

/// Malformed frame on the wire.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Header opcode outside `Handshake..=Pong`.
    #[error("unknown opcode {0}")]
    UnknownOpcode(u32),

    /// Payload was not valid UTF-8 JSON.
    #[error("payload decode failed: {0}")]
    DecodeFailure(#[from] serde_json::Error),

    /// Header length above [`crate::constants::MAX_FRAME_SIZE`].
    #[error("frame too large: {0} bytes")]
    FrameTooLarge(u32),
}

/// A `Frame` payload whose shape does not match the event it names.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The payload names a known event but has no `data` object.
    #[error("{event} payload has no data")]
    MissingData {
        /// Event name from the `evt` field.
        event: &'static str,
    },

    /// A field required by the event is absent or has the wrong type.
    #[error("{event} payload has invalid data: {source}")]
    InvalidField {
        /// Event name from the `evt` field.
        event: &'static str,
        /// Underlying serde error naming the field.
        #[source]
        source: serde_json::Error,
    },
}

/// Errors returned by the public [`crate::Client`] entry points.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Every candidate address refused the connection.
    #[error("no IPC peer found on any of {0} candidate addresses")]
    PeerNotFound(u8),

    /// `connect()` called while a connection is already established.
    #[error("already connected")]
    AlreadyConnected,

    /// The transport failed while sending the handshake.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// The engine task is gone (runtime shut down).
    #[error("client engine stopped")]
    EngineStopped,
}
