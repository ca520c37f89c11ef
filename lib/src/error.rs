// Copyright (c) 2022-2023 The MobileCoin Foundation

use hw_daemon_proto::{MessageKind, WireError};
use tokio::time::error::Elapsed;

/// Hardware wallet daemon error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No device available for the requested transport
    #[error("no device available")]
    NoDevice,

    /// HID transport error
    #[cfg(feature = "transport_hid")]
    #[error("HID error: {0}")]
    Hid(#[from] hidapi::HidError),

    /// Underlying I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Packet framing error
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    /// Failed to decode a message payload
    #[error("failed to decode {kind} payload: {err}")]
    Decode {
        kind: MessageKind,
        err: hw_daemon_proto::prost::DecodeError,
    },

    /// Device replied with a message kind the daemon does not handle
    #[error("unexpected message kind {0}")]
    UnexpectedMessage(String),

    /// Device connection was closed while awaiting a response
    #[error("device disconnected")]
    Disconnected,

    /// Request timeout
    #[error("timeout waiting for device response")]
    RequestTimeout,

    /// HTTP client went away while a device call was outstanding
    #[error("client closed request")]
    ClientClosed,

    /// Device task terminated before returning a result
    #[error("device task failed: {0}")]
    Task(String),
}

impl From<Elapsed> for Error {
    fn from(_: Elapsed) -> Self {
        Error::RequestTimeout
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Error::Task(e.to_string())
    }
}
