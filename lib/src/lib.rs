// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Hardware wallet daemon library (and CLI)
//!
//! Exposes a Skycoin hardware wallet, or its emulator, as a REST API.
//! Requests are executed against a [Session] through a [Gateway], which
//! serializes device access and resolves device interaction requests.

/// Re-export transports for consumer use
pub mod transport;

mod error;
pub use error::Error;

mod session;
pub use session::{Session, Settings};

mod handle;
pub use handle::{DeviceHandle, DEFAULT_USER_TIMEOUT};

pub mod serializer;

pub mod dispatch;

pub mod gateway;
pub use gateway::Gateway;

pub mod csrf;

pub mod api;

/// Re-export protocol definitions for consumers
pub use hw_daemon_proto::{self as proto};

/// Device handle for USB or emulator transports
pub type GenericHandle = DeviceHandle<transport::GenericConnector>;
