//! Device transports and a generic abstraction hiding transport types
//!
// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::net::{Ipv4Addr, SocketAddr};

use async_trait::async_trait;
use log::{debug, trace};
use strum::Display;
use tokio::net::UdpSocket;

use hw_daemon_proto::{wire, Decoder, Message, Packet, PACKET_LEN};

use crate::Error;

/// Default emulator UDP port
pub const EMULATOR_PORT: u16 = 21324;

/// USB vendor ID for Skycoin hardware wallets
pub const USB_VENDOR_ID: u16 = 0x313a;

/// USB product ID for Skycoin hardware wallets
pub const USB_PRODUCT_ID: u16 = 0x0001;

/// Packet transport for a connected device
///
/// Methods take `&self` so a packet may be written while another
/// task is blocked awaiting a response (see [DeviceHandle::cancel][crate::DeviceHandle]).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Write a single packet to the device
    async fn write_packet(&self, p: &Packet) -> Result<(), Error>;

    /// Read a single packet from the device
    async fn read_packet(&self) -> Result<Packet, Error>;

    /// Write a complete message
    async fn write_message(&self, m: &Message) -> Result<(), Error> {
        trace!("TX {:?}", m);

        for p in wire::encode_packets(m) {
            self.write_packet(&p).await?;
        }

        Ok(())
    }

    /// Read packets until a complete message is available
    async fn read_message(&self) -> Result<Message, Error> {
        let mut d = Decoder::new();

        loop {
            let p = self.read_packet().await?;
            if let Some(m) = d.push(&p)? {
                trace!("RX {:?}", m);
                return Ok(m);
            }
        }
    }
}

/// Connect trait for supported transports
#[async_trait]
pub trait Connect: Send + Sync + 'static {
    type Transport: Transport + 'static;

    /// Open a connection to the device
    async fn connect(&self) -> Result<Self::Transport, Error>;
}

/// Emulator transport, exchanging one packet per UDP datagram
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Connect to an emulator at the provided address
    pub async fn connect(addr: SocketAddr) -> Result<Self, Error> {
        let bind = match addr {
            SocketAddr::V4(_) => SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), 0),
            SocketAddr::V6(_) => SocketAddr::new(std::net::Ipv6Addr::UNSPECIFIED.into(), 0),
        };

        let socket = UdpSocket::bind(bind).await?;
        socket.connect(addr).await?;

        debug!("Connected emulator transport to {}", addr);

        Ok(Self { socket })
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn write_packet(&self, p: &Packet) -> Result<(), Error> {
        self.socket.send(p).await?;
        Ok(())
    }

    async fn read_packet(&self) -> Result<Packet, Error> {
        let mut p = [0u8; PACKET_LEN];

        let n = self.socket.recv(&mut p).await?;
        if n == 0 {
            return Err(Error::Disconnected);
        }

        Ok(p)
    }
}

/// Emulator connection options
#[derive(Clone, Debug, PartialEq)]
pub struct EmulatorConnector {
    pub addr: SocketAddr,
}

impl Default for EmulatorConnector {
    fn default() -> Self {
        Self {
            addr: SocketAddr::new(Ipv4Addr::LOCALHOST.into(), EMULATOR_PORT),
        }
    }
}

#[async_trait]
impl Connect for EmulatorConnector {
    type Transport = UdpTransport;

    async fn connect(&self) -> Result<UdpTransport, Error> {
        UdpTransport::connect(self.addr).await
    }
}

/// USB HID transport
#[cfg(feature = "transport_hid")]
pub struct HidTransport {
    device: std::sync::Mutex<hidapi::HidDevice>,
}

/// Poll interval for HID reads, the device lock is released between polls
#[cfg(feature = "transport_hid")]
const HID_POLL_MS: i32 = 100;

#[cfg(feature = "transport_hid")]
impl HidTransport {
    /// Open the first attached hardware wallet
    pub fn open() -> Result<Self, Error> {
        let api = hidapi::HidApi::new()?;

        let info = api
            .device_list()
            .find(|d| d.vendor_id() == USB_VENDOR_ID && d.product_id() == USB_PRODUCT_ID)
            .ok_or(Error::NoDevice)?;

        debug!(
            "Opening USB device {:04x}:{:04x} ({})",
            info.vendor_id(),
            info.product_id(),
            info.serial_number().unwrap_or("UNKNOWN")
        );

        let device = info.open_device(&api)?;

        Ok(Self {
            device: std::sync::Mutex::new(device),
        })
    }

    fn device(&self) -> std::sync::MutexGuard<'_, hidapi::HidDevice> {
        // A poisoned lock only means another reader panicked mid-poll
        self.device.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(feature = "transport_hid")]
#[async_trait]
impl Transport for HidTransport {
    async fn write_packet(&self, p: &Packet) -> Result<(), Error> {
        // Prefix report ID
        let mut report = [0u8; PACKET_LEN + 1];
        report[1..].copy_from_slice(p);

        tokio::task::block_in_place(|| self.device().write(&report))?;

        Ok(())
    }

    async fn read_packet(&self) -> Result<Packet, Error> {
        let mut p = [0u8; PACKET_LEN];

        loop {
            let n = tokio::task::block_in_place(|| self.device().read_timeout(&mut p, HID_POLL_MS))?;
            if n > 0 {
                return Ok(p);
            }

            tokio::task::yield_now().await;
        }
    }
}

/// USB connection options
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UsbConnector;

#[async_trait]
impl Connect for UsbConnector {
    type Transport = GenericTransport;

    async fn connect(&self) -> Result<GenericTransport, Error> {
        #[cfg(feature = "transport_hid")]
        return tokio::task::block_in_place(HidTransport::open).map(GenericTransport::Hid);

        #[cfg(not(feature = "transport_hid"))]
        {
            debug!("USB transport unavailable (transport_hid feature disabled)");
            Err(Error::NoDevice)
        }
    }
}

/// Generic device transport (abstract over transport types)
#[derive(Display)]
#[non_exhaustive]
pub enum GenericTransport {
    Udp(UdpTransport),
    #[cfg(feature = "transport_hid")]
    Hid(HidTransport),
}

/// Convert a UDP transport into a generic transport
impl From<UdpTransport> for GenericTransport {
    fn from(t: UdpTransport) -> Self {
        Self::Udp(t)
    }
}

/// Convert a HID transport into a generic transport
#[cfg(feature = "transport_hid")]
impl From<HidTransport> for GenericTransport {
    fn from(t: HidTransport) -> Self {
        Self::Hid(t)
    }
}

/// Implementation of [Transport] for [GenericTransport], hiding transport types
#[async_trait]
impl Transport for GenericTransport {
    async fn write_packet(&self, p: &Packet) -> Result<(), Error> {
        match self {
            Self::Udp(t) => t.write_packet(p).await,
            #[cfg(feature = "transport_hid")]
            Self::Hid(t) => t.write_packet(p).await,
        }
    }

    async fn read_packet(&self) -> Result<Packet, Error> {
        match self {
            Self::Udp(t) => t.read_packet().await,
            #[cfg(feature = "transport_hid")]
            Self::Hid(t) => t.read_packet().await,
        }
    }
}

/// Generic connector, selecting the USB or emulator transport
#[derive(Clone, Debug, PartialEq, Display)]
pub enum GenericConnector {
    Usb(UsbConnector),
    Emulator(EmulatorConnector),
}

#[async_trait]
impl Connect for GenericConnector {
    type Transport = GenericTransport;

    async fn connect(&self) -> Result<GenericTransport, Error> {
        match self {
            Self::Usb(c) => c.connect().await,
            Self::Emulator(c) => c.connect().await.map(GenericTransport::from),
        }
    }
}
