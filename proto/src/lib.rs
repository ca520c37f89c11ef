// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Protocol / message definitions for hardware wallet communication
//!
//! Devices speak a message oriented protocol where each message is a
//! `(kind, payload)` pair, the kind being a numeric identifier from
//! [MessageKind] and the payload a protobuf encoding of the matching
//! structure in [messages].
//!
//! Messages are carried over USB HID or the emulator UDP socket as a series
//! of 64-byte packets, see [wire] for the framing.

use strum::{Display, EnumIter, EnumString, EnumVariantNames};

pub mod messages;
pub mod wire;

pub use messages::FailureType;
pub use prost;
pub use wire::{Decoder, Packet, WireError, PACKET_LEN};

/// Device message kinds
///
/// Values match the firmware message type table and MUST NOT be renumbered.
#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    Debug,
    Hash,
    Display,
    EnumString,
    EnumVariantNames,
    EnumIter,
    num_enum::TryFromPrimitive,
)]
#[repr(u16)]
pub enum MessageKind {
    Initialize = 0,
    Ping = 1,
    Success = 2,
    Failure = 3,
    ChangePin = 4,
    WipeDevice = 5,
    GetEntropy = 9,
    Entropy = 10,
    ResetDevice = 14,
    Features = 17,
    PinMatrixRequest = 18,
    PinMatrixAck = 19,
    Cancel = 20,
    ApplySettings = 25,
    ButtonRequest = 26,
    ButtonAck = 27,
    BackupDevice = 34,
    PassphraseRequest = 41,
    PassphraseAck = 42,
    RecoveryDevice = 45,
    WordRequest = 46,
    WordAck = 47,
    GetFeatures = 55,

    // Skycoin specific messages
    SetMnemonic = 113,
    SkycoinAddress = 114,
    ResponseSkycoinAddress = 115,
    SkycoinCheckMessageSignature = 116,
    SkycoinSignMessage = 117,
    ResponseSkycoinSignMessage = 118,
    GenerateMnemonic = 119,
    TransactionSign = 120,
    ResponseTransactionSign = 121,
}

/// Protocol message envelope
///
/// Kinds are kept raw so messages from newer firmware with unknown kinds
/// can still be framed and reported.
#[derive(Clone, PartialEq, Eq)]
pub struct Message {
    kind: u16,
    payload: Vec<u8>,
}

impl Message {
    /// Build a message by encoding the provided payload
    pub fn new<M: prost::Message>(kind: MessageKind, payload: &M) -> Self {
        Self {
            kind: kind as u16,
            payload: payload.encode_to_vec(),
        }
    }

    /// Build a message from a raw kind and encoded payload
    pub fn from_raw(kind: u16, payload: Vec<u8>) -> Self {
        Self { kind, payload }
    }

    /// Fetch the message kind, returning the raw value for unknown kinds
    pub fn kind(&self) -> Result<MessageKind, u16> {
        MessageKind::try_from(self.kind).map_err(|_| self.kind)
    }

    /// Raw message kind identifier
    pub fn raw_kind(&self) -> u16 {
        self.kind
    }

    /// Encoded message payload
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Decode the message payload
    pub fn decode<M: prost::Message + Default>(&self) -> Result<M, prost::DecodeError> {
        M::decode(self.payload.as_slice())
    }

    /// Human readable kind name, for logging
    pub fn kind_name(&self) -> String {
        match self.kind() {
            Ok(k) => k.to_string(),
            Err(v) => format!("Unknown({v})"),
        }
    }
}

impl core::fmt::Debug for Message {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Message")
            .field("kind", &self.kind_name())
            .field("payload_len", &self.payload.len())
            .finish()
    }
}
