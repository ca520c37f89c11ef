// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Protobuf message payloads
//!
//! Structures mirror the firmware `.proto` definitions (proto2, so most
//! fields are optional). Only messages sent or decoded by the daemon are
//! defined here.

use serde::Serialize;

/// Failure codes reported by the device in [Failure] messages
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum FailureType {
    UnexpectedMessage = 1,
    ButtonExpected = 2,
    DataError = 3,
    ActionCancelled = 4,
    PinExpected = 5,
    PinCancelled = 6,
    PinInvalid = 7,
    InvalidSignature = 8,
    ProcessError = 9,
    NotEnoughFunds = 10,
    NotInitialized = 11,
    PinMismatch = 12,
    AddressGeneration = 13,
    FirmwareError = 99,
}

/// Generic success response
#[derive(Clone, PartialEq, prost::Message)]
pub struct Success {
    #[prost(string, optional, tag = "1")]
    pub message: Option<String>,
}

/// Generic failure response
#[derive(Clone, PartialEq, prost::Message)]
pub struct Failure {
    #[prost(enumeration = "FailureType", optional, tag = "1")]
    pub code: Option<i32>,
    #[prost(string, optional, tag = "2")]
    pub message: Option<String>,
}

/// Abort the current operation
#[derive(Clone, PartialEq, prost::Message)]
pub struct Cancel {}

/// Request the device features
#[derive(Clone, PartialEq, prost::Message)]
pub struct GetFeatures {}

/// Reset device session and request features
#[derive(Clone, PartialEq, prost::Message)]
pub struct Initialize {}

/// Device features
#[derive(Clone, PartialEq, prost::Message, Serialize)]
pub struct Features {
    #[prost(string, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[prost(uint32, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major_version: Option<u32>,
    #[prost(uint32, optional, tag = "3")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minor_version: Option<u32>,
    #[prost(uint32, optional, tag = "4")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch_version: Option<u32>,
    #[prost(bool, optional, tag = "5")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bootloader_mode: Option<bool>,
    #[prost(string, optional, tag = "6")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[prost(bool, optional, tag = "7")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin_protection: Option<bool>,
    #[prost(bool, optional, tag = "8")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passphrase_protection: Option<bool>,
    #[prost(string, optional, tag = "9")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[prost(string, optional, tag = "10")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[prost(bool, optional, tag = "12")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initialized: Option<bool>,
    #[prost(bytes = "vec", optional, tag = "14")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bootloader_hash: Option<Vec<u8>>,
    #[prost(bool, optional, tag = "16")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin_cached: Option<bool>,
    #[prost(bool, optional, tag = "17")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passphrase_cached: Option<bool>,
    #[prost(bool, optional, tag = "18")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firmware_present: Option<bool>,
    #[prost(bool, optional, tag = "19")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub needs_backup: Option<bool>,
    #[prost(string, optional, tag = "21")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[prost(uint32, optional, tag = "22")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fw_major: Option<u32>,
    #[prost(uint32, optional, tag = "23")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fw_minor: Option<u32>,
    #[prost(uint32, optional, tag = "24")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fw_patch: Option<u32>,
}

/// Device requests a physical button press
#[derive(Clone, PartialEq, prost::Message)]
pub struct ButtonRequest {
    #[prost(int32, optional, tag = "1")]
    pub code: Option<i32>,
    #[prost(string, optional, tag = "2")]
    pub data: Option<String>,
}

/// Host acknowledges a button request (the device then waits for the press)
#[derive(Clone, PartialEq, prost::Message)]
pub struct ButtonAck {}

/// Device requests PIN entry via the scrambled matrix
#[derive(Clone, PartialEq, prost::Message)]
pub struct PinMatrixRequest {
    #[prost(int32, optional, tag = "1")]
    pub r#type: Option<i32>,
}

/// PIN entry, encoded as matrix positions
#[derive(Clone, PartialEq, prost::Message)]
pub struct PinMatrixAck {
    #[prost(string, required, tag = "1")]
    pub pin: String,
}

/// Device requests a passphrase
#[derive(Clone, PartialEq, prost::Message)]
pub struct PassphraseRequest {}

/// Passphrase entry
#[derive(Clone, PartialEq, prost::Message)]
pub struct PassphraseAck {
    #[prost(string, required, tag = "1")]
    pub passphrase: String,
}

/// Device requests a recovery word
#[derive(Clone, PartialEq, prost::Message)]
pub struct WordRequest {}

/// Recovery word entry
#[derive(Clone, PartialEq, prost::Message)]
pub struct WordAck {
    #[prost(string, required, tag = "1")]
    pub word: String,
}

/// Change label, language or passphrase use
#[derive(Clone, PartialEq, prost::Message)]
pub struct ApplySettings {
    #[prost(string, optional, tag = "1")]
    pub language: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub label: Option<String>,
    #[prost(bool, optional, tag = "3")]
    pub use_passphrase: Option<bool>,
}

/// Display the seed for backup
#[derive(Clone, PartialEq, prost::Message)]
pub struct BackupDevice {}

/// Set, change or remove the device PIN
#[derive(Clone, PartialEq, prost::Message)]
pub struct ChangePin {
    #[prost(bool, optional, tag = "1")]
    pub remove: Option<bool>,
}

/// Erase all device secrets
#[derive(Clone, PartialEq, prost::Message)]
pub struct WipeDevice {}

/// Generate a new seed on device
#[derive(Clone, PartialEq, prost::Message)]
pub struct GenerateMnemonic {
    #[prost(uint32, optional, tag = "1")]
    pub word_count: Option<u32>,
    #[prost(bool, optional, tag = "2")]
    pub passphrase_protection: Option<bool>,
}

/// Load a seed onto the device
#[derive(Clone, PartialEq, prost::Message)]
pub struct SetMnemonic {
    #[prost(string, required, tag = "1")]
    pub mnemonic: String,
}

/// Start seed recovery
#[derive(Clone, PartialEq, prost::Message)]
pub struct RecoveryDevice {
    #[prost(uint32, optional, tag = "1")]
    pub word_count: Option<u32>,
    #[prost(bool, optional, tag = "2")]
    pub passphrase_protection: Option<bool>,
    #[prost(bool, optional, tag = "10")]
    pub dry_run: Option<bool>,
}

/// Generate addresses
#[derive(Clone, PartialEq, prost::Message)]
pub struct SkycoinAddress {
    #[prost(uint32, required, tag = "1")]
    pub address_n: u32,
    #[prost(bool, optional, tag = "2")]
    pub confirm_address: Option<bool>,
    #[prost(uint32, optional, tag = "3")]
    pub start_index: Option<u32>,
}

/// Generated addresses
#[derive(Clone, PartialEq, prost::Message)]
pub struct ResponseSkycoinAddress {
    #[prost(string, repeated, tag = "1")]
    pub addresses: Vec<String>,
}

/// Check a message signature against an address
#[derive(Clone, PartialEq, prost::Message)]
pub struct SkycoinCheckMessageSignature {
    #[prost(string, required, tag = "1")]
    pub address: String,
    #[prost(string, required, tag = "2")]
    pub message: String,
    #[prost(string, required, tag = "3")]
    pub signature: String,
}

/// Sign a message with the key at `address_n`
#[derive(Clone, PartialEq, prost::Message)]
pub struct SkycoinSignMessage {
    #[prost(uint32, required, tag = "1")]
    pub address_n: u32,
    #[prost(string, required, tag = "2")]
    pub message: String,
}

/// Message signature
#[derive(Clone, PartialEq, prost::Message)]
pub struct ResponseSkycoinSignMessage {
    #[prost(string, required, tag = "1")]
    pub signed_message: String,
}

/// Transaction input
#[derive(Clone, PartialEq, prost::Message)]
pub struct SkycoinTransactionInput {
    #[prost(string, required, tag = "1")]
    pub hash_in: String,
    #[prost(uint32, optional, tag = "2")]
    pub index: Option<u32>,
}

/// Transaction output
#[derive(Clone, PartialEq, prost::Message)]
pub struct SkycoinTransactionOutput {
    #[prost(string, required, tag = "1")]
    pub address: String,
    #[prost(uint32, optional, tag = "2")]
    pub address_index: Option<u32>,
    #[prost(uint64, required, tag = "3")]
    pub coin: u64,
    #[prost(uint64, required, tag = "4")]
    pub hour: u64,
}

/// Sign a transaction
#[derive(Clone, PartialEq, prost::Message)]
pub struct TransactionSign {
    #[prost(uint32, required, tag = "1")]
    pub nb_in: u32,
    #[prost(message, repeated, tag = "2")]
    pub transaction_in: Vec<SkycoinTransactionInput>,
    #[prost(uint32, required, tag = "3")]
    pub nb_out: u32,
    #[prost(message, repeated, tag = "4")]
    pub transaction_out: Vec<SkycoinTransactionOutput>,
}

/// Transaction input signatures
#[derive(Clone, PartialEq, prost::Message)]
pub struct ResponseTransactionSign {
    #[prost(string, repeated, tag = "1")]
    pub signatures: Vec<String>,
    #[prost(bool, optional, tag = "2")]
    pub padding: Option<bool>,
}
