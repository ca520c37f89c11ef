// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Request bodies and validation
//!
//! Shape errors (missing required fields) map to 400, value errors
//! (out of range, undecodable addresses or amounts) map to 422.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::{header::CONTENT_TYPE, StatusCode},
};
use serde::{de::DeserializeOwned, Deserialize};
use sha2::{Digest, Sha256};

use hw_daemon_proto::messages::{SkycoinTransactionInput, SkycoinTransactionOutput};

use super::ApiError;
use crate::session::Settings;

/// JSON body extractor returning envelope errors
///
/// Non-JSON content types are rejected with 415, undecodable bodies
/// with 400.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().eq_ignore_ascii_case("application/json"))
            .unwrap_or(false);

        if !json {
            return Err(ApiError::new(StatusCode::UNSUPPORTED_MEDIA_TYPE, ""));
        }

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;

        serde_json::from_slice(&body)
            .map(JsonBody)
            .map_err(|e| ApiError::bad_request(e.to_string()))
    }
}

/// Number of decimal places in a coin amount
pub const DROPLET_PRECISION: u32 = 6;

/// Parse a decimal coin amount into droplets (1e-6 coins)
pub fn parse_droplets(s: &str) -> Result<u64, String> {
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };

    let digits = |v: &str| !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit());
    if !digits(whole) || !(frac.is_empty() || digits(frac)) || s.ends_with('.') {
        return Err(format!("invalid coin amount: {s:?}"));
    }
    if frac.len() > DROPLET_PRECISION as usize {
        return Err("too many decimal places".to_string());
    }

    let scale = 10u64.pow(DROPLET_PRECISION);
    let frac_droplets = match frac.is_empty() {
        true => 0,
        false => {
            let v: u64 = frac
                .parse()
                .map_err(|_| format!("invalid coin amount: {s:?}"))?;
            v * 10u64.pow(DROPLET_PRECISION - frac.len() as u32)
        }
    };

    whole
        .parse::<u64>()
        .ok()
        .and_then(|w| w.checked_mul(scale))
        .and_then(|w| w.checked_add(frac_droplets))
        .ok_or_else(|| "coin amount out of range".to_string())
}

/// Length of a decoded address: 20 byte key, version, 4 byte checksum
pub const ADDRESS_LEN: usize = 25;

/// Check a base58 address decodes with a valid checksum
pub fn validate_address(address: &str) -> Result<(), String> {
    let b = bs58::decode(address)
        .into_vec()
        .map_err(|_| "invalid base58 address".to_string())?;

    if b.len() != ADDRESS_LEN {
        return Err("invalid address length".to_string());
    }

    let sum = Sha256::digest(&b[..21]);
    if sum[..4] != b[21..] {
        return Err("invalid address checksum".to_string());
    }

    Ok(())
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GenerateAddressesRequest {
    pub address_n: i64,
    pub start_index: i64,
    pub confirm_address: bool,
}

impl GenerateAddressesRequest {
    pub fn validate(&self) -> Result<(u32, u32), ApiError> {
        if self.address_n == 0 {
            return Err(ApiError::unprocessable("address_n cannot be 0"));
        }
        let address_n = u32::try_from(self.address_n)
            .map_err(|_| ApiError::unprocessable("address_n must be a positive integer"))?;
        let start_index = u32::try_from(self.start_index)
            .map_err(|_| ApiError::unprocessable("start_index must be a non-negative integer"))?;

        Ok((address_n, start_index))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApplySettingsRequest {
    pub label: Option<String>,
    pub language: Option<String>,
    pub use_passphrase: Option<bool>,
}

impl ApplySettingsRequest {
    pub fn validate(self) -> Result<Settings, ApiError> {
        if self.label.is_none() && self.language.is_none() && self.use_passphrase.is_none() {
            return Err(ApiError::bad_request("no settings provided"));
        }

        Ok(Settings {
            label: self.label,
            language: self.language,
            use_passphrase: self.use_passphrase,
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CheckMessageSignatureRequest {
    pub message: String,
    pub signature: String,
    pub address: String,
}

impl CheckMessageSignatureRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.address.is_empty() {
            return Err(ApiError::bad_request("address is required"));
        }
        if self.message.is_empty() {
            return Err(ApiError::bad_request("message is required"));
        }
        if self.signature.is_empty() {
            return Err(ApiError::bad_request("signature is required"));
        }

        validate_address(&self.address).map_err(ApiError::unprocessable)
    }
}

/// Mnemonic lengths supported by the device
pub const WORD_COUNTS: [u32; 2] = [12, 24];

fn validate_word_count(word_count: u32) -> Result<(), ApiError> {
    match WORD_COUNTS.contains(&word_count) {
        true => Ok(()),
        false => Err(ApiError::unprocessable("word_count must be 12 or 24")),
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GenerateMnemonicRequest {
    pub word_count: u32,
    pub use_passphrase: bool,
}

impl GenerateMnemonicRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_word_count(self.word_count)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RecoveryRequest {
    pub word_count: u32,
    pub use_passphrase: bool,
    pub dry_run: bool,
}

impl RecoveryRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_word_count(self.word_count)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SetMnemonicRequest {
    pub mnemonic: String,
}

impl SetMnemonicRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let words = self.mnemonic.split_whitespace().count();

        if words == 0 {
            return Err(ApiError::bad_request("mnemonic is required"));
        }
        if !WORD_COUNTS.contains(&(words as u32)) {
            return Err(ApiError::unprocessable("mnemonic must be 12 or 24 words"));
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SetPinCodeRequest {
    pub remove_pin: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SignMessageRequest {
    pub address_n: i64,
    pub message: String,
}

impl SignMessageRequest {
    pub fn validate(&self) -> Result<u32, ApiError> {
        if self.message.is_empty() {
            return Err(ApiError::bad_request("message is required"));
        }

        u32::try_from(self.address_n)
            .map_err(|_| ApiError::unprocessable("address_n must be a non-negative integer"))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TransactionInput {
    pub hash: String,
    pub index: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TransactionOutput {
    pub address: String,
    pub address_index: Option<u32>,
    pub coins: String,
    pub hours: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TransactionSignRequest {
    pub transaction_inputs: Vec<TransactionInput>,
    pub transaction_outputs: Vec<TransactionOutput>,
}

impl TransactionSignRequest {
    /// Validate and convert to device inputs and outputs
    pub fn validate(
        self,
    ) -> Result<(Vec<SkycoinTransactionInput>, Vec<SkycoinTransactionOutput>), ApiError> {
        if self.transaction_inputs.is_empty() {
            return Err(ApiError::bad_request("at least one input is required"));
        }
        if self.transaction_outputs.is_empty() {
            return Err(ApiError::bad_request("at least one output is required"));
        }

        let mut inputs = Vec::with_capacity(self.transaction_inputs.len());
        for i in self.transaction_inputs {
            if i.hash.is_empty() {
                return Err(ApiError::bad_request("input hash is required"));
            }
            inputs.push(SkycoinTransactionInput {
                hash_in: i.hash,
                index: i.index,
            });
        }

        let mut outputs = Vec::with_capacity(self.transaction_outputs.len());
        for o in self.transaction_outputs {
            if o.address.is_empty() {
                return Err(ApiError::bad_request("output address is required"));
            }
            if o.coins.is_empty() {
                return Err(ApiError::bad_request("output coins are required"));
            }
            if o.hours.is_empty() {
                return Err(ApiError::bad_request("output hours are required"));
            }

            validate_address(&o.address).map_err(ApiError::unprocessable)?;
            let coin = parse_droplets(&o.coins).map_err(ApiError::unprocessable)?;
            let hour = o
                .hours
                .parse::<u64>()
                .map_err(|e| ApiError::unprocessable(format!("invalid hours: {e}")))?;

            outputs.push(SkycoinTransactionOutput {
                address: o.address,
                address_index: o.address_index,
                coin,
                hour,
            });
        }

        Ok((inputs, outputs))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PinMatrixBody {
    pub pin: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PassphraseBody {
    pub passphrase: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct WordBody {
    pub word: String,
}
