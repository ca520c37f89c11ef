// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Device endpoint handlers
//!
//! Each handler validates its request, then executes the matching
//! [Session](crate::Session) operation through the bound [Gateway].

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use log::debug;

use super::{
    ok,
    requests::{
        ApplySettingsRequest, CheckMessageSignatureRequest, GenerateAddressesRequest,
        GenerateMnemonicRequest, JsonBody, PassphraseBody, PinMatrixBody, RecoveryRequest,
        SetMnemonicRequest, SetPinCodeRequest, SignMessageRequest, TransactionSignRequest,
        WordBody,
    },
    ApiError,
};
use crate::{dispatch::Resolution, gateway::Gateway, Session};

/// Derive addresses
pub async fn generate_addresses(
    State(gw): State<Gateway>,
    JsonBody(req): JsonBody<GenerateAddressesRequest>,
) -> Result<Resolution, ApiError> {
    let (address_n, start_index) = req.validate()?;
    let confirm = req.confirm_address;

    let r = gw
        .execute("generateAddresses", move |s| async move {
            s.address_gen(address_n, start_index, confirm).await
        })
        .await?;

    Ok(r)
}

pub async fn apply_settings(
    State(gw): State<Gateway>,
    JsonBody(req): JsonBody<ApplySettingsRequest>,
) -> Result<Resolution, ApiError> {
    let settings = req.validate()?;

    let r = gw
        .execute("applySettings", move |s| async move {
            s.apply_settings(settings).await
        })
        .await?;

    Ok(r)
}

pub async fn backup(State(gw): State<Gateway>) -> Result<Resolution, ApiError> {
    let r = gw
        .execute("backup", |s| async move { s.backup().await })
        .await?;

    Ok(r)
}

/// Cancel the current device operation
///
/// This bypasses the serializer so a parked or stuck operation can be
/// cancelled, a device Failure (the expected reply) is returned as data.
pub async fn cancel(State(gw): State<Gateway>) -> Result<Response, ApiError> {
    let r = gw
        .execute_unserialized("cancel", |s| async move { s.cancel().await })
        .await?;

    match r {
        Resolution::Failure(message) => {
            debug!("Cancel acknowledged: {}", message);
            Ok(ok(message))
        }
        other => Ok(other.into_response()),
    }
}

pub async fn check_message_signature(
    State(gw): State<Gateway>,
    JsonBody(req): JsonBody<CheckMessageSignatureRequest>,
) -> Result<Resolution, ApiError> {
    req.validate()?;

    let r = gw
        .execute("checkMessageSignature", move |s| async move {
            s.check_message_signature(req.message, req.signature, req.address)
                .await
        })
        .await?;

    Ok(r)
}

pub async fn features(State(gw): State<Gateway>) -> Result<Resolution, ApiError> {
    let r = gw
        .execute("features", |s| async move { s.features().await })
        .await?;

    Ok(r)
}

pub async fn generate_mnemonic(
    State(gw): State<Gateway>,
    JsonBody(req): JsonBody<GenerateMnemonicRequest>,
) -> Result<Resolution, ApiError> {
    req.validate()?;

    let r = gw
        .execute("generateMnemonic", move |s| async move {
            s.generate_mnemonic(req.word_count, req.use_passphrase)
                .await
        })
        .await?;

    Ok(r)
}

pub async fn recovery(
    State(gw): State<Gateway>,
    JsonBody(req): JsonBody<RecoveryRequest>,
) -> Result<Resolution, ApiError> {
    req.validate()?;

    let r = gw
        .execute("recovery", move |s| async move {
            s.recovery(req.word_count, req.use_passphrase, req.dry_run)
                .await
        })
        .await?;

    Ok(r)
}

pub async fn set_mnemonic(
    State(gw): State<Gateway>,
    JsonBody(req): JsonBody<SetMnemonicRequest>,
) -> Result<Resolution, ApiError> {
    req.validate()?;

    let r = gw
        .execute("setMnemonic", move |s| async move {
            s.set_mnemonic(req.mnemonic).await
        })
        .await?;

    Ok(r)
}

/// Set or change the PIN, or remove it with `?remove_pin=true`
pub async fn set_pin_code(
    State(gw): State<Gateway>,
    query: Option<Query<SetPinCodeRequest>>,
) -> Result<Resolution, ApiError> {
    let remove = query.map(|Query(q)| q.remove_pin).unwrap_or(false);

    let r = gw
        .execute("setPinCode", move |s| async move { s.change_pin(remove).await })
        .await?;

    Ok(r)
}

pub async fn sign_message(
    State(gw): State<Gateway>,
    JsonBody(req): JsonBody<SignMessageRequest>,
) -> Result<Resolution, ApiError> {
    let address_n = req.validate()?;

    let r = gw
        .execute("signMessage", move |s| async move {
            s.sign_message(address_n, req.message).await
        })
        .await?;

    Ok(r)
}

pub async fn transaction_sign(
    State(gw): State<Gateway>,
    JsonBody(req): JsonBody<TransactionSignRequest>,
) -> Result<Resolution, ApiError> {
    let (inputs, outputs) = req.validate()?;

    let r = gw
        .execute("transactionSign", move |s| async move {
            s.transaction_sign(inputs, outputs).await
        })
        .await?;

    Ok(r)
}

pub async fn wipe(State(gw): State<Gateway>) -> Result<Resolution, ApiError> {
    let r = gw
        .execute("wipe", |s| async move { s.wipe().await })
        .await?;

    Ok(r)
}

/// Resume a parked operation with the scrambled PIN
pub async fn pin_matrix(
    State(gw): State<Gateway>,
    JsonBody(req): JsonBody<PinMatrixBody>,
) -> Result<Resolution, ApiError> {
    if req.pin.is_empty() {
        return Err(ApiError::bad_request("pin is required"));
    }

    let r = gw
        .execute("pinMatrixAck", move |s| async move {
            s.pin_matrix_ack(&req.pin).await
        })
        .await?;

    Ok(r)
}

/// Resume a parked operation with the passphrase, which may be empty
pub async fn passphrase(
    State(gw): State<Gateway>,
    JsonBody(req): JsonBody<PassphraseBody>,
) -> Result<Resolution, ApiError> {
    let r = gw
        .execute("passphraseAck", move |s| async move {
            s.passphrase_ack(&req.passphrase).await
        })
        .await?;

    Ok(r)
}

/// Resume a parked recovery with the next word
pub async fn word(
    State(gw): State<Gateway>,
    JsonBody(req): JsonBody<WordBody>,
) -> Result<Resolution, ApiError> {
    if req.word.is_empty() {
        return Err(ApiError::bad_request("word is required"));
    }

    let r = gw
        .execute("wordAck", move |s| async move { s.word_ack(&req.word).await })
        .await?;

    Ok(r)
}
