// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Interaction dispatcher
//!
//! Drives a device response to a terminal [Resolution], acknowledging
//! button requests along the way.

use log::{debug, warn};
use serde::Serialize;

use hw_daemon_proto::{
    messages::{
        Failure, Features, ResponseSkycoinAddress, ResponseSkycoinSignMessage,
        ResponseTransactionSign, Success,
    },
    Message, MessageKind,
};

use crate::{Error, Session};

/// User input the device is waiting on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, strum::Display)]
pub enum Interaction {
    PinMatrixRequest,
    PassphraseRequest,
    WordRequest,
}

/// Data returned by a completed operation
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    /// Success message text
    Message(String),
    /// Derived addresses
    Addresses { addresses: Vec<String> },
    /// Message signature
    Signature { signature: String },
    /// Transaction input signatures
    Signatures { signatures: Vec<String> },
    /// Device features
    Features { features: Box<Features> },
}

/// Terminal state of a device interaction
#[derive(Clone, Debug, PartialEq)]
pub enum Resolution {
    /// Operation completed
    Complete(Payload),
    /// Device paused pending user input
    Interaction(Interaction),
    /// Device refused the operation, with the failure text
    Failure(String),
}

fn decode<M: hw_daemon_proto::prost::Message + Default>(
    msg: &Message,
    kind: MessageKind,
) -> Result<M, Error> {
    msg.decode().map_err(|err| Error::Decode { kind, err })
}

/// Resolve a device response, acknowledging button requests until a
/// terminal message arrives
pub async fn resolve<S: Session + ?Sized>(session: &S, mut msg: Message) -> Result<Resolution, Error> {
    let mut acks = 0usize;

    loop {
        let kind = match msg.kind() {
            Ok(k) => k,
            Err(raw) => {
                warn!("Unknown response kind: {}", raw);
                return Err(Error::UnexpectedMessage(msg.kind_name()));
            }
        };

        let r = match kind {
            MessageKind::ButtonRequest => {
                acks += 1;
                debug!("Button request ({}), sending ButtonAck", acks);
                msg = session.button_ack().await?;
                continue;
            }
            MessageKind::PinMatrixRequest => Resolution::Interaction(Interaction::PinMatrixRequest),
            MessageKind::PassphraseRequest => {
                Resolution::Interaction(Interaction::PassphraseRequest)
            }
            MessageKind::WordRequest => Resolution::Interaction(Interaction::WordRequest),
            MessageKind::Failure => {
                let f: Failure = decode(&msg, kind)?;
                Resolution::Failure(f.message.unwrap_or_default())
            }
            MessageKind::Success => {
                let s: Success = decode(&msg, kind)?;
                Resolution::Complete(Payload::Message(s.message.unwrap_or_default()))
            }
            MessageKind::ResponseSkycoinAddress => {
                let r: ResponseSkycoinAddress = decode(&msg, kind)?;
                Resolution::Complete(Payload::Addresses {
                    addresses: r.addresses,
                })
            }
            MessageKind::ResponseSkycoinSignMessage => {
                let r: ResponseSkycoinSignMessage = decode(&msg, kind)?;
                Resolution::Complete(Payload::Signature {
                    signature: r.signed_message,
                })
            }
            MessageKind::ResponseTransactionSign => {
                let r: ResponseTransactionSign = decode(&msg, kind)?;
                Resolution::Complete(Payload::Signatures {
                    signatures: r.signatures,
                })
            }
            MessageKind::Features => {
                let f: Features = decode(&msg, kind)?;
                Resolution::Complete(Payload::Features {
                    features: Box::new(f),
                })
            }
            other => {
                warn!("Unexpected response kind: {}", other);
                return Err(Error::UnexpectedMessage(other.to_string()));
            }
        };

        return Ok(r);
    }
}
