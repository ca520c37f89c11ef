// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Device session abstraction
//!
//! A [Session] exchanges one request [Message] for one response [Message]
//! with a device. Wallet operations are provided on top of this as
//! request builders, so alternate sessions (emulators, test doubles)
//! need only implement [Session::call] and [Session::disconnect].

use async_trait::async_trait;
use log::debug;

use hw_daemon_proto::{
    messages::{
        ApplySettings, BackupDevice, ButtonAck, Cancel, ChangePin, GenerateMnemonic, GetFeatures,
        PassphraseAck, PinMatrixAck, RecoveryDevice, SetMnemonic, SkycoinAddress,
        SkycoinCheckMessageSignature, SkycoinSignMessage, SkycoinTransactionInput,
        SkycoinTransactionOutput, TransactionSign, WipeDevice, WordAck,
    },
    Message, MessageKind,
};

use crate::Error;

/// Device settings applied via [Session::apply_settings]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Settings {
    pub label: Option<String>,
    pub language: Option<String>,
    pub use_passphrase: Option<bool>,
}

/// Request/response session with a hardware wallet
#[async_trait]
pub trait Session: Send + Sync + 'static {
    /// Send a request and await the device response
    async fn call(&self, req: Message) -> Result<Message, Error>;

    /// Tear down the underlying connection, aborting any outstanding call
    async fn disconnect(&self) -> Result<(), Error>;

    /// Ask the device to abandon the current operation
    async fn cancel(&self) -> Result<Message, Error> {
        debug!("Sending Cancel");
        self.call(Message::new(MessageKind::Cancel, &Cancel {}))
            .await
    }

    /// Acknowledge a button request
    async fn button_ack(&self) -> Result<Message, Error> {
        self.call(Message::new(MessageKind::ButtonAck, &ButtonAck {}))
            .await
    }

    /// Answer a PIN matrix request with the scrambled PIN
    async fn pin_matrix_ack(&self, pin: &str) -> Result<Message, Error> {
        let req = PinMatrixAck {
            pin: pin.to_string(),
        };
        self.call(Message::new(MessageKind::PinMatrixAck, &req))
            .await
    }

    /// Answer a passphrase request
    async fn passphrase_ack(&self, passphrase: &str) -> Result<Message, Error> {
        let req = PassphraseAck {
            passphrase: passphrase.to_string(),
        };
        self.call(Message::new(MessageKind::PassphraseAck, &req))
            .await
    }

    /// Answer a recovery word request
    async fn word_ack(&self, word: &str) -> Result<Message, Error> {
        let req = WordAck {
            word: word.to_string(),
        };
        self.call(Message::new(MessageKind::WordAck, &req)).await
    }

    /// Fetch device features
    async fn features(&self) -> Result<Message, Error> {
        self.call(Message::new(MessageKind::GetFeatures, &GetFeatures {}))
            .await
    }

    /// Derive `address_n` addresses beginning at `start_index`
    async fn address_gen(
        &self,
        address_n: u32,
        start_index: u32,
        confirm_address: bool,
    ) -> Result<Message, Error> {
        debug!(
            "Requesting {} addresses from index {} (confirm: {})",
            address_n, start_index, confirm_address
        );

        let req = SkycoinAddress {
            address_n,
            start_index: Some(start_index),
            confirm_address: Some(confirm_address),
        };
        self.call(Message::new(MessageKind::SkycoinAddress, &req))
            .await
    }

    /// Update device label, language or passphrase protection
    async fn apply_settings(&self, settings: Settings) -> Result<Message, Error> {
        let req = ApplySettings {
            label: settings.label,
            language: settings.language,
            use_passphrase: settings.use_passphrase,
        };
        self.call(Message::new(MessageKind::ApplySettings, &req))
            .await
    }

    /// Start mnemonic backup
    async fn backup(&self) -> Result<Message, Error> {
        self.call(Message::new(MessageKind::BackupDevice, &BackupDevice {}))
            .await
    }

    /// Check a message signature against an address
    async fn check_message_signature(
        &self,
        message: String,
        signature: String,
        address: String,
    ) -> Result<Message, Error> {
        let req = SkycoinCheckMessageSignature {
            address,
            message,
            signature,
        };
        self.call(Message::new(
            MessageKind::SkycoinCheckMessageSignature,
            &req,
        ))
        .await
    }

    /// Set, change or remove the device PIN
    async fn change_pin(&self, remove: bool) -> Result<Message, Error> {
        let req = ChangePin {
            remove: remove.then_some(true),
        };
        self.call(Message::new(MessageKind::ChangePin, &req)).await
    }

    /// Have the device generate a fresh mnemonic
    async fn generate_mnemonic(
        &self,
        word_count: u32,
        use_passphrase: bool,
    ) -> Result<Message, Error> {
        let req = GenerateMnemonic {
            word_count: Some(word_count),
            passphrase_protection: Some(use_passphrase),
        };
        self.call(Message::new(MessageKind::GenerateMnemonic, &req))
            .await
    }

    /// Recover a wallet from a mnemonic entered word by word
    async fn recovery(
        &self,
        word_count: u32,
        use_passphrase: bool,
        dry_run: bool,
    ) -> Result<Message, Error> {
        let req = RecoveryDevice {
            word_count: Some(word_count),
            passphrase_protection: Some(use_passphrase),
            dry_run: Some(dry_run),
        };
        self.call(Message::new(MessageKind::RecoveryDevice, &req))
            .await
    }

    /// Load a mnemonic onto the device
    async fn set_mnemonic(&self, mnemonic: String) -> Result<Message, Error> {
        let req = SetMnemonic { mnemonic };
        self.call(Message::new(MessageKind::SetMnemonic, &req))
            .await
    }

    /// Sign a message with the key at `address_n`
    async fn sign_message(&self, address_n: u32, message: String) -> Result<Message, Error> {
        let req = SkycoinSignMessage { address_n, message };
        self.call(Message::new(MessageKind::SkycoinSignMessage, &req))
            .await
    }

    /// Sign a transaction
    async fn transaction_sign(
        &self,
        inputs: Vec<SkycoinTransactionInput>,
        outputs: Vec<SkycoinTransactionOutput>,
    ) -> Result<Message, Error> {
        debug!(
            "Signing transaction with {} inputs, {} outputs",
            inputs.len(),
            outputs.len()
        );

        let req = TransactionSign {
            nb_in: inputs.len() as u32,
            transaction_in: inputs,
            nb_out: outputs.len() as u32,
            transaction_out: outputs,
        };
        self.call(Message::new(MessageKind::TransactionSign, &req))
            .await
    }

    /// Erase the device
    async fn wipe(&self) -> Result<Message, Error> {
        self.call(Message::new(MessageKind::WipeDevice, &WipeDevice {}))
            .await
    }
}
