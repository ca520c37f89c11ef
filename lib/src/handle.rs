// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Handle for connected hardware wallets
//!
//! This implements [Session] over any [Connect] provider, opening the
//! transport lazily on first use and re-opening it after disconnects.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use log::{debug, warn};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use hw_daemon_proto::{
    messages::{Cancel, Failure},
    FailureType, Message, MessageKind,
};

use crate::{
    transport::{Connect, Transport},
    Error, Session,
};

/// Default timeout for a device exchange to yield after a [Cancel]
pub const DEFAULT_USER_TIMEOUT: Duration = Duration::from_secs(10);

/// Session handle for a hardware wallet reachable via [Connect].
pub struct DeviceHandle<C: Connect> {
    connector: C,
    /// Open transport, if any
    conn: Mutex<Option<Arc<C::Transport>>>,
    /// Held for the duration of a request/response exchange
    exchange: Mutex<()>,
    /// Fired on disconnect to abort outstanding exchanges
    abort: std::sync::Mutex<CancellationToken>,
    /// Timeout for the device to yield after a cancellation
    user_timeout: Duration,
}

/// Create a [DeviceHandle] wrapper from a type implementing [Connect]
impl<C: Connect> From<C> for DeviceHandle<C> {
    fn from(connector: C) -> Self {
        Self {
            connector,
            conn: Mutex::new(None),
            exchange: Mutex::new(()),
            abort: std::sync::Mutex::new(CancellationToken::new()),
            user_timeout: DEFAULT_USER_TIMEOUT,
        }
    }
}

impl<C: Connect> DeviceHandle<C> {
    /// Set the timeout for the device to yield after a cancellation
    pub fn with_user_timeout(mut self, user_timeout: Duration) -> Self {
        self.user_timeout = user_timeout;
        self
    }

    /// Fetch the open transport, connecting if required
    async fn transport(&self) -> Result<Arc<C::Transport>, Error> {
        let mut conn = self.conn.lock().await;

        if let Some(t) = conn.as_ref() {
            return Ok(t.clone());
        }

        debug!("Opening device transport");

        let t = Arc::new(self.connector.connect().await?);
        *conn = Some(t.clone());

        Ok(t)
    }

    /// Drop the open transport so the next call reconnects
    async fn close(&self) {
        if self.conn.lock().await.take().is_some() {
            debug!("Closed device transport");
        }
    }

    fn abort_token(&self) -> CancellationToken {
        match self.abort.lock() {
            Ok(t) => t.clone(),
            Err(p) => p.into_inner().clone(),
        }
    }

    /// Perform a request/response exchange, the caller must hold the exchange lock
    async fn exchange_locked(&self, req: &Message) -> Result<Message, Error> {
        let abort = self.abort_token();
        let t = self.transport().await?;

        debug!("Sending {}", req.kind_name());

        let exchange = async {
            t.write_message(req).await?;
            t.read_message().await
        };

        let resp = tokio::select! {
            r = exchange => r,
            _ = abort.cancelled() => Err(Error::Disconnected),
        };

        match &resp {
            Ok(m) => debug!("Received {}", m.kind_name()),
            Err(e) => {
                warn!("Device exchange failed: {}", e);
                self.close().await;
            }
        }

        resp
    }
}

#[async_trait]
impl<C: Connect> Session for DeviceHandle<C> {
    async fn call(&self, req: Message) -> Result<Message, Error> {
        let _exchange = self.exchange.lock().await;
        self.exchange_locked(&req).await
    }

    async fn disconnect(&self) -> Result<(), Error> {
        debug!("Disconnecting device");

        let prev = match self.abort.lock() {
            Ok(mut t) => std::mem::take(&mut *t),
            Err(p) => std::mem::take(&mut *p.into_inner()),
        };
        prev.cancel();

        self.close().await;

        Ok(())
    }

    /// Cancel the current operation, preempting any in-flight exchange
    async fn cancel(&self) -> Result<Message, Error> {
        let req = Message::new(MessageKind::Cancel, &Cancel {});

        // Idle device, cancel as a normal exchange
        if let Ok(_exchange) = self.exchange.try_lock() {
            return self.exchange_locked(&req).await;
        }

        // Otherwise write the cancel out of band so the device fails the
        // outstanding request, then wait for that exchange to finish
        debug!("Device busy, sending out of band Cancel");

        let t = self.transport().await?;
        t.write_message(&req).await?;

        let _exchange = tokio::time::timeout(self.user_timeout, self.exchange.lock()).await?;

        Ok(Message::new(
            MessageKind::Failure,
            &Failure {
                code: Some(FailureType::ActionCancelled as i32),
                message: Some("Action cancelled by user".to_string()),
            },
        ))
    }
}
