// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Device gateway
//!
//! A [Gateway] binds a [Session] to its [Serializer] and executes wallet
//! operations on behalf of HTTP handlers. Operations complete in a
//! detached task; a dropped caller (closed client connection) fires the
//! operation's cancellation token, which disconnects the device.

use std::{future::Future, sync::Arc};

use log::{debug, warn};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use hw_daemon_proto::Message;

use crate::{
    dispatch::{self, Resolution},
    serializer::{Serializer, SlotGuard},
    Error, Session,
};

/// Run a device operation to its [Resolution], racing it against `cancel`.
///
/// On cancellation the device is disconnected once and
/// [Error::ClientClosed] is returned, unless the disconnect itself fails.
pub async fn run<S, F, Fut>(
    session: Arc<S>,
    cancel: CancellationToken,
    op: F,
) -> Result<Resolution, Error>
where
    S: Session + ?Sized,
    F: FnOnce(Arc<S>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<Message, Error>> + Send + 'static,
{
    let s = session.clone();
    let task = tokio::spawn(async move {
        let resp = op(s.clone()).await?;
        dispatch::resolve(&*s, resp).await
    });

    tokio::select! {
        r = task => r?,
        _ = cancel.cancelled() => {
            warn!("Request cancelled, disconnecting device");
            session.disconnect().await?;
            Err(Error::ClientClosed)
        }
    }
}

/// Acquire the device slot, racing a contended Cancel against `cancel`.
///
/// On cancellation the device is disconnected once and
/// [Error::ClientClosed] is returned; the slot stays with its holder.
pub async fn acquire<S>(
    serializer: &Serializer,
    session: &S,
    cancel: &CancellationToken,
) -> Result<SlotGuard, Error>
where
    S: Session + ?Sized,
{
    tokio::select! {
        g = serializer.acquire(session) => g,
        _ = cancel.cancelled() => {
            warn!("Request cancelled while acquiring device, disconnecting");
            session.disconnect().await?;
            Err(Error::ClientClosed)
        }
    }
}

/// Gateway executing operations against a single device
#[derive(Clone)]
pub struct Gateway {
    session: Arc<dyn Session>,
    serializer: Serializer,
}

impl Gateway {
    pub fn new(session: Arc<dyn Session>) -> Self {
        Self {
            session,
            serializer: Serializer::new(),
        }
    }

    /// Session for the bound device
    pub fn session(&self) -> &Arc<dyn Session> {
        &self.session
    }

    /// Serializer for the bound device
    pub fn serializer(&self) -> &Serializer {
        &self.serializer
    }

    /// Execute an operation holding the device slot until it resolves
    pub async fn execute<F, Fut>(&self, name: &'static str, op: F) -> Result<Resolution, Error>
    where
        F: FnOnce(Arc<dyn Session>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Message, Error>> + Send + 'static,
    {
        self.spawn(name, Some(self.serializer.clone()), op).await
    }

    /// Execute an operation without taking the device slot
    pub async fn execute_unserialized<F, Fut>(
        &self,
        name: &'static str,
        op: F,
    ) -> Result<Resolution, Error>
    where
        F: FnOnce(Arc<dyn Session>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Message, Error>> + Send + 'static,
    {
        self.spawn(name, None, op).await
    }

    async fn spawn<F, Fut>(
        &self,
        name: &'static str,
        serializer: Option<Serializer>,
        op: F,
    ) -> Result<Resolution, Error>
    where
        F: FnOnce(Arc<dyn Session>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Message, Error>> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let abort_on_drop = cancel.clone().drop_guard();
        let (tx, rx) = oneshot::channel();

        debug!("Starting {}", name);

        let session = self.session.clone();
        tokio::spawn(async move {
            let r = supervise(session, serializer, cancel, op).await;

            if tx.send(r).is_err() {
                debug!("{}: caller gone, discarding result", name);
            }
        });

        let r = rx
            .await
            .map_err(|_| Error::Task(format!("{name} task dropped")))?;

        abort_on_drop.disarm();

        r
    }
}

async fn supervise<F, Fut>(
    session: Arc<dyn Session>,
    serializer: Option<Serializer>,
    cancel: CancellationToken,
    op: F,
) -> Result<Resolution, Error>
where
    F: FnOnce(Arc<dyn Session>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<Message, Error>> + Send + 'static,
{
    // Slot is held until the operation resolves or is torn down
    let _guard = match &serializer {
        Some(s) => Some(acquire(s, &*session, &cancel).await?),
        None => None,
    };

    run(session, cancel, op).await
}
