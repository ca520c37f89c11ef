#![allow(dead_code)]

use std::{
    collections::VecDeque,
    str::FromStr,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    Router,
};
use log::{debug, LevelFilter};
use serde_json::Value;
use simplelog::SimpleLogger;
use tower::ServiceExt;

use hw_daemon::{
    api::{self, ApiState, ServerConfig},
    csrf::CsrfTokens,
    proto::{messages, Message, MessageKind},
    Error, Gateway, Session,
};

/// Setup logging, level from `LOG_LEVEL` (defaults to debug)
pub fn setup_logging() {
    let log_level = match std::env::var("LOG_LEVEL").map(|v| LevelFilter::from_str(&v)) {
        Ok(Ok(l)) => l,
        _ => LevelFilter::Debug,
    };

    let _ = SimpleLogger::init(log_level, simplelog::Config::default());
}

/// Scripted device reply
pub enum Reply {
    /// Respond with a message
    Message(Message),
    /// Fail with a transport error
    Error(&'static str),
    /// Never respond
    Pending,
}

/// Mock session replaying scripted replies and recording requests
#[derive(Default)]
pub struct MockSession {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<Message>>,
    disconnects: AtomicUsize,
    fail_disconnect: AtomicBool,
}

impl MockSession {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            ..Default::default()
        })
    }

    /// Kinds of requests received so far
    pub fn requests(&self) -> Vec<MessageKind> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.kind().unwrap())
            .collect()
    }

    /// Decode the `n`th request
    pub fn request<M: hw_daemon::proto::prost::Message + Default>(&self, n: usize) -> M {
        self.requests.lock().unwrap()[n].decode().unwrap()
    }

    /// Number of requests of the provided kind
    pub fn count(&self, kind: MessageKind) -> usize {
        self.requests().iter().filter(|k| **k == kind).count()
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    /// Make subsequent disconnects fail
    pub fn fail_disconnect(&self) {
        self.fail_disconnect.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Session for MockSession {
    async fn call(&self, req: Message) -> Result<Message, Error> {
        debug!("Mock request: {}", req.kind_name());

        self.requests.lock().unwrap().push(req);
        let reply = self.replies.lock().unwrap().pop_front();

        match reply {
            Some(Reply::Message(m)) => Ok(m),
            Some(Reply::Error(e)) => Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                e,
            ))),
            Some(Reply::Pending) => std::future::pending().await,
            None => Err(Error::NoDevice),
        }
    }

    async fn disconnect(&self) -> Result<(), Error> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);

        match self.fail_disconnect.load(Ordering::SeqCst) {
            true => Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "disconnect failed",
            ))),
            false => Ok(()),
        }
    }
}

pub fn success(message: &str) -> Reply {
    Reply::Message(Message::new(
        MessageKind::Success,
        &messages::Success {
            message: Some(message.to_string()),
        },
    ))
}

pub fn failure(message: &str) -> Reply {
    Reply::Message(Message::new(
        MessageKind::Failure,
        &messages::Failure {
            code: None,
            message: Some(message.to_string()),
        },
    ))
}

pub fn button_request() -> Reply {
    Reply::Message(Message::new(
        MessageKind::ButtonRequest,
        &messages::ButtonRequest::default(),
    ))
}

pub fn pin_matrix_request() -> Reply {
    Reply::Message(Message::new(
        MessageKind::PinMatrixRequest,
        &messages::PinMatrixRequest::default(),
    ))
}

pub fn passphrase_request() -> Reply {
    Reply::Message(Message::new(
        MessageKind::PassphraseRequest,
        &messages::PassphraseRequest {},
    ))
}

pub fn word_request() -> Reply {
    Reply::Message(Message::new(
        MessageKind::WordRequest,
        &messages::WordRequest {},
    ))
}

pub fn addresses(addresses: &[&str]) -> Reply {
    Reply::Message(Message::new(
        MessageKind::ResponseSkycoinAddress,
        &messages::ResponseSkycoinAddress {
            addresses: addresses.iter().map(|a| a.to_string()).collect(),
        },
    ))
}

pub fn signatures(signatures: &[&str]) -> Reply {
    Reply::Message(Message::new(
        MessageKind::ResponseTransactionSign,
        &messages::ResponseTransactionSign {
            signatures: signatures.iter().map(|s| s.to_string()).collect(),
            padding: None,
        },
    ))
}

pub fn features(label: &str) -> Reply {
    Reply::Message(Message::new(
        MessageKind::Features,
        &messages::Features {
            vendor: Some("Skycoin Foundation".to_string()),
            label: Some(label.to_string()),
            initialized: Some(true),
            ..Default::default()
        },
    ))
}

/// Build a valid address from a 20 byte key
pub fn address(key: [u8; 20]) -> String {
    use sha2::{Digest, Sha256};

    let mut b = key.to_vec();
    b.push(0);
    let sum = Sha256::digest(&b);
    b.extend_from_slice(&sum[..4]);

    bs58::encode(b).into_string()
}

/// Build an API router over mock sessions, with header checks disabled
pub fn app(
    usb: Arc<MockSession>,
    emulator: Arc<MockSession>,
    csrf: Option<Arc<CsrfTokens>>,
) -> Router {
    let config = ServerConfig {
        header_check: false,
        ..Default::default()
    };

    app_with_config(config, usb, emulator, csrf)
}

pub fn app_with_config(
    config: ServerConfig,
    usb: Arc<MockSession>,
    emulator: Arc<MockSession>,
    csrf: Option<Arc<CsrfTokens>>,
) -> Router {
    setup_logging();

    api::router(
        config,
        ApiState {
            usb: Gateway::new(usb),
            emulator: Gateway::new(emulator),
            csrf,
        },
    )
}

/// Issue a request with a JSON body (if provided), returning status and envelope
pub async fn request(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    headers: &[(&str, &str)],
) -> (StatusCode, Value) {
    match body {
        Some(b) => {
            request_raw(
                app,
                method,
                uri,
                Some("application/json"),
                b.to_string(),
                headers,
            )
            .await
        }
        None => request_raw(app, method, uri, None, String::new(), headers).await,
    }
}

/// Issue a request with a raw body and content type
pub async fn request_raw(
    app: &Router,
    method: Method,
    uri: &str,
    content_type: Option<&str>,
    body: String,
    headers: &[(&str, &str)],
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(c) = content_type {
        req = req.header(CONTENT_TYPE, c);
    }
    for (k, v) in headers {
        req = req.header(*k, *v);
    }

    let resp = app
        .clone()
        .oneshot(req.body(Body::from(body)).unwrap())
        .await
        .unwrap();

    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();

    (status, serde_json::from_slice(&body).unwrap())
}
