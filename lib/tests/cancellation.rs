use std::time::Duration;

use axum::http::StatusCode;
use tokio_util::sync::CancellationToken;

use hw_daemon::{
    api::ApiError, gateway, proto::MessageKind, serializer::Serializer, Error, Gateway, Session,
};

mod helpers;
use helpers::*;

#[tokio::test]
async fn client_cancel_disconnects() {
    setup_logging();

    let s = MockSession::new([Reply::Pending]);
    let token = CancellationToken::new();

    let op = tokio::spawn(gateway::run(s.clone(), token.clone(), |s| async move {
        s.backup().await
    }));

    tokio::time::sleep(Duration::from_millis(20)).await;
    token.cancel();

    let r = op.await.unwrap();
    assert!(matches!(r, Err(Error::ClientClosed)));
    assert_eq!(s.disconnects(), 1);

    let e = ApiError::from(r.unwrap_err());
    assert_eq!(e.status.as_u16(), 499);
}

#[tokio::test]
async fn failed_disconnect_is_server_error() {
    let s = MockSession::new([Reply::Pending]);
    s.fail_disconnect();
    let token = CancellationToken::new();

    let op = tokio::spawn(gateway::run(s.clone(), token.clone(), |s| async move {
        s.wipe().await
    }));

    tokio::time::sleep(Duration::from_millis(20)).await;
    token.cancel();

    let r = op.await.unwrap();
    assert!(matches!(r, Err(Error::Io(_))));
    assert_eq!(s.disconnects(), 1);

    let e = ApiError::from(r.unwrap_err());
    assert_eq!(e.status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn completed_operation_does_not_disconnect() {
    let s = MockSession::new([success("ok")]);
    let token = CancellationToken::new();

    let r = gateway::run(s.clone(), token.clone(), |s| async move { s.backup().await }).await;
    assert!(r.is_ok());

    token.cancel();
    assert_eq!(s.disconnects(), 0);
}

#[tokio::test]
async fn dropped_request_disconnects() {
    let s = MockSession::new([Reply::Pending]);
    let gw = Gateway::new(s.clone());

    // Caller gives up while the device call is outstanding
    let r = tokio::time::timeout(
        Duration::from_millis(50),
        gw.execute("backup", |s| async move { s.backup().await }),
    )
    .await;
    assert!(r.is_err());

    // Teardown completes in the background
    for _ in 0..100 {
        if s.disconnects() > 0 && gw.serializer().is_free() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(s.disconnects(), 1);
    assert!(gw.serializer().is_free());
}

#[tokio::test]
async fn dropped_request_during_cancel_disconnects() {
    setup_logging();

    // Cancel sent to preempt the holder is never answered
    let s = MockSession::new([Reply::Pending]);
    let gw = Gateway::new(s.clone());

    let holder = gw.serializer().acquire(&*s).await.unwrap();

    let r = tokio::time::timeout(
        Duration::from_millis(50),
        gw.execute("wipe", |s| async move { s.wipe().await }),
    )
    .await;
    assert!(r.is_err());

    for _ in 0..100 {
        if s.disconnects() > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(s.disconnects(), 1);
    assert_eq!(s.requests(), vec![MessageKind::Cancel]);

    // Slot stays with its holder
    assert!(!gw.serializer().is_free());
    drop(holder);
    assert!(gw.serializer().is_free());
}

#[tokio::test]
async fn cancelled_acquire_is_client_closed() {
    let s = MockSession::new([Reply::Pending]);
    let ser = Serializer::new();
    let token = CancellationToken::new();

    let _holder = ser.acquire(&*s).await.unwrap();

    let op = {
        let (s, ser, token) = (s.clone(), ser.clone(), token.clone());
        tokio::spawn(async move { gateway::acquire(&ser, &*s, &token).await.map(|_| ()) })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    token.cancel();

    let r = op.await.unwrap();
    assert!(matches!(r, Err(Error::ClientClosed)));
    assert_eq!(s.disconnects(), 1);
}
