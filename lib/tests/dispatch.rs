use axum::http::{Method, StatusCode};
use serde_json::json;

use hw_daemon::{
    dispatch::{Interaction, Resolution},
    proto::{messages, Message, MessageKind},
    Gateway, Session,
};

mod helpers;
use helpers::*;

#[tokio::test]
async fn button_requests_are_acknowledged() {
    let usb = MockSession::new([button_request(), button_request(), success("Device wiped")]);
    let app = app(usb.clone(), MockSession::new([]), None);

    let (status, body) = request(&app, Method::DELETE, "/api/v1/wipe", None, &[]).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"error": null, "data": "Device wiped"}));
    assert_eq!(
        usb.requests(),
        vec![
            MessageKind::WipeDevice,
            MessageKind::ButtonAck,
            MessageKind::ButtonAck
        ]
    );
}

#[tokio::test]
async fn interaction_releases_slot() {
    setup_logging();

    let usb = MockSession::new([pin_matrix_request(), success("Cancelled")]);
    let gw = Gateway::new(usb.clone());

    let r = gw
        .execute("setPinCode", |s| async move { s.change_pin(false).await })
        .await
        .unwrap();
    assert_eq!(r, Resolution::Interaction(Interaction::PinMatrixRequest));

    // Slot is free, a second operation acquires without cancelling
    assert!(gw.serializer().is_free());
    let _g = gw.serializer().acquire(&*usb).await.unwrap();
    assert_eq!(usb.count(MessageKind::Cancel), 0);
}

#[tokio::test]
async fn pin_matrix_flow() {
    let usb = MockSession::new([pin_matrix_request(), pin_matrix_request(), success("PIN changed")]);
    let app = app(usb.clone(), MockSession::new([]), None);

    let (status, body) = request(&app, Method::POST, "/api/v1/setPinCode", None, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"error": null, "data": {"request_type": "PinMatrixRequest"}})
    );

    // First entry, device asks for confirmation
    let (status, body) = request(
        &app,
        Method::POST,
        "/api/v1/intermediate/pinmatrix",
        Some(json!({"pin": "123"})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["request_type"], "PinMatrixRequest");

    // Confirmation completes the operation
    let (status, body) = request(
        &app,
        Method::POST,
        "/api/v1/intermediate/pinmatrix",
        Some(json!({"pin": "123"})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], "PIN changed");

    assert_eq!(
        usb.requests(),
        vec![
            MessageKind::ChangePin,
            MessageKind::PinMatrixAck,
            MessageKind::PinMatrixAck
        ]
    );
    let ack: messages::PinMatrixAck = usb.request(1);
    assert_eq!(ack.pin, "123");
}

#[tokio::test]
async fn recovery_word_flow() {
    let usb = MockSession::new([word_request(), passphrase_request(), success("Device recovered")]);
    let app = app(usb.clone(), MockSession::new([]), None);

    let (_, body) = request(
        &app,
        Method::POST,
        "/api/v1/recovery",
        Some(json!({"word_count": 12, "use_passphrase": true})),
        &[],
    )
    .await;
    assert_eq!(body["data"]["request_type"], "WordRequest");

    let (_, body) = request(
        &app,
        Method::POST,
        "/api/v1/intermediate/word",
        Some(json!({"word": "abandon"})),
        &[],
    )
    .await;
    assert_eq!(body["data"]["request_type"], "PassphraseRequest");

    let (status, body) = request(
        &app,
        Method::POST,
        "/api/v1/intermediate/passphrase",
        Some(json!({"passphrase": ""})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], "Device recovered");

    let req: messages::RecoveryDevice = usb.request(0);
    assert_eq!(req.word_count, Some(12));
    assert_eq!(req.passphrase_protection, Some(true));
    assert_eq!(req.dry_run, Some(false));
}

#[tokio::test]
async fn failure_is_conflict() {
    let usb = MockSession::new([failure("PIN mismatch")]);
    let app = app(usb, MockSession::new([]), None);

    let (status, body) = request(&app, Method::POST, "/api/v1/setPinCode", None, &[]).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body,
        json!({"error": {"code": 409, "message": "PIN mismatch"}, "data": null})
    );
}

#[tokio::test]
async fn unknown_kind_is_server_error() {
    let usb = MockSession::new([Reply::Message(Message::from_raw(999, vec![]))]);
    let app = app(usb, MockSession::new([]), None);

    let (status, body) = request(&app, Method::POST, "/api/v1/backup", None, &[]).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], 500);
    assert!(body["error"]["message"].as_str().unwrap().contains("999"));
    assert_eq!(body["data"], serde_json::Value::Null);
}

#[tokio::test]
async fn unhandled_kind_is_server_error() {
    // Known kind, but not a valid response
    let usb = MockSession::new([Reply::Message(Message::new(
        MessageKind::Initialize,
        &messages::Initialize {},
    ))]);
    let app = app(usb, MockSession::new([]), None);

    let (status, body) = request(&app, Method::POST, "/api/v1/backup", None, &[]).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Initialize"));
}

#[tokio::test]
async fn undecodable_success() {
    let usb = MockSession::new([Reply::Message(Message::from_raw(
        MessageKind::Success as u16,
        vec![0xff, 0xff],
    ))]);
    let app = app(usb, MockSession::new([]), None);

    let (status, _body) = request(&app, Method::POST, "/api/v1/backup", None, &[]).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn transport_error() {
    let usb = MockSession::new([button_request(), Reply::Error("device unplugged")]);
    let app = app(usb, MockSession::new([]), None);

    let (status, body) = request(&app, Method::POST, "/api/v1/backup", None, &[]).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("device unplugged"));
}

#[tokio::test]
async fn result_payloads() {
    let usb = MockSession::new([
        addresses(&["2EU3JbveHdkxW6z5tdhbbB2kRAWvXC2pLzw"]),
        features("my wallet"),
        Reply::Message(Message::new(
            MessageKind::ResponseSkycoinSignMessage,
            &messages::ResponseSkycoinSignMessage {
                signed_message: "abcd".to_string(),
            },
        )),
    ]);
    let app = app(usb.clone(), MockSession::new([]), None);

    let (status, body) = request(
        &app,
        Method::POST,
        "/api/v1/generateAddresses",
        Some(json!({"address_n": 1, "start_index": 3})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!({"addresses": ["2EU3JbveHdkxW6z5tdhbbB2kRAWvXC2pLzw"]})
    );

    let req: messages::SkycoinAddress = usb.request(0);
    assert_eq!(req.address_n, 1);
    assert_eq!(req.start_index, Some(3));
    assert_eq!(req.confirm_address, Some(false));

    let (status, body) = request(&app, Method::GET, "/api/v1/features", None, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["features"]["vendor"], "Skycoin Foundation");
    assert_eq!(body["data"]["features"]["label"], "my wallet");
    assert_eq!(body["data"]["features"]["initialized"], true);

    let (status, body) = request(
        &app,
        Method::POST,
        "/api/v1/signMessage",
        Some(json!({"address_n": 0, "message": "hello"})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({"signature": "abcd"}));
}

#[tokio::test]
async fn transaction_sign() {
    let to = address([9u8; 20]);
    let usb = MockSession::new([button_request(), signatures(&["sig0", "sig1"])]);
    let app = app(usb.clone(), MockSession::new([]), None);

    let (status, body) = request(
        &app,
        Method::POST,
        "/api/v1/transactionSign",
        Some(json!({
            "transaction_inputs": [
                {"hash": "ab".repeat(32), "index": 0},
                {"hash": "cd".repeat(32), "index": 1},
            ],
            "transaction_outputs": [
                {"address": to, "coins": "2.5", "hours": "17"},
            ],
        })),
        &[],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({"signatures": ["sig0", "sig1"]}));

    let req: messages::TransactionSign = usb.request(0);
    assert_eq!(req.nb_in, 2);
    assert_eq!(req.nb_out, 1);
    assert_eq!(req.transaction_out[0].address, to);
    assert_eq!(req.transaction_out[0].coin, 2_500_000);
    assert_eq!(req.transaction_out[0].hour, 17);
    assert_eq!(usb.count(MessageKind::ButtonAck), 1);
}
