#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! Integration tests for the async event driver.

use data_encoding::BASE64;
use fieldlock_crypto::{PinningSigner, RelayHandshake, SealedField, TrustedKeySet};
use fieldlock_frame::{
    event_channel, run_session, AppearanceLimits, ChannelTransport, EditEvent, FrameEvent,
    HeadlessSurface, SessionController, SessionState, TargetOrigin, EVENT_QUEUE_CAPACITY,
};
use serde_json::Value;

const SESSION: &str = "sess-driver";

fn query(handshake: &RelayHandshake) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("embedder", "https://shop.example")
        .append_pair("session_id", SESSION)
        .append_pair("pk", &BASE64.encode(handshake.public_key()))
        .append_pair("sig", &BASE64.encode(handshake.signature()))
        .append_pair("input_type", "credit_card_number")
        .finish()
}

#[tokio::test]
async fn changes_leave_in_keystroke_order() {
    let signer = PinningSigner::generate().unwrap();
    let relay = RelayHandshake::begin(&signer).unwrap();
    let q = query(&relay);

    let (transport, mut posted) = ChannelTransport::channel();
    let controller = SessionController::new(
        TrustedKeySet::new([signer.public_key()]).unwrap(),
        AppearanceLimits::default(),
        transport,
        HeadlessSurface::new(),
    );

    let (tx, rx) = event_channel(EVENT_QUEUE_CAPACITY);
    for c in "4111111111111111".chars() {
        tx.send(FrameEvent::Edit(EditEvent::Insert(c.to_string())))
            .await
            .unwrap();
    }
    tx.send(FrameEvent::NativeBlur).await.unwrap();
    drop(tx);

    let controller = run_session(controller, q, rx).await;
    assert_eq!(controller.state(), SessionState::Ready);
    assert_eq!(controller.display(), Some("4111 1111 1111 1111 "));

    let ready = posted.recv().await.unwrap();
    assert_eq!(ready.target, TargetOrigin::Exact("https://shop.example".into()));
    let ready: Value = serde_json::from_str(&ready.body).unwrap();
    let frame_pk = BASE64
        .decode(ready["ecdhPublicKey"].as_str().unwrap().as_bytes())
        .unwrap();
    let relay_session = relay.complete(&frame_pk, SESSION).unwrap();

    let mut expected = String::new();
    for c in "4111111111111111".chars() {
        expected.push(c);
        let change: Value = serde_json::from_str(&posted.recv().await.unwrap().body).unwrap();
        assert_eq!(change["type"], "change");
        let sealed: Vec<SealedField> = serde_json::from_value(change["encrypted"].clone()).unwrap();
        let plain = relay_session.open(&sealed[0]).unwrap();
        assert_eq!(plain.expose(), expected.as_bytes());
    }

    let last: Value = serde_json::from_str(&posted.recv().await.unwrap().body).unwrap();
    assert_eq!(last["type"], "blur");

    drop(controller);
    assert!(posted.recv().await.is_none());
}

#[tokio::test]
async fn failed_handshake_drains_queue() {
    let signer = PinningSigner::generate().unwrap();
    let rogue = PinningSigner::generate().unwrap();
    let relay = RelayHandshake::begin(&rogue).unwrap();

    let (transport, mut posted) = ChannelTransport::channel();
    let controller = SessionController::new(
        TrustedKeySet::new([signer.public_key()]).unwrap(),
        AppearanceLimits::default(),
        transport,
        HeadlessSurface::new(),
    );

    let (tx, rx) = event_channel(8);
    tx.send(FrameEvent::Edit(EditEvent::Insert("4".into())))
        .await
        .unwrap();
    tx.send(FrameEvent::NativeFocus).await.unwrap();
    drop(tx);

    let controller = run_session(controller, query(&relay), rx).await;
    assert_eq!(controller.state(), SessionState::Failed);
    assert_eq!(controller.surface().failure(), Some("E_PIN"));

    let only = posted.recv().await.unwrap();
    assert_eq!(only.target, TargetOrigin::Any);
    assert_eq!(only.body, r#"{"type":"failed_init"}"#);

    drop(controller);
    assert!(posted.recv().await.is_none());
}
