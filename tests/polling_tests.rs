//! # Long Polling Tests
//!
//! Run the `getUpdates` loop against a local stand-in for the Bot API.

mod common;

use common::telegram_stub::{ok, TelegramStub};
use common::text_update_json;
use photo_album_bot::ingress::polling::{run_polling, PollingOptions};
use photo_album_bot::ingress::update_channel;
use serde_json::{json, Value};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Offset sent with a `getUpdates` request, 0 when absent
fn offset_of(body: &str) -> i64 {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("offset").and_then(Value::as_i64))
        .unwrap_or(0)
}

/// Two updates first, then one update per request numbered by its offset
async fn update_feed() -> TelegramStub {
    TelegramStub::start(|method, body, _| match method {
        "getUpdates" => match offset_of(body) {
            0 => ok(json!([
                text_update_json(5, common::CHAT_ID, "first"),
                text_update_json(6, common::CHAT_ID, "second"),
            ])),
            offset => ok(json!([text_update_json(offset, common::CHAT_ID, "next")])),
        },
        _ => ok(json!(true)),
    })
    .await
}

fn options() -> PollingOptions {
    PollingOptions { timeout_secs: 0 }
}

#[tokio::test]
async fn test_offset_advances_and_closed_queue_stops_polling() {
    let stub = update_feed().await;
    let (tx, mut rx) = update_channel(1);
    let handle = tokio::spawn(run_polling(stub.bot(), tx, options(), CancellationToken::new()));

    let mut received = Vec::new();
    for _ in 0..3 {
        let update = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("update should arrive")
            .expect("queue should be open");
        received.push(update.id.0);
    }
    assert_eq!(received, vec![5, 6, 7]);

    drop(rx);
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("polling should stop once the queue closes")
        .expect("polling task should not panic");
    assert!(result.is_ok());

    let requests = stub.requests();
    assert_eq!(requests[0].method, "deleteWebhook");

    let offsets: Vec<i64> = requests
        .iter()
        .filter(|r| r.method == "getUpdates")
        .map(|r| offset_of(&r.body))
        .collect();
    // Each request confirms everything received before it
    assert_eq!(&offsets[..2], &[0, 7]);
    assert!(offsets.windows(2).all(|pair| pair[0] < pair[1]));
}

#[tokio::test]
async fn test_cancellation_stops_polling() {
    let stub = TelegramStub::start(|method, _, _| match method {
        "getUpdates" => ok(json!([])),
        _ => ok(json!(true)),
    })
    .await;
    let (tx, _rx) = update_channel(4);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(run_polling(stub.bot(), tx, options(), cancel.clone()));

    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("polling should stop when cancelled")
        .expect("polling task should not panic");
    assert!(result.is_ok());
    assert!(stub.methods().iter().any(|m| m == "getUpdates"));
}
