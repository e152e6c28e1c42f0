//! # Webhook Ingress Tests
//!
//! Exercise the axum router in-process: secret checking, malformed bodies,
//! deduplication and back-pressure from the update queue.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use common::text_update_json;
use photo_album_bot::deduplication::create_shared_deduplicator;
use photo_album_bot::ingress::webhook::{router, WebhookState, SECRET_TOKEN_HEADER};
use photo_album_bot::ingress::{update_channel, UpdateReceiver};
use tower::ServiceExt;

const PATH: &str = "/telegram/webhook";

fn setup(capacity: usize, secret: Option<&str>) -> (Router, UpdateReceiver) {
    let (tx, rx) = update_channel(capacity);
    let dedup = create_shared_deduplicator(300, 1000);
    (router(PATH, WebhookState::new(tx, dedup, secret)), rx)
}

fn post(body: impl Into<Body>, secret: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(PATH)
        .header("content-type", "application/json");
    if let Some(secret) = secret {
        builder = builder.header(SECRET_TOKEN_HEADER, secret);
    }
    builder.body(body.into()).unwrap()
}

fn update_body(update_id: i64) -> String {
    text_update_json(update_id, 42, "hello").to_string()
}

#[tokio::test]
async fn test_update_is_queued() {
    let (app, mut rx) = setup(8, None);

    let response = app.oneshot(post(update_body(10), None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let update = rx.try_recv().unwrap();
    assert_eq!(update.id.0, 10);
}

#[tokio::test]
async fn test_secret_token_is_enforced() {
    let (app, mut rx) = setup(8, Some("s3cret"));

    let missing = app.clone().oneshot(post(update_body(1), None)).await.unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let wrong = app
        .clone()
        .oneshot(post(update_body(1), Some("guess")))
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert!(rx.try_recv().is_err());

    // Rejected calls must not mark the update as seen
    let ok = app.oneshot(post(update_body(1), Some("s3cret"))).await.unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
    assert_eq!(rx.try_recv().unwrap().id.0, 1);
}

#[tokio::test]
async fn test_malformed_bodies_are_acknowledged() {
    let (app, mut rx) = setup(8, None);

    let garbage = app.clone().oneshot(post("{not json", None)).await.unwrap();
    assert_eq!(garbage.status(), StatusCode::OK);

    let not_an_update = app
        .oneshot(post(r#"{"hello":"world"}"#, None))
        .await
        .unwrap();
    assert_eq!(not_an_update.status(), StatusCode::OK);

    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_duplicate_delivery_is_dropped() {
    let (app, mut rx) = setup(8, None);

    for _ in 0..3 {
        let response = app.clone().oneshot(post(update_body(5), None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(rx.try_recv().unwrap().id.0, 5);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_full_queue_rejects_and_allows_redelivery() {
    let (app, mut rx) = setup(1, None);

    let first = app.clone().oneshot(post(update_body(1), None)).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app.clone().oneshot(post(update_body(2), None)).await.unwrap();
    assert_eq!(second.status(), StatusCode::SERVICE_UNAVAILABLE);

    assert_eq!(rx.try_recv().unwrap().id.0, 1);

    // Telegram retries update 2 once the queue has room
    let retry = app.oneshot(post(update_body(2), None)).await.unwrap();
    assert_eq!(retry.status(), StatusCode::OK);
    assert_eq!(rx.try_recv().unwrap().id.0, 2);
}

#[tokio::test]
async fn test_closed_queue_is_unavailable() {
    let (app, rx) = setup(8, None);
    drop(rx);

    let response = app.oneshot(post(update_body(3), None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_other_paths_and_methods() {
    let (app, _rx) = setup(8, None);

    let wrong_path = Request::builder()
        .method("POST")
        .uri("/elsewhere")
        .body(Body::from(update_body(1)))
        .unwrap();
    let response = app.clone().oneshot(wrong_path).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let get = Request::builder().uri(PATH).body(Body::empty()).unwrap();
    let response = app.oneshot(get).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_relative_path_is_normalized() {
    let (tx, mut rx) = update_channel(4);
    let app = router(
        "hooks/tg",
        WebhookState::new(tx, create_shared_deduplicator(300, 100), None),
    );

    let request = Request::builder()
        .method("POST")
        .uri("/hooks/tg")
        .body(Body::from(update_body(9)))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(rx.try_recv().unwrap().id.0, 9);
}
