//! Webhook 发送测试（本地 mock webhook）

mod common;

use axum::http::StatusCode;
use chrono::Utc;
use common::{dispatcher_for, facts, unreachable_url, MockWebhook};
use help_request_relay::notification::{format, NotifyError};

#[tokio::test]
async fn test_dispatch_success_on_2xx() {
    let webhook = MockWebhook::start(StatusCode::OK).await;
    let dispatcher = dispatcher_for(Some(webhook.url.clone()), None);

    let card = format("ITB-1010-CP1", Utc::now()).unwrap();
    let outcome = dispatcher.dispatch(&card).await;

    assert!(outcome.success);
    assert_eq!(outcome.http_status, Some(200));
    assert!(outcome.error.is_none());

    let cards = webhook.cards();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0], serde_json::to_value(&card).unwrap());
    assert_eq!(webhook.content_types(), vec!["application/json".to_string()]);
}

#[tokio::test]
async fn test_dispatch_accepts_any_2xx() {
    let webhook = MockWebhook::start(StatusCode::ACCEPTED).await;
    let dispatcher = dispatcher_for(Some(webhook.url.clone()), None);

    let card = format("ITB-1010-CP1", Utc::now()).unwrap();
    let outcome = dispatcher.dispatch(&card).await;
    assert!(outcome.success);
    assert_eq!(outcome.http_status, Some(202));

    assert_eq!(dispatcher.notify("ITB-1010-CP1").await, Ok(()));
    assert_eq!(webhook.cards().len(), 2);
}

#[tokio::test]
async fn test_dispatch_failure_on_500() {
    let webhook = MockWebhook::start(StatusCode::INTERNAL_SERVER_ERROR).await;
    let dispatcher = dispatcher_for(Some(webhook.url.clone()), None);

    let card = format("ITB-1010-CP1", Utc::now()).unwrap();
    let outcome = dispatcher.dispatch(&card).await;

    assert!(!outcome.success);
    assert_eq!(outcome.http_status, Some(500));
    assert_eq!(outcome.error, Some(NotifyError::Status(500)));

    let err = dispatcher.notify("ITB-1010-CP1").await.unwrap_err();
    assert!(matches!(err, NotifyError::Status(500)));
}

#[tokio::test]
async fn test_dispatch_transport_failure() {
    let dispatcher = dispatcher_for(Some(unreachable_url().await), None);

    let card = format("ITB-1010-CP1", Utc::now()).unwrap();
    let outcome = dispatcher.dispatch(&card).await;

    assert!(!outcome.success);
    assert_eq!(outcome.http_status, None);
    assert!(matches!(outcome.error, Some(NotifyError::Transport(_))));

    let err = dispatcher.notify("ITB-1010-CP1").await.unwrap_err();
    assert!(matches!(err, NotifyError::Transport(_)));
}

#[tokio::test]
async fn test_malformed_identifier_makes_no_request() {
    let webhook = MockWebhook::start(StatusCode::OK).await;
    let dispatcher = dispatcher_for(Some(webhook.url.clone()), None);

    for id in ["ITB", "ITB-1010", ""] {
        let err = dispatcher.notify(id).await.unwrap_err();
        assert!(matches!(err, NotifyError::MalformedIdentifier(_)));
    }
    assert!(webhook.cards().is_empty());
}

#[tokio::test]
async fn test_notify_builds_card_with_monitoring_link() {
    let webhook = MockWebhook::start(StatusCode::OK).await;
    let dispatcher = dispatcher_for(
        Some(webhook.url.clone()),
        Some("https://monitor.example.com".to_string()),
    );

    dispatcher.notify("ITB-1010-CP1").await.unwrap();

    let cards = webhook.cards();
    assert_eq!(cards.len(), 1);
    let card = &cards[0];
    let facts = facts(card);
    assert_eq!(facts.len(), 4);
    assert_eq!(facts[0], ("Building".to_string(), "ITB".to_string()));
    assert_eq!(facts[1], ("Room".to_string(), "1010".to_string()));
    assert_eq!(facts[2], ("Device".to_string(), "CP1".to_string()));
    assert_eq!(facts[3].0, "Time Stamp");
    assert!(facts[3].1.ends_with(" GMT"));
    assert_eq!(
        card["potentialAction"][0]["targets"][0]["uri"],
        "https://monitor.example.com/rooms/ITB-1010"
    );
}
