//! 事件中心 websocket 客户端测试（本地 websocket 服务）

use futures::{SinkExt, StreamExt};
use help_request_relay::hub::ReconnectPolicy;
use help_request_relay::{is_help_request, EventSource, HubError, HubMessenger};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::protocol::Message, WebSocketStream};

fn quick_reconnect(max_attempts: u32) -> ReconnectPolicy {
    ReconnectPolicy {
        delay: Duration::from_millis(50),
        max_attempts: Some(max_attempts),
    }
}

async fn read_subscription(ws: &mut WebSocketStream<TcpStream>) -> serde_json::Value {
    match ws.next().await.unwrap().unwrap() {
        Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
        other => panic!("unexpected message: {:?}", other),
    }
}

fn help_request(generating_system: &str) -> Message {
    Message::text(format!(
        r#"{{"key":"help-request","value":"confirm","event-tags":["alert"],"generating-system":"{}"}}"#,
        generating_system
    ))
}

#[tokio::test]
async fn test_subscribe_and_receive_events() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let hub = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        drop(listener);
        let mut ws = accept_async(tcp).await.unwrap();

        let subscription = read_subscription(&mut ws).await;

        ws.send(Message::text("garbage")).await.unwrap();
        ws.send(help_request("ITB-1010-CP1")).await.unwrap();
        ws.send(Message::text(r#"{"key":"power","value":"on","generating-system":"ITB-1010-D1"}"#))
            .await
            .unwrap();
        ws.close(None).await.unwrap();

        subscription
    });

    let mut messenger = HubMessenger::connect(Some(format!("ws://{}", addr).as_str()))
        .await
        .unwrap()
        .with_reconnect(quick_reconnect(1));
    messenger.subscribe("*").await.unwrap();

    let first = messenger.next_event().await.unwrap();
    assert!(is_help_request(&first));
    assert_eq!(first.generating_system, "ITB-1010-CP1");

    let second = messenger.next_event().await.unwrap();
    assert_eq!(second.key, "power");
    assert!(!is_help_request(&second));

    // 服务端已关闭且不再监听，重连失败后结束
    assert!(messenger.next_event().await.is_none());

    let subscription = hub.await.unwrap();
    assert_eq!(subscription["rooms"], serde_json::json!(["*"]));
    assert_eq!(subscription["create"], true);
}

#[tokio::test]
async fn test_connect_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = HubMessenger::connect(Some(addr.to_string().as_str())).await;
    assert!(matches!(result, Err(HubError::Connect { .. })));
}

#[tokio::test]
async fn test_reconnects_and_resubscribes_after_drop() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let hub = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(tcp).await.unwrap();
        let first = read_subscription(&mut ws).await;
        ws.send(help_request("ITB-1010-CP1")).await.unwrap();
        // 不发 close 帧直接断开
        drop(ws);

        let (tcp, _) = listener.accept().await.unwrap();
        drop(listener);
        let mut ws = accept_async(tcp).await.unwrap();
        let second = read_subscription(&mut ws).await;
        ws.send(help_request("ITB-2020-CP1")).await.unwrap();
        ws.close(None).await.unwrap();

        (first, second)
    });

    let mut messenger = HubMessenger::connect(Some(format!("ws://{}", addr).as_str()))
        .await
        .unwrap()
        .with_reconnect(quick_reconnect(3));
    messenger.subscribe("*").await.unwrap();

    let event = messenger.next_event().await.unwrap();
    assert_eq!(event.generating_system, "ITB-1010-CP1");

    let event = messenger.next_event().await.unwrap();
    assert_eq!(event.generating_system, "ITB-2020-CP1");
    assert!(is_help_request(&event));

    let (first, second) = hub.await.unwrap();
    assert_eq!(first["rooms"], serde_json::json!(["*"]));
    assert_eq!(second, first);
}

#[tokio::test]
async fn test_gives_up_when_hub_stays_down() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let hub = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        drop(listener);
        let mut ws = accept_async(tcp).await.unwrap();
        read_subscription(&mut ws).await;
        drop(ws);
    });

    let mut messenger = HubMessenger::connect(Some(format!("ws://{}", addr).as_str()))
        .await
        .unwrap()
        .with_reconnect(quick_reconnect(2));
    messenger.subscribe("*").await.unwrap();
    hub.await.unwrap();

    assert!(messenger.next_event().await.is_none());
}
