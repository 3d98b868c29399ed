//! Telegram delivery against loopback servers.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use outpost_agent::application::ports::MessageSender;
use outpost_agent::domain::DeliveryError;
use outpost_agent::infra::telegram::TelegramSender;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Accepts connections and holds them open without ever answering.
async fn silent_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{addr}")
}

/// Answers every request with `status` and a Bot API error body.
async fn replying_server(status: u16, description: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let body = format!(r#"{{"ok":false,"description":"{description}"}}"#);
                let reply = format!(
                    "HTTP/1.1 {status} Fixture\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_stalled_bot_api_times_out_as_retryable() {
    let base = silent_server().await;
    let sender = TelegramSender::new(client(), &base, "123:secret", Duration::from_millis(200));

    let result = tokio::time::timeout(Duration::from_secs(5), sender.deliver(1, "hi", None))
        .await
        .expect("delivery must not hang past its own timeout");

    let reason = match result {
        Err(DeliveryError::Other(reason)) => reason,
        other => panic!("expected a retryable failure, got {other:?}"),
    };
    assert!(reason.contains("no reply within"), "reason: {reason}");
    assert!(!reason.contains("secret"));
}

#[tokio::test]
async fn test_blocked_recipient_is_unreachable() {
    let base = replying_server(403, "Forbidden: bot was blocked by the user").await;
    let sender = TelegramSender::new(client(), &base, "123:secret", Duration::from_secs(5));

    let err = sender.deliver(1, "hi", None).await.unwrap_err();

    assert!(matches!(err, DeliveryError::Unreachable(_)), "got {err:?}");
}
