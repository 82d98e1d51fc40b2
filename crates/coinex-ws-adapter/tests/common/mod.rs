/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for coinex-ws-adapter tests

#![allow(dead_code)]

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use wiremock::MockServer;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Frames the mock exchange can push to the client
#[derive(Debug, Clone)]
pub enum MockFrame {
    Text(String),
    Binary(Vec<u8>),
    Close,
}

/// Single-connection WebSocket exchange stand-in.
///
/// Every text frame the client sends shows up on `inbound`; frames pushed
/// with `send_*` are written to the client in order.
pub struct MockExchange {
    pub url: String,
    inbound: mpsc::UnboundedReceiver<String>,
    outbound: mpsc::UnboundedSender<MockFrame>,
    client_closed: watch::Receiver<bool>,
}

impl MockExchange {
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<String>();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<MockFrame>();
        let (closed_tx, closed_rx) = watch::channel(false);

        tokio::spawn(async move {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let Ok(ws) = accept_async(stream).await else {
                return;
            };
            let (mut write, mut read) = ws.split();

            loop {
                tokio::select! {
                    frame = out_rx.recv() => {
                        let message = match frame {
                            Some(MockFrame::Text(text)) => WsMessage::Text(text.into()),
                            Some(MockFrame::Binary(bytes)) => WsMessage::Binary(bytes.into()),
                            Some(MockFrame::Close) | None => {
                                let _ = write.send(WsMessage::Close(None)).await;
                                break;
                            }
                        };
                        if write.send(message).await.is_err() {
                            break;
                        }
                    }
                    incoming = read.next() => {
                        match incoming {
                            Some(Ok(WsMessage::Text(text))) => {
                                let _ = in_tx.send(text.to_string());
                            }
                            Some(Ok(WsMessage::Close(_))) => {
                                closed_tx.send_replace(true);
                                break;
                            }
                            Some(Err(_)) | None => break,
                            Some(Ok(_)) => {}
                        }
                    }
                }
            }
        });

        Self {
            url: format!("ws://{addr}"),
            inbound: in_rx,
            outbound: out_tx,
            client_closed: closed_rx,
        }
    }

    /// Whether the client sends a close frame within `wait`
    pub async fn client_closed_within(&mut self, wait: Duration) -> bool {
        matches!(
            tokio::time::timeout(wait, self.client_closed.wait_for(|closed| *closed)).await,
            Ok(Ok(_))
        )
    }

    /// Next request the client sent, parsed as JSON
    pub async fn recv_request(&mut self) -> Value {
        let text = tokio::time::timeout(RECV_TIMEOUT, self.inbound.recv())
            .await
            .expect("timed out waiting for client request")
            .expect("mock connection closed");
        serde_json::from_str(&text).expect("client sent invalid JSON")
    }

    /// Whether another client request arrives within `wait`
    pub async fn has_request_within(&mut self, wait: Duration) -> bool {
        matches!(
            tokio::time::timeout(wait, self.inbound.recv()).await,
            Ok(Some(_))
        )
    }

    pub fn send_text(&self, text: impl Into<String>) {
        self.outbound.send(MockFrame::Text(text.into())).unwrap();
    }

    pub fn send_json(&self, value: Value) {
        self.send_text(value.to_string());
    }

    pub fn send_binary(&self, bytes: Vec<u8>) {
        self.outbound.send(MockFrame::Binary(bytes)).unwrap();
    }

    pub fn close(&self) {
        let _ = self.outbound.send(MockFrame::Close);
    }
}

/// Sample v2 ticker push for one market
pub fn state_update(market: &str, last: &str) -> Value {
    serde_json::json!({
        "method": "state.update",
        "data": {
            "state_list": [{
                "market": market,
                "last": last,
                "open": "42000",
                "high": "43500",
                "low": "41800",
                "volume": "1234.5"
            }]
        },
        "id": null
    })
}

/// Success response echoing a request id
pub fn ok_response(id: u64) -> Value {
    serde_json::json!({"id": id, "code": 0, "message": "OK", "data": {}})
}
