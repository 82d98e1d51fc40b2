/*
[INPUT]:  Scripted exchange behaviour for scenario runs
[OUTPUT]: In-process CoinEx stand-in and demo config fixtures
[POS]:    Test infrastructure - shared across demo integration tests
[UPDATE]: When scenarios subscribe to new channels
*/

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use coinex_ws_demo::DemoConfig;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;

/// Answers every request the way the live feed would and records the methods it saw.
pub struct ScriptedExchange {
    pub url: String,
    methods: Arc<Mutex<Vec<String>>>,
}

impl ScriptedExchange {
    /// `reject_sign` makes `server.sign` fail with code 20001
    pub async fn spawn(reject_sign: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let methods = Arc::new(Mutex::new(Vec::new()));
        let seen = methods.clone();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let Ok(ws) = accept_async(stream).await else {
                    continue;
                };
                let seen = seen.clone();
                tokio::spawn(async move {
                    let (mut write, mut read) = ws.split();
                    while let Some(Ok(frame)) = read.next().await {
                        let WsMessage::Text(text) = frame else {
                            continue;
                        };
                        let request: Value = serde_json::from_str(text.as_str()).unwrap();
                        let method = request["method"].as_str().unwrap_or_default().to_string();
                        seen.lock().unwrap().push(method.clone());

                        for reply in replies(&method, &request["id"], reject_sign) {
                            if write.send(WsMessage::Text(reply.to_string().into())).await.is_err() {
                                return;
                            }
                        }
                    }
                });
            }
        });

        Self {
            url: format!("ws://{addr}"),
            methods,
        }
    }

    pub fn methods(&self) -> Vec<String> {
        self.methods.lock().unwrap().clone()
    }
}

fn replies(method: &str, id: &Value, reject_sign: bool) -> Vec<Value> {
    let ack = json!({"id": id, "code": 0, "message": "OK", "data": {}});
    match method {
        "server.sign" if reject_sign => {
            vec![json!({"id": id, "code": 20001, "message": "invalid signature", "data": {}})]
        }
        "server.ping" => vec![json!({"id": id, "code": 0, "message": "OK", "data": {"result": "pong"}})],
        "state.subscribe" => vec![
            ack,
            json!({"method": "state.update", "id": null, "data": {"state_list": [
                {"market": "BTCUSDT", "last": "43000.5", "open": "42000", "high": "43500", "low": "41800", "volume": "12.5"}
            ]}}),
        ],
        "depth.subscribe" => vec![
            ack,
            json!({"method": "depth.update", "id": null, "data": {"market": "BTCUSDT", "is_full": true, "depth": {
                "asks": [["43001", "0.5"]],
                "bids": [["43000", "1.2"]]
            }}}),
        ],
        "deals.subscribe" => vec![
            ack,
            json!({"method": "deals.update", "id": null, "data": {"market": "BTCUSDT", "deal_list": [
                {"deal_id": 1, "created_at": 1700000000000i64, "side": "buy", "price": "43000.5", "amount": "0.01"}
            ]}}),
        ],
        "balance.subscribe" => vec![
            ack,
            json!({"method": "balance.update", "id": null, "data": {"balance_list": [{"ccy": "USDT", "available": "100"}]}}),
        ],
        _ => vec![ack],
    }
}

pub fn demo_config(url: &str) -> DemoConfig {
    DemoConfig {
        ws_url: url.to_string(),
        public_duration_secs: 1,
        private_duration_secs: 1,
        ping_duration_secs: 2,
        ping_interval_secs: 1,
        ..DemoConfig::default()
    }
}
