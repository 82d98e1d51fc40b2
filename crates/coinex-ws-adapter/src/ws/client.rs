/*
[INPUT]:  WebSocket URL and optional API credentials
[OUTPUT]: Signed session, channel subscriptions, inbound ServerMessage stream
[POS]:    WebSocket layer - real-time data stream handling
[UPDATE]: When adding new channels or changing connection logic
*/

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

use super::codec;
use super::message::ServerMessage;
use super::request::{Channel, Request, depth_params, market_list_params};
use crate::auth::Credentials;
use crate::http::{CoinexError, Result};

pub const DEFAULT_WS_URL: &str = "wss://socket.coinex.com/v2/spot";
const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(10);
const CLOSE_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(1);
const CHANNEL_CAPACITY: usize = 100;
const MESSAGE_SAMPLE_LIMIT: usize = 3;
const SUBSCRIPTION_LOG_LIMIT: usize = 10;
const PARSE_FAIL_LOG_LIMIT: usize = 3;
const DROPPED_LOG_LIMIT: usize = 3;
const RAW_LOG_MAX_BYTES: usize = 1024;

static MESSAGE_SAMPLE_COUNT: AtomicUsize = AtomicUsize::new(0);
static SUBSCRIBE_LOG_COUNT: AtomicUsize = AtomicUsize::new(0);
static PARSE_FAIL_LOG_COUNT: AtomicUsize = AtomicUsize::new(0);
static DROPPED_LOG_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Session state. Transitions are driven by the caller's calls, except
/// `Disconnected`, which the IO task also sets when the socket goes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
    Authenticating,
    Authenticated,
    Subscribed { authenticated: bool },
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        !matches!(self, ConnectionState::Disconnected)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(
            self,
            ConnectionState::Authenticated | ConnectionState::Subscribed { authenticated: true }
        )
    }
}

/// A subscription request sent on the current connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub channel: Channel,
    pub market: Option<String>,
    pub request_id: u64,
}

#[derive(Debug)]
struct Outbound {
    connection_id: u64,
    tx: mpsc::Sender<WsMessage>,
}

type OutboundSlot = Mutex<Option<Outbound>>;
type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<ServerMessage>>>>;

/// WebSocket client for the CoinEx spot API
#[derive(Debug)]
pub struct CoinexWebSocket {
    url: String,
    credentials: Option<Credentials>,
    auth_timeout: Duration,
    next_id: AtomicU64,
    next_connection_id: AtomicU64,
    message_tx: mpsc::Sender<ServerMessage>,
    message_rx: Option<mpsc::Receiver<ServerMessage>>,
    outbound: Arc<OutboundSlot>,
    pending: PendingMap,
    state: Arc<watch::Sender<ConnectionState>>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl CoinexWebSocket {
    /// Create a public client for the default endpoint
    pub fn new() -> Self {
        Self::with_url(DEFAULT_WS_URL)
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            url: url.into(),
            credentials: None,
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
            next_id: AtomicU64::new(1),
            next_connection_id: AtomicU64::new(1),
            message_tx: tx,
            message_rx: Some(rx),
            outbound: Arc::new(Mutex::new(None)),
            pending: Arc::new(Mutex::new(HashMap::new())),
            state: Arc::new(state),
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// Get the message receiver
    pub fn take_receiver(&mut self) -> Option<mpsc::Receiver<ServerMessage>> {
        self.message_rx.take()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated()
    }

    /// Subscription requests sent since the last connect
    pub async fn subscriptions(&self) -> Vec<Subscription> {
        self.subscriptions.lock().await.clone()
    }

    pub async fn connect(&self) -> Result<()> {
        if self.outbound.lock().await.is_some() {
            return Err(CoinexError::AlreadyConnected);
        }

        info!(url = %self.url, "ws connecting");
        let (ws_stream, _response) = connect_async(self.url.as_str()).await?;
        let (mut write, mut read) = ws_stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let connection_id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);

        {
            let mut guard = self.outbound.lock().await;
            if guard.is_some() {
                return Err(CoinexError::AlreadyConnected);
            }
            *guard = Some(Outbound {
                connection_id,
                tx: outbound_tx,
            });
        }
        self.subscriptions.lock().await.clear();
        self.state.send_replace(ConnectionState::Connected);
        info!(url = %self.url, connection_id, "ws connected");

        let message_tx = self.message_tx.clone();
        let pending = self.pending.clone();
        let state = self.state.clone();
        let outbound_slot = Arc::downgrade(&self.outbound);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    outbound = outbound_rx.recv() => {
                        match outbound {
                            Some(message) => {
                                if let Err(err) = write.send(message).await {
                                    warn!(connection_id, error = %err, "ws write failed");
                                    break;
                                }
                            }
                            None => {
                                let _ = write.send(WsMessage::Close(None)).await;
                                // Wait briefly for the peer's close frame
                                let _ = tokio::time::timeout(CLOSE_HANDSHAKE_TIMEOUT, async {
                                    while let Some(Ok(message)) = read.next().await {
                                        if message.is_close() {
                                            break;
                                        }
                                    }
                                })
                                .await;
                                break;
                            }
                        }
                    }
                    incoming = read.next() => {
                        match incoming {
                            Some(Ok(WsMessage::Close(frame))) => {
                                debug!(connection_id, ?frame, "ws close frame received");
                                let _ = write.send(WsMessage::Close(None)).await;
                                break;
                            }
                            Some(Ok(message)) => match codec::frame_text(message) {
                                Ok(Some(text)) => route_text(&text, &pending, &message_tx).await,
                                Ok(None) => {}
                                Err(err) => log_parse_fail_once(&err, ""),
                            },
                            Some(Err(err)) => {
                                warn!(connection_id, error = %err, "ws read failed");
                                break;
                            }
                            None => break,
                        }
                    }
                }
            }

            release_connection(outbound_slot, connection_id, &pending, &state).await;
            info!(connection_id, "ws connection closed");
        });

        Ok(())
    }

    /// Sign the connection with `server.sign` and wait for the server's verdict.
    pub async fn authenticate(&self) -> Result<()> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            CoinexError::Config("API credentials required for authentication".to_string())
        })?;
        let previous = self.state();
        if !previous.is_connected() {
            return Err(CoinexError::NotConnected);
        }

        let id = self.next_request_id();
        let request = Request::sign(&credentials.sign_auth_now(), id);
        let (waiter_tx, waiter_rx) = oneshot::channel();
        self.pending.lock().await.insert(id, waiter_tx);
        self.state.send_replace(ConnectionState::Authenticating);
        info!(request_id = id, access_id = %credentials.access_id, "ws authenticating");

        if let Err(err) = self.send_request(&request).await {
            self.pending.lock().await.remove(&id);
            self.settle_auth(previous.is_authenticated()).await;
            return Err(err);
        }

        let response = match tokio::time::timeout(self.auth_timeout, waiter_rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => return Err(CoinexError::NotConnected),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                self.settle_auth(previous.is_authenticated()).await;
                warn!(request_id = id, "ws authentication timed out");
                return Err(CoinexError::Timeout {
                    duration_ms: self.auth_timeout.as_millis() as u64,
                });
            }
        };

        if response.is_success() {
            self.settle_auth(true).await;
            info!(request_id = id, "ws authenticated");
            Ok(())
        } else {
            self.settle_auth(previous.is_authenticated()).await;
            let message = response.error_message();
            warn!(request_id = id, reason = %message, "ws authentication rejected");
            Err(CoinexError::Authentication { message })
        }
    }

    /// Subscribe to ticker (`state.update`) for a market
    pub async fn subscribe_ticker(&self, market: &str) -> Result<u64> {
        self.subscribe(Channel::Ticker, Some(market), market_list_params(market))
            .await
    }

    /// Subscribe to order book depth; `interval` is the merge precision, "0" for none
    pub async fn subscribe_depth(&self, market: &str, limit: u32, interval: &str) -> Result<u64> {
        self.subscribe(
            Channel::Depth,
            Some(market),
            depth_params(market, limit, interval),
        )
        .await
    }

    /// Subscribe to public trades (`deals.update`) for a market
    pub async fn subscribe_trades(&self, market: &str) -> Result<u64> {
        self.subscribe(Channel::Trades, Some(market), market_list_params(market))
            .await
    }

    /// Subscribe to balance updates (requires auth)
    pub async fn subscribe_balance(&self) -> Result<u64> {
        self.subscribe(Channel::Balance, None, json!({})).await
    }

    /// Subscribe to own order updates (requires auth)
    pub async fn subscribe_user_order(&self) -> Result<u64> {
        self.subscribe(Channel::UserOrder, None, json!({})).await
    }

    /// Subscribe to own fills (requires auth)
    pub async fn subscribe_user_deals(&self) -> Result<u64> {
        self.subscribe(Channel::UserDeals, None, json!({})).await
    }

    /// Application-level keep-alive. Leaves state and subscriptions untouched.
    pub async fn ping(&self) -> Result<u64> {
        let id = self.next_request_id();
        self.send_request(&Request::ping(id)).await?;
        debug!(request_id = id, "ws ping sent");
        Ok(id)
    }

    /// Close the connection; safe to call when already closed
    pub async fn close(&self) {
        let outbound = self.outbound.lock().await.take();
        if outbound.is_some() {
            self.pending.lock().await.clear();
            self.state.send_replace(ConnectionState::Disconnected);
            info!(url = %self.url, "ws close requested");
        }
    }

    fn next_request_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Leave `Authenticating`. Subscriptions sent while the sign request
    /// was in flight count towards the resulting state.
    async fn settle_auth(&self, authenticated: bool) {
        let subscribed = !self.subscriptions.lock().await.is_empty();
        let next = match (subscribed, authenticated) {
            (true, authenticated) => ConnectionState::Subscribed { authenticated },
            (false, true) => ConnectionState::Authenticated,
            (false, false) => ConnectionState::Connected,
        };
        self.state.send_if_modified(|state| {
            if *state == ConnectionState::Authenticating {
                *state = next;
                true
            } else {
                false
            }
        });
    }

    async fn subscribe(&self, channel: Channel, market: Option<&str>, params: Value) -> Result<u64> {
        let state = self.state();
        if !state.is_connected() {
            return Err(CoinexError::NotConnected);
        }
        if channel.is_private() && !state.is_authenticated() {
            warn!(
                channel = channel.name(),
                ?state,
                "private channel requested before authentication; not sent"
            );
            return Err(CoinexError::NotAuthenticated);
        }

        let id = self.next_request_id();
        self.send_request(&Request::subscribe(channel, params, id))
            .await?;

        self.subscriptions.lock().await.push(Subscription {
            channel,
            market: market.map(str::to_string),
            request_id: id,
        });
        self.state.send_if_modified(|state| {
            let next = match *state {
                ConnectionState::Connected => ConnectionState::Subscribed {
                    authenticated: false,
                },
                ConnectionState::Authenticated => ConnectionState::Subscribed {
                    authenticated: true,
                },
                _ => return false,
            };
            *state = next;
            true
        });
        log_subscription_sent(channel, market, id);

        Ok(id)
    }

    async fn send_request(&self, request: &Request) -> Result<()> {
        let sender = {
            let guard = self.outbound.lock().await;
            guard
                .as_ref()
                .map(|outbound| outbound.tx.clone())
                .ok_or(CoinexError::NotConnected)?
        };

        let text = serde_json::to_string(request)?;
        sender
            .send(WsMessage::Text(text.into()))
            .await
            .map_err(|_| CoinexError::WebSocket("WebSocket send channel closed".to_string()))
    }
}

impl Default for CoinexWebSocket {
    fn default() -> Self {
        Self::new()
    }
}

async fn release_connection(
    outbound_slot: Weak<OutboundSlot>,
    connection_id: u64,
    pending: &PendingMap,
    state: &watch::Sender<ConnectionState>,
) {
    let Some(slot) = outbound_slot.upgrade() else {
        return;
    };
    let mut guard = slot.lock().await;
    let current = guard
        .as_ref()
        .is_some_and(|outbound| outbound.connection_id == connection_id);
    if current {
        *guard = None;
        pending.lock().await.clear();
        state.send_replace(ConnectionState::Disconnected);
    }
}

async fn route_text(text: &str, pending: &PendingMap, message_tx: &mpsc::Sender<ServerMessage>) {
    let message = match ServerMessage::parse(text) {
        Ok(message) => message,
        Err(err) => {
            log_parse_fail_once(&err, text);
            return;
        }
    };

    if let Some(id) = message.id {
        let waiter = pending.lock().await.remove(&id);
        if let Some(waiter) = waiter {
            let _ = waiter.send(message);
            return;
        }
    }

    log_message_sample_once(&message);
    match message_tx.try_send(message) {
        Ok(()) => {}
        Err(TrySendError::Full(message)) => log_dropped_once(&message),
        // Receiver dropped: nobody is listening, keep serving the socket.
        Err(TrySendError::Closed(_)) => {}
    }
}

fn log_subscription_sent(channel: Channel, market: Option<&str>, request_id: u64) {
    let count = SUBSCRIBE_LOG_COUNT.fetch_add(1, Ordering::Relaxed);
    if count >= SUBSCRIPTION_LOG_LIMIT {
        return;
    }

    if let Some(market) = market {
        info!(
            sample_index = count + 1,
            sample_limit = SUBSCRIPTION_LOG_LIMIT,
            method = channel.subscribe_method(),
            market,
            request_id,
            "ws subscription sent"
        );
    } else {
        info!(
            sample_index = count + 1,
            sample_limit = SUBSCRIPTION_LOG_LIMIT,
            method = channel.subscribe_method(),
            request_id,
            "ws subscription sent"
        );
    }
}

fn log_message_sample_once(message: &ServerMessage) {
    let count = MESSAGE_SAMPLE_COUNT.fetch_add(1, Ordering::Relaxed);
    if count >= MESSAGE_SAMPLE_LIMIT {
        return;
    }

    info!(
        sample_index = count + 1,
        sample_limit = MESSAGE_SAMPLE_LIMIT,
        method = message.method().unwrap_or("response"),
        id = ?message.id,
        "ws message sample"
    );
}

fn log_dropped_once(message: &ServerMessage) {
    let count = DROPPED_LOG_COUNT.fetch_add(1, Ordering::Relaxed);
    if count < DROPPED_LOG_LIMIT {
        warn!(
            sample_index = count + 1,
            sample_limit = DROPPED_LOG_LIMIT,
            method = message.method().unwrap_or("response"),
            capacity = CHANNEL_CAPACITY,
            "ws message channel full; dropping"
        );
    }
}

fn log_parse_fail_once(err: &dyn std::fmt::Display, raw: &str) {
    let count = PARSE_FAIL_LOG_COUNT.fetch_add(1, Ordering::Relaxed);
    if count < PARSE_FAIL_LOG_LIMIT {
        info!(
            sample_index = count + 1,
            sample_limit = PARSE_FAIL_LOG_LIMIT,
            error = %err,
            bytes = raw.len(),
            "ws message parse failed"
        );
        let preview = truncate_for_log(raw, RAW_LOG_MAX_BYTES);
        debug!(
            sample_index = count + 1,
            sample_limit = PARSE_FAIL_LOG_LIMIT,
            error = %err,
            bytes = raw.len(),
            message = %preview,
            "ws message parse failed"
        );
    }
}

fn truncate_for_log(value: &str, max_len: usize) -> String {
    if value.len() <= max_len {
        return value.to_string();
    }
    let mut end = max_len;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = String::with_capacity(end + 3);
    out.push_str(&value[..end]);
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_client_is_disconnected() {
        let ws = CoinexWebSocket::new();
        assert_eq!(ws.state(), ConnectionState::Disconnected);
        assert_eq!(ws.url(), DEFAULT_WS_URL);
        assert!(!ws.has_credentials());
    }

    #[test]
    fn test_receiver_take_once() {
        let mut ws = CoinexWebSocket::default();
        assert!(ws.take_receiver().is_some());
        assert!(ws.take_receiver().is_none());
    }

    #[test]
    fn test_state_predicates() {
        assert!(!ConnectionState::Disconnected.is_connected());
        assert!(ConnectionState::Authenticating.is_connected());
        assert!(!ConnectionState::Authenticating.is_authenticated());
        assert!(ConnectionState::Authenticated.is_authenticated());
        assert!(ConnectionState::Subscribed { authenticated: true }.is_authenticated());
        assert!(!ConnectionState::Subscribed { authenticated: false }.is_authenticated());
    }

    #[tokio::test]
    async fn test_calls_while_disconnected_fail_cleanly() {
        let ws = CoinexWebSocket::new().with_credentials(Credentials::new("AID", "SECRET"));

        assert!(matches!(
            ws.subscribe_ticker("BTCUSDT").await,
            Err(CoinexError::NotConnected)
        ));
        assert!(matches!(ws.ping().await, Err(CoinexError::NotConnected)));
        assert!(matches!(
            ws.authenticate().await,
            Err(CoinexError::NotConnected)
        ));
        assert!(ws.subscriptions().await.is_empty());
        ws.close().await;
        assert_eq!(ws.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_authenticate_requires_credentials() {
        let ws = CoinexWebSocket::new();
        assert!(matches!(
            ws.authenticate().await,
            Err(CoinexError::Config(_))
        ));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        let value = "ééé";
        assert_eq!(truncate_for_log(value, 3), "é...");
        assert_eq!(truncate_for_log("short", 10), "short");
    }
}
