/*
[INPUT]:  ServerMessage stream from the WebSocket client
[OUTPUT]: Per-method handler callbacks
[POS]:    WebSocket layer - message routing by method name
[UPDATE]: When adding new channels or handler hooks
*/

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::message::{DealsUpdate, DepthUpdate, ServerMessage, TickerState, Update};

/// Callbacks for inbound updates. Every method defaults to a no-op.
pub trait MessageHandler {
    fn on_ticker(&mut self, _states: &[TickerState]) {}

    fn on_depth(&mut self, _depth: &DepthUpdate) {}

    fn on_deals(&mut self, _deals: &DealsUpdate) {}

    fn on_order(&mut self, _payload: &Value) {}

    fn on_balance(&mut self, _payload: &Value) {}

    fn on_user_deals(&mut self, _payload: &Value) {}

    fn on_pong(&mut self) {}

    fn on_response(&mut self, _response: &ServerMessage) {}

    fn on_unknown(&mut self, message: &ServerMessage) {
        debug!(method = ?message.method, "ws message method unrecognized");
    }
}

/// Route one message to exactly one handler method.
///
/// Returns `false` when the typed payload could not be decoded and the
/// message was dropped.
pub fn dispatch<H: MessageHandler + ?Sized>(message: ServerMessage, handler: &mut H) -> bool {
    let method = message.method.clone();
    let update = match message.into_update() {
        Ok(update) => update,
        Err(err) => {
            warn!(method = ?method, error = %err, "ws payload decode failed; dropping");
            return false;
        }
    };

    match update {
        Update::Ticker(states) => handler.on_ticker(&states),
        Update::Depth(depth) => handler.on_depth(&depth),
        Update::Deals(deals) => handler.on_deals(&deals),
        Update::Order(payload) => handler.on_order(&payload),
        Update::Balance(payload) => handler.on_balance(&payload),
        Update::UserDeals(payload) => handler.on_user_deals(&payload),
        Update::Pong => handler.on_pong(),
        Update::Response(response) => handler.on_response(&response),
        Update::Unknown(message) => handler.on_unknown(&message),
    }
    true
}

/// Dispatch messages until the channel closes; returns how many were handled.
///
/// Runs forever on a live connection; bound it with `tokio::time::timeout`
/// or `select!`.
pub async fn listen<H: MessageHandler + ?Sized>(
    receiver: &mut mpsc::Receiver<ServerMessage>,
    handler: &mut H,
) -> usize {
    let mut handled = 0;
    while let Some(message) = receiver.recv().await {
        if dispatch(message, handler) {
            handled += 1;
        }
    }
    debug!(handled, "ws message channel closed");
    handled
}
