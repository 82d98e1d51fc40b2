/*
[INPUT]:  Channel name, market and channel-specific arguments
[OUTPUT]: Outbound `{"method","params","id"}` envelopes
[POS]:    WebSocket layer - request construction
[UPDATE]: When adding new channels or changing request params
*/

use serde::Serialize;
use serde_json::{Value, json};

use crate::auth::SignedAuthRequest;

pub const METHOD_SIGN: &str = "server.sign";
pub const METHOD_PING: &str = "server.ping";

/// Subscribable channels on the spot WebSocket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Ticker,
    Depth,
    Trades,
    Balance,
    UserOrder,
    UserDeals,
}

impl Channel {
    pub fn subscribe_method(&self) -> &'static str {
        match self {
            Channel::Ticker => "state.subscribe",
            Channel::Depth => "depth.subscribe",
            Channel::Trades => "deals.subscribe",
            Channel::Balance => "balance.subscribe",
            Channel::UserOrder => "order.subscribe",
            Channel::UserDeals => "user_deals.subscribe",
        }
    }

    /// Private channels need a signed connection
    pub fn is_private(&self) -> bool {
        matches!(
            self,
            Channel::Balance | Channel::UserOrder | Channel::UserDeals
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Channel::Ticker => "ticker",
            Channel::Depth => "depth",
            Channel::Trades => "trades",
            Channel::Balance => "balance",
            Channel::UserOrder => "user_order",
            Channel::UserDeals => "user_deals",
        }
    }
}

/// Outbound request envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    pub method: String,
    pub params: Value,
    pub id: u64,
}

impl Request {
    pub fn new(method: impl Into<String>, params: Value, id: u64) -> Self {
        Self {
            method: method.into(),
            params,
            id,
        }
    }

    pub fn sign(auth: &SignedAuthRequest, id: u64) -> Self {
        Self::new(METHOD_SIGN, json!(auth), id)
    }

    pub fn ping(id: u64) -> Self {
        Self::new(METHOD_PING, json!({}), id)
    }

    pub fn subscribe(channel: Channel, params: Value, id: u64) -> Self {
        Self::new(channel.subscribe_method(), params, id)
    }
}

pub fn market_list_params(market: &str) -> Value {
    json!({ "market_list": [market] })
}

pub fn depth_params(market: &str, limit: u32, interval: &str) -> Value {
    json!({
        "market_list": [market],
        "limit": limit,
        "interval": interval,
    })
}
