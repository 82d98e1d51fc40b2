/*
[INPUT]:  Decoded JSON text from the WebSocket
[OUTPUT]: ServerMessage envelopes and typed channel updates
[POS]:    WebSocket layer - message parsing and validation
[UPDATE]: When adding new message types or changing format
*/

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::TradeSide;

pub const METHOD_STATE_UPDATE: &str = "state.update";
pub const METHOD_DEPTH_UPDATE: &str = "depth.update";
pub const METHOD_DEALS_UPDATE: &str = "deals.update";
pub const METHOD_ORDER_UPDATE: &str = "order.update";
pub const METHOD_BALANCE_UPDATE: &str = "balance.update";
pub const METHOD_ASSET_UPDATE: &str = "asset.update";
pub const METHOD_USER_DEALS_UPDATE: &str = "user_deals.update";
pub const METHOD_PONG: &str = "server.pong";

/// Raw inbound envelope.
///
/// Push updates carry `method` and either `data` (v2) or `params` (v1).
/// Responses echo the request `id` with `code`/`message` or `result`/`error`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerMessage {
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Value,
}

/// Ticker state for one market
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickerState {
    #[serde(default)]
    pub market: String,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub last: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub open: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub close: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub high: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub low: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub volume: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub value: Option<Decimal>,
}

/// `[price, amount]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel(pub Decimal, pub Decimal);

impl PriceLevel {
    pub fn price(&self) -> Decimal {
        self.0
    }

    pub fn amount(&self) -> Decimal {
        self.1
    }
}

/// Order book snapshot or delta for one market
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DepthUpdate {
    pub market: String,
    pub is_full: bool,
    pub asks: Vec<PriceLevel>,
    pub bids: Vec<PriceLevel>,
}

impl DepthUpdate {
    pub fn best_ask(&self) -> Option<PriceLevel> {
        self.asks.first().copied()
    }

    pub fn best_bid(&self) -> Option<PriceLevel> {
        self.bids.first().copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    #[serde(default, alias = "id")]
    pub deal_id: Option<u64>,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(alias = "type", default = "unknown_side")]
    pub side: TradeSide,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
}

fn unknown_side() -> TradeSide {
    TradeSide::Unknown
}

impl Deal {
    /// Quote-currency value of the fill
    pub fn notional(&self) -> Decimal {
        self.price * self.amount
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DealsUpdate {
    pub market: String,
    pub deals: Vec<Deal>,
}

/// Server message classified by method
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Ticker(Vec<TickerState>),
    Depth(DepthUpdate),
    Deals(DealsUpdate),
    Order(Value),
    Balance(Value),
    UserDeals(Value),
    Pong,
    Response(ServerMessage),
    Unknown(ServerMessage),
}

impl ServerMessage {
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    /// v2 `data`, falling back to legacy `params`
    pub fn payload(&self) -> &Value {
        if self.data.is_null() {
            &self.params
        } else {
            &self.data
        }
    }

    pub fn is_response(&self) -> bool {
        self.method.is_none() && self.id.is_some()
    }

    pub fn is_pong(&self) -> bool {
        self.method() == Some(METHOD_PONG)
            || (self.method.is_none()
                && self.data.get("result").and_then(Value::as_str) == Some("pong"))
    }

    /// Whether a response reports success (`code == 0`, or legacy `result.status`)
    pub fn is_success(&self) -> bool {
        match self.code {
            Some(code) => code == 0,
            None => {
                self.error.is_null()
                    && self.result.get("status").and_then(Value::as_str) == Some("success")
            }
        }
    }

    /// Human readable failure reason for a response
    pub fn error_message(&self) -> String {
        if let Some(message) = self.message.as_deref().filter(|m| !m.is_empty()) {
            return match self.code {
                Some(code) => format!("code {code}: {message}"),
                None => message.to_string(),
            };
        }
        if let Some(message) = self.error.get("message").and_then(Value::as_str) {
            return message.to_string();
        }
        if !self.error.is_null() {
            return self.error.to_string();
        }
        "unexpected response".to_string()
    }

    pub fn ticker_states(&self) -> serde_json::Result<Vec<TickerState>> {
        if let Some(list) = self.data.get("state_list") {
            return Vec::<TickerState>::deserialize(list);
        }

        let Some(first) = self.params.get(0) else {
            return Ok(Vec::new());
        };
        if first.get("market").is_some() {
            return Ok(vec![TickerState::deserialize(first)?]);
        }
        // v1: [{"BTCUSDT": {...}, "ETHUSDT": {...}}]
        let mut states = Vec::new();
        if let Some(by_market) = first.as_object() {
            for (market, state) in by_market {
                let mut state = TickerState::deserialize(state)?;
                state.market = market.clone();
                states.push(state);
            }
        }
        Ok(states)
    }

    pub fn depth_update(&self) -> serde_json::Result<DepthUpdate> {
        if self.data.is_object() {
            let market = string_field(&self.data, "market");
            let is_full = self
                .data
                .get("is_full")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            let book = self.data.get("depth").unwrap_or(&self.data);
            let (asks, bids) = book_sides(book)?;
            return Ok(DepthUpdate {
                market,
                is_full,
                asks,
                bids,
            });
        }

        // v1: [is_full, book, market] or [is_full, market, book]
        let items = self.params.as_array().map(Vec::as_slice).unwrap_or(&[]);
        let is_full = items.first().and_then(Value::as_bool).unwrap_or(false);
        let rest = items.get(1..).unwrap_or(&[]);
        let market = rest
            .iter()
            .find_map(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let (asks, bids) = match rest.iter().find(|v| v.is_object()) {
            Some(book) => book_sides(book)?,
            None => (Vec::new(), Vec::new()),
        };
        Ok(DepthUpdate {
            market,
            is_full,
            asks,
            bids,
        })
    }

    pub fn deals_update(&self) -> serde_json::Result<DealsUpdate> {
        if self.data.is_object() {
            let market = string_field(&self.data, "market");
            let list = self
                .data
                .get("deal_list")
                .or_else(|| self.data.get("deals"));
            let deals = match list {
                Some(list) => Vec::<Deal>::deserialize(list)?,
                None => Vec::new(),
            };
            return Ok(DealsUpdate { market, deals });
        }

        // v1: [market, deals]
        let market = self
            .params
            .get(0)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let deals = match self.params.get(1) {
            Some(list) => Vec::<Deal>::deserialize(list)?,
            None => Vec::new(),
        };
        Ok(DealsUpdate { market, deals })
    }

    /// Classify by method and decode the typed payload
    pub fn into_update(self) -> serde_json::Result<Update> {
        if self.is_pong() {
            return Ok(Update::Pong);
        }
        let method = self.method.clone();
        let update = match method.as_deref() {
            Some(METHOD_STATE_UPDATE) => Update::Ticker(self.ticker_states()?),
            Some(METHOD_DEPTH_UPDATE) => Update::Depth(self.depth_update()?),
            Some(METHOD_DEALS_UPDATE) => Update::Deals(self.deals_update()?),
            Some(METHOD_ORDER_UPDATE) => Update::Order(self.payload().clone()),
            Some(METHOD_BALANCE_UPDATE) | Some(METHOD_ASSET_UPDATE) => {
                Update::Balance(self.payload().clone())
            }
            Some(METHOD_USER_DEALS_UPDATE) => Update::UserDeals(self.payload().clone()),
            None if self.id.is_some() => Update::Response(self),
            _ => Update::Unknown(self),
        };
        Ok(update)
    }
}

fn string_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn book_sides(book: &Value) -> serde_json::Result<(Vec<PriceLevel>, Vec<PriceLevel>)> {
    let side = |key: &str| -> serde_json::Result<Vec<PriceLevel>> {
        match book.get(key) {
            Some(levels) if !levels.is_null() => Vec::<PriceLevel>::deserialize(levels),
            _ => Ok(Vec::new()),
        }
    };
    Ok((side("asks")?, side("bids")?))
}
