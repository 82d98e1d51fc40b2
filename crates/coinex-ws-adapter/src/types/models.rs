/*
[INPUT]:  API schema definitions and serde requirements
[OUTPUT]: Typed Rust structs with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketInfo {
    pub market: String,
    #[serde(default)]
    pub base_ccy: String,
    #[serde(default)]
    pub quote_ccy: String,
    #[serde(default)]
    pub base_ccy_precision: u32,
    #[serde(default)]
    pub quote_ccy_precision: u32,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub min_amount: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub maker_fee_rate: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub taker_fee_rate: Option<Decimal>,
    #[serde(default, alias = "is_market_allowed")]
    pub is_api_trading_available: bool,
}

impl MarketInfo {
    pub fn quotes_in(&self, quote: &str) -> bool {
        if self.quote_ccy.is_empty() {
            self.market.ends_with(quote)
        } else {
            self.quote_ccy.eq_ignore_ascii_case(quote)
        }
    }
}

/// Keep only markets quoted in `quote` (e.g. "USDT")
pub fn filter_by_quote<'a>(markets: &'a [MarketInfo], quote: &str) -> Vec<&'a MarketInfo> {
    markets.iter().filter(|m| m.quotes_in(quote)).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kline {
    pub market: String,
    /// Bucket open time in milliseconds
    pub created_at: i64,
    #[serde(with = "rust_decimal::serde::str")]
    pub open: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub close: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub high: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub low: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub volume: Decimal,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub value: Option<Decimal>,
}
