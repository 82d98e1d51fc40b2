/*
[INPUT]:  Dispatched ticker, depth, trade and account updates
[OUTPUT]: Human readable lines on stdout, running market view
[POS]:    Presentation layer - print handlers for the demo scenarios
[UPDATE]: When changing output format or adding new update kinds
*/

use std::io::{self, Write};

use chrono::{Local, TimeZone, Utc};
use coinex_ws_adapter::{
    AlertEvent, DealsUpdate, DepthUpdate, MarketMonitor, MessageHandler, PriceAlert, PriceMove,
    ServerMessage, Spread, TickerState,
};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

const TRADES_PER_UPDATE: usize = 3;

/// Counters for what the handler has seen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsoleStats {
    pub tickers: usize,
    pub depths: usize,
    pub trades: usize,
    pub account_updates: usize,
    pub responses: usize,
    pub pongs: usize,
    pub unknown: usize,
    pub alerts: usize,
}

/// Print handler backed by a [`MarketMonitor`]
pub struct ConsoleHandler<W: Write = io::Stdout> {
    out: W,
    monitor: MarketMonitor,
    alert: Option<PriceAlert>,
    stats: ConsoleStats,
}

impl ConsoleHandler<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleHandler<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            monitor: MarketMonitor::new(),
            alert: None,
            stats: ConsoleStats::default(),
        }
    }

    pub fn with_alert(mut self, alert: PriceAlert) -> Self {
        self.alert = Some(alert);
        self
    }

    pub fn stats(&self) -> ConsoleStats {
        self.stats
    }

    pub fn monitor(&self) -> &MarketMonitor {
        &self.monitor
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Section banner printed at the start of a scenario
    pub fn banner(&mut self, title: &str) {
        let rule = "=".repeat(60);
        let _ = writeln!(self.out, "\n{rule}\n{title}\n{rule}");
    }

    pub fn line(&mut self, text: &str) {
        let _ = writeln!(self.out, "{text}");
    }

    fn print_json(&mut self, title: &str, payload: &Value) {
        let body = serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string());
        let _ = writeln!(self.out, "\n[{}] {title}:\n{body}", clock());
    }
}

impl<W: Write> MessageHandler for ConsoleHandler<W> {
    fn on_ticker(&mut self, states: &[TickerState]) {
        for state in states {
            self.stats.tickers += 1;
            let price_move = self.monitor.record_ticker(state);
            let _ = writeln!(self.out, "{}", format_ticker(state, price_move.as_ref()));

            let (Some(alert), Some(price)) = (self.alert.as_mut(), state.last) else {
                continue;
            };
            if let Some(event) = alert.check(price) {
                self.stats.alerts += 1;
                let _ = writeln!(self.out, "{}", format_alert(&state.market, event));
            }
        }
    }

    fn on_depth(&mut self, depth: &DepthUpdate) {
        self.stats.depths += 1;
        let spread = self.monitor.record_depth(depth);
        let _ = writeln!(self.out, "{}", format_depth(depth, spread.as_ref()));
    }

    fn on_deals(&mut self, deals: &DealsUpdate) {
        self.stats.trades += deals.deals.len();
        self.monitor.record_deals(deals);
        let _ = writeln!(self.out, "{}", format_deals(deals));
    }

    fn on_order(&mut self, payload: &Value) {
        self.stats.account_updates += 1;
        self.print_json("Order Update", payload);
    }

    fn on_balance(&mut self, payload: &Value) {
        self.stats.account_updates += 1;
        self.print_json("Balance Update", payload);
    }

    fn on_user_deals(&mut self, payload: &Value) {
        self.stats.account_updates += 1;
        self.print_json("User Deal", payload);
    }

    fn on_pong(&mut self) {
        self.stats.pongs += 1;
        let _ = writeln!(self.out, "[{}] <- pong", clock());
    }

    fn on_response(&mut self, response: &ServerMessage) {
        self.stats.responses += 1;
        if response.is_success() {
            debug!(id = ?response.id, "ws request acknowledged");
        } else {
            let _ = writeln!(
                self.out,
                "[{}] request {:?} failed: {}",
                clock(),
                response.id,
                response.error_message()
            );
        }
    }

    fn on_unknown(&mut self, message: &ServerMessage) {
        self.stats.unknown += 1;
        debug!(method = ?message.method, "ws message method unrecognized");
    }
}

fn clock() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

fn show(value: Option<Decimal>) -> String {
    value.map_or_else(|| "-".to_string(), |value| value.normalize().to_string())
}

fn signed_pct(value: Decimal) -> String {
    let value = value.round_dp(2).normalize();
    if value.is_sign_negative() {
        format!("{value}%")
    } else {
        format!("+{value}%")
    }
}

pub fn format_ticker(state: &TickerState, price_move: Option<&PriceMove>) -> String {
    let mut text = format!(
        "Ticker [{}] last {} | high {} | low {} | volume {}",
        state.market,
        show(state.last),
        show(state.high),
        show(state.low),
        show(state.volume)
    );
    if let Some(change) = price_move.and_then(|price_move| price_move.change_24h_pct) {
        text.push_str(&format!(" | 24h {}", signed_pct(change)));
    }
    if let Some(change) = price_move.and_then(|price_move| price_move.change_pct) {
        text.push_str(&format!(" | tick {}", signed_pct(change)));
    }
    text
}

pub fn format_depth(depth: &DepthUpdate, spread: Option<&Spread>) -> String {
    let kind = if depth.is_full { "snapshot" } else { "delta" };
    let mut text = format!(
        "Order Book [{}] {kind}: {} asks, {} bids",
        depth.market,
        depth.asks.len(),
        depth.bids.len()
    );
    if let Some(ask) = depth.best_ask() {
        text.push_str(&format!(
            " | best ask {} x {}",
            ask.price().normalize(),
            ask.amount().normalize()
        ));
    }
    if let Some(bid) = depth.best_bid() {
        text.push_str(&format!(
            " | best bid {} x {}",
            bid.price().normalize(),
            bid.amount().normalize()
        ));
    }
    if let Some(spread) = spread {
        text.push_str(&format!(
            " | spread {} ({}%)",
            spread.spread.normalize(),
            spread.spread_pct.round_dp(4).normalize()
        ));
    }
    text
}

pub fn format_deals(update: &DealsUpdate) -> String {
    let mut text = format!("Trades [{}] {} new", update.market, update.deals.len());
    for deal in update.deals.iter().take(TRADES_PER_UPDATE) {
        let at = deal
            .created_at
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .map(|at| at.with_timezone(&Local).format(" at %H:%M:%S").to_string())
            .unwrap_or_default();
        text.push_str(&format!(
            "\n  {} {} @ {}{at}",
            deal.side.as_str(),
            deal.amount.normalize(),
            deal.price.normalize()
        ));
    }
    text
}

pub fn format_alert(market: &str, event: AlertEvent) -> String {
    let (direction, price, threshold) = match event {
        AlertEvent::Above { price, threshold } => ("above", price, threshold),
        AlertEvent::Below { price, threshold } => ("below", price, threshold),
    };
    format!(
        "ALERT [{market}] price {} crossed {direction} {}",
        price.normalize(),
        threshold.normalize()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinex_ws_adapter::ws::PriceLevel;

    fn dec(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    fn ticker(market: &str, last: &str) -> TickerState {
        TickerState {
            market: market.to_string(),
            last: Some(dec(last)),
            open: Some(dec("100")),
            high: Some(dec("110")),
            low: Some(dec("90")),
            volume: Some(dec("12.5")),
            ..TickerState::default()
        }
    }

    #[test]
    fn test_ticker_line_contains_market_and_fields() {
        let state = ticker("BTCUSDT", "105");
        let line = format_ticker(&state, None);
        assert_eq!(
            line,
            "Ticker [BTCUSDT] last 105 | high 110 | low 90 | volume 12.5"
        );
    }

    #[test]
    fn test_handler_prints_and_counts_tickers() {
        let mut handler = ConsoleHandler::new(Vec::new());
        handler.on_ticker(&[ticker("BTCUSDT", "105"), ticker("ETHUSDT", "99")]);

        assert_eq!(handler.stats().tickers, 2);
        assert_eq!(handler.monitor().last_price("BTCUSDT"), Some(dec("105")));
        let output = String::from_utf8(handler.into_inner()).unwrap();
        assert!(output.contains("Ticker [BTCUSDT]"));
        assert!(output.contains("Ticker [ETHUSDT]"));
        assert!(output.contains("24h +5%"));
    }

    #[test]
    fn test_alert_fires_on_band_crossing() {
        let mut handler =
            ConsoleHandler::new(Vec::new()).with_alert(PriceAlert::new(dec("95"), dec("108")));
        handler.on_ticker(&[ticker("BTCUSDT", "100")]);
        handler.on_ticker(&[ticker("BTCUSDT", "109")]);

        assert_eq!(handler.stats().alerts, 1);
        let output = String::from_utf8(handler.into_inner()).unwrap();
        assert!(output.contains("ALERT [BTCUSDT] price 109 crossed above 108"));
    }

    #[test]
    fn test_depth_line_reports_spread() {
        let depth = DepthUpdate {
            market: "BTCUSDT".to_string(),
            is_full: true,
            asks: vec![PriceLevel(dec("101"), dec("1"))],
            bids: vec![PriceLevel(dec("100"), dec("2"))],
        };
        let mut handler = ConsoleHandler::new(Vec::new());
        handler.on_depth(&depth);

        let output = String::from_utf8(handler.into_inner()).unwrap();
        assert!(output.contains("snapshot: 1 asks, 1 bids"));
        assert!(output.contains("best ask 101 x 1"));
        assert!(output.contains("spread 1 (1%)"));
    }

    #[test]
    fn test_account_payloads_are_printed_as_json() {
        let mut handler = ConsoleHandler::new(Vec::new());
        handler.on_balance(&serde_json::json!({"ccy": "USDT", "available": "10"}));

        assert_eq!(handler.stats().account_updates, 1);
        let output = String::from_utf8(handler.into_inner()).unwrap();
        assert!(output.contains("Balance Update"));
        assert!(output.contains("\"ccy\": \"USDT\""));
    }
}
