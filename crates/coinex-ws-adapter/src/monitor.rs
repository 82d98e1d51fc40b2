/*
[INPUT]:  Typed ticker, depth and trade updates
[OUTPUT]: Per-market price moves, spreads, bounded history and price alerts
[POS]:    Analytics layer - in-memory market view (no trading logic)
[UPDATE]: When adding derived market signals or changing retention limits
*/

use std::collections::{HashMap, VecDeque};

use rust_decimal::Decimal;

use crate::ws::{Deal, DealsUpdate, DepthUpdate, TickerState};

pub const PRICE_HISTORY_LIMIT: usize = 100;
pub const RECENT_TRADES_LIMIT: usize = 10;

/// Result of recording a ticker update
#[derive(Debug, Clone, PartialEq)]
pub struct PriceMove {
    pub market: String,
    pub last: Decimal,
    /// Percent change against the previous update, if there was one
    pub change_pct: Option<Decimal>,
    /// Percent change against the 24h open
    pub change_24h_pct: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spread {
    pub market: String,
    pub best_ask: Decimal,
    pub best_bid: Decimal,
    pub spread: Decimal,
    /// Spread as percent of the best bid
    pub spread_pct: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecentTrade {
    pub market: String,
    pub deal: Deal,
}

#[derive(Debug, Default)]
struct MarketView {
    last_price: Option<Decimal>,
    history: VecDeque<Decimal>,
    best_ask: Option<Decimal>,
    best_bid: Option<Decimal>,
}

#[derive(Debug, Default)]
pub struct MarketMonitor {
    markets: HashMap<String, MarketView>,
    recent_trades: VecDeque<RecentTrade>,
}

impl MarketMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_ticker(&mut self, state: &TickerState) -> Option<PriceMove> {
        let last = state.last?;
        let view = self.markets.entry(state.market.clone()).or_default();

        let change_pct = view.last_price.and_then(|previous| percent_change(previous, last));
        let change_24h_pct = state.open.and_then(|open| percent_change(open, last));

        view.last_price = Some(last);
        view.history.push_back(last);
        while view.history.len() > PRICE_HISTORY_LIMIT {
            view.history.pop_front();
        }

        Some(PriceMove {
            market: state.market.clone(),
            last,
            change_pct,
            change_24h_pct,
        })
    }

    /// Track top of book; returns the spread once both sides are known
    pub fn record_depth(&mut self, depth: &DepthUpdate) -> Option<Spread> {
        let view = self.markets.entry(depth.market.clone()).or_default();

        if depth.is_full || !depth.asks.is_empty() {
            view.best_ask = depth.best_ask().map(|level| level.price());
        }
        if depth.is_full || !depth.bids.is_empty() {
            view.best_bid = depth.best_bid().map(|level| level.price());
        }

        let (best_ask, best_bid) = (view.best_ask?, view.best_bid?);
        if best_bid <= Decimal::ZERO {
            return None;
        }
        let spread = best_ask.checked_sub(best_bid)?;
        let spread_pct = spread
            .checked_div(best_bid)?
            .checked_mul(Decimal::ONE_HUNDRED)?;
        Some(Spread {
            market: depth.market.clone(),
            best_ask,
            best_bid,
            spread,
            spread_pct,
        })
    }

    pub fn record_deals(&mut self, update: &DealsUpdate) {
        for deal in &update.deals {
            self.recent_trades.push_back(RecentTrade {
                market: update.market.clone(),
                deal: deal.clone(),
            });
        }
        while self.recent_trades.len() > RECENT_TRADES_LIMIT {
            self.recent_trades.pop_front();
        }
    }

    pub fn last_price(&self, market: &str) -> Option<Decimal> {
        self.markets.get(market)?.last_price
    }

    pub fn price_history(&self, market: &str) -> Vec<Decimal> {
        self.markets
            .get(market)
            .map(|view| view.history.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn recent_trades(&self) -> impl Iterator<Item = &RecentTrade> {
        self.recent_trades.iter()
    }
}

/// None when `from` is not positive or the result leaves Decimal range
fn percent_change(from: Decimal, to: Decimal) -> Option<Decimal> {
    if from <= Decimal::ZERO {
        return None;
    }
    to.checked_sub(from)?
        .checked_div(from)?
        .checked_mul(Decimal::ONE_HUNDRED)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertEvent {
    Above { price: Decimal, threshold: Decimal },
    Below { price: Decimal, threshold: Decimal },
}

/// Fires once per band exit and re-arms when price returns strictly inside
#[derive(Debug, Clone)]
pub struct PriceAlert {
    high: Decimal,
    low: Decimal,
    alerted_high: bool,
    alerted_low: bool,
}

impl PriceAlert {
    pub fn new(low: Decimal, high: Decimal) -> Self {
        Self {
            high,
            low,
            alerted_high: false,
            alerted_low: false,
        }
    }

    pub fn check(&mut self, price: Decimal) -> Option<AlertEvent> {
        let mut event = None;
        if price >= self.high && !self.alerted_high {
            self.alerted_high = true;
            event = Some(AlertEvent::Above {
                price,
                threshold: self.high,
            });
        } else if price <= self.low && !self.alerted_low {
            self.alerted_low = true;
            event = Some(AlertEvent::Below {
                price,
                threshold: self.low,
            });
        }

        if self.low < price && price < self.high {
            self.alerted_high = false;
            self.alerted_low = false;
        }
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TradeSide;
    use crate::ws::PriceLevel;

    fn dec(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    fn ticker(market: &str, last: &str, open: Option<&str>) -> TickerState {
        TickerState {
            market: market.to_string(),
            last: Some(dec(last)),
            open: open.map(dec),
            ..TickerState::default()
        }
    }

    #[test]
    fn test_record_ticker_changes() {
        let mut monitor = MarketMonitor::new();

        let first = monitor
            .record_ticker(&ticker("BTCUSDT", "100", Some("80")))
            .unwrap();
        assert_eq!(first.change_pct, None);
        assert_eq!(first.change_24h_pct, Some(dec("25")));

        let second = monitor.record_ticker(&ticker("BTCUSDT", "110", None)).unwrap();
        assert_eq!(second.change_pct, Some(dec("10")));
        assert_eq!(second.change_24h_pct, None);
        assert_eq!(monitor.last_price("BTCUSDT"), Some(dec("110")));
    }

    #[test]
    fn test_ticker_without_last_is_ignored() {
        let mut monitor = MarketMonitor::new();
        let state = TickerState {
            market: "BTCUSDT".to_string(),
            ..TickerState::default()
        };
        assert!(monitor.record_ticker(&state).is_none());
        assert!(monitor.price_history("BTCUSDT").is_empty());
    }

    #[test]
    fn test_price_history_is_bounded() {
        let mut monitor = MarketMonitor::new();
        for i in 1..=(PRICE_HISTORY_LIMIT + 5) {
            monitor.record_ticker(&ticker("ETHUSDT", &i.to_string(), None));
        }

        let history = monitor.price_history("ETHUSDT");
        assert_eq!(history.len(), PRICE_HISTORY_LIMIT);
        assert_eq!(history[0], Decimal::from(6));
    }

    #[test]
    fn test_record_depth_spread() {
        let mut monitor = MarketMonitor::new();
        let depth = DepthUpdate {
            market: "BTCUSDT".to_string(),
            is_full: true,
            asks: vec![PriceLevel(dec("101"), dec("1"))],
            bids: vec![PriceLevel(dec("100"), dec("2"))],
        };

        let spread = monitor.record_depth(&depth).unwrap();
        assert_eq!(spread.spread, dec("1"));
        assert_eq!(spread.spread_pct, dec("1"));

        // Delta touching only bids keeps the previous ask
        let delta = DepthUpdate {
            market: "BTCUSDT".to_string(),
            is_full: false,
            asks: Vec::new(),
            bids: vec![PriceLevel(dec("99"), dec("1"))],
        };
        let spread = monitor.record_depth(&delta).unwrap();
        assert_eq!(spread.best_ask, dec("101"));
        assert_eq!(spread.spread, dec("2"));
    }

    #[test]
    fn test_record_depth_one_sided_book() {
        let mut monitor = MarketMonitor::new();
        let depth = DepthUpdate {
            market: "BTCUSDT".to_string(),
            is_full: true,
            asks: vec![PriceLevel(dec("101"), dec("1"))],
            bids: Vec::new(),
        };
        assert!(monitor.record_depth(&depth).is_none());
    }

    #[test]
    fn test_extreme_prices_skip_derived_values() {
        let huge = dec("79228162514264337593543950");
        let tiny = dec("0.0001");
        let mut monitor = MarketMonitor::new();

        let price_move = monitor
            .record_ticker(&ticker("BTCUSDT", "79228162514264337593543950", Some("0.0001")))
            .unwrap();
        assert_eq!(price_move.last, huge);
        assert_eq!(price_move.change_24h_pct, None);
        assert_eq!(monitor.last_price("BTCUSDT"), Some(huge));

        let depth = DepthUpdate {
            market: "BTCUSDT".to_string(),
            is_full: true,
            asks: vec![PriceLevel(huge, dec("1"))],
            bids: vec![PriceLevel(tiny, dec("1"))],
        };
        assert!(monitor.record_depth(&depth).is_none());

        // Tick change from the huge price back down stays in range
        let next = monitor.record_ticker(&ticker("BTCUSDT", "1", None)).unwrap();
        assert!(next.change_pct.is_some());
    }

    #[test]
    fn test_recent_trades_are_bounded() {
        let mut monitor = MarketMonitor::new();
        let deals = (0..15)
            .map(|i| Deal {
                deal_id: Some(i),
                created_at: None,
                side: TradeSide::Sell,
                price: Decimal::from(100 + i),
                amount: dec("0.5"),
            })
            .collect();
        monitor.record_deals(&DealsUpdate {
            market: "BTCUSDT".to_string(),
            deals,
        });

        let trades: Vec<_> = monitor.recent_trades().collect();
        assert_eq!(trades.len(), RECENT_TRADES_LIMIT);
        assert_eq!(trades[0].deal.deal_id, Some(5));
        assert_eq!(trades[0].market, "BTCUSDT");
    }

    #[test]
    fn test_price_alert_fires_once_and_rearms() {
        let mut alert = PriceAlert::new(dec("95000"), dec("105000"));

        assert_eq!(alert.check(dec("100000")), None);
        assert_eq!(
            alert.check(dec("105500")),
            Some(AlertEvent::Above {
                price: dec("105500"),
                threshold: dec("105000"),
            })
        );
        assert_eq!(alert.check(dec("106000")), None);
        assert_eq!(alert.check(dec("100000")), None);
        assert!(matches!(
            alert.check(dec("105000")),
            Some(AlertEvent::Above { .. })
        ));
        assert!(matches!(
            alert.check(dec("94000")),
            Some(AlertEvent::Below { .. })
        ));
        assert_eq!(alert.check(dec("93000")), None);
    }
}
