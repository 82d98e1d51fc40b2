/*
[INPUT]:  Market identifiers and query parameters
[OUTPUT]: Market list and kline history
[POS]:    HTTP layer - public market data endpoints (no auth required)
[UPDATE]: When adding new public endpoints or changing response format
*/

use crate::http::{CoinexClient, Result};
use crate::types::{Kline, KlinePeriod, MarketInfo};
use reqwest::Method;

impl CoinexClient {
    /// List all spot markets
    ///
    /// GET /v2/spot/market
    pub async fn list_markets(&self) -> Result<Vec<MarketInfo>> {
        let builder = self.request(Method::GET, "/v2/spot/market")?;
        self.send_json(builder).await
    }

    /// Get kline/candlestick history, newest last
    ///
    /// GET /v2/spot/kline?market={market}&period={period}&limit={limit}
    pub async fn get_klines(
        &self,
        market: &str,
        period: KlinePeriod,
        limit: u32,
    ) -> Result<Vec<Kline>> {
        let limit = limit.to_string();
        let builder = self.request(Method::GET, "/v2/spot/kline")?.query(&[
            ("market", market),
            ("period", period.as_str()),
            ("limit", limit.as_str()),
        ]);
        self.send_json(builder).await
    }
}
