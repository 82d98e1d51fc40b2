/*
[INPUT]:  WebSocket configuration and subscription channels
[OUTPUT]: Real-time market data and account updates
[POS]:    WebSocket layer - real-time data streams
[UPDATE]: When adding new channels or changing connection logic
*/

pub mod client;
pub mod codec;
pub mod dispatch;
pub mod message;
pub mod request;

pub use client::{CoinexWebSocket, ConnectionState, DEFAULT_WS_URL, Subscription};
pub use dispatch::{MessageHandler, dispatch, listen};
pub use message::{
    Deal, DealsUpdate, DepthUpdate, PriceLevel, ServerMessage, TickerState, Update,
};
pub use request::{Channel, Request};
