/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public CoinEx adapter crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod auth;
pub mod http;
pub mod monitor;
pub mod types;
pub mod ws;

// Re-export commonly used types from auth
pub use auth::{Credentials, HmacSigner, SignedAuthRequest};

// Re-export commonly used types from http
pub use http::{ClientConfig, CoinexClient, CoinexError, Result};

pub use monitor::{AlertEvent, MarketMonitor, PriceAlert, PriceMove, Spread};

// Re-export all types
pub use types::*;

// Re-export commonly used types from ws
pub use ws::{
    Channel,
    CoinexWebSocket,
    ConnectionState,
    DealsUpdate,
    DepthUpdate,
    MessageHandler,
    ServerMessage,
    Subscription,
    TickerState,
    Update,
};
