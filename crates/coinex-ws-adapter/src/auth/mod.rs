/*
[INPUT]:  API credentials
[OUTPUT]: HMAC signatures and signed auth requests
[POS]:    Auth layer - handles CoinEx WebSocket authentication
[UPDATE]: When auth flow or signature methods change
*/

pub mod credentials;
pub mod signer;

pub use credentials::{Credentials, SignedAuthRequest};
pub use signer::HmacSigner;
