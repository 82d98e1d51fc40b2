/*
[INPUT]:  API access id and secret key supplied out of band
[OUTPUT]: Signed `server.sign` parameters
[POS]:    Auth layer - credential holder and auth request construction
[UPDATE]: When auth params or credential sources change
*/

use serde::Serialize;

use super::signer::HmacSigner;

/// CoinEx API key pair
#[derive(Clone)]
pub struct Credentials {
    pub access_id: String,
    pub secret_key: String,
}

impl Credentials {
    pub fn new(access_id: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_id: access_id.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Build the signed auth params for the given timestamp
    pub fn sign_auth(&self, timestamp_ms: i64) -> SignedAuthRequest {
        let signature = HmacSigner::new(&self.secret_key).sign_timestamp(timestamp_ms);
        SignedAuthRequest {
            access_id: self.access_id.clone(),
            signature,
            timestamp: timestamp_ms,
        }
    }

    /// Build the signed auth params using the current wall clock
    pub fn sign_auth_now(&self) -> SignedAuthRequest {
        self.sign_auth(chrono::Utc::now().timestamp_millis())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_id", &self.access_id)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Parameters of the `server.sign` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedAuthRequest {
    pub access_id: String,
    pub signature: String,
    pub timestamp: i64,
}
