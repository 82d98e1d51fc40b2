/*
[INPUT]:  Secret key bytes and a millisecond timestamp
[OUTPUT]: Lowercase hex HMAC-SHA256 signatures
[POS]:    Auth layer - cryptographic signing for `server.sign`
[UPDATE]: When changing signing algorithm or signed payload format
*/

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 signer keyed by the account secret
pub struct HmacSigner {
    secret_key: Vec<u8>,
}

impl HmacSigner {
    pub fn new(secret_key: impl AsRef<[u8]>) -> Self {
        Self {
            secret_key: secret_key.as_ref().to_vec(),
        }
    }

    /// Sign raw bytes and return the lowercase hex digest (64 chars)
    pub fn sign(&self, message: &[u8]) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret_key).expect("HMAC can take key of any size");
        mac.update(message);
        hex::encode(mac.finalize().into_bytes())
    }

    /// Sign the decimal string form of a millisecond timestamp
    pub fn sign_timestamp(&self, timestamp_ms: i64) -> String {
        self.sign(timestamp_ms.to_string().as_bytes())
    }

    /// Constant-time check of a hex signature against a message
    pub fn verify(&self, message: &[u8], signature_hex: &str) -> bool {
        let Ok(expected) = hex::decode(signature_hex) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.secret_key) else {
            return false;
        };
        mac.update(message);
        mac.verify_slice(&expected).is_ok()
    }
}

impl std::fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSigner")
            .field("secret_key", &"<redacted>")
            .finish()
    }
}
