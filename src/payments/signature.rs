use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Verifies gateway payment callbacks.
///
/// The gateway signs `"{order_ref}|{payment_ref}"` with a secret shared with
/// this server; a matching signature is treated as proof the processor
/// authorized that exact (order, payment) pair.
#[derive(Clone)]
pub struct SignatureVerifier {
    key_secret: String,
}

impl SignatureVerifier {
    pub fn new(key_secret: String) -> Self {
        Self { key_secret }
    }

    /// Hex-encoded HMAC-SHA256 over the canonical message.
    pub fn expected_signature(&self, order_ref: &str, payment_ref: &str) -> String {
        let message = format!("{}|{}", order_ref, payment_ref);
        let mut mac = HmacSha256::new_from_slice(self.key_secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(message.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Constant-time comparison against the signature supplied by the client.
    pub fn verify(&self, order_ref: &str, payment_ref: &str, signature: &str) -> bool {
        let expected = self.expected_signature(order_ref, payment_ref);
        constant_time_eq(&expected, signature)
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}
