//! Request and URL signing for blob access.
//!
//! A signature covers the HTTP method, the URL path, and a validity window
//! ("start;end" unix seconds). The same scheme authorizes remote store
//! requests (Authorization header) and time-boxed read URLs (query string).

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha1::{Digest, Sha1};
use std::time::Duration;

type HmacSha1 = Hmac<Sha1>;

/// Signer for one request shape
pub struct Signer<'a> {
    method: &'a str,
    path: &'a str,
}

/// A computed signature plus the window it is valid for
#[derive(Debug, Clone)]
pub struct SignedToken {
    pub key_time: String,
    pub signature: String,
}

impl SignedToken {
    /// Render as URL query parameters
    pub fn query_string(&self) -> String {
        format!(
            "sign-time={}&signature={}",
            urlencoding::encode(&self.key_time),
            self.signature
        )
    }

    /// Render as an Authorization header value
    pub fn header_value(&self) -> String {
        format!(
            "sign-algorithm=sha1&sign-time={}&signature={}",
            self.key_time, self.signature
        )
    }
}

impl<'a> Signer<'a> {
    pub fn new(method: &'a str, path: &'a str) -> Self {
        Self { method, path }
    }

    fn hmac_hex(key: &str, data: &str) -> String {
        let mut mac =
            HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC can take key of any size");
        mac.update(data.as_bytes());
        let code_bytes = mac.finalize().into_bytes();

        code_bytes
            .iter()
            .map(|x| format!("{:02x}", x))
            .collect::<Vec<String>>()
            .join("")
    }

    fn sha1_hex(data: &str) -> String {
        let mut hasher = Sha1::new();
        hasher.update(data.as_bytes());
        hasher
            .finalize()
            .as_slice()
            .iter()
            .map(|x| format!("{:02x}", x))
            .collect::<Vec<String>>()
            .join("")
    }

    fn http_string(&self) -> String {
        format!("{}\n{}\n", self.method.to_lowercase(), self.path)
    }

    fn string_to_sign(&self, key_time: &str) -> String {
        format!("sha1\n{}\n{}\n", key_time, Self::sha1_hex(&self.http_string()))
    }

    /// Compute the signature for an explicit validity window
    pub fn signature_for_window(&self, access_key: &str, key_time: &str) -> String {
        let sign_key = Self::hmac_hex(access_key, key_time);
        Self::hmac_hex(&sign_key, &self.string_to_sign(key_time))
    }

    /// Sign with a window starting now
    pub fn sign(&self, access_key: &str, valid_for: Duration) -> SignedToken {
        let start = Utc::now().timestamp();
        let end = start + valid_for.as_secs() as i64;
        let key_time = format!("{};{}", start, end);
        let signature = self.signature_for_window(access_key, &key_time);
        SignedToken {
            key_time,
            signature,
        }
    }

    /// Check a presented signature against the key and its validity window
    pub fn verify(&self, access_key: &str, key_time: &str, signature: &str, now: i64) -> bool {
        let Some((start, end)) = key_time.split_once(';') else {
            return false;
        };
        let (Ok(start), Ok(end)) = (start.parse::<i64>(), end.parse::<i64>()) else {
            return false;
        };
        if now < start || now > end {
            return false;
        }
        self.signature_for_window(access_key, key_time) == signature
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_is_deterministic_per_window() {
        let signer = Signer::new("get", "/images/a.png");
        let a = signer.signature_for_window("key", "100;200");
        let b = signer.signature_for_window("key", "100;200");
        assert_eq!(a, b);
        assert_eq!(a.len(), 40); // hex-encoded sha1 output

        // A different window or path must change the signature
        assert_ne!(a, signer.signature_for_window("key", "100;201"));
        assert_ne!(
            a,
            Signer::new("get", "/images/b.png").signature_for_window("key", "100;200")
        );
    }

    #[test]
    fn test_verify_inside_window() {
        let signer = Signer::new("get", "/blobs/a.png");
        let signature = signer.signature_for_window("key", "100;200");
        assert!(signer.verify("key", "100;200", &signature, 150));
        assert!(signer.verify("key", "100;200", &signature, 100));
        assert!(signer.verify("key", "100;200", &signature, 200));
    }

    #[test]
    fn test_verify_rejects_expired_or_tampered() {
        let signer = Signer::new("get", "/blobs/a.png");
        let signature = signer.signature_for_window("key", "100;200");
        assert!(!signer.verify("key", "100;200", &signature, 201));
        assert!(!signer.verify("key", "100;200", &signature, 99));
        assert!(!signer.verify("other-key", "100;200", &signature, 150));
        assert!(!signer.verify("key", "100;200", "bad-signature", 150));
        assert!(!signer.verify("key", "not-a-window", &signature, 150));
    }

    #[test]
    fn test_method_case_is_normalized() {
        let upper = Signer::new("GET", "/blobs/a.png").signature_for_window("key", "100;200");
        let lower = Signer::new("get", "/blobs/a.png").signature_for_window("key", "100;200");
        assert_eq!(upper, lower);
    }
}
