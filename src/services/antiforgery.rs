use chrono::Utc;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::config::AuthConfig;
use crate::error::{AppError, Result};

type HmacSha1 = Hmac<Sha1>;

/// Stateless anti-forgery tokens for the upload form
///
/// Token format: "{issued_at}.{hmac}". Verification recomputes the digest
/// and checks the configured lifetime; nothing is stored server-side.
pub struct AntiForgeryService;

impl AntiForgeryService {
    pub fn issue(config: &AuthConfig) -> String {
        let issued_at = Utc::now().timestamp();
        format!("{}.{}", issued_at, Self::digest(&config.jwt_secret, issued_at))
    }

    pub fn verify(config: &AuthConfig, token: &str) -> Result<()> {
        let (issued_at, digest) = token
            .split_once('.')
            .ok_or_else(|| AppError::BadRequest("Invalid anti-forgery token".to_string()))?;

        let issued_at: i64 = issued_at
            .parse()
            .map_err(|_| AppError::BadRequest("Invalid anti-forgery token".to_string()))?;

        let age = Utc::now().timestamp() - issued_at;
        let lifetime = config.antiforgery_lifetime_minutes as i64 * 60;
        if age < 0 || age > lifetime {
            return Err(AppError::BadRequest(
                "Anti-forgery token expired".to_string(),
            ));
        }

        if Self::digest(&config.jwt_secret, issued_at) != digest {
            return Err(AppError::BadRequest(
                "Invalid anti-forgery token".to_string(),
            ));
        }

        Ok(())
    }

    fn digest(secret: &str, issued_at: i64) -> String {
        let mut mac =
            HmacSha1::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
        mac.update(format!("antiforgery:{}", issued_at).as_bytes());
        mac.finalize()
            .into_bytes()
            .iter()
            .map(|x| format!("{:02x}", x))
            .collect::<Vec<String>>()
            .join("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_verify_roundtrip() {
        let config = AuthConfig::default();
        let token = AntiForgeryService::issue(&config);
        assert!(AntiForgeryService::verify(&config, &token).is_ok());
    }

    #[test]
    fn test_tampered_token_rejected() {
        let config = AuthConfig::default();
        let token = AntiForgeryService::issue(&config);

        let mut tampered = token.clone();
        tampered.pop();
        tampered.push('0');
        assert!(AntiForgeryService::verify(&config, &tampered).is_err());

        assert!(AntiForgeryService::verify(&config, "not-a-token").is_err());
        assert!(AntiForgeryService::verify(&config, "123.").is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let config = AuthConfig::default();
        let stale = Utc::now().timestamp()
            - (config.antiforgery_lifetime_minutes as i64 * 60)
            - 10;
        let token = format!(
            "{}.{}",
            stale,
            AntiForgeryService::digest(&config.jwt_secret, stale)
        );
        assert!(AntiForgeryService::verify(&config, &token).is_err());
    }

    #[test]
    fn test_future_dated_token_rejected() {
        let config = AuthConfig::default();
        let future = Utc::now().timestamp() + 600;
        let token = format!(
            "{}.{}",
            future,
            AntiForgeryService::digest(&config.jwt_secret, future)
        );
        assert!(AntiForgeryService::verify(&config, &token).is_err());
    }
}
