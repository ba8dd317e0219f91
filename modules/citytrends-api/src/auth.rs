use axum::http::{header, HeaderMap};
use tracing::warn;

/// Bearer-token check for the scheduled trigger endpoints.
#[derive(Debug, Clone, Default)]
pub struct CronAuth {
    secret: Option<String>,
    require_secret: bool,
}

impl CronAuth {
    pub fn new(secret: Option<String>, require_secret: bool) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
            require_secret,
        }
    }

    /// With a secret configured, the request must carry `Authorization: Bearer <secret>`.
    /// Without one, requests pass unless the secret is required.
    pub fn authorize(&self, headers: &HeaderMap) -> bool {
        let Some(secret) = self.secret.as_deref() else {
            if self.require_secret {
                warn!("CRON_SECRET is required but not set, rejecting trigger");
                return false;
            }
            warn!("CRON_SECRET is not set, allowing unauthenticated trigger");
            return true;
        };

        let presented = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        match presented {
            Some(token) => constant_time_eq(token.as_bytes(), secret.as_bytes()),
            None => false,
        }
    }
}

/// Constant-time comparison to prevent timing attacks.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[test]
    fn matching_secret_passes() {
        let auth = CronAuth::new(Some("s3cret".to_string()), false);
        assert!(auth.authorize(&bearer("s3cret")));
    }

    #[test]
    fn wrong_or_missing_token_fails() {
        let auth = CronAuth::new(Some("s3cret".to_string()), false);
        assert!(!auth.authorize(&bearer("nope")));
        assert!(!auth.authorize(&bearer("s3cret2")));
        assert!(!auth.authorize(&HeaderMap::new()));
    }

    #[test]
    fn token_without_bearer_scheme_fails() {
        let auth = CronAuth::new(Some("s3cret".to_string()), false);
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("s3cret"));
        assert!(!auth.authorize(&headers));
    }

    #[test]
    fn unset_secret_is_open_unless_required() {
        assert!(CronAuth::new(None, false).authorize(&HeaderMap::new()));
        assert!(CronAuth::new(Some(String::new()), false).authorize(&HeaderMap::new()));
        assert!(!CronAuth::new(None, true).authorize(&bearer("anything")));
    }

    #[test]
    fn constant_time_eq_compares_bytes() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }
}
