use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// An OAuth credential for one remote account.
///
/// Acquiring and renewing tokens is the host's job; a source only ever reads
/// its credential. The JSON shape matches what common OAuth libraries
/// persist (`access_token`, `refresh_token`, `token_type`, `expiry`).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default, with = "time::serde::rfc3339::option", skip_serializing_if = "Option::is_none")]
    pub expiry: Option<OffsetDateTime>,
    /// Stable identifier of the account, when the host knows one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
}
impl Token {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            token_type: default_token_type(),
            expiry: None,
            account_id: None,
        }
    }

    pub fn with_account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    pub fn with_expiry(mut self, expiry: OffsetDateTime) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Whether the access token has expired as of `now`. Tokens without an
    /// expiry never expire.
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expiry.is_some_and(|expiry| expiry <= now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(OffsetDateTime::now_utc())
    }

    /// Key identifying the account behind this credential.
    ///
    /// Prefers the stable account identifier; falls back to the access token,
    /// which changes whenever the token is renewed.
    pub fn key(&self) -> &str {
        self.account_id.as_deref().unwrap_or(&self.access_token)
    }
}
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("token_type", &self.token_type)
            .field("expiry", &self.expiry)
            .field("account_id", &self.account_id)
            .finish()
    }
}

fn default_token_type() -> String {
    DEFAULT_TOKEN_TYPE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;
    use time::format_description::well_known::Rfc3339;

    #[test]
    fn test_key_prefers_account_id() {
        assert_eq!(Token::new("ya29.secret").key(), "ya29.secret");
        assert_eq!(Token::new("ya29.secret").with_account_id("user@example.com").key(), "user@example.com");
    }

    #[test]
    fn test_expiry() {
        let now = OffsetDateTime::now_utc();
        assert!(!Token::new("t").is_expired_at(now));
        assert!(Token::new("t").with_expiry(now - Duration::minutes(1)).is_expired_at(now));
        assert!(!Token::new("t").with_expiry(now + Duration::minutes(1)).is_expired_at(now));
    }

    #[test]
    fn test_deserialize_minimal() {
        let token: Token = serde_json::from_str(r#"{"access_token":"abc"}"#).unwrap();
        assert_eq!(token, Token::new("abc"));
        assert_eq!(token.token_type, "Bearer");
    }

    #[test]
    fn test_deserialize_full() {
        let token: Token = serde_json::from_str(
            r#"{"access_token":"abc","refresh_token":"def","token_type":"Bearer","expiry":"2026-01-02T03:04:05Z","account_id":"me"}"#,
        )
        .unwrap();
        assert_eq!(token.expiry, Some(OffsetDateTime::parse("2026-01-02T03:04:05Z", &Rfc3339).unwrap()));
        assert_eq!(token.refresh_token.as_deref(), Some("def"));
        assert_eq!(serde_json::from_str::<Token>(&serde_json::to_string(&token).unwrap()).unwrap(), token);
    }

    #[test]
    fn test_debug_hides_secrets() {
        let debug = format!("{:?}", Token::new("ya29.secret"));
        assert!(!debug.contains("ya29.secret"));
    }
}
