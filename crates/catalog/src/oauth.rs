//! OAuth client registrations handed to hosts.
//!
//! Sources only ever receive a finished [`Token`](crate::Token); acquiring
//! one is the host's job. A registration carries everything the host's
//! authorization flow needs for one source type.

use serde::Serialize;
use std::fmt;

/// Read-only access to file contents and metadata.
pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://accounts.google.com/o/oauth2/token";

/// An OAuth 2.0 client registration for one source type.
///
/// Serializes without the client secret.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct OAuthClient {
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret: String,
    pub redirect_url: String,
    pub scopes: Vec<String>,
    pub auth_url: String,
    pub token_url: String,
}
impl OAuthClient {
    /// Registration for the Drive source.
    ///
    /// The redirect URL is `redirect_base` with the source name appended, so
    /// one callback prefix can serve every registered source.
    pub fn drive(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_base: impl AsRef<str>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_url: format!("{}{}", redirect_base.as_ref(), crate::registry::DRIVE),
            scopes: vec![DRIVE_READONLY_SCOPE.to_string()],
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
        }
    }
}
impl fmt::Debug for OAuthClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthClient")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_url", &self.redirect_url)
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}
