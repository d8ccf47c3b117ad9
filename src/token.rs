use crate::error::{ErrorKind, Result};
use cumulus_catalog::Token;
use exn::ResultExt;
use std::path::Path;

/// Resolve the credential to use: a JSON token file takes precedence over a
/// bare access token.
pub async fn load(file: Option<&Path>, access_token: Option<&str>) -> Result<Option<Token>> {
    let token = match (file, access_token) {
        (Some(path), _) => {
            let json = tokio::fs::read_to_string(path).await.or_raise(|| ErrorKind::Token)?;
            Some(parse(&json)?)
        },
        (None, Some(access_token)) if !access_token.trim().is_empty() => Some(Token::new(access_token.trim())),
        _ => None,
    };
    if let Some(token) = &token
        && token.is_expired()
    {
        tracing::warn!("Access token has expired; requests will likely be rejected");
    }
    Ok(token)
}

fn parse(json: &str) -> Result<Token> {
    serde_json::from_str(json).or_raise(|| ErrorKind::Token)
}
