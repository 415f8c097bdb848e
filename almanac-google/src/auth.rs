//! OAuth token endpoint client.
//!
//! Handles the code exchange completing the OAuth handshake and the
//! unattended refresh used by the token store.

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use almanac_core::{OAuthExchange, SyncError, TokenSet};

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

pub const SCOPES: &[&str] = &["https://www.googleapis.com/auth/calendar"];

#[derive(Debug, Clone)]
pub struct GoogleOAuth {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: i64,
}

impl GoogleOAuth {
    pub fn new(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        GoogleOAuth {
            http: reqwest::Client::new(),
            client_id,
            client_secret,
            redirect_uri,
        }
    }

    /// Consent-screen URL the UI sends the user to. `state` carries the
    /// resolved user id so the callback never has to guess the identity.
    pub fn authorize_url(&self, state: &str) -> String {
        let mut url = Url::parse(AUTH_URL).expect("static URL");
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &SCOPES.join(" "))
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .append_pair("state", state);
        url.to_string()
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<TokenResponse, SyncError> {
        let response = self
            .http
            .post(TOKEN_URL)
            .form(params)
            .send()
            .await
            .map_err(|e| SyncError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Http(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| SyncError::Http(format!("invalid token response: {}", e)))
    }
}

#[async_trait]
impl OAuthExchange for GoogleOAuth {
    async fn exchange_code(&self, code: &str) -> Result<TokenSet, SyncError> {
        let tokens = self
            .token_request(&[
                ("code", code),
                ("client_id", &self.client_id),
                ("client_secret", &self.client_secret),
                ("redirect_uri", &self.redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .await?;

        Ok(TokenSet::from_expires_in(
            tokens.access_token,
            tokens.refresh_token,
            tokens.expires_in,
        ))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, SyncError> {
        let tokens = self
            .token_request(&[
                ("refresh_token", refresh_token),
                ("client_id", &self.client_id),
                ("client_secret", &self.client_secret),
                ("grant_type", "refresh_token"),
            ])
            .await
            // A rejected refresh means the grant is gone; callers mark the
            // credential invalid rather than retrying.
            .map_err(|_| SyncError::AuthExpired)?;

        // Google typically doesn't return a new refresh_token on refresh
        Ok(TokenSet::from_expires_in(
            tokens.access_token,
            tokens.refresh_token.filter(|t| !t.is_empty()),
            tokens.expires_in,
        ))
    }
}
