use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use serde::Deserialize;

use crate::config::GoogleConfig;
use crate::error::{AppError, Result};
use crate::store::GoogleProfile;

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

type GoogleClient = BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

fn oauth_error(e: impl std::fmt::Display) -> AppError {
    AppError::OAuth(e.to_string())
}

#[derive(Deserialize)]
struct UserInfo {
    sub: String,
    email: Option<String>,
    name: Option<String>,
}

/// Authorization-code flow against Google.
pub struct GoogleAuth {
    client: GoogleClient,
    http: reqwest::Client,
}

impl GoogleAuth {
    pub fn new(config: &GoogleConfig) -> Result<Self> {
        let redirect = RedirectUrl::new(config.redirect_url.clone()).map_err(|e| {
            AppError::Validation(format!("Invalid Google redirect URL {}: {}", config.redirect_url, e))
        })?;
        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_auth_uri(AuthUrl::new(AUTH_URL.to_string()).map_err(oauth_error)?)
            .set_token_uri(TokenUrl::new(TOKEN_URL.to_string()).map_err(oauth_error)?)
            .set_redirect_uri(redirect);

        // Following redirects from the token endpoint would leak the code.
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(oauth_error)?;

        Ok(Self { client, http })
    }

    /// Consent page URL plus the state value the callback must echo back.
    pub fn authorize_url(&self) -> (String, CsrfToken) {
        let (url, state) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("openid".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .add_scope(Scope::new("profile".to_string()))
            .url();
        (url.to_string(), state)
    }

    /// Trades the callback code for a token and reads the account's profile.
    pub async fn fetch_profile(&self, code: String) -> Result<GoogleProfile> {
        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .request_async(&self.http)
            .await
            .map_err(oauth_error)?;

        let info: UserInfo = self
            .http
            .get(USERINFO_URL)
            .bearer_auth(token.access_token().secret())
            .send()
            .await
            .map_err(oauth_error)?
            .error_for_status()
            .map_err(oauth_error)?
            .json()
            .await
            .map_err(oauth_error)?;

        let email = info
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| AppError::Validation("Google account has no email address".to_string()))?;

        Ok(GoogleProfile {
            google_id: info.sub,
            email,
            name: info.name,
        })
    }
}
