//! OAuth token endpoint client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use drivedesk_core::error::{AuthError, Error};
use drivedesk_core::{
    ApiUrl, ClientCredentials, CredentialPair, Credentials, RefreshToken, Result, TokenEndpoint,
};

use crate::client::{build_http_client, handle_response, map_reqwest, parse_error_response};
use crate::config::ClientConfig;

/// Form body for the password grant.
#[derive(Serialize)]
struct PasswordGrant<'a> {
    grant_type: &'static str,
    username: &'a str,
    password: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
}

/// Form body for the refresh grant.
#[derive(Serialize)]
struct RefreshGrant<'a> {
    grant_type: &'static str,
    refresh_token: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
}

/// Success body from the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
}

impl From<TokenResponse> for CredentialPair {
    fn from(response: TokenResponse) -> Self {
        CredentialPair::new(response.access_token, response.refresh_token)
    }
}

/// Token endpoint speaking the OAuth password and refresh grants with
/// URL-encoded form bodies.
#[derive(Debug, Clone)]
pub struct OAuthTokenClient {
    http: reqwest::Client,
    token_url: ApiUrl,
    client: ClientCredentials,
}

impl OAuthTokenClient {
    /// Create a token client with its own HTTP connection pool.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self::with_http(build_http_client(config)?, config))
    }

    /// Create a token client that shares an existing connection pool.
    pub(crate) fn with_http(http: reqwest::Client, config: &ClientConfig) -> Self {
        Self {
            http,
            token_url: config.token_url().clone(),
            client: config.client().clone(),
        }
    }

    /// Returns the token endpoint URL.
    pub fn url(&self) -> &ApiUrl {
        &self.token_url
    }

    async fn exchange<F: Serialize>(&self, form: &F) -> Result<reqwest::Response> {
        self.http
            .post(self.token_url.as_str())
            .header(reqwest::header::ACCEPT, "application/json")
            .form(form)
            .send()
            .await
            .map_err(map_reqwest)
    }
}

#[async_trait]
impl TokenEndpoint for OAuthTokenClient {
    #[instrument(skip(self, credentials), fields(url = %self.token_url, username = %credentials.username()))]
    async fn login(&self, credentials: &Credentials) -> Result<CredentialPair> {
        debug!("Requesting password grant");

        let form = PasswordGrant {
            grant_type: "password",
            username: credentials.username(),
            password: credentials.password(),
            client_id: self.client.client_id(),
            client_secret: self.client.client_secret(),
        };

        let response = self.exchange(&form).await?;
        let status = response.status().as_u16();
        if status == 400 || status == 401 {
            let error = parse_error_response(response).await;
            debug!(%error, "Password grant rejected");
            return Err(Error::Auth(AuthError::InvalidCredentials));
        }

        let body: TokenResponse = handle_response(response).await?;
        Ok(body.into())
    }

    #[instrument(skip_all, fields(url = %self.token_url))]
    async fn refresh(&self, refresh_token: &RefreshToken) -> Result<CredentialPair> {
        debug!("Requesting refresh grant");

        let form = RefreshGrant {
            grant_type: "refresh_token",
            refresh_token: refresh_token.as_str(),
            client_id: self.client.client_id(),
            client_secret: self.client.client_secret(),
        };

        let response = self.exchange(&form).await?;
        let body: TokenResponse = handle_response(response).await?;
        Ok(body.into())
    }
}
