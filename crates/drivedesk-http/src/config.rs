//! Client configuration.

use std::time::Duration;

use drivedesk_core::{ApiUrl, ClientCredentials, Result};

/// Default transport timeout for every call, including token refresh.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Path of the token endpoint relative to the API base when none is given.
pub const DEFAULT_TOKEN_PATH: &str = "/oauth/token";

/// Connection settings shared by the token client and the request pipeline.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    api_url: ApiUrl,
    token_url: ApiUrl,
    client: ClientCredentials,
    timeout: Duration,
}

impl ClientConfig {
    /// Create a configuration with the token endpoint at
    /// `<api_url>/oauth/token` and the default timeout.
    pub fn new(api_url: ApiUrl, client: ClientCredentials) -> Result<Self> {
        let token_url = api_url.join(DEFAULT_TOKEN_PATH)?;
        Ok(Self {
            api_url,
            token_url,
            client,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Use a token endpoint on a different host or path.
    pub fn with_token_url(mut self, token_url: ApiUrl) -> Self {
        self.token_url = token_url;
        self
    }

    /// Override the transport timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn api_url(&self) -> &ApiUrl {
        &self.api_url
    }

    pub fn token_url(&self) -> &ApiUrl {
        &self.token_url
    }

    pub fn client(&self) -> &ClientCredentials {
        &self.client
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ClientCredentials {
        ClientCredentials::new("2", "secret")
    }

    #[test]
    fn token_url_defaults_under_api_url() {
        let api = ApiUrl::new("https://admin.example.com").unwrap();
        let config = ClientConfig::new(api, client()).unwrap();
        assert_eq!(
            config.token_url().as_str(),
            "https://admin.example.com/oauth/token"
        );
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn overrides_apply() {
        let api = ApiUrl::new("https://admin.example.com").unwrap();
        let token = ApiUrl::new("https://auth.example.com/token").unwrap();
        let config = ClientConfig::new(api, client())
            .unwrap()
            .with_token_url(token.clone())
            .with_timeout(Duration::from_secs(5));
        assert_eq!(config.token_url(), &token);
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn debug_hides_client_secret() {
        let api = ApiUrl::new("https://admin.example.com").unwrap();
        let config = ClientConfig::new(api, client()).unwrap();
        assert!(!format!("{:?}", config).contains("\"secret\""));
    }
}
