//! CLI argument definitions.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use drivedesk_core::{ApiUrl, ClientCredentials};
use drivedesk_http::ClientConfig;

use crate::commands::{login, logout, refresh_token, request, whoami};

/// Command-line client for the drivedesk admin API.
#[derive(Parser, Debug)]
#[command(name = "drivedesk")]
#[command(author, version = env!("DRIVEDESK_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(flatten)]
    pub api: ApiArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Connection settings shared by every command that talks to the API.
#[derive(Args, Debug, Clone)]
pub struct ApiArgs {
    /// API base URL
    #[arg(long, env = "DRIVEDESK_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Token endpoint URL (defaults to <api-url>/oauth/token)
    #[arg(long, env = "DRIVEDESK_TOKEN_URL", global = true)]
    pub token_url: Option<String>,

    /// OAuth client id
    #[arg(long, env = "DRIVEDESK_CLIENT_ID", global = true)]
    pub client_id: Option<String>,

    /// OAuth client secret
    #[arg(long, env = "DRIVEDESK_CLIENT_SECRET", global = true, hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Timeout in seconds for every HTTP call, token refresh included
    #[arg(long, default_value_t = 30, global = true)]
    pub timeout_secs: u64,
}

impl ApiArgs {
    /// Build the client configuration, failing on missing or invalid values.
    pub fn config(&self) -> Result<ClientConfig> {
        let api_url = self
            .api_url
            .as_deref()
            .context("No API URL. Pass --api-url or set DRIVEDESK_API_URL.")?;
        let api_url = ApiUrl::new(api_url).context("Invalid API URL")?;

        let client_id = self
            .client_id
            .as_deref()
            .context("No client id. Pass --client-id or set DRIVEDESK_CLIENT_ID.")?;
        let client_secret = self
            .client_secret
            .as_deref()
            .context("No client secret. Pass --client-secret or set DRIVEDESK_CLIENT_SECRET.")?;

        let mut config = ClientConfig::new(api_url, ClientCredentials::new(client_id, client_secret))
            .context("Invalid API URL")?
            .with_timeout(Duration::from_secs(self.timeout_secs));

        if let Some(token_url) = &self.token_url {
            let token_url = ApiUrl::new(token_url).context("Invalid token URL")?;
            config = config.with_token_url(token_url);
        }

        Ok(config)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in with a username and password
    Login(login::LoginArgs),

    /// Discard the stored session
    Logout(logout::LogoutArgs),

    /// Display the stored session
    Whoami(whoami::WhoamiArgs),

    /// Exchange the refresh token for a new token pair
    RefreshToken(refresh_token::RefreshTokenArgs),

    /// Send a GET request
    Get(request::QueryArgs),

    /// Send a DELETE request
    Delete(request::QueryArgs),

    /// Send a POST request
    Post(request::BodyArgs),

    /// Send a PUT request
    Put(request::BodyArgs),

    /// Send a PATCH request
    Patch(request::BodyArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn config_requires_api_url() {
        let args = ApiArgs {
            api_url: None,
            token_url: None,
            client_id: Some("2".into()),
            client_secret: Some("secret".into()),
            timeout_secs: 30,
        };
        let err = args.config().unwrap_err();
        assert!(err.to_string().contains("No API URL"));
    }

    #[test]
    fn config_applies_token_url_and_timeout() {
        let args = ApiArgs {
            api_url: Some("https://admin.example.com".into()),
            token_url: Some("https://auth.example.com/oauth/token".into()),
            client_id: Some("2".into()),
            client_secret: Some("secret".into()),
            timeout_secs: 5,
        };
        let config = args.config().unwrap();
        assert_eq!(
            config.token_url().as_str(),
            "https://auth.example.com/oauth/token"
        );
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn parses_request_with_queries() {
        let cli = Cli::try_parse_from([
            "drivedesk",
            "get",
            "/api/registrations",
            "--query",
            "status=pending",
            "--query",
            "page=2",
        ])
        .unwrap();
        match cli.command {
            Commands::Get(args) => {
                assert_eq!(args.path, "/api/registrations");
                assert_eq!(args.query.len(), 2);
                assert_eq!(args.query[0], ("status".to_string(), "pending".to_string()));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
