//! Subcommand implementations.

pub mod login;
pub mod logout;
pub mod refresh_token;
pub mod request;
pub mod whoami;

use anyhow::Result;

use drivedesk_http::Method;

use crate::cli::{ApiArgs, Commands};

pub async fn handle(api: &ApiArgs, command: Commands) -> Result<()> {
    match command {
        Commands::Login(args) => login::run(api, args).await,
        Commands::Logout(args) => logout::run(args),
        Commands::Whoami(args) => whoami::run(api, args),
        Commands::RefreshToken(args) => refresh_token::run(api, args).await,
        Commands::Get(args) => request::run_query(api, Method::GET, args).await,
        Commands::Delete(args) => request::run_query(api, Method::DELETE, args).await,
        Commands::Post(args) => request::run_body(api, Method::POST, args).await,
        Commands::Put(args) => request::run_body(api, Method::PUT, args).await,
        Commands::Patch(args) => request::run_body(api, Method::PATCH, args).await,
    }
}
