//! Refresh token command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use crate::cli::ApiArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct RefreshTokenArgs {}

pub async fn run(api: &ApiArgs, _args: RefreshTokenArgs) -> Result<()> {
    let (client, _store) = session::connect(api)?;
    client.require_session().context(session::NO_SESSION)?;

    eprintln!("{}", "Refreshing session...".dimmed());

    client
        .refresh()
        .await
        .context("Failed to refresh session")?;

    output::success("Session refreshed successfully");
    output::field("API", client.api_url().as_str());

    Ok(())
}
