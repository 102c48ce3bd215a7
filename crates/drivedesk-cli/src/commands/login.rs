//! Login command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use drivedesk_core::Credentials;

use crate::cli::ApiArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account username or email
    #[arg(long)]
    pub username: String,

    /// Account password
    #[arg(long)]
    pub password: String,
}

pub async fn run(api: &ApiArgs, args: LoginArgs) -> Result<()> {
    let (client, store) = session::connect(api)?;
    let credentials = Credentials::new(args.username, args.password);

    eprintln!("{}", "Logging in...".dimmed());

    client
        .login(&credentials)
        .await
        .context("Failed to login")?;

    output::success("Logged in successfully");
    println!();
    output::field("User", credentials.username());
    output::field("API", client.api_url().as_str());
    output::field("Session", store.path().display());

    Ok(())
}
