//! Whoami command implementation.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;

use drivedesk_core::CredentialStore;

use crate::cli::ApiArgs;
use crate::output;
use crate::session::{self, storage};

#[derive(Args, Debug)]
pub struct WhoamiArgs {
    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

/// What is known about the stored session without contacting the API.
#[derive(Debug, Serialize)]
struct SessionSummary {
    path: String,
    api_url: Option<String>,
    updated_at: Option<DateTime<Utc>>,
}

pub fn run(api: &ApiArgs, args: WhoamiArgs) -> Result<()> {
    let store = storage::open_store()?;
    store.get().context(session::NO_SESSION)?;

    let summary = SessionSummary {
        path: store.path().display().to_string(),
        api_url: api.api_url.clone(),
        updated_at: store.updated_at(),
    };

    if args.json {
        return output::json(&summary, false);
    }

    output::field("Session", &summary.path);
    if let Some(api_url) = &summary.api_url {
        output::field("API", api_url);
    }
    if let Some(updated_at) = summary.updated_at {
        output::field("Updated", &updated_at.to_rfc3339());
    }
    output::field("Access token", "[REDACTED]");
    output::field("Refresh token", "[REDACTED]");

    Ok(())
}
