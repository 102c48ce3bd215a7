//! Logout command implementation.

use anyhow::Result;
use clap::Args;

use drivedesk_core::CredentialStore;

use crate::output;
use crate::session::storage;

#[derive(Args, Debug)]
pub struct LogoutArgs {}

/// Clears the stored pair. Needs no API settings, so it always works
/// offline.
pub fn run(_args: LogoutArgs) -> Result<()> {
    let store = storage::open_store()?;

    if !store.is_present() {
        output::field("Session", "none stored");
        return Ok(());
    }

    store.clear();
    tracing::info!(path = %store.path().display(), "Session cleared");
    output::success("Logged out");

    Ok(())
}
