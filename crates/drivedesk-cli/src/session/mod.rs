//! Session wiring: the persisted store and the client built on it.

pub mod storage;

use std::sync::Arc;

use anyhow::{Context, Result};

use drivedesk_core::LogoutReason;
use drivedesk_http::AuthClient;
use drivedesk_store::FileCredentialStore;

use crate::cli::ApiArgs;
use crate::output;

pub const NO_SESSION: &str = "No active session. Run 'drivedesk login' first.";

/// Open the session store and build a client over it.
///
/// The logout hook tells the user to sign in again when the pipeline drops
/// a session it could not refresh.
pub fn connect(api: &ApiArgs) -> Result<(AuthClient, Arc<FileCredentialStore>)> {
    let config = api.config()?;
    let store = storage::open_store()?;

    let client = AuthClient::builder(&config, store.clone())
        .logout_hook(Arc::new(|reason: LogoutReason| {
            tracing::debug!(%reason, "Session dropped");
            if reason != LogoutReason::UserRequested {
                output::warning("Session expired. Run 'drivedesk login'.");
            }
        }))
        .build()
        .context("Failed to build HTTP client")?;

    Ok((client, store))
}
