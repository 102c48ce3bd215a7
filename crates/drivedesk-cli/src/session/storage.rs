//! Location of the persisted session.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use directories::ProjectDirs;

use drivedesk_store::FileCredentialStore;

/// Get the session file path under the platform data directory.
pub fn session_path() -> Result<PathBuf> {
    let dirs =
        ProjectDirs::from("", "", "drivedesk").context("Could not determine data directory")?;

    Ok(dirs.data_dir().join("session.json"))
}

/// Open the session store. A missing or unreadable file is an empty store.
pub fn open_store() -> Result<Arc<FileCredentialStore>> {
    let path = session_path()?;
    Ok(Arc::new(FileCredentialStore::open(path)))
}
