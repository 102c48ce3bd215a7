//! Filesystem storage for the credential pair.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use drivedesk_core::{AccessToken, CredentialPair, CredentialStore, RefreshToken};

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

/// On-disk layout: two named token entries plus the time they were written.
#[derive(Debug, Serialize, Deserialize)]
struct StoredCredentials {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct Snapshot {
    pair: Option<CredentialPair>,
    updated_at: Option<DateTime<Utc>>,
}

/// A [`CredentialStore`] persisted to a JSON file.
///
/// The file is read once when the store is opened; after that the in-memory
/// snapshot is authoritative for this process and every `set`/`clear` is
/// written through. A second store opened on the same path (another process,
/// or the same process after a restart) sees the last written pair.
///
/// Writes go to a temporary sibling that is renamed over the target, so the
/// file always holds either the old pair or the new one. Writers in different
/// processes are serialized with an advisory lock on `<file>.lock`.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    snapshot: RwLock<Snapshot>,
}

impl FileCredentialStore {
    /// Open the store at `path`, loading any pair already saved there.
    ///
    /// A missing, unreadable, or malformed file opens as an empty store.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let snapshot = match read_snapshot(&path) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable credential file");
                Snapshot::default()
            }
        };

        debug!(present = snapshot.pair.is_some(), "Opened credential store");

        Self {
            path,
            snapshot: RwLock::new(snapshot),
        }
    }

    /// Get the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// When the stored pair was last written, if known.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .updated_at
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        self.path.with_file_name(name)
    }

    fn write_file(&self, stored: &StoredCredentials) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let lock_file = self.acquire_lock()?;

        let tmp_path = self
            .path
            .with_file_name(format!(".{}.tmp", Uuid::new_v4().simple()));
        let json = serde_json::to_string_pretty(stored)?;

        let result = (|| {
            let mut file = create_private(&tmp_path)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp_path, &self.path)
        })();

        if result.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }

        lock_file.unlock()?;
        result
    }

    fn remove_file(&self) -> io::Result<()> {
        if !self.path.exists() {
            return Ok(());
        }

        let lock_file = self.acquire_lock()?;
        let result = match fs::remove_file(&self.path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        };
        lock_file.unlock()?;
        result
    }

    fn acquire_lock(&self) -> io::Result<File> {
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())?;
        lock_file.lock_exclusive()?;
        Ok(lock_file)
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Option<CredentialPair> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .pair
            .clone()
    }

    #[instrument(skip(self, pair), fields(path = %self.path.display()))]
    fn set(&self, pair: CredentialPair) {
        let now = Utc::now();
        let stored = StoredCredentials {
            access_token: pair.access_token.as_str().to_string(),
            refresh_token: pair.refresh_token.as_str().to_string(),
            updated_at: Some(now),
        };

        // Hold the write guard across the file write so the file and the
        // snapshot are updated in the same order.
        let mut snapshot = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        snapshot.pair = Some(pair);
        snapshot.updated_at = Some(now);

        match self.write_file(&stored) {
            Ok(()) => debug!("Saved credentials"),
            Err(e) => warn!(error = %e, "Failed to persist credentials"),
        }
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn clear(&self) {
        let mut snapshot = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        *snapshot = Snapshot::default();

        match self.remove_file() {
            Ok(()) => debug!("Cleared credentials"),
            Err(e) => warn!(error = %e, "Failed to remove credential file"),
        }
    }
}

fn read_snapshot(path: &Path) -> io::Result<Snapshot> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Snapshot::default()),
        Err(e) => return Err(e),
    };

    let stored: StoredCredentials = serde_json::from_str(&content)?;

    if stored.access_token.is_empty() || stored.refresh_token.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "credential file is missing a token",
        ));
    }

    Ok(Snapshot {
        pair: Some(CredentialPair {
            access_token: AccessToken::new(stored.access_token),
            refresh_token: RefreshToken::new(stored.refresh_token),
        }),
        updated_at: stored.updated_at,
    })
}

#[cfg(unix)]
fn create_private(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .create_new(true)
        .write(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn create_private(path: &Path) -> io::Result<File> {
    OpenOptions::new().create_new(true).write(true).open(path)
}
