//! drivedesk-store - Filesystem-backed credential store.
//!
//! [`FileCredentialStore`] keeps the access/refresh pair in a single JSON
//! file so a signed-in session survives restarting the client.

mod store;

pub use store::FileCredentialStore;
