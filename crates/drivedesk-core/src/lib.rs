//! drivedesk-core - Credential types and traits for the drivedesk API client.
//!
//! The request pipeline in `drivedesk-http` is built against the traits in
//! [`traits`]; storage backends and token endpoints plug in behind them.

pub mod credentials;
pub mod error;
pub mod memory;
pub mod tokens;
pub mod traits;
pub mod types;

pub use credentials::{ClientCredentials, Credentials};
pub use error::Error;
pub use memory::MemoryCredentialStore;
pub use tokens::{AccessToken, CredentialPair, RefreshToken};
pub use traits::{CredentialStore, LogoutHook, LogoutReason, TokenEndpoint, TracingLogoutHook};
pub use types::ApiUrl;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
