//! Token endpoint trait.

use async_trait::async_trait;

use crate::{CredentialPair, Credentials, RefreshToken, Result};

/// The OAuth token endpoint that mints credential pairs.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// Exchange a username and password for a new pair (password grant).
    async fn login(&self, credentials: &Credentials) -> Result<CredentialPair>;

    /// Exchange a refresh token for a new pair (refresh grant).
    async fn refresh(&self, refresh_token: &RefreshToken) -> Result<CredentialPair>;
}
