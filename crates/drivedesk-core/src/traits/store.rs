//! Credential store trait.

use crate::CredentialPair;

/// Single source of truth for the current [`CredentialPair`].
///
/// Implementations are shared across every in-flight request, so all methods
/// take `&self`. None of them fail: a store that persists to durable media is
/// expected to keep an authoritative in-memory view and report persistence
/// problems through logging.
pub trait CredentialStore: Send + Sync {
    /// Returns the stored pair, if any.
    fn get(&self) -> Option<CredentialPair>;

    /// Replaces both tokens in one step.
    fn set(&self, pair: CredentialPair);

    /// Removes both tokens.
    fn clear(&self);

    /// Returns true if a pair is stored.
    fn is_present(&self) -> bool {
        self.get().is_some()
    }
}
