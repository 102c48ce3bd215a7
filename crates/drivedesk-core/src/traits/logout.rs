//! Logout notification.

use std::fmt;

use tracing::warn;

/// Why the stored credentials were cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    /// The caller asked to sign out.
    UserRequested,
    /// A request got `401` and there was no refresh token to recover with.
    MissingRefreshToken,
    /// The token endpoint rejected the refresh token or could not be reached.
    RefreshFailed,
}

impl fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogoutReason::UserRequested => "user requested",
            LogoutReason::MissingRefreshToken => "missing refresh token",
            LogoutReason::RefreshFailed => "refresh failed",
        };
        f.write_str(s)
    }
}

/// Side effect run after the credential store has been cleared.
///
/// This is where a front-end navigates to its login surface.
pub trait LogoutHook: Send + Sync {
    fn on_logout(&self, reason: LogoutReason);
}

/// Hook that only records the logout in the trace log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogoutHook;

impl LogoutHook for TracingLogoutHook {
    fn on_logout(&self, reason: LogoutReason) {
        warn!(%reason, "Signed out");
    }
}

impl<F> LogoutHook for F
where
    F: Fn(LogoutReason) + Send + Sync,
{
    fn on_logout(&self, reason: LogoutReason) {
        self(reason)
    }
}
