//! Core traits at the seams of the request pipeline.

mod logout;
mod store;
mod token_endpoint;

pub use logout::{LogoutHook, LogoutReason, TracingLogoutHook};
pub use store::CredentialStore;
pub use token_endpoint::TokenEndpoint;
