//! drivedesk-http - Authenticated HTTP pipeline for the drivedesk API.
//!
//! [`AuthClient`] attaches the stored access token to every request,
//! refreshes it on `401` (one refresh shared by all concurrent requests),
//! retries once, and signs the session out when recovery is impossible.

mod client;
mod config;
mod pipeline;
mod request;
mod token;

pub use config::{ClientConfig, DEFAULT_TIMEOUT, DEFAULT_TOKEN_PATH};
pub use pipeline::{AuthClient, AuthClientBuilder};
pub use request::PendingRequest;
pub use token::OAuthTokenClient;

pub use reqwest::{Method, Response, StatusCode};
