//! Shared HTTP plumbing: client construction, error mapping, response decoding.

use reqwest::Response;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::trace;

use drivedesk_core::Result;
use drivedesk_core::error::{Error, InvalidInputError, ProtocolError, TransportError};

use crate::config::ClientConfig;

/// Error body shape returned by the API and the token endpoint.
///
/// The API sends `message`; OAuth errors send `error` and
/// `error_description`. Whichever is present is surfaced.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Build the reqwest client used for both the token endpoint and the API.
pub(crate) fn build_http_client(config: &ClientConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("drivedesk/", env!("CARGO_PKG_VERSION")))
        .timeout(config.timeout())
        .build()
        .map_err(|e| {
            Error::InvalidInput(InvalidInputError::Other {
                message: format!("failed to build HTTP client: {}", e),
            })
        })
}

/// Map a reqwest error onto the transport taxonomy.
pub(crate) fn map_reqwest(err: reqwest::Error) -> Error {
    let message = err.to_string();
    let err = if err.is_timeout() {
        TransportError::Timeout { message }
    } else if err.is_connect() {
        TransportError::Connection { message }
    } else if err.is_decode() || err.is_body() {
        TransportError::Decode { message }
    } else {
        TransportError::Http { message }
    };
    Error::Transport(err)
}

/// Decode a success body as JSON, or turn a failure status into a
/// [`ProtocolError`]. An empty success body decodes as JSON `null`.
pub(crate) async fn handle_response<R: DeserializeOwned>(response: Response) -> Result<R> {
    let status = response.status();
    trace!(status = %status, "API response");

    if !status.is_success() {
        return Err(Error::Protocol(parse_error_response(response).await));
    }

    let bytes = response.bytes().await.map_err(map_reqwest)?;
    let body: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
        &b"null"[..]
    } else {
        &bytes[..]
    };

    serde_json::from_slice(body).map_err(|e| {
        Error::Transport(TransportError::Decode {
            message: e.to_string(),
        })
    })
}

/// Check the status and discard the body.
pub(crate) async fn expect_success(response: Response) -> Result<()> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(Error::Protocol(parse_error_response(response).await))
    }
}

/// Parse an error response, tolerating non-JSON bodies.
pub(crate) async fn parse_error_response(response: Response) -> ProtocolError {
    let status = response.status().as_u16();

    match response.json::<ErrorBody>().await {
        Ok(body) => ProtocolError::new(
            status,
            body.message.or(body.error_description).or(body.error),
        ),
        Err(_) => ProtocolError::new(status, None),
    }
}
