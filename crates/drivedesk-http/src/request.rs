//! Requests awaiting dispatch through the pipeline.

use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;

use drivedesk_core::error::{Error, InvalidInputError};
use drivedesk_core::{AccessToken, Result};

/// An HTTP request against the business API.
///
/// The body is held as shared [`Bytes`] so the same logical request can be
/// sent again after a token refresh without copying it. The pipeline overwrites `Authorization` on
/// every dispatch; any value the caller sets there is replaced when a token
/// is stored.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl PendingRequest {
    /// Create a request for `path`, relative to the configured API URL.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Set a header, replacing any previous value.
    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            InvalidInputError::Header {
                name: name.to_string(),
                reason: e.to_string(),
            }
        })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| InvalidInputError::Header {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    /// Serialize `body` as the JSON request body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        let bytes = serde_json::to_vec(body)?;
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Some(Bytes::from(bytes));
        Ok(self)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// The body as a cheaply cloned buffer for dispatch.
    pub(crate) fn body_bytes(&self) -> Option<Bytes> {
        self.body.clone()
    }

    /// Install `token` as the bearer credential, overwriting any previous one.
    pub(crate) fn authorize(&mut self, token: &AccessToken) -> Result<()> {
        let mut value = HeaderValue::from_str(&token.bearer()).map_err(|e| {
            Error::InvalidInput(InvalidInputError::Header {
                name: AUTHORIZATION.to_string(),
                reason: e.to_string(),
            })
        })?;
        value.set_sensitive(true);
        self.headers.insert(AUTHORIZATION, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_overwrites_previous_token() {
        let mut request = PendingRequest::get("/api/registrations");
        request.authorize(&AccessToken::new("A1")).unwrap();
        request.authorize(&AccessToken::new("A2")).unwrap();

        let values: Vec<_> = request.headers().get_all(AUTHORIZATION).iter().collect();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0], "Bearer A2");
        assert!(values[0].is_sensitive());
    }

    #[test]
    fn authorize_rejects_control_characters() {
        let mut request = PendingRequest::get("/api/registrations");
        assert!(request.authorize(&AccessToken::new("bad\ntoken")).is_err());
    }

    #[test]
    fn json_sets_body_and_content_type() {
        let request = PendingRequest::post("/api/exam-schedules")
            .json(&serde_json::json!({"date": "2026-11-02"}))
            .unwrap();
        assert_eq!(request.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(request.body().unwrap(), br#"{"date":"2026-11-02"}"#);
    }

    #[test]
    fn query_pairs_accumulate() {
        let request = PendingRequest::get("/api/payments")
            .query("status", "pending")
            .query("page", "2");
        assert_eq!(
            request.query_pairs(),
            &[
                ("status".to_string(), "pending".to_string()),
                ("page".to_string(), "2".to_string())
            ]
        );
    }

    #[test]
    fn clones_share_the_body_buffer() {
        let request = PendingRequest::put("/api/registrations/5")
            .json(&serde_json::json!({"status": "approved"}))
            .unwrap();
        let retry = request.clone();
        assert_eq!(
            request.body_bytes().unwrap().as_ptr(),
            retry.body_bytes().unwrap().as_ptr()
        );
    }

    #[test]
    fn header_rejects_invalid_name() {
        assert!(PendingRequest::get("/").header("bad header", "x").is_err());
    }
}
