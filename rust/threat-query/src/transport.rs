//! Boundary to the HTTP client that talks to the Infoblox API.

use thiserror::Error;

/// One GET against the API: path plus the already-encoded query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendRequest {
    pub path: String,
    pub query: String,
}

impl BackendRequest {
    pub fn new(path: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: query.into(),
        }
    }

    pub fn url(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendResponse {
    /// `None` when the client could not determine a status code.
    pub status: Option<u16>,
    pub body: String,
}

impl BackendResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            body: body.into(),
        }
    }
}

/// Connection level failure (refused, timed out, TLS...). The message is shown verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Blocking request/response client. Timeouts, auth headers and HTTP retries live behind it.
pub trait Transport {
    fn call(&self, request: &BackendRequest) -> Result<BackendResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn call(&self, request: &BackendRequest) -> Result<BackendResponse, TransportError> {
        (**self).call(request)
    }
}
