pub mod fixture;
pub mod live;

use std::fmt;

use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: vec![],
            body: None,
        }
    }

    pub fn post_json<T: serde::Serialize>(url: impl Into<String>, body: &T) -> Result<Self, HttpError> {
        let bytes = serde_json::to_vec(body).map_err(|e| HttpError::Decode(e.to_string()))?;
        Ok(Self {
            method: Method::Post,
            url: url.into(),
            headers: vec![("Content-Type".into(), "application/json".into())],
            body: Some(bytes),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn json<T: serde::Serialize>(status: u16, value: &T) -> Result<Self, HttpError> {
        let body = serde_json::to_vec(value).map_err(|e| HttpError::Decode(e.to_string()))?;
        Ok(Self { status, body })
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into `HttpError::Status`.
    pub fn error_for_status(self) -> Result<Self, HttpError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(HttpError::Status {
                status: self.status,
                body: String::from_utf8_lossy(&self.body).into_owned(),
            })
        }
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        serde_json::from_slice(&self.body).map_err(|e| HttpError::Decode(e.to_string()))
    }
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid payload: {0}")]
    Decode(String),
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Blocking HTTP seam. Which implementation is used is decided when the
/// archiver is wired up, never by swapping shared state afterwards.
pub trait HttpClient: Send + Sync {
    fn execute(&self, req: &HttpRequest) -> Result<HttpResponse, HttpError>;

    /// True when requests are answered from canned fixtures.
    fn is_fixture(&self) -> bool {
        false
    }
}

/// Client used underneath the fixture client when there is nowhere real to
/// forward unmatched requests to.
pub struct OfflineClient;

impl HttpClient for OfflineClient {
    fn execute(&self, req: &HttpRequest) -> Result<HttpResponse, HttpError> {
        Err(HttpError::Transport(format!(
            "offline: no route for {} {}",
            req.method, req.url
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_success_status_becomes_error() {
        let resp = HttpResponse {
            status: 401,
            body: b"unauthorized".to_vec(),
        };
        match resp.error_for_status() {
            Err(HttpError::Status { status, body }) => {
                assert_eq!(status, 401);
                assert_eq!(body, "unauthorized");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn post_json_sets_content_type() {
        let req = HttpRequest::post_json("http://x/y", &serde_json::json!({"a": 1})).unwrap();
        assert_eq!(req.method, Method::Post);
        assert_eq!(
            req.headers,
            vec![("Content-Type".to_string(), "application/json".to_string())]
        );
        assert_eq!(req.body.as_deref(), Some(br#"{"a":1}"#.as_slice()));
    }

    #[test]
    fn offline_client_always_fails() {
        let err = OfflineClient.execute(&HttpRequest::get("http://example.com")).unwrap_err();
        assert!(matches!(err, HttpError::Transport(_)));
    }
}
