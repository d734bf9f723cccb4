use std::sync::Arc;

use anyhow::Result;

use crate::http::{HttpClient, HttpError, HttpRequest, HttpResponse, Method};
use crate::logging::ComponentLogger;

/// Anything that can hand out a currently valid OAuth access token.
pub trait TokenSource: Send + Sync {
    fn access_token(&self) -> Result<String>;
}

/// Fixed token, handy for `GMAIL_ACCESS_TOKEN` and tests.
pub struct StaticToken(pub String);

impl TokenSource for StaticToken {
    fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

pub struct LiveClient {
    http: reqwest::blocking::Client,
    tokens: Arc<dyn TokenSource>,
    log: ComponentLogger,
}

impl LiveClient {
    pub fn new(tokens: Arc<dyn TokenSource>, log: ComponentLogger) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(concat!("rs_mail_archiver/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, tokens, log })
    }
}

impl HttpClient for LiveClient {
    fn execute(&self, req: &HttpRequest) -> Result<HttpResponse, HttpError> {
        let token = self
            .tokens
            .access_token()
            .map_err(|e| HttpError::Transport(format!("no access token: {e}")))?;

        let method = match req.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };

        let mut builder = self.http.request(method, &req.url).bearer_auth(token);
        for (k, v) in &req.headers {
            builder = builder.header(k.as_str(), v.as_str());
        }
        if let Some(body) = &req.body {
            builder = builder.body(body.clone());
        }

        self.log
            .debug("Sending request", &[("method", &req.method), ("url", &req.url)]);

        let resp = builder
            .send()
            .map_err(|e| HttpError::Transport(e.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp
            .bytes()
            .map_err(|e| HttpError::Transport(e.to_string()))?
            .to_vec();

        self.log.debug(
            "Received response",
            &[("status", &status), ("bytes", &body.len())],
        );
        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoToken;

    impl TokenSource for NoToken {
        fn access_token(&self) -> Result<String> {
            Err(anyhow::anyhow!("not signed in"))
        }
    }

    #[test]
    fn missing_token_is_transport_error() {
        let client = LiveClient::new(Arc::new(NoToken), ComponentLogger::new("test")).unwrap();
        let err = client
            .execute(&HttpRequest::get("http://127.0.0.1:9/never"))
            .unwrap_err();
        match err {
            HttpError::Transport(msg) => assert!(msg.contains("not signed in")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
