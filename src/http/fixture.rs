//! Canned Gmail responses for development and tests.
//!
//! `FixtureClient` sits in front of another `HttpClient`. Requests aimed at the
//! Gmail messages endpoints are answered locally; everything else is forwarded
//! untouched to the wrapped client.

use std::fmt;

use serde_json::Value;
use url::Url;

use crate::domain::message::{ListMessagesResponse, MessageRef, ModifyResponse};
use crate::gmail::{DEFAULT_UNREAD_QUERY, messages_url};
use crate::http::{HttpClient, HttpError, HttpRequest, HttpResponse, Method};
use crate::logging::ComponentLogger;

pub const GMAIL_MESSAGES_MARKER: &str = "gmail.googleapis.com/gmail/v1/users/me/messages";
pub const MOCK_ID_PREFIX: &str = "mock_";
pub const ARCHIVED_LABEL: &str = "ARCHIVED";

pub fn mock_list_response() -> ListMessagesResponse {
    ListMessagesResponse {
        messages: (1..=3)
            .map(|i| {
                MessageRef::new(format!("{MOCK_ID_PREFIX}email_{i}"))
                    .with_thread(format!("{MOCK_ID_PREFIX}thread_{i}"))
            })
            .collect(),
        next_page_token: None,
        result_size_estimate: None,
    }
}

pub fn mock_modify_response(id: &str) -> ModifyResponse {
    ModifyResponse {
        id: id.to_string(),
        thread_id: Some(format!("thread_{id}")),
        label_ids: vec![ARCHIVED_LABEL.to_string()],
    }
}

pub struct FixtureClient {
    inner: Box<dyn HttpClient>,
    log: ComponentLogger,
}

impl FixtureClient {
    /// Install interception in front of `inner`.
    pub fn install(inner: Box<dyn HttpClient>, log: ComponentLogger) -> Self {
        log.info("Mock fetch handler installed", &[]);
        Self { inner, log }
    }

    /// Remove interception and give back the original client.
    pub fn uninstall(self) -> Box<dyn HttpClient> {
        self.log.info("Mock fetch handler removed", &[]);
        self.inner
    }

    fn intercept(&self, req: &HttpRequest) -> Option<Result<HttpResponse, HttpError>> {
        if !req.url.contains(GMAIL_MESSAGES_MARKER) {
            return None;
        }

        if req.method == Method::Post
            && let Some(id) = modify_target(&req.url)
        {
            self.log
                .info("Mocking Gmail API modify request", &[("messageId", &id)]);
            if let Some(body) = &req.body {
                match serde_json::from_slice::<Value>(body) {
                    Ok(v) => self.log.debug("Modify request body", &[("body", &v)]),
                    Err(e) => self
                        .log
                        .warn("Could not parse request body", &[("error", &e)]),
                }
            }
            return Some(HttpResponse::json(200, &mock_modify_response(&id)));
        }

        if is_list_request(&req.url) {
            let resp = mock_list_response();
            self.log.info(
                "Mocking Gmail API get messages request",
                &[("messageCount", &resp.messages.len())],
            );
            return Some(HttpResponse::json(200, &resp));
        }

        None
    }
}

impl HttpClient for FixtureClient {
    fn execute(&self, req: &HttpRequest) -> Result<HttpResponse, HttpError> {
        self.log.debug(
            "Intercepted request",
            &[("url", &req.url), ("method", &req.method)],
        );
        if let Some(resp) = self.intercept(req) {
            return resp;
        }
        self.log
            .debug("Passing through non-mocked request", &[("url", &req.url)]);
        self.inner.execute(req)
    }

    fn is_fixture(&self) -> bool {
        true
    }
}

/// `.../messages` carrying a `q` or `maxResults` query pair.
fn is_list_request(raw: &str) -> bool {
    let Ok(url) = Url::parse(raw) else {
        return false;
    };
    url.path().trim_end_matches('/').ends_with("/users/me/messages")
        && url
            .query_pairs()
            .any(|(k, _)| k == "q" || k == "maxResults")
}

/// Extract `{id}` from `.../messages/{id}/modify`.
fn modify_target(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    let segments: Vec<&str> = url.path_segments()?.collect();
    let pos = segments.iter().position(|s| *s == "messages")?;
    match segments.get(pos + 1..)? {
        [id, "modify"] if !id.is_empty() => Some((*id).to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockStatus {
    Active,
    Inactive,
    Error(String),
}

impl fmt::Display for MockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MockStatus::Active => f.write_str("Mock API Status: Active"),
            MockStatus::Inactive => f.write_str("Mock API Status: Inactive"),
            MockStatus::Error(e) => write!(f, "Mock API Status: Error ({e})"),
        }
    }
}

/// Ask the list endpoint once and decide whether the answer came from fixtures.
pub fn check_mock_status(client: &dyn HttpClient, api_base: &str, log: &ComponentLogger) -> MockStatus {
    let url = match messages_url(api_base, &[("q", DEFAULT_UNREAD_QUERY), ("maxResults", "10")]) {
        Ok(u) => u,
        Err(e) => return MockStatus::Error(e.to_string()),
    };
    log.debug("Checking mock API status", &[("url", &url)]);

    let resp = match client
        .execute(&HttpRequest::get(url))
        .and_then(HttpResponse::error_for_status)
    {
        Ok(r) => r,
        Err(e) => {
            log.error("Error checking mock API status", &[("error", &e)]);
            return MockStatus::Error(e.to_string());
        }
    };

    let data: ListMessagesResponse = match resp.decode() {
        Ok(d) => d,
        Err(e) => {
            log.error("Error checking mock API status", &[("error", &e)]);
            return MockStatus::Error(e.to_string());
        }
    };

    match data.messages.first() {
        Some(first) if first.id.starts_with(MOCK_ID_PREFIX) => {
            log.info(
                "Mock API is active",
                &[("messagesCount", &data.messages.len()), ("firstMessageId", &first.id)],
            );
            MockStatus::Active
        }
        _ => {
            log.warn("Mock API may not be active, unexpected data received", &[]);
            MockStatus::Inactive
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::OfflineClient;
    use std::sync::{Arc, Mutex};

    const BASE: &str = "https://gmail.googleapis.com/gmail/v1";

    struct Recorder {
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl HttpClient for Recorder {
        fn execute(&self, req: &HttpRequest) -> Result<HttpResponse, HttpError> {
            self.seen.lock().unwrap().push(req.url.clone());
            Ok(HttpResponse {
                status: 204,
                body: vec![],
            })
        }
    }

    fn fixture() -> (FixtureClient, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let inner = Recorder { seen: seen.clone() };
        (
            FixtureClient::install(Box::new(inner), ComponentLogger::new("MockAPI")),
            seen,
        )
    }

    #[test]
    fn list_request_gets_mock_messages() {
        let (client, seen) = fixture();
        let resp = client
            .execute(&HttpRequest::get(format!("{BASE}/users/me/messages?q=is:unread")))
            .unwrap();
        let data: ListMessagesResponse = resp.decode().unwrap();
        assert_eq!(data.messages.len(), 3);
        assert!(data.messages[0].id.starts_with("mock_"));
        assert_eq!(data.next_page_token, None);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn encoded_query_still_counts_as_list_request() {
        let (client, seen) = fixture();
        let url = messages_url(BASE, &[("q", "is:unread -label:a&b #x")]).unwrap();
        let data: ListMessagesResponse = client
            .execute(&HttpRequest::get(url))
            .unwrap()
            .decode()
            .unwrap();
        assert_eq!(data.messages.len(), 3);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn messages_path_without_list_params_passes_through() {
        let (client, seen) = fixture();
        let url = format!("{BASE}/users/me/messages?pageToken=abc");
        assert_eq!(client.execute(&HttpRequest::get(url.clone())).unwrap().status, 204);
        assert_eq!(*seen.lock().unwrap(), vec![url]);
    }

    #[test]
    fn modify_request_gets_archived_label() {
        let (client, _) = fixture();
        let req = HttpRequest::post_json(
            format!("{BASE}/users/me/messages/abc123/modify"),
            &crate::domain::message::ModifyRequest::archive(),
        )
        .unwrap();
        let data: ModifyResponse = client.execute(&req).unwrap().decode().unwrap();
        assert_eq!(data.id, "abc123");
        assert_eq!(data.label_ids, vec!["ARCHIVED".to_string()]);
        assert_eq!(data.thread_id.as_deref(), Some("thread_abc123"));
    }

    #[test]
    fn modify_url_with_get_passes_through() {
        let (client, seen) = fixture();
        let url = format!("{BASE}/users/me/messages/abc123/modify");
        let resp = client.execute(&HttpRequest::get(url.clone())).unwrap();
        assert_eq!(resp.status, 204);
        assert_eq!(*seen.lock().unwrap(), vec![url]);
    }

    #[test]
    fn other_urls_pass_through() {
        let (client, seen) = fixture();
        client
            .execute(&HttpRequest::get("https://example.com/health"))
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["https://example.com/health".to_string()]);
    }

    #[test]
    fn uninstall_restores_original_client() {
        let client = FixtureClient::install(Box::new(OfflineClient), ComponentLogger::new("MockAPI"));
        assert!(client.is_fixture());
        let original = client.uninstall();
        assert!(!original.is_fixture());
        assert!(
            original
                .execute(&HttpRequest::get(format!("{BASE}/users/me/messages?q=is:unread")))
                .is_err()
        );
    }

    #[test]
    fn mock_status_reports_active_and_error() {
        let log = ComponentLogger::new("Popup");
        let (client, _) = fixture();
        assert_eq!(check_mock_status(&client, BASE, &log), MockStatus::Active);
        assert!(matches!(check_mock_status(&OfflineClient, BASE, &log), MockStatus::Error(_)));
    }

    #[test]
    fn modify_target_parsing() {
        assert_eq!(
            modify_target(&format!("{BASE}/users/me/messages/x1/modify")).as_deref(),
            Some("x1")
        );
        assert_eq!(modify_target(&format!("{BASE}/users/me/messages/x1")), None);
        assert_eq!(modify_target("not a url"), None);
    }
}
