use std::sync::Arc;

use url::Url;

use crate::domain::message::{ListMessagesResponse, ModifyRequest, ModifyResponse};
use crate::http::{HttpClient, HttpError, HttpRequest, HttpResponse};

pub const DEFAULT_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";
pub const DEFAULT_UNREAD_QUERY: &str = "is:unread";

/// The two Gmail REST calls the archiver needs, on top of any `HttpClient`.
#[derive(Clone)]
pub struct GmailApi {
    http: Arc<dyn HttpClient>,
    base: String,
    query: String,
}

impl GmailApi {
    pub fn new(http: Arc<dyn HttpClient>, base: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            http,
            base: base.into().trim_end_matches('/').to_string(),
            query: query.into(),
        }
    }

    pub fn list_url(&self) -> Result<String, HttpError> {
        messages_url(&self.base, &[("q", &self.query)])
    }

    pub fn modify_url(&self, id: &str) -> String {
        format!("{}/users/me/messages/{}/modify", self.base, id)
    }

    /// First page of messages matching the unread query.
    pub fn list_unread(&self) -> Result<ListMessagesResponse, HttpError> {
        self.http
            .execute(&HttpRequest::get(self.list_url()?))
            .and_then(HttpResponse::error_for_status)?
            .decode()
    }

    pub fn modify(&self, id: &str, req: &ModifyRequest) -> Result<ModifyResponse, HttpError> {
        let req = HttpRequest::post_json(self.modify_url(id), req)?;
        self.http
            .execute(&req)
            .and_then(HttpResponse::error_for_status)?
            .decode()
    }

    pub fn is_fixture(&self) -> bool {
        self.http.is_fixture()
    }
}

/// `{base}/users/me/messages` with percent-encoded query pairs.
pub fn messages_url(base: &str, pairs: &[(&str, &str)]) -> Result<String, HttpError> {
    let raw = format!("{}/users/me/messages", base.trim_end_matches('/'));
    let mut url = Url::parse(&raw).map_err(|e| HttpError::InvalidUrl {
        url: raw.clone(),
        reason: e.to_string(),
    })?;
    if !pairs.is_empty() {
        let mut q = url.query_pairs_mut();
        for (k, v) in pairs {
            q.append_pair(k, v);
        }
    }
    Ok(url.into())
}
