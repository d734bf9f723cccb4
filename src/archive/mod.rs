pub mod policy;

use anyhow::Result;
use std::sync::Arc;

use crate::domain::message::{MessageRef, ModifyRequest};
use crate::gmail::GmailApi;
use crate::logging::ComponentLogger;
use crate::store::repo::{KeyValueStore, save_archived};

pub use policy::{DegradedResponse, DeferredWrite, fallback_record};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeSource {
    Live,
    Degraded,
}

#[derive(Debug)]
pub struct ArchiveOutcome {
    pub messages: Vec<MessageRef>,
    pub source: OutcomeSource,
    /// Present on the degraded path only.
    pub deferred_write: Option<DeferredWrite>,
}

impl ArchiveOutcome {
    pub fn count(&self) -> usize {
        self.messages.len()
    }
}

pub struct Archiver {
    api: GmailApi,
    store: Arc<dyn KeyValueStore>,
    on_failure: DegradedResponse,
    log: ComponentLogger,
}

impl Archiver {
    pub fn new(
        api: GmailApi,
        store: Arc<dyn KeyValueStore>,
        on_failure: DegradedResponse,
        log: ComponentLogger,
    ) -> Self {
        Self {
            api,
            store,
            on_failure,
            log,
        }
    }

    /// One archive pass: list unread, drop INBOX from each, persist the list.
    ///
    /// A failed list call never surfaces as an error; the degraded response
    /// is returned instead. The only `Err` is a failed storage write on the
    /// live path.
    pub fn run_pass(&self) -> Result<ArchiveOutcome> {
        self.log.info("Archiving emails", &[("fixture", &self.api.is_fixture())]);

        let listing = match self.api.list_unread() {
            Ok(l) => l,
            Err(e) => {
                self.log.error("Error archiving emails", &[("error", &e)]);
                let (messages, pending) = self.on_failure.respond(self.store.clone(), &self.log);
                return Ok(ArchiveOutcome {
                    messages,
                    source: OutcomeSource::Degraded,
                    deferred_write: Some(pending),
                });
            }
        };

        if let Some(token) = &listing.next_page_token {
            self.log
                .debug("Ignoring further result pages", &[("nextPageToken", token)]);
        }

        let request = ModifyRequest::archive();
        let mut archived = 0usize;
        for msg in &listing.messages {
            match self.api.modify(&msg.id, &request) {
                Ok(resp) => {
                    archived += 1;
                    self.log.debug(
                        "Archived message",
                        &[("id", &resp.id), ("labels", &resp.label_ids.join(","))],
                    );
                }
                Err(e) => {
                    self.log
                        .warn("Failed to archive message", &[("id", &msg.id), ("error", &e)]);
                }
            }
        }

        save_archived(self.store.as_ref(), &listing.messages)?;

        self.log.info(
            "Archive complete",
            &[
                ("listed", &listing.messages.len()),
                ("archived", &archived),
                ("failed", &(listing.messages.len() - archived)),
            ],
        );

        Ok(ArchiveOutcome {
            messages: listing.messages,
            source: OutcomeSource::Live,
            deferred_write: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpClient, HttpError, HttpRequest, HttpResponse, Method};
    use crate::store::memory::MemoryStore;
    use crate::store::repo::load_archived;
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use std::time::Duration;

    const BASE: &str = "https://gmail.googleapis.com/gmail/v1";

    enum ListBehaviour {
        Respond(u16, Value),
        Fail,
    }

    struct ScriptedGmail {
        list: ListBehaviour,
        failing_ids: Vec<&'static str>,
        calls: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedGmail {
        fn new(list: ListBehaviour) -> Self {
            Self {
                list,
                failing_ids: vec![],
                calls: Mutex::new(vec![]),
            }
        }

        fn modify_calls(&self) -> Vec<HttpRequest> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.url.ends_with("/modify"))
                .cloned()
                .collect()
        }
    }

    impl HttpClient for ScriptedGmail {
        fn execute(&self, req: &HttpRequest) -> Result<HttpResponse, HttpError> {
            self.calls.lock().unwrap().push(req.clone());
            if req.url.contains("/messages?q=") {
                return match &self.list {
                    ListBehaviour::Respond(status, body) => HttpResponse::json(*status, body),
                    ListBehaviour::Fail => Err(HttpError::Transport("API Error".into())),
                };
            }
            if req.url.ends_with("/modify") {
                let id = req.url.rsplit('/').nth(1).unwrap_or_default().to_string();
                if self.failing_ids.iter().any(|f| *f == id) {
                    return Err(HttpError::Transport("connection reset".into()));
                }
                return HttpResponse::json(200, &json!({ "id": id, "labelIds": ["ARCHIVED"] }));
            }
            Err(HttpError::Transport("Unhandled fetch URL".into()))
        }
    }

    fn archiver(http: Arc<ScriptedGmail>, store: Arc<MemoryStore>) -> Archiver {
        Archiver::new(
            GmailApi::new(http, BASE, "is:unread"),
            store,
            DegradedResponse::new(Duration::from_millis(50)),
            ComponentLogger::new("Archiver"),
        )
    }

    fn two_unread() -> Value {
        json!({
            "messages": [
                { "id": "test_email_1", "threadId": "thread_1" },
                { "id": "test_email_2", "threadId": "thread_2" }
            ]
        })
    }

    #[test]
    fn archives_every_listed_message() {
        let http = Arc::new(ScriptedGmail::new(ListBehaviour::Respond(200, two_unread())));
        let store = Arc::new(MemoryStore::new());
        let outcome = archiver(http.clone(), store.clone()).run_pass().unwrap();

        assert_eq!(outcome.source, OutcomeSource::Live);
        assert!(outcome.deferred_write.is_none());
        assert_eq!(outcome.count(), 2);
        assert_eq!(outcome.messages[0].id, "test_email_1");

        let calls = http.calls.lock().unwrap().clone();
        assert_eq!(calls[0].method, Method::Get);
        assert_eq!(calls[0].url, format!("{BASE}/users/me/messages?q=is%3Aunread"));

        let modifies = http.modify_calls();
        assert_eq!(modifies.len(), 2);
        for m in &modifies {
            assert_eq!(m.method, Method::Post);
            let body: Value = serde_json::from_slice(m.body.as_deref().unwrap()).unwrap();
            assert_eq!(body, json!({ "addLabelIds": [], "removeLabelIds": ["INBOX"] }));
        }

        let stored = load_archived(store.as_ref()).unwrap();
        let ids: Vec<_> = stored.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["test_email_1", "test_email_2"]);
    }

    #[test]
    fn failed_modify_does_not_stop_the_pass() {
        let mut scripted = ScriptedGmail::new(ListBehaviour::Respond(
            200,
            json!({ "messages": [{ "id": "a" }, { "id": "b" }, { "id": "c" }] }),
        ));
        scripted.failing_ids = vec!["a"];
        let http = Arc::new(scripted);
        let store = Arc::new(MemoryStore::new());

        let outcome = archiver(http.clone(), store.clone()).run_pass().unwrap();

        assert_eq!(http.modify_calls().len(), 3);
        assert_eq!(outcome.count(), 3);
        assert_eq!(load_archived(store.as_ref()).unwrap().len(), 3);
    }

    #[test]
    fn thrown_list_error_returns_fallback_then_writes_it() {
        let http = Arc::new(ScriptedGmail::new(ListBehaviour::Fail));
        let store = Arc::new(MemoryStore::new());

        let outcome = archiver(http.clone(), store.clone()).run_pass().unwrap();

        assert_eq!(outcome.source, OutcomeSource::Degraded);
        assert_eq!(outcome.messages, fallback_record());
        assert!(http.modify_calls().is_empty());

        outcome.deferred_write.expect("deferred write").wait().unwrap();
        assert_eq!(load_archived(store.as_ref()).unwrap(), fallback_record());
        assert_eq!(store.write_log(), vec!["archivedEmails".to_string()]);
    }

    #[test]
    fn non_success_list_status_takes_degraded_path() {
        let http = Arc::new(ScriptedGmail::new(ListBehaviour::Respond(
            500,
            json!({ "error": { "code": 500 } }),
        )));
        let store = Arc::new(MemoryStore::new());

        let outcome = archiver(http, store).run_pass().unwrap();
        assert_eq!(outcome.source, OutcomeSource::Degraded);
        assert_eq!(outcome.count(), 2);
    }

    #[test]
    fn empty_inbox_stores_empty_list() {
        let http = Arc::new(ScriptedGmail::new(ListBehaviour::Respond(
            200,
            json!({ "resultSizeEstimate": 0 }),
        )));
        let store = Arc::new(MemoryStore::new());

        let outcome = archiver(http.clone(), store.clone()).run_pass().unwrap();
        assert_eq!(outcome.count(), 0);
        assert!(http.modify_calls().is_empty());
        assert_eq!(store.get("archivedEmails").unwrap(), Some(json!([])));
    }

    #[test]
    fn running_twice_repeats_the_same_modify_calls() {
        let http = Arc::new(ScriptedGmail::new(ListBehaviour::Respond(200, two_unread())));
        let store = Arc::new(MemoryStore::new());
        let a = archiver(http.clone(), store);

        a.run_pass().unwrap();
        a.run_pass().unwrap();

        let urls: Vec<_> = http.modify_calls().into_iter().map(|r| r.url).collect();
        assert_eq!(urls.len(), 4);
        assert_eq!(urls[0], urls[2]);
        assert_eq!(urls[1], urls[3]);
    }
}
