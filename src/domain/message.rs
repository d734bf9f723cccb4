use serde::{Deserialize, Serialize};

pub type MessageId = String;

pub const INBOX_LABEL: &str = "INBOX";

/// Reference to one Gmail message as returned by `messages.list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub id: MessageId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl MessageRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            thread_id: None,
            subject: None,
        }
    }

    pub fn with_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMessagesResponse {
    // absent when nothing matches the query
    #[serde(default)]
    pub messages: Vec<MessageRef>,
    #[serde(default)]
    pub next_page_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_size_estimate: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyRequest {
    pub add_label_ids: Vec<String>,
    pub remove_label_ids: Vec<String>,
}

impl ModifyRequest {
    /// Archiving in Gmail is just dropping the INBOX label.
    pub fn archive() -> Self {
        Self {
            add_label_ids: vec![],
            remove_label_ids: vec![INBOX_LABEL.to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyResponse {
    pub id: MessageId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub label_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_response_without_messages_is_empty() {
        let r: ListMessagesResponse = serde_json::from_str(r#"{"resultSizeEstimate":0}"#).unwrap();
        assert!(r.messages.is_empty());
        assert_eq!(r.next_page_token, None);
    }

    #[test]
    fn archive_request_wire_shape() {
        let v = serde_json::to_value(ModifyRequest::archive()).unwrap();
        assert_eq!(
            v,
            serde_json::json!({ "addLabelIds": [], "removeLabelIds": ["INBOX"] })
        );
    }

    #[test]
    fn message_ref_omits_missing_fields() {
        let v = serde_json::to_value(MessageRef::new("abc").with_thread("t1")).unwrap();
        assert_eq!(v, serde_json::json!({ "id": "abc", "threadId": "t1" }));
    }
}
