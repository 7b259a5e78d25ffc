//! Message source abstraction and the Gmail-backed adapter
//!
//! The sync engine only sees the [`MessageSource`] trait; [`GmailSource`]
//! implements it on top of the Gmail client, owning query construction and
//! the processed-marker protocol.

use anyhow::Result;
use chrono::DateTime;
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};

use crate::gmail::GmailClient;
use crate::gmail::api::{CreateLabelRequest, GmailMessage, MessagePart, MessagePayload};
use crate::models::{FetchedMessage, MessageId};

/// How candidate messages are selected and fenced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Selection {
    /// Select messages not bearing the marker label; fence by adding it
    Label,
    /// Select unread messages; fence by clearing the UNREAD flag
    Unread,
}

/// A remote mailbox viewed as a stream of candidate messages
pub trait MessageSource: Send + Sync {
    /// Find or create the processed marker. Idempotent.
    fn ensure_marker(&self) -> Result<String>;

    /// List candidate message ids strictly after the watermark, in source
    /// order (newest first), excluding messages already bearing the marker
    fn list_candidates(&self, after: i64) -> Result<Vec<MessageId>>;

    /// Fetch the full message content for a candidate
    fn fetch_full(&self, id: &MessageId) -> Result<FetchedMessage>;

    /// Apply the processed marker to a message.
    ///
    /// Not reversible. Must only be invoked after the record has been
    /// durably delivered or definitively classified as unparseable.
    fn mark_processed(&self, id: &MessageId) -> Result<()>;
}

/// Gmail-backed message source for a single trusted sender
pub struct GmailSource {
    client: Arc<GmailClient>,
    sender: String,
    marker_label: String,
    selection: Selection,
    marker_id: OnceLock<String>,
}

impl GmailSource {
    const FETCH_RETRIES: u32 = 3;

    pub fn new(
        client: Arc<GmailClient>,
        sender: impl Into<String>,
        marker_label: impl Into<String>,
        selection: Selection,
    ) -> Self {
        Self {
            client,
            sender: sender.into(),
            marker_label: marker_label.into(),
            selection,
            marker_id: OnceLock::new(),
        }
    }

    /// Build the candidate query: sender, lower-bound delivery time, and the
    /// negated marker predicate, combined conjunctively
    fn build_query(&self, after: i64) -> String {
        match self.selection {
            Selection::Label => format!(
                "from:{} after:{} -label:{}",
                self.sender, after, self.marker_label
            ),
            Selection::Unread => format!("from:{} is:unread after:{}", self.sender, after),
        }
    }
}

impl MessageSource for GmailSource {
    fn ensure_marker(&self) -> Result<String> {
        if let Some(id) = self.marker_id.get() {
            return Ok(id.clone());
        }

        let id = match self.selection {
            Selection::Unread => "UNREAD".to_string(),
            Selection::Label => {
                let existing = self
                    .client
                    .list_labels()?
                    .labels
                    .unwrap_or_default()
                    .into_iter()
                    .find(|l| l.name == self.marker_label);

                match existing {
                    Some(label) => label.id,
                    None => {
                        debug!("Marker label '{}' not found, creating it", self.marker_label);
                        self.client
                            .create_label(&CreateLabelRequest::shown(&self.marker_label))?
                            .id
                    }
                }
            }
        };

        let _ = self.marker_id.set(id.clone());
        Ok(id)
    }

    fn list_candidates(&self, after: i64) -> Result<Vec<MessageId>> {
        let query = self.build_query(after);
        debug!("Listing candidates: {}", query);

        let refs = self.client.list_messages_all(&query)?;
        Ok(refs.into_iter().map(|r| MessageId::new(r.id)).collect())
    }

    fn fetch_full(&self, id: &MessageId) -> Result<FetchedMessage> {
        let message = self.client.get_message_with_retry(id, Self::FETCH_RETRIES)?;
        Ok(normalize_fetched(message))
    }

    fn mark_processed(&self, id: &MessageId) -> Result<()> {
        let marker = self.ensure_marker()?;
        match self.selection {
            Selection::Label => self.client.modify_message(id, &[&marker], &[]),
            Selection::Unread => self.client.modify_message(id, &[], &[&marker]),
        }
    }
}

/// Convert a raw Gmail message to the engine's fetched form
fn normalize_fetched(message: GmailMessage) -> FetchedMessage {
    // internalDate is milliseconds since epoch as a decimal string
    let delivered_at = message.internal_date.parse::<i64>().unwrap_or(0) / 1000;

    let event_ts = message
        .payload
        .as_ref()
        .and_then(|p| header_value(p, "Date"))
        .and_then(|date| DateTime::parse_from_rfc2822(&date).ok())
        .map(|dt| dt.timestamp())
        .unwrap_or(delivered_at);

    let body = message.payload.as_ref().and_then(locate_encoded_body);

    FetchedMessage {
        id: MessageId::new(message.id),
        delivered_at,
        event_ts,
        body,
    }
}

/// Extract a header value by name
fn header_value(payload: &MessagePayload, name: &str) -> Option<String> {
    payload.headers.as_ref()?.iter().find_map(|h| {
        if h.name.eq_ignore_ascii_case(name) {
            Some(h.value.clone())
        } else {
            None
        }
    })
}

/// Locate the encoded body: the top-level payload body if present,
/// otherwise the first text/html part found by recursive descent
fn locate_encoded_body(payload: &MessagePayload) -> Option<String> {
    if let Some(body) = &payload.body
        && let Some(data) = &body.data
    {
        return Some(data.clone());
    }

    payload.parts.as_deref().and_then(find_html_part)
}

/// Recursively search message parts for text/html content
fn find_html_part(parts: &[MessagePart]) -> Option<String> {
    for part in parts {
        if part
            .mime_type
            .as_ref()
            .is_some_and(|m| m.starts_with("text/html"))
            && let Some(body) = &part.body
            && let Some(data) = &body.data
        {
            return Some(data.clone());
        }

        if let Some(nested) = &part.parts
            && let Some(data) = find_html_part(nested)
        {
            return Some(data);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmail::api::{Header, MessageBody};

    fn html_part(data: &str) -> MessagePart {
        MessagePart {
            mime_type: Some("text/html".to_string()),
            body: Some(MessageBody {
                data: Some(data.to_string()),
            }),
            parts: None,
        }
    }

    fn offline_source(selection: Selection) -> GmailSource {
        let auth = crate::gmail::GmailAuth::with_token_path(
            "client-id".to_string(),
            "client-secret".to_string(),
            std::env::temp_dir().join("paymail-test-token.json"),
        );
        GmailSource::new(
            Arc::new(GmailClient::new(auth)),
            "no-reply@paytm.com",
            "PROCESSED",
            selection,
        )
    }

    #[test]
    fn test_build_query_label_selection() {
        let source = offline_source(Selection::Label);
        assert_eq!(
            source.build_query(1_764_000_000),
            "from:no-reply@paytm.com after:1764000000 -label:PROCESSED"
        );
    }

    #[test]
    fn test_build_query_unread_selection() {
        let source = offline_source(Selection::Unread);
        assert_eq!(
            source.build_query(1_764_000_000),
            "from:no-reply@paytm.com is:unread after:1764000000"
        );
    }

    #[test]
    fn test_normalize_internal_date_to_seconds() {
        let message = GmailMessage {
            id: "m1".to_string(),
            internal_date: "1764130860123".to_string(),
            payload: Some(MessagePayload::default()),
        };

        let fetched = normalize_fetched(message);
        assert_eq!(fetched.delivered_at, 1_764_130_860);
        // No Date header, so the event time falls back to delivery time
        assert_eq!(fetched.event_ts, 1_764_130_860);
        assert!(fetched.body.is_none());
    }

    #[test]
    fn test_normalize_prefers_date_header() {
        let message = GmailMessage {
            id: "m1".to_string(),
            internal_date: "1764130860000".to_string(),
            payload: Some(MessagePayload {
                headers: Some(vec![Header {
                    name: "Date".to_string(),
                    value: "Wed, 26 Nov 2025 10:31:00 +0530".to_string(),
                }]),
                ..Default::default()
            }),
        };

        let fetched = normalize_fetched(message);
        let expected = DateTime::parse_from_rfc2822("Wed, 26 Nov 2025 10:31:00 +0530")
            .unwrap()
            .timestamp();
        assert_eq!(fetched.event_ts, expected);
    }

    #[test]
    fn test_locate_body_in_nested_parts() {
        let payload = MessagePayload {
            parts: Some(vec![
                MessagePart {
                    mime_type: Some("text/plain".to_string()),
                    body: Some(MessageBody {
                        data: Some("plain".to_string()),
                    }),
                    parts: None,
                },
                MessagePart {
                    mime_type: Some("multipart/alternative".to_string()),
                    body: None,
                    parts: Some(vec![html_part("aGVsbG8")]),
                },
            ]),
            ..Default::default()
        };

        assert_eq!(locate_encoded_body(&payload), Some("aGVsbG8".to_string()));
    }

    #[test]
    fn test_top_level_body_wins() {
        let payload = MessagePayload {
            body: Some(MessageBody {
                data: Some("dG9w".to_string()),
            }),
            parts: Some(vec![html_part("bmVzdGVk")]),
            ..Default::default()
        };

        assert_eq!(locate_encoded_body(&payload), Some("dG9w".to_string()));
    }
}
