//! Message identity and the fetched-message model

use serde::{Deserialize, Serialize};

/// Unique identifier for a mailbox message (Gmail message ID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A fully fetched candidate message. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct FetchedMessage {
    pub id: MessageId,
    /// Source-assigned delivery time in Unix seconds.
    ///
    /// Authoritative for ordering and for the watermark; payload-derived
    /// times are advisory output only.
    pub delivered_at: i64,
    /// The message's own Date header in Unix seconds, falling back to
    /// `delivered_at` when the header is absent or unparseable
    pub event_ts: i64,
    /// Base64url-encoded HTML body, when one could be located
    pub body: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_id_round_trip() {
        let id = MessageId::new("19a8f2c4d1");
        assert_eq!(id.as_str(), "19a8f2c4d1");
        assert_eq!(MessageId::from("19a8f2c4d1"), id);
    }
}
