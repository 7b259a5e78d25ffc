//! Gmail API integration
//!
//! This module provides:
//! - OAuth2 authentication flow with a cached token file
//! - Gmail API client for querying, fetching and labeling messages

mod auth;
mod client;

pub use auth::GmailAuth;
pub use client::GmailClient;

/// Gmail API request/response types
pub mod api {
    use serde::{Deserialize, Serialize};

    /// Response from listing messages
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ListMessagesResponse {
        pub messages: Option<Vec<MessageRef>>,
        pub next_page_token: Option<String>,
    }

    /// Reference to a message (id only; the rest comes from a full fetch)
    #[derive(Debug, Deserialize)]
    pub struct MessageRef {
        pub id: String,
    }

    /// Full message from the Gmail API
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GmailMessage {
        pub id: String,
        /// Delivery time, milliseconds since epoch, as a decimal string
        pub internal_date: String,
        pub payload: Option<MessagePayload>,
    }

    /// Message payload containing headers and body
    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessagePayload {
        pub headers: Option<Vec<Header>>,
        pub body: Option<MessageBody>,
        pub parts: Option<Vec<MessagePart>>,
        pub mime_type: Option<String>,
    }

    /// Email header (name-value pair)
    #[derive(Debug, Deserialize, Serialize)]
    pub struct Header {
        pub name: String,
        pub value: String,
    }

    /// Message body (base64url encoded)
    #[derive(Debug, Deserialize)]
    pub struct MessageBody {
        pub data: Option<String>,
    }

    /// Message part (for multipart messages)
    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessagePart {
        pub mime_type: Option<String>,
        pub body: Option<MessageBody>,
        pub parts: Option<Vec<MessagePart>>,
    }

    /// Response from listing labels
    #[derive(Debug, Deserialize)]
    pub struct ListLabelsResponse {
        pub labels: Option<Vec<GmailLabel>>,
    }

    /// A Gmail label
    #[derive(Debug, Deserialize)]
    pub struct GmailLabel {
        pub id: String,
        pub name: String,
    }

    /// Request body for creating a label
    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CreateLabelRequest {
        pub name: String,
        pub label_list_visibility: String,
        pub message_list_visibility: String,
        pub color: LabelColor,
    }

    /// Label color styling
    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct LabelColor {
        pub background_color: String,
        pub text_color: String,
    }

    impl CreateLabelRequest {
        /// A label visible in both the label list and the message list
        pub fn shown(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                label_list_visibility: "labelShow".to_string(),
                message_list_visibility: "show".to_string(),
                color: LabelColor {
                    background_color: "#000000".to_string(),
                    text_color: "#ffffff".to_string(),
                },
            }
        }
    }

    /// Request body for modifying a message's labels
    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ModifyMessageRequest {
        #[serde(skip_serializing_if = "Vec::is_empty")]
        pub add_label_ids: Vec<String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        pub remove_label_ids: Vec<String>,
    }

}
