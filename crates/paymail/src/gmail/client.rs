//! Gmail API HTTP client
//!
//! Provides methods for querying, fetching and labeling messages.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use anyhow::{Context, Result};
use std::time::Duration;

use super::GmailAuth;
use super::api::{
    CreateLabelRequest, GmailLabel, GmailMessage, ListLabelsResponse, ListMessagesResponse,
    MessageRef, ModifyMessageRequest,
};
use crate::models::MessageId;

/// Gmail API client
pub struct GmailClient {
    auth: GmailAuth,
}

impl GmailClient {
    /// Gmail API base URL
    const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1";

    /// Create a new Gmail client
    pub fn new(auth: GmailAuth) -> Self {
        Self { auth }
    }

    /// List message IDs matching a search query
    ///
    /// # Arguments
    /// * `query` - Gmail search query (e.g. `from:x after:1700000000 -label:Y`)
    /// * `max_results` - Maximum messages per page (1-500)
    /// * `page_token` - Optional page token for pagination
    pub fn list_messages(
        &self,
        query: &str,
        max_results: usize,
        page_token: Option<&str>,
    ) -> Result<ListMessagesResponse> {
        let access_token = self.auth.get_access_token()?;

        let mut url = format!(
            "{}/users/me/messages?maxResults={}&q={}",
            Self::BASE_URL,
            max_results.min(500),
            urlencoding::encode(query)
        );

        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={}", token));
        }

        let mut response = ureq::get(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .call()
            .context("Failed to send list messages request")?;

        let list: ListMessagesResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse list messages response")?;

        Ok(list)
    }

    /// List ALL message IDs matching a search query
    ///
    /// Automatically follows page tokens until the result set is exhausted.
    pub fn list_messages_all(&self, query: &str) -> Result<Vec<MessageRef>> {
        let mut all_messages = Vec::new();
        let mut page_token = None;

        loop {
            let response = self.list_messages(query, 500, page_token.as_deref())?;

            if let Some(messages) = response.messages {
                all_messages.extend(messages);
            }

            match response.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(all_messages)
    }

    /// Get full message details by ID
    pub fn get_message(&self, id: &MessageId) -> Result<GmailMessage> {
        let access_token = self.auth.get_access_token()?;

        let url = format!(
            "{}/users/me/messages/{}?format=full",
            Self::BASE_URL,
            id.as_str()
        );

        let mut response = ureq::get(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .call()
            .context("Failed to send get message request")?;

        let message: GmailMessage = response
            .body_mut()
            .read_json()
            .context("Failed to parse message response")?;

        Ok(message)
    }

    /// Get a message with exponential backoff retry
    pub fn get_message_with_retry(&self, id: &MessageId, max_retries: u32) -> Result<GmailMessage> {
        let mut last_error = None;
        let mut delay = Duration::from_millis(100);

        for attempt in 0..max_retries {
            match self.get_message(id) {
                Ok(msg) => return Ok(msg),
                Err(e) => {
                    last_error = Some(e);
                    if attempt < max_retries - 1 {
                        // Add jitter to delay
                        let jitter = Duration::from_millis(rand_jitter());
                        std::thread::sleep(delay + jitter);
                        delay *= 2;
                    }
                }
            }
        }

        Err(last_error.unwrap())
    }

    /// Check if the client is authenticated
    pub fn is_authenticated(&self) -> bool {
        self.auth.is_authenticated()
    }

    /// Trigger the authentication flow (interactive on first run)
    pub fn authenticate(&self) -> Result<()> {
        self.auth.get_access_token()?;
        Ok(())
    }

    // === Labels API ===

    /// List all labels in the user's mailbox
    pub fn list_labels(&self) -> Result<ListLabelsResponse> {
        let access_token = self.auth.get_access_token()?;

        let url = format!("{}/users/me/labels", Self::BASE_URL);

        let mut response = ureq::get(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .call()
            .context("Failed to send list labels request")?;

        let labels: ListLabelsResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse labels response")?;

        Ok(labels)
    }

    /// Create a new label
    pub fn create_label(&self, request: &CreateLabelRequest) -> Result<GmailLabel> {
        let access_token = self.auth.get_access_token()?;

        let url = format!("{}/users/me/labels", Self::BASE_URL);

        let mut response = ureq::post(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .send_json(request)
            .context("Failed to send create label request")?;

        let label: GmailLabel = response
            .body_mut()
            .read_json()
            .context("Failed to parse create label response")?;

        Ok(label)
    }

    /// Add and/or remove labels on a message
    pub fn modify_message(&self, id: &MessageId, add: &[&str], remove: &[&str]) -> Result<()> {
        let access_token = self.auth.get_access_token()?;

        let url = format!(
            "{}/users/me/messages/{}/modify",
            Self::BASE_URL,
            id.as_str()
        );

        let request = ModifyMessageRequest {
            add_label_ids: add.iter().map(|s| s.to_string()).collect(),
            remove_label_ids: remove.iter().map(|s| s.to_string()).collect(),
        };

        ureq::post(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .send_json(&request)
            .with_context(|| format!("Failed to modify labels on message {}", id.as_str()))?;

        Ok(())
    }
}

/// Generate a random jitter value (0-100ms)
fn rand_jitter() -> u64 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let hasher = RandomState::new().build_hasher();
    hasher.finish() % 100
}
