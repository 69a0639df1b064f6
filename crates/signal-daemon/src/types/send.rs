//! Types for sending and editing messages via signal-cli daemon.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Who a message goes to: one recipient or one group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SendTarget {
    /// Phone number or UUID of a single recipient.
    Recipient(String),
    /// Base64 group ID.
    Group(String),
}

impl SendTarget {
    pub fn recipient(recipient: impl Into<String>) -> Self {
        SendTarget::Recipient(recipient.into())
    }

    pub fn group(group_id: impl Into<String>) -> Self {
        SendTarget::Group(group_id.into())
    }
}

impl fmt::Display for SendTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendTarget::Recipient(r) => write!(f, "{}", r),
            SendTarget::Group(g) => write!(f, "group:{}", g),
        }
    }
}

/// Parameters for sending a message.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendParams {
    /// Recipients (phone numbers).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recipient: Vec<String>,

    /// Group IDs to send to.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub group_id: Vec<String>,

    /// The message text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Account to send from (multi-account mode).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,

    /// Timestamp of an earlier message this one replaces.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_timestamp: Option<u64>,
}

impl SendParams {
    /// Create new send params for a text message to a recipient.
    pub fn text(recipient: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            recipient: vec![recipient.into()],
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Create new send params for a text message to a group.
    pub fn group(group_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            group_id: vec![group_id.into()],
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Create send params for a target.
    pub fn to(target: &SendTarget, message: impl Into<String>) -> Self {
        match target {
            SendTarget::Recipient(r) => Self::text(r.clone(), message),
            SendTarget::Group(g) => Self::group(g.clone(), message),
        }
    }

    /// Set the account for multi-account mode.
    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    /// Turn this message into an edit of the message sent at `timestamp`.
    pub fn editing(mut self, timestamp: u64) -> Self {
        self.edit_timestamp = Some(timestamp);
        self
    }
}

/// Result of sending a message.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResult {
    /// Timestamp of the sent message.
    pub timestamp: u64,

    /// Results per recipient (if available).
    #[serde(default)]
    pub results: Vec<RecipientResult>,
}

impl SendResult {
    /// True when per-recipient results were reported and none succeeded.
    pub fn all_failed(&self) -> bool {
        !self.results.is_empty() && self.results.iter().all(|r| !r.is_success())
    }

    /// First per-recipient error, if any.
    pub fn first_error(&self) -> Option<&str> {
        self.results.iter().find_map(|r| r.error.as_deref())
    }
}

/// Result for a specific recipient.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientResult {
    /// Recipient phone number.
    #[serde(default)]
    pub recipient_address: Option<RecipientAddress>,

    /// Delivery outcome reported by signal-cli (`SUCCESS`, `UNREGISTERED_FAILURE`, ...).
    #[serde(default, rename = "type")]
    pub kind: Option<String>,

    /// Error message if failed.
    #[serde(default)]
    pub error: Option<String>,
}

impl RecipientResult {
    pub fn is_success(&self) -> bool {
        match &self.kind {
            Some(kind) => kind == "SUCCESS",
            None => self.error.is_none(),
        }
    }
}

/// Recipient address information.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientAddress {
    /// UUID.
    #[serde(default)]
    pub uuid: Option<String>,

    /// Phone number.
    #[serde(default)]
    pub number: Option<String>,
}
