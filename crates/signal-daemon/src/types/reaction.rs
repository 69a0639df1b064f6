//! Types for reacting to messages.

use serde::Serialize;

use super::send::SendTarget;

/// Parameters for the `sendReaction` call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionParams {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recipient: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub group_id: Vec<String>,

    /// A single emoji.
    pub emoji: String,

    /// Author of the message reacted to.
    pub target_author: String,

    /// Sent timestamp of the message reacted to.
    pub target_timestamp: u64,

    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub remove: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

impl ReactionParams {
    pub fn new(
        target: &SendTarget,
        emoji: impl Into<String>,
        target_author: impl Into<String>,
        target_timestamp: u64,
    ) -> Self {
        let (recipient, group_id) = match target {
            SendTarget::Recipient(r) => (vec![r.clone()], Vec::new()),
            SendTarget::Group(g) => (Vec::new(), vec![g.clone()]),
        };
        Self {
            recipient,
            group_id,
            emoji: emoji.into(),
            target_author: target_author.into(),
            target_timestamp,
            remove: false,
            account: None,
        }
    }
}
