//! Destination-ready rendered content.

use serde::{Deserialize, Serialize};

/// Delivery priority requested from the chat platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Normal,
    Important,
    Urgent,
}

/// A structured location field, shown in region insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentField {
    pub title: String,
    pub value: String,
}

/// Content rendered for one language.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RenderedContent {
    /// Localized category headline, empty for advisory-only notices.
    pub title: String,
    /// Localized instruction line.
    pub instructions: String,
    /// Body text: region names, instructions and hashtags.
    pub text: String,
    /// Location fields grouped by area.
    pub fields: Vec<ContentField>,
    pub priority: Priority,
    /// Whether recipients are asked to acknowledge the post.
    pub requested_ack: bool,
}

impl RenderedContent {
    /// Flatten into a single message for transports without structured posts.
    ///
    /// The title heads the message and the rendered body follows it. Content
    /// without a body (notices such as `uav_event_over`) falls back to the
    /// instructions and location fields.
    pub fn to_plain_text(&self) -> String {
        let mut lines = Vec::new();
        if !self.title.is_empty() {
            lines.push(self.title.clone());
        }
        if !self.text.is_empty() {
            lines.push(self.text.clone());
            return lines.join("\n");
        }
        if !self.instructions.is_empty() {
            lines.push(self.instructions.clone());
        }
        for field in &self.fields {
            if field.value.is_empty() {
                lines.push(format!("• {}", field.title));
            } else {
                lines.push(format!("• {}: {}", field.title, field.value.replace('\n', ", ")));
            }
        }
        lines.join("\n")
    }
}
