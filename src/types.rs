//! Shared reply types sent back to the presentation layer.

use serde::{Deserialize, Serialize};

use crate::calendar::Event;
use crate::goals::Goal;

/// A label/value pair rendered as a detail row in previews.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyItem {
    pub label: String,
    pub value: String,
}

impl ReplyItem {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// The outward chat reply. `reply` is always present; the optional fields
/// are populated only by the handler that produced the response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reply {
    pub reply: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_md: Option<String>,
    /// Call-to-action label shown when a confirmation turn is expected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cta: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<ReplyItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<Event>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goals: Option<Vec<Goal>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_ids: Option<Vec<String>>,
}

impl Reply {
    pub fn text(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            ..Self::default()
        }
    }

    pub fn with_cta(mut self, cta: impl Into<String>) -> Self {
        self.cta = Some(cta.into());
        self
    }
}
