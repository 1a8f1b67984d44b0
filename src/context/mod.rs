//! Conversational context supplied by the hosting session layer
//!
//! One `ConversationContext` is passed per turn. It carries the previous
//! turn's resolved merchant (for omitted-subject recognition), the last
//! classified intent (for plan-continuation scoring), and a short window
//! of recent messages (for speculative follow-up planning).

use crate::core::types::MerchantId;
use crate::intent::QueryIntent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl ConversationMessage {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            timestamp: Utc::now(),
            metadata: None,
        }
    }
}

/// Per-turn context from the session layer.
///
/// All fields are optional; an empty context is a valid first turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationContext {
    pub prior_merchant_id: Option<MerchantId>,
    pub prior_merchant_name: Option<String>,
    pub last_intent: Option<QueryIntent>,
    #[serde(default)]
    pub recent_messages: Vec<ConversationMessage>,
}

impl ConversationContext {
    pub fn with_prior_merchant(id: MerchantId, name: impl Into<String>) -> Self {
        Self {
            prior_merchant_id: Some(id),
            prior_merchant_name: Some(name.into()),
            ..Default::default()
        }
    }

    /// True when both halves of the prior-merchant reference are present.
    pub fn has_prior_merchant(&self) -> bool {
        self.prior_merchant_id.is_some() && self.prior_merchant_name.is_some()
    }
}
