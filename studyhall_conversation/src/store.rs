//! Keyed in-memory conversation storage with size and TTL bounds.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use studyhall_core::{Message, Role};
use tracing::{debug, info};
use uuid::Uuid;

/// Header line prepended to a non-empty transcript.
const CONTEXT_HEADER: &str = "Previous conversation:";

#[derive(Debug)]
struct Conversation {
    created_at: DateTime<Utc>,
    messages: Vec<Message>,
}

impl Conversation {
    fn new() -> Self {
        Self {
            created_at: Utc::now(),
            messages: Vec::new(),
        }
    }
}

/// Read-only snapshot of a conversation's bookkeeping.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub conversation_id: String,
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
    pub last_message: Option<DateTime<Utc>>,
}

/// Ephemeral per-conversation message history.
///
/// Each conversation keeps at most `2 * max_history` messages (oldest
/// dropped first) and is evicted lazily once its age exceeds the TTL;
/// [`ConversationStore::clear_expired`] additionally bounds memory
/// under low read volume. Mutations on one conversation id are atomic
/// with respect to each other and never contend with other ids.
pub struct ConversationStore {
    conversations: DashMap<String, Conversation>,
    max_history: usize,
    ttl: Duration,
}

impl ConversationStore {
    /// Create a store keeping `max_history` messages of context per
    /// conversation, expiring conversations after `ttl_hours`.
    #[must_use]
    pub fn new(max_history: usize, ttl_hours: i64) -> Self {
        info!("Conversation store initialized (max_history={max_history}, ttl={ttl_hours}h)");
        Self {
            conversations: DashMap::new(),
            max_history,
            ttl: Duration::hours(ttl_hours),
        }
    }

    /// Allocate a fresh conversation. Never fails.
    #[must_use]
    pub fn create(&self, owner_hint: Option<&str>) -> String {
        let id = Uuid::now_v7().to_string();
        self.conversations.insert(id.clone(), Conversation::new());
        debug!(
            "Created conversation {id} for {}",
            owner_hint.unwrap_or("anonymous")
        );
        id
    }

    /// Append a message, implicitly creating the conversation when the
    /// id is unknown. Trims the oldest messages once the log exceeds
    /// `2 * max_history`.
    pub fn add_message(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str,
        metadata: Option<serde_json::Map<String, serde_json::Value>>,
    ) {
        let mut entry = self
            .conversations
            .entry(conversation_id.to_string())
            .or_insert_with(Conversation::new);

        entry
            .messages
            .push(Message::new(role, content.to_string(), metadata));

        let cap = self.max_history * 2;
        if entry.messages.len() > cap {
            let excess = entry.messages.len() - cap;
            entry.messages.drain(..excess);
        }

        debug!("Added {role:?} message to conversation {conversation_id}");
    }

    /// Most recent messages in chronological order.
    ///
    /// Unknown ids yield an empty history. Reading an expired
    /// conversation deletes it and yields an empty history.
    #[must_use]
    pub fn get_history(&self, conversation_id: &str, max_messages: Option<usize>) -> Vec<Message> {
        if self.evict_if_expired(conversation_id) {
            return Vec::new();
        }

        self.conversations
            .get(conversation_id)
            .map_or_else(Vec::new, |conv| {
                let limit = max_messages
                    .unwrap_or(self.max_history)
                    .min(conv.messages.len());
                conv.messages[conv.messages.len() - limit..].to_vec()
            })
    }

    /// Format the recent history as a prompt-ready transcript.
    ///
    /// Returns an empty string (no header) when there is no history.
    #[must_use]
    pub fn get_context_string(
        &self,
        conversation_id: &str,
        max_messages: Option<usize>,
    ) -> String {
        let history = self.get_history(conversation_id, max_messages);
        if history.is_empty() {
            return String::new();
        }

        let mut lines = vec![CONTEXT_HEADER.to_string()];
        for msg in &history {
            lines.push(format!("{}: {}", msg.role.transcript_label(), msg.content));
        }
        lines.join("\n")
    }

    /// Remove a conversation and its bookkeeping. Idempotent.
    pub fn clear(&self, conversation_id: &str) {
        self.conversations.remove(conversation_id);
        debug!("Cleared conversation {conversation_id}");
    }

    /// Sweep out every conversation older than the TTL.
    ///
    /// Returns the number removed.
    pub fn clear_expired(&self) -> usize {
        let before = self.conversations.len();
        let now = Utc::now();
        self.conversations
            .retain(|_, conv| now - conv.created_at <= self.ttl);
        let removed = before.saturating_sub(self.conversations.len());
        if removed > 0 {
            info!("Cleared {removed} expired conversations");
        }
        removed
    }

    /// Bookkeeping snapshot for a conversation.
    ///
    /// Uses [`Self::get_history`] internally, so it follows the same
    /// expiry rule as reads.
    #[must_use]
    pub fn summary(&self, conversation_id: &str) -> ConversationSummary {
        let history = self.get_history(conversation_id, None);
        let created_at = self
            .conversations
            .get(conversation_id)
            .map_or_else(Utc::now, |conv| conv.created_at);
        ConversationSummary {
            conversation_id: conversation_id.to_string(),
            message_count: history.len(),
            created_at,
            last_message: history.last().map(|msg| msg.timestamp),
        }
    }

    /// Whether a conversation currently exists in the store.
    #[must_use]
    pub fn contains(&self, conversation_id: &str) -> bool {
        self.conversations.contains_key(conversation_id)
    }

    /// Number of live conversations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Atomically remove the conversation if it has outlived the TTL.
    fn evict_if_expired(&self, conversation_id: &str) -> bool {
        let now = Utc::now();
        let removed = self
            .conversations
            .remove_if(conversation_id, |_, conv| now - conv.created_at > self.ttl)
            .is_some();
        if removed {
            debug!("Conversation {conversation_id} expired, clearing");
        }
        removed
    }

    /// Shift a conversation's creation time into the past.
    #[cfg(test)]
    fn backdate(&self, conversation_id: &str, hours: i64) {
        if let Some(mut conv) = self.conversations.get_mut(conversation_id) {
            conv.created_at -= Duration::hours(hours);
        }
    }
}
