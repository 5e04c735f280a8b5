use chrono::{Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::types::{AssistantVariant, ConversationSession, Message, MessageMetadata, Role, SessionId};

/// In-memory session table for one assistant variant.
///
/// Every operation locks a single DashMap shard for its own duration only,
/// so concurrent turns on different sessions never block each other. Nothing
/// is persisted: sessions live until `delete` or process exit.
#[derive(Clone)]
pub struct SessionStore {
    variant: AssistantVariant,
    max_messages: usize,

    /// session_id -> ConversationSession
    storage: Arc<DashMap<SessionId, ConversationSession>>,
}

impl SessionStore {
    pub fn new(variant: AssistantVariant, max_messages: usize) -> Self {
        let max_messages = max_messages.max(1);
        info!(
            "Initializing {:?} session store (max_messages={})",
            variant, max_messages
        );
        Self {
            variant,
            max_messages,
            storage: Arc::new(DashMap::new()),
        }
    }

    /// Store with the variant's default cap (6 patient, 8 clinic)
    pub fn for_variant(variant: AssistantVariant) -> Self {
        Self::new(variant, variant.default_max_messages())
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    /// Return the session for `session_id`, creating an empty one first if
    /// needed. Always refreshes `last_activity`.
    pub fn get_or_create(&self, session_id: &str) -> ConversationSession {
        self.update(session_id, |session| session.clone())
    }

    /// Inspection alias of [`get_or_create`](Self::get_or_create); it creates
    /// and touches exactly the same way.
    pub fn read(&self, session_id: &str) -> ConversationSession {
        self.get_or_create(session_id)
    }

    /// Push a message and trim the oldest ones beyond the cap
    pub fn append(
        &self,
        session_id: &str,
        role: Role,
        content: impl Into<String>,
        metadata: MessageMetadata,
    ) -> ConversationSession {
        let message = Message::new(role, content, metadata);
        let max_messages = self.max_messages;

        self.update(session_id, move |session| {
            session.messages.push(message);
            let dropped = session.trim_to(max_messages);
            if dropped > 0 {
                debug!(
                    "Session {} trimmed {} message(s) to stay within {}",
                    session.session_id, dropped, max_messages
                );
            }
            session.clone()
        })
    }

    /// Get-or-create the session, touch it, and run `f` on the stored record
    /// while holding its entry lock.
    pub fn update<R>(&self, session_id: &str, f: impl FnOnce(&mut ConversationSession) -> R) -> R {
        let mut entry = self
            .storage
            .entry(session_id.to_string())
            .or_insert_with(|| {
                debug!("Creating {:?} session {}", self.variant, session_id);
                ConversationSession::new(session_id)
            });
        entry.touch();
        f(entry.value_mut())
    }

    /// Remove a session. Returns whether one existed; removing an unknown id
    /// is not an error.
    pub fn delete(&self, session_id: &str) -> bool {
        let removed = self.storage.remove(session_id).is_some();
        debug!(
            "Delete {:?} session {} (existed: {})",
            self.variant, session_id, removed
        );
        removed
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Drop sessions whose last activity is older than `max_idle`.
    /// Returns number of sessions removed.
    pub fn purge_idle(&self, max_idle: Duration) -> usize {
        let cutoff = Utc::now() - max_idle;
        let start_len = self.storage.len();
        self.storage
            .retain(|_, session: &mut ConversationSession| session.last_activity >= cutoff);
        let count = start_len.saturating_sub(self.storage.len());

        if count > 0 {
            info!("Purged {} idle {:?} sessions", count, self.variant);
        }

        count
    }

    /// Store statistics for monitoring
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            variant: self.variant,
            active_sessions: self.len(),
            buffered_messages: self.storage.iter().map(|entry| entry.messages.len()).sum(),
            max_messages: self.max_messages,
        }
    }
}

/// Store statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct StoreStats {
    pub variant: AssistantVariant,
    pub active_sessions: usize,
    pub buffered_messages: usize,
    pub max_messages: usize,
}
