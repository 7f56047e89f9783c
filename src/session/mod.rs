//! In-memory conversation sessions.
//!
//! Turns live in process memory and are lost on restart; the pipeline only
//! needs recent history for prompt building. Sessions are capped at their
//! most recent turns and idle sessions are evicted by the maintenance task.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Display-oriented projection of a document, attached for attribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub title: String,
    pub url: String,
    pub similarity: f32,
    pub content_preview: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub turn_count: usize,
    pub last_active: DateTime<Utc>,
}

struct SessionEntry {
    turns: Vec<ConversationTurn>,
    last_active: DateTime<Utc>,
}

pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    max_turns: usize,
    idle_ttl: Duration,
}

impl SessionStore {
    pub fn new(max_turns: usize, idle_ttl_secs: u64) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_turns: max_turns.max(1),
            idle_ttl: Duration::seconds(idle_ttl_secs as i64),
        }
    }

    /// Conversation history for a session, oldest first. Unknown sessions
    /// have an empty history.
    pub async fn history(&self, session_id: &str) -> Vec<ConversationTurn> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(|entry| entry.turns.clone())
            .unwrap_or_default()
    }

    /// Append a turn, creating the session if needed and dropping the
    /// oldest turns beyond the cap.
    pub async fn append(&self, session_id: &str, turn: ConversationTurn) {
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionEntry {
                turns: Vec::new(),
                last_active: Utc::now(),
            });

        entry.turns.push(turn);
        if entry.turns.len() > self.max_turns {
            let excess = entry.turns.len() - self.max_turns;
            entry.turns.drain(..excess);
        }
        entry.last_active = Utc::now();
    }

    pub async fn list(&self) -> Vec<SessionSummary> {
        let sessions = self.sessions.read().await;
        let mut summaries: Vec<SessionSummary> = sessions
            .iter()
            .map(|(id, entry)| SessionSummary {
                id: id.clone(),
                turn_count: entry.turns.len(),
                last_active: entry.last_active,
            })
            .collect();
        summaries.sort_by(|a, b| b.last_active.cmp(&a.last_active));
        summaries
    }

    pub async fn delete(&self, session_id: &str) -> bool {
        self.sessions.write().await.remove(session_id).is_some()
    }

    /// Drop sessions idle longer than the TTL. Returns how many were
    /// removed.
    pub async fn evict_expired(&self) -> usize {
        let cutoff = Utc::now() - self.idle_ttl;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.last_active >= cutoff);
        before - sessions.len()
    }
}
