//! `ConversationStore` trait — backend-agnostic persistence seam.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::engine::state::{CollectedFields, ConversationStatus};
use crate::error::DatabaseError;

/// Persisted dialogue state for one phone number.
///
/// One row per address; a restart resets the row in place, it is never
/// deleted.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: String,
    pub phone: String,
    /// Raw status string as stored; the engine parses it leniently.
    pub status: String,
    /// Cleaned 11-digit CPF, set once validated.
    pub document: Option<String>,
    pub collected: CollectedFields,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Conversation {
    /// Fresh conversation at the start of the collection flow.
    pub fn new(phone: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            phone: phone.to_string(),
            status: ConversationStatus::CollectingDocument.as_str().to_string(),
            document: None,
            collected: CollectedFields::default(),
            created_at: now,
            last_activity: now,
        }
    }

    /// Bump the last-activity timestamp.
    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    pub fn set_status(&mut self, status: ConversationStatus) {
        self.status = status.as_str().to_string();
    }
}

/// Direction tag for an audit message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Incoming => "incoming",
            Self::Outgoing => "outgoing",
        }
    }
}

/// Immutable log record of one inbound or outbound text.
#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub id: String,
    pub phone: String,
    pub direction: Direction,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// One message row to record as part of an event commit.
#[derive(Debug, Clone)]
pub struct EventMessage {
    pub direction: Direction,
    pub body: String,
}

impl EventMessage {
    pub fn new(direction: Direction, body: impl Into<String>) -> Self {
        Self {
            direction,
            body: body.into(),
        }
    }
}

/// Backend-agnostic conversation persistence.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Look up the conversation for a phone number.
    async fn find_conversation(&self, phone: &str)
    -> Result<Option<Conversation>, DatabaseError>;

    /// Persist one handled event atomically: the conversation row is
    /// inserted or updated (keyed by phone) and every message row lands
    /// in the same transaction. A failure writes nothing.
    async fn commit_event(
        &self,
        conversation: &Conversation,
        messages: &[EventMessage],
    ) -> Result<(), DatabaseError>;

    /// Most recent messages for a phone number, newest first. Audit
    /// only, never read back for flow decisions.
    async fn recent_messages(
        &self,
        phone: &str,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, DatabaseError>;

    /// Cheap connectivity check for the health endpoint.
    async fn ping(&self) -> Result<(), DatabaseError>;
}
