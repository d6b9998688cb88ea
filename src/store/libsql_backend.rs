//! libSQL implementation of `ConversationStore`.
//!
//! Supports local file and in-memory databases. `libsql::Connection` is
//! `Send + Sync`, so a single connection is shared across handlers.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::engine::state::CollectedFields;
use crate::error::DatabaseError;
use crate::store::traits::{
    Conversation, ConversationStore, Direction, EventMessage, StoredMessage,
};

const CONVERSATION_COLUMNS: &str =
    "id, phone, status, document, collected, created_at, last_activity";
const MESSAGE_COLUMNS: &str = "id, phone, direction, body, created_at";

/// libSQL conversation store.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and initialize the schema.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.init_schema().await?;
        info!(path = %path.display(), "Database opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to create in-memory database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.init_schema().await?;
        Ok(store)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }

    async fn init_schema(&self) -> Result<(), DatabaseError> {
        self.conn()
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS conversations (
                    id TEXT PRIMARY KEY,
                    phone TEXT NOT NULL UNIQUE,
                    status TEXT NOT NULL,
                    document TEXT,
                    collected TEXT NOT NULL DEFAULT '{}',
                    created_at TEXT NOT NULL,
                    last_activity TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_conversations_phone
                    ON conversations(phone);

                CREATE TABLE IF NOT EXISTS messages (
                    id TEXT PRIMARY KEY,
                    phone TEXT NOT NULL,
                    direction TEXT NOT NULL,
                    body TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_messages_phone
                    ON messages(phone);",
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("init_schema: {e}")))?;
        Ok(())
    }
}

// ── Row mapping helpers ─────────────────────────────────────────────

/// Parse an RFC 3339 timestamp, falling back to the epoch floor on a
/// malformed row rather than failing the whole query.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| DateTime::<Utc>::MIN_UTC)
}

fn parse_direction(s: &str) -> Direction {
    match s {
        "outgoing" => Direction::Outgoing,
        _ => Direction::Incoming,
    }
}

fn row_to_conversation(row: &libsql::Row) -> Result<Conversation, libsql::Error> {
    let id: String = row.get(0)?;
    let phone: String = row.get(1)?;
    let status: String = row.get(2)?;
    let document: Option<String> = row.get(3)?;
    let collected_json: String = row.get(4)?;
    let created_str: String = row.get(5)?;
    let activity_str: String = row.get(6)?;

    // Lenient: a corrupted JSON column degrades to "nothing collected",
    // which the engine's restart fallback handles.
    let collected: CollectedFields = serde_json::from_str(&collected_json).unwrap_or_default();

    Ok(Conversation {
        id,
        phone,
        status,
        document,
        collected,
        created_at: parse_datetime(&created_str),
        last_activity: parse_datetime(&activity_str),
    })
}

fn row_to_message(row: &libsql::Row) -> Result<StoredMessage, libsql::Error> {
    let direction_str: String = row.get(2)?;
    let created_str: String = row.get(4)?;
    Ok(StoredMessage {
        id: row.get(0)?,
        phone: row.get(1)?,
        direction: parse_direction(&direction_str),
        body: row.get(3)?,
        created_at: parse_datetime(&created_str),
    })
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl ConversationStore for LibSqlStore {
    async fn find_conversation(
        &self,
        phone: &str,
    ) -> Result<Option<Conversation>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE phone = ?1"),
                params![phone],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("find_conversation: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let conversation = row_to_conversation(&row)
                    .map_err(|e| DatabaseError::Query(format!("row parse: {e}")))?;
                Ok(Some(conversation))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("find_conversation: {e}"))),
        }
    }

    async fn commit_event(
        &self,
        conversation: &Conversation,
        messages: &[EventMessage],
    ) -> Result<(), DatabaseError> {
        let collected = serde_json::to_string(&conversation.collected)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

        // Dropping the transaction without a commit rolls it back, so a
        // failed statement below leaves no rows behind.
        let tx = self
            .conn()
            .transaction()
            .await
            .map_err(|e| DatabaseError::Query(format!("commit_event: {e}")))?;

        tx.execute(
            "INSERT INTO conversations (id, phone, status, document, collected,
                created_at, last_activity)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(phone) DO UPDATE SET
                status = excluded.status,
                document = excluded.document,
                collected = excluded.collected,
                last_activity = excluded.last_activity",
            params![
                conversation.id.clone(),
                conversation.phone.clone(),
                conversation.status.clone(),
                conversation.document.clone(),
                collected,
                conversation.created_at.to_rfc3339(),
                conversation.last_activity.to_rfc3339(),
            ],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("commit_event conversation: {e}")))?;

        for message in messages {
            tx.execute(
                "INSERT INTO messages (id, phone, direction, body, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    Uuid::new_v4().to_string(),
                    conversation.phone.clone(),
                    message.direction.as_str(),
                    message.body.clone(),
                    Utc::now().to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("commit_event message: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| DatabaseError::Query(format!("commit_event: {e}")))?;
        debug!(
            phone = %conversation.phone,
            messages = messages.len(),
            "Event committed"
        );
        Ok(())
    }

    async fn recent_messages(
        &self,
        phone: &str,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages
                     WHERE phone = ?1 ORDER BY created_at DESC LIMIT ?2"
                ),
                params![phone, limit as i64],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("recent_messages: {e}")))?;

        let mut messages = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("recent_messages: {e}")))?
        {
            messages.push(
                row_to_message(&row)
                    .map_err(|e| DatabaseError::Query(format!("row parse: {e}")))?,
            );
        }
        Ok(messages)
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        self.conn()
            .query("SELECT 1", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("ping: {e}")))?;
        Ok(())
    }
}

// ── Tests ───────────────────────────────────────────────────────────
