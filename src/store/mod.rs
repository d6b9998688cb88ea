//! Persistence layer — libSQL-backed storage for conversations and
//! message history.

pub mod libsql_backend;
pub mod traits;

pub use libsql_backend::LibSqlStore;
pub use traits::{Conversation, ConversationStore, Direction, EventMessage, StoredMessage};
