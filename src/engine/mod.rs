//! Conversation engine — turns one inbound text into one reply,
//! advancing the per-phone state machine and persisting the result.

pub mod pipeline;
pub mod replies;
pub mod state;

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::cpf;
use crate::engine::pipeline::QuoteContext;
use crate::engine::state::ConversationStatus;
use crate::error::DatabaseError;
use crate::safra::QuoteService;
use crate::store::{Conversation, ConversationStore, Direction, EventMessage};

/// Commands that show the help text from any state.
const HELP_COMMANDS: &[&str] = &["ajuda", "help", "menu"];
/// Commands that restart the flow from any state.
const RESTART_COMMANDS: &[&str] = &["reiniciar", "começar", "start", "oi", "olá", "ola"];

/// What the engine wants sent back for one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// The main reply text.
    pub text: String,
    /// When set, send this first: the main reply took a slow lookup to
    /// produce.
    pub wait_notice: Option<String>,
}

impl Reply {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            wait_notice: None,
        }
    }
}

/// Drives the collection state machine over a persistence backend and a
/// quote service.
pub struct Engine {
    store: Arc<dyn ConversationStore>,
    quotes: Arc<dyn QuoteService>,
}

impl Engine {
    pub fn new(store: Arc<dyn ConversationStore>, quotes: Arc<dyn QuoteService>) -> Self {
        Self { store, quotes }
    }

    /// Process one inbound text and return the reply to send.
    ///
    /// Nothing is written until the reply is fully computed; then the
    /// conversation row and the event's message records go into the
    /// store as one transaction. A storage failure leaves the previous
    /// state intact, so the user can simply resend.
    pub async fn process_message(&self, phone: &str, text: &str) -> Result<Reply, DatabaseError> {
        let mut conversation = self
            .store
            .find_conversation(phone)
            .await?
            .unwrap_or_else(|| Conversation::new(phone));
        conversation.touch();

        let command = text.trim().to_lowercase();
        let reply = if HELP_COMMANDS.contains(&command.as_str()) {
            Reply::plain(replies::HELP)
        } else if RESTART_COMMANDS.contains(&command.as_str()) {
            self.restart(&mut conversation)
        } else {
            match ConversationStatus::parse(&conversation.status) {
                Some(ConversationStatus::CollectingDocument) => {
                    self.handle_document(&mut conversation, text)
                }
                Some(ConversationStatus::CollectingBirthDate) => {
                    self.handle_birth_date(&mut conversation, text)
                }
                Some(ConversationStatus::CollectingSex) => {
                    self.handle_sex(&mut conversation, text)
                }
                Some(ConversationStatus::CollectingEmploymentStatus) => {
                    self.handle_employment_status(&mut conversation, text).await
                }
                Some(ConversationStatus::Processing)
                | Some(ConversationStatus::Completed)
                | None => {
                    // Stale or unrecognized state: restart rather than
                    // trapping the user.
                    self.restart(&mut conversation)
                }
            }
        };

        let mut messages = vec![EventMessage::new(Direction::Incoming, text)];
        if let Some(notice) = &reply.wait_notice {
            messages.push(EventMessage::new(Direction::Outgoing, notice.clone()));
        }
        messages.push(EventMessage::new(Direction::Outgoing, reply.text.clone()));
        self.store.commit_event(&conversation, &messages).await?;

        Ok(reply)
    }

    fn restart(&self, conversation: &mut Conversation) -> Reply {
        info!(phone = %conversation.phone, "Restarting conversation flow");
        conversation.set_status(ConversationStatus::CollectingDocument);
        conversation.document = None;
        conversation.collected = Default::default();
        Reply::plain(replies::WELCOME)
    }

    fn handle_document(&self, conversation: &mut Conversation, text: &str) -> Reply {
        let cleaned = cpf::clean(text);
        if !cpf::is_valid(&cleaned) {
            return Reply::plain(replies::INVALID_DOCUMENT);
        }

        conversation.document = Some(cleaned.clone());
        conversation.set_status(ConversationStatus::CollectingBirthDate);
        Reply::plain(replies::document_received(&cpf::format(&cleaned)))
    }

    fn handle_birth_date(&self, conversation: &mut Conversation, text: &str) -> Reply {
        let trimmed = text.trim();
        let Ok(date) = NaiveDate::parse_from_str(trimmed, "%d/%m/%Y") else {
            return Reply::plain(replies::INVALID_BIRTH_DATE);
        };

        conversation.collected.birth_date = Some(format!("{}T00:00:00", date.format("%Y-%m-%d")));
        conversation.set_status(ConversationStatus::CollectingSex);
        Reply::plain(replies::birth_date_received(trimmed))
    }

    fn handle_sex(&self, conversation: &mut Conversation, text: &str) -> Reply {
        let sex = text.trim().to_uppercase();
        if sex != "M" && sex != "F" {
            return Reply::plain(replies::INVALID_SEX);
        }

        conversation.collected.sex = Some(sex.clone());
        conversation.set_status(ConversationStatus::CollectingEmploymentStatus);
        Reply::plain(replies::sex_received(&sex))
    }

    async fn handle_employment_status(
        &self,
        conversation: &mut Conversation,
        text: &str,
    ) -> Reply {
        let status: i32 = match text.trim() {
            "1" => 1,
            "2" => 2,
            "3" => 3,
            _ => return Reply::plain(replies::INVALID_EMPLOYMENT_STATUS),
        };
        conversation.collected.employment_status = Some(status);

        let Some(document) = conversation.document.clone() else {
            // Should not happen: the document is set before this state
            // is ever entered.
            warn!(phone = %conversation.phone, "Employment step reached without a document");
            return self.restart(conversation);
        };

        conversation.set_status(ConversationStatus::Processing);
        let ctx = QuoteContext {
            document,
            birth_date: conversation.collected.birth_date.clone(),
            sex: conversation.collected.sex.clone(),
            employment_status: status,
        };
        let result = pipeline::run(self.quotes.as_ref(), &ctx).await;
        conversation.set_status(ConversationStatus::Completed);

        Reply {
            text: result,
            wait_notice: Some(replies::WAIT_NOTICE.to_string()),
        }
    }
}
