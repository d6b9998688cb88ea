//! Refin Bot — WhatsApp assistant for consignado refinancing quotes.
//!
//! A webhook-driven chatbot that collects a user's CPF, birth date, sex,
//! and benefit status over a short guided conversation, then drives the
//! Safra partner API to simulate refinancing offers for the user's
//! eligible contracts.

pub mod config;
pub mod cpf;
pub mod engine;
pub mod error;
pub mod safra;
pub mod server;
pub mod store;
pub mod zapi;
