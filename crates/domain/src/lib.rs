//! Shared types for the Inkwell AI relay: errors, configuration, chat
//! messages, stream events and the storage collaborator interfaces.

pub mod config;
pub mod error;
pub mod message;
pub mod record;
pub mod stream;
