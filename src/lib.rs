//! Feels Relay: a chat-bot relay that broadcasts moderated messages to one
//! recipient under platform rate limits.

pub mod channels;
pub mod config;
pub mod context;
pub mod conversation;
pub mod error;
pub mod outbound;
pub mod server;
pub mod store;
