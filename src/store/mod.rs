//! Persistence layer: libSQL-backed content and conversation state.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::{ApprovalStatus, ContentCounts, ContentItem, ContentStore, StateStore};
