//! Store traits: narrow async interfaces for content and conversation state.

use async_trait::async_trait;
use serde::Serialize;

use crate::conversation::state::ConversationState;
use crate::error::DatabaseError;

/// Moderation status of a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Blocked,
}

impl ApprovalStatus {
    /// Integer stored in the `approved` column.
    pub fn code(&self) -> i64 {
        match self {
            Self::Pending => 0,
            Self::Approved => 1,
            Self::Blocked => -1,
        }
    }

    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Approved,
            c if c < 0 => Self::Blocked,
            _ => Self::Pending,
        }
    }
}

/// A submitted piece of content ("feel").
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentItem {
    pub id: i64,
    /// Submission time, as supplied by the submitter.
    pub submitted: String,
    pub author: String,
    pub body: String,
    pub status: ApprovalStatus,
    /// Fairness counter; lower values are preferred for selection.
    pub selector: i64,
    pub sent_count: i64,
}

/// Moderation counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ContentCounts {
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub blocked: i64,
}

/// Content store with fairness-weighted selection.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Add a new item awaiting approval. Returns its id.
    async fn insert(&self, submitted: &str, author: &str, body: &str) -> Result<i64, DatabaseError>;

    async fn get(&self, id: i64) -> Result<Option<ContentItem>, DatabaseError>;

    /// Pick an approved item whose selector is within 1 of the approved
    /// minimum, uniformly at random, and mark it sent. `None` when nothing is
    /// approved.
    async fn select_random(&self) -> Result<Option<ContentItem>, DatabaseError>;

    /// Oldest item awaiting approval.
    async fn select_pending(&self) -> Result<Option<ContentItem>, DatabaseError>;

    /// Approve a pending item. Returns `false` (no change) for any other status.
    async fn approve(&self, id: i64) -> Result<bool, DatabaseError>;

    /// Block a pending or approved item. Returns `false` if already blocked or missing.
    async fn block(&self, id: i64) -> Result<bool, DatabaseError>;

    /// Return a blocked item to approved. Returns `false` for any other status.
    async fn unblock(&self, id: i64) -> Result<bool, DatabaseError>;

    async fn counts(&self) -> Result<ContentCounts, DatabaseError>;

    async fn count_total(&self) -> Result<i64, DatabaseError> {
        Ok(self.counts().await?.total)
    }

    async fn count_pending(&self) -> Result<i64, DatabaseError> {
        Ok(self.counts().await?.pending)
    }

    async fn count_blocked(&self) -> Result<i64, DatabaseError> {
        Ok(self.counts().await?.blocked)
    }
}

/// Per-user conversation state.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Current state; the default state when none was stored.
    async fn get_state(&self, user_id: &str) -> Result<ConversationState, DatabaseError>;

    async fn set_state(&self, user_id: &str, state: &ConversationState) -> Result<(), DatabaseError>;
}
