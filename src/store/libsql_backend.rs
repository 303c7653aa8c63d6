//! libSQL backend: async `ContentStore` and `StateStore` implementation.
//!
//! Supports local file and in-memory databases. Every read-modify-write runs
//! inside one transaction, and writers are serialized through `write_lock` so
//! concurrent requests sharing the connection cannot interleave.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, Transaction, params};
use rand::seq::SliceRandom;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::conversation::state::{ConversationState, ConversationStatus};
use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::{ApprovalStatus, ContentCounts, ContentItem, ContentStore, StateStore};

const FEEL_COLUMNS: &str = "feel_id, submitted, name, comment, approved, selector, sent_count";

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
    write_lock: Mutex<()>,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
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

        let backend = Self::from_database(db).await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        migrations::run_migrations(&conn).await?;

        Ok(Self {
            db: Arc::new(db),
            conn,
            write_lock: Mutex::new(()),
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }

    async fn begin(&self, op: &str) -> Result<Transaction, DatabaseError> {
        self.conn
            .transaction()
            .await
            .map_err(|e| DatabaseError::Query(format!("{op} begin: {e}")))
    }
}

/// Commit on success, roll back on error.
async fn finish<T>(
    tx: Transaction,
    result: Result<T, DatabaseError>,
    op: &str,
) -> Result<T, DatabaseError> {
    match result {
        Ok(value) => {
            tx.commit()
                .await
                .map_err(|e| DatabaseError::Query(format!("{op} commit: {e}")))?;
            Ok(value)
        }
        Err(err) => {
            if let Err(e) = tx.rollback().await {
                warn!(op, error = %e, "Rollback failed");
            }
            Err(err)
        }
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Map a libsql Row to a ContentItem. Column order matches FEEL_COLUMNS.
fn row_to_item(row: &libsql::Row) -> Result<ContentItem, libsql::Error> {
    Ok(ContentItem {
        id: row.get(0)?,
        submitted: row.get(1)?,
        author: row.get(2)?,
        body: row.get(3)?,
        status: ApprovalStatus::from_code(row.get(4)?),
        selector: row.get(5)?,
        sent_count: row.get(6)?,
    })
}

async fn get_in(conn: &Connection, id: i64) -> Result<Option<ContentItem>, DatabaseError> {
    let mut rows = conn
        .query(
            &format!("SELECT {FEEL_COLUMNS} FROM feels WHERE feel_id = ?1"),
            params![id],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("get: {e}")))?;

    match rows.next().await {
        Ok(Some(row)) => {
            let item = row_to_item(&row)
                .map_err(|e| DatabaseError::Query(format!("get row parse: {e}")))?;
            Ok(Some(item))
        }
        Ok(None) => Ok(None),
        Err(e) => Err(DatabaseError::Query(format!("get: {e}"))),
    }
}

/// Lowest selector among approved items and how many approved items exist.
async fn min_selector(conn: &Connection) -> Result<(i64, i64), DatabaseError> {
    let mut rows = conn
        .query(
            "SELECT COALESCE(MIN(selector), 0), COUNT(*) FROM feels WHERE approved = 1",
            (),
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("min_selector: {e}")))?;

    match rows.next().await {
        Ok(Some(row)) => {
            let min: i64 = row
                .get(0)
                .map_err(|e| DatabaseError::Query(format!("min_selector parse: {e}")))?;
            let count: i64 = row
                .get(1)
                .map_err(|e| DatabaseError::Query(format!("min_selector parse: {e}")))?;
            Ok((min, count))
        }
        Ok(None) => Ok((0, 0)),
        Err(e) => Err(DatabaseError::Query(format!("min_selector: {e}"))),
    }
}

async fn set_selector(conn: &Connection, id: i64, selector: i64) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE feels SET selector = ?1 WHERE feel_id = ?2",
        params![selector, id],
    )
    .await
    .map_err(|e| DatabaseError::Query(format!("set_selector: {e}")))?;
    debug!(feel_id = id, selector, "Selector updated");
    Ok(())
}

async fn set_approval(conn: &Connection, id: i64, status: ApprovalStatus) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE feels SET approved = ?1 WHERE feel_id = ?2",
        params![status.code(), id],
    )
    .await
    .map_err(|e| DatabaseError::Query(format!("set_approval: {e}")))?;
    Ok(())
}

async fn select_random_in(conn: &Connection) -> Result<Option<ContentItem>, DatabaseError> {
    let (min, approved) = min_selector(conn).await?;
    if approved == 0 {
        return Ok(None);
    }

    let mut rows = conn
        .query(
            "SELECT feel_id FROM feels WHERE approved = 1 AND selector <= ?1",
            params![min],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("select_random: {e}")))?;

    let mut ids = Vec::new();
    loop {
        match rows.next().await {
            Ok(Some(row)) => ids.push(
                row.get::<i64>(0)
                    .map_err(|e| DatabaseError::Query(format!("select_random row parse: {e}")))?,
            ),
            Ok(None) => break,
            Err(e) => return Err(DatabaseError::Query(format!("select_random: {e}"))),
        }
    }

    let chosen = {
        let mut rng = rand::thread_rng();
        ids.choose(&mut rng).copied()
    };
    let Some(id) = chosen else {
        return Ok(None);
    };

    conn.execute(
        "UPDATE feels SET selector = selector + 1, sent_count = sent_count + 1 WHERE feel_id = ?1",
        params![id],
    )
    .await
    .map_err(|e| DatabaseError::Query(format!("select_random update: {e}")))?;
    debug!(feel_id = id, candidates = ids.len(), min_selector = min, "Feel selected");

    get_in(conn, id).await
}

async fn approve_in(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    match get_in(conn, id).await? {
        Some(item) if item.status == ApprovalStatus::Pending => {}
        _ => return Ok(false),
    }

    let (min, _) = min_selector(conn).await?;
    set_approval(conn, id, ApprovalStatus::Approved).await?;
    if min > 0 {
        set_selector(conn, id, min).await?;
    }
    debug!(feel_id = id, "Feel approved");
    Ok(true)
}

async fn block_in(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    match get_in(conn, id).await? {
        Some(item) if item.status != ApprovalStatus::Blocked => {}
        _ => return Ok(false),
    }

    set_approval(conn, id, ApprovalStatus::Blocked).await?;
    debug!(feel_id = id, "Feel blocked");
    Ok(true)
}

async fn unblock_in(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let item = match get_in(conn, id).await? {
        Some(item) if item.status == ApprovalStatus::Blocked => item,
        _ => return Ok(false),
    };

    let (min, _) = min_selector(conn).await?;
    set_approval(conn, id, ApprovalStatus::Approved).await?;
    if min > item.selector {
        set_selector(conn, id, min).await?;
    }
    debug!(feel_id = id, "Feel unblocked");
    Ok(true)
}

#[async_trait]
impl ContentStore for LibSqlBackend {
    async fn insert(&self, submitted: &str, author: &str, body: &str) -> Result<i64, DatabaseError> {
        let _guard = self.write_lock.lock().await;
        let conn = self.conn();
        conn.execute(
            "INSERT INTO feels (submitted, name, comment) VALUES (?1, ?2, ?3)",
            params![submitted, author, body],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("insert: {e}")))?;

        let id = conn.last_insert_rowid();
        info!(feel_id = id, author, "Feel submitted");
        Ok(id)
    }

    async fn get(&self, id: i64) -> Result<Option<ContentItem>, DatabaseError> {
        get_in(self.conn(), id).await
    }

    async fn select_random(&self) -> Result<Option<ContentItem>, DatabaseError> {
        let _guard = self.write_lock.lock().await;
        let tx = self.begin("select_random").await?;
        let result = select_random_in(&tx).await;
        finish(tx, result, "select_random").await
    }

    async fn select_pending(&self) -> Result<Option<ContentItem>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {FEEL_COLUMNS} FROM feels WHERE approved = 0 ORDER BY feel_id LIMIT 1"),
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("select_pending: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let item = row_to_item(&row)
                    .map_err(|e| DatabaseError::Query(format!("select_pending row parse: {e}")))?;
                Ok(Some(item))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("select_pending: {e}"))),
        }
    }

    async fn approve(&self, id: i64) -> Result<bool, DatabaseError> {
        let _guard = self.write_lock.lock().await;
        let tx = self.begin("approve").await?;
        let result = approve_in(&tx, id).await;
        finish(tx, result, "approve").await
    }

    async fn block(&self, id: i64) -> Result<bool, DatabaseError> {
        let _guard = self.write_lock.lock().await;
        let tx = self.begin("block").await?;
        let result = block_in(&tx, id).await;
        finish(tx, result, "block").await
    }

    async fn unblock(&self, id: i64) -> Result<bool, DatabaseError> {
        let _guard = self.write_lock.lock().await;
        let tx = self.begin("unblock").await?;
        let result = unblock_in(&tx, id).await;
        finish(tx, result, "unblock").await
    }

    async fn counts(&self) -> Result<ContentCounts, DatabaseError> {
        let mut rows = self
            .conn()
            .query("SELECT approved, COUNT(*) FROM feels GROUP BY approved", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("counts: {e}")))?;

        let mut counts = ContentCounts::default();
        loop {
            let row = match rows.next().await {
                Ok(Some(row)) => row,
                Ok(None) => break,
                Err(e) => return Err(DatabaseError::Query(format!("counts: {e}"))),
            };
            let (code, count) = row
                .get::<i64>(0)
                .and_then(|code| Ok((code, row.get::<i64>(1)?)))
                .map_err(|e| DatabaseError::Query(format!("counts row parse: {e}")))?;
            counts.total += count;
            match ApprovalStatus::from_code(code) {
                ApprovalStatus::Pending => counts.pending += count,
                ApprovalStatus::Approved => counts.approved += count,
                ApprovalStatus::Blocked => counts.blocked += count,
            }
        }
        Ok(counts)
    }
}

#[async_trait]
impl StateStore for LibSqlBackend {
    async fn get_state(&self, user_id: &str) -> Result<ConversationState, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT status, data FROM user_status WHERE user_id = ?1",
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_state: {e}")))?;

        let row = match rows.next().await {
            Ok(Some(row)) => row,
            Ok(None) => return Ok(ConversationState::default()),
            Err(e) => return Err(DatabaseError::Query(format!("get_state: {e}"))),
        };

        let code: i64 = row.get(0).unwrap_or(0);
        let data: Option<String> = row.get(1).ok();

        let status = ConversationStatus::from_code(code).unwrap_or_else(|| {
            warn!(user_id, code, "Unknown conversation status, using default");
            ConversationStatus::Default
        });
        let payload = data
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or(serde_json::Value::Null);

        Ok(ConversationState::new(status, payload))
    }

    async fn set_state(&self, user_id: &str, state: &ConversationState) -> Result<(), DatabaseError> {
        let data = serde_json::to_string(&state.payload)
            .map_err(|e| DatabaseError::Serialization(format!("set_state payload: {e}")))?;
        let now = Utc::now().to_rfc3339();

        let _guard = self.write_lock.lock().await;
        self.conn()
            .execute(
                "INSERT INTO user_status (user_id, status, data, updated_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (user_id) DO UPDATE SET status = ?2, data = ?3, updated_at = ?4",
                params![user_id, state.status.code(), data, now],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("set_state: {e}")))?;

        debug!(user_id, status = %state.status, "Conversation state saved");
        Ok(())
    }
}
