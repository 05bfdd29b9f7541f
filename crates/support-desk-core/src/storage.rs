//! Storage layer for the support desk
//!
//! Provides a persistent storage implementation backed by a local SQLite database.
//! All statements run on the blocking pool behind a single connection lock, so every
//! insert/update (and every guarded read-then-write transaction) is atomic.

use crate::session::SessionState;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, ToSql, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{error, info};

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Error reported by SQLite
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Error during JSON serialization or deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Blocking database task failed to complete
    #[error("Database task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    /// The connection lock was poisoned by a panicking task
    #[error("Database connection lock poisoned")]
    Poisoned,
}

/// A single FAQ question/answer pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqEntry {
    /// Question text, also used verbatim as the keyboard button label
    pub question: String,
    /// Canned answer sent back to the user
    pub answer: String,
}

impl FaqEntry {
    /// Build an entry from borrowed text
    #[must_use]
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Lifecycle status of a support request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Waiting for an answer
    #[default]
    New,
    /// Answered (by a manager or from the FAQ)
    Resolved,
}

impl RequestStatus {
    /// Column value stored in `support_requests.status`
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Resolved => "resolved",
        }
    }
}

impl ToSql for RequestStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for RequestStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "new" => Ok(Self::New),
            "resolved" => Ok(Self::Resolved),
            other => Err(FromSqlError::Other(
                format!("unknown request status '{other}'").into(),
            )),
        }
    }
}

/// A persisted support request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportRequest {
    /// Row id, assigned on creation
    pub id: i64,
    /// Telegram id of the user who asked
    pub user_id: i64,
    /// Question text
    pub question: String,
    /// Answer text, present once resolved
    pub answer: Option<String>,
    /// Assigned manager, absent when nobody was available
    pub manager_id: Option<i64>,
    /// Lifecycle status
    pub status: RequestStatus,
    /// Creation time (UTC)
    pub created_at: DateTime<Utc>,
}

/// Fields for a request about to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRequest {
    /// Telegram id of the user who asked
    pub user_id: i64,
    /// Question text
    pub question: String,
    /// Answer text (FAQ audit records only)
    pub answer: Option<String>,
    /// Assigned manager
    pub manager_id: Option<i64>,
    /// Initial status
    pub status: RequestStatus,
}

impl NewRequest {
    /// A fresh unanswered request with no manager
    #[must_use]
    pub fn new(user_id: i64, question: impl Into<String>) -> Self {
        Self {
            user_id,
            question: question.into(),
            answer: None,
            manager_id: None,
            status: RequestStatus::New,
        }
    }

    /// Assign the request to a manager
    #[must_use]
    pub const fn assigned_to(mut self, manager_id: i64) -> Self {
        self.manager_id = Some(manager_id);
        self
    }

    /// Mark the request as already answered (used for FAQ audit records)
    #[must_use]
    pub fn answered(mut self, answer: impl Into<String>) -> Self {
        self.answer = Some(answer.into());
        self.status = RequestStatus::Resolved;
        self
    }
}

/// An unanswered request as shown in a manager's picker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    /// Request id
    pub id: i64,
    /// Question text
    pub question: String,
    /// Requester id
    pub user_id: i64,
}

/// Result of a guarded resolution attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The row was updated; carries the updated request
    Resolved(SupportRequest),
    /// No request with this id
    NotFound,
    /// The request is not assigned to the caller
    Forbidden,
    /// The request already has an answer
    AlreadyResolved,
}

/// Aggregate request counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestStats {
    /// Assigned to a manager and waiting for an answer
    pub pending: i64,
    /// Waiting for an answer with no manager assigned
    pub unassigned: i64,
    /// Answered requests, FAQ audit records included
    pub resolved: i64,
}

impl RequestStats {
    /// Total number of stored requests
    #[must_use]
    pub const fn total(&self) -> i64 {
        self.pending + self.unassigned + self.resolved
    }
}

/// Interface for storage providers
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Insert FAQ entries whose question is not stored yet; returns inserted count
    async fn seed_faq(&self, entries: Vec<FaqEntry>) -> Result<usize, StorageError>;
    /// Load the whole FAQ table in insertion order
    async fn load_faq(&self) -> Result<Vec<FaqEntry>, StorageError>;
    /// Add a manager; returns `false` if already registered
    async fn register_manager(&self, user_id: i64) -> Result<bool, StorageError>;
    /// Check whether a user is a registered manager
    async fn is_manager(&self, user_id: i64) -> Result<bool, StorageError>;
    /// All registered managers
    async fn list_managers(&self) -> Result<BTreeSet<i64>, StorageError>;
    /// Insert a request and return its id
    async fn create_request(&self, request: NewRequest) -> Result<i64, StorageError>;
    /// Fetch a request by id
    async fn get_request(&self, request_id: i64) -> Result<Option<SupportRequest>, StorageError>;
    /// Record a manager's answer on an existing request
    async fn resolve_request(
        &self,
        request_id: i64,
        answer: String,
        manager_id: i64,
    ) -> Result<Resolution, StorageError>;
    /// Unanswered requests assigned to a manager, oldest first
    async fn pending_for_manager(&self, manager_id: i64)
        -> Result<Vec<PendingRequest>, StorageError>;
    /// Aggregate request counters
    async fn request_stats(&self) -> Result<RequestStats, StorageError>;
    /// Load the conversation state of a user
    async fn load_session(&self, user_id: i64) -> Result<Option<SessionState>, StorageError>;
    /// Persist the conversation state of a user (`Idle` removes the row)
    async fn save_session(&self, user_id: i64, state: SessionState) -> Result<(), StorageError>;
    /// Check connection to storage
    async fn check_connection(&self) -> Result<(), String>;
}

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS faq (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    question TEXT UNIQUE NOT NULL,
    answer TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS support_requests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    question TEXT NOT NULL,
    answer TEXT,
    manager_id INTEGER,
    status TEXT NOT NULL DEFAULT 'new',
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_requests_manager ON support_requests(manager_id, answer);

CREATE TABLE IF NOT EXISTS managers (
    user_id INTEGER PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS sessions (
    user_id INTEGER PRIMARY KEY,
    state TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
";

/// SQLite-backed storage implementation
#[derive(Clone)]
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Open (or create) the database file and apply the schema
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the schema fails to apply.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(path.as_ref())?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        info!(
            "Opened SQLite database at {} (journal_mode={mode})",
            path.as_ref().display()
        );
        Self::with_schema(conn)
    }

    /// Open a private in-memory database (tests, dry runs)
    ///
    /// # Errors
    ///
    /// Returns an error if the schema fails to apply.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::with_schema(Connection::open_in_memory()?)
    }

    fn with_schema(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a closure against the connection on the blocking pool
    async fn with_conn<F, T>(&self, op: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StorageError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| StorageError::Poisoned)?;
            op(&mut guard)
        })
        .await?
    }

    fn fetch_request(
        conn: &Connection,
        request_id: i64,
    ) -> Result<Option<SupportRequest>, StorageError> {
        let request = conn
            .query_row(
                "SELECT id, user_id, question, answer, manager_id, status, created_at
                 FROM support_requests WHERE id = ?1",
                params![request_id],
                |row| {
                    Ok(SupportRequest {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        question: row.get(2)?,
                        answer: row.get(3)?,
                        manager_id: row.get(4)?,
                        status: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                },
            )
            .optional()?;
        Ok(request)
    }
}

#[async_trait]
impl StorageProvider for SqliteStorage {
    async fn seed_faq(&self, entries: Vec<FaqEntry>) -> Result<usize, StorageError> {
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let mut inserted = 0;
            {
                let mut stmt =
                    tx.prepare("INSERT OR IGNORE INTO faq (question, answer) VALUES (?1, ?2)")?;
                for entry in &entries {
                    if stmt.execute(params![entry.question, entry.answer])? > 0 {
                        info!("Added FAQ entry: {}", entry.question);
                        inserted += 1;
                    }
                }
            }
            tx.commit()?;
            Ok(inserted)
        })
        .await
    }

    async fn load_faq(&self) -> Result<Vec<FaqEntry>, StorageError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT question, answer FROM faq ORDER BY id")?;
            let rows = stmt.query_map([], |row| {
                Ok(FaqEntry {
                    question: row.get(0)?,
                    answer: row.get(1)?,
                })
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
    }

    async fn register_manager(&self, user_id: i64) -> Result<bool, StorageError> {
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO managers (user_id) VALUES (?1)",
                params![user_id],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    async fn is_manager(&self, user_id: i64) -> Result<bool, StorageError> {
        self.with_conn(move |conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM managers WHERE user_id = ?1",
                    params![user_id],
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
        .await
    }

    async fn list_managers(&self) -> Result<BTreeSet<i64>, StorageError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT user_id FROM managers")?;
            let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;
            Ok(rows.collect::<Result<BTreeSet<_>, _>>()?)
        })
        .await
    }

    async fn create_request(&self, request: NewRequest) -> Result<i64, StorageError> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO support_requests (user_id, question, answer, manager_id, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    request.user_id,
                    request.question,
                    request.answer,
                    request.manager_id,
                    request.status,
                    Utc::now(),
                ],
            )?;
            let request_id = conn.last_insert_rowid();
            info!(
                "Saved request #{request_id} from user {}",
                request.user_id
            );
            Ok(request_id)
        })
        .await
    }

    async fn get_request(&self, request_id: i64) -> Result<Option<SupportRequest>, StorageError> {
        self.with_conn(move |conn| Self::fetch_request(conn, request_id))
            .await
    }

    async fn resolve_request(
        &self,
        request_id: i64,
        answer: String,
        manager_id: i64,
    ) -> Result<Resolution, StorageError> {
        self.with_conn(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let current: Option<(Option<i64>, Option<String>)> = tx
                .query_row(
                    "SELECT manager_id, answer FROM support_requests WHERE id = ?1",
                    params![request_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let outcome = match current {
                None => Resolution::NotFound,
                Some((assigned, _)) if assigned != Some(manager_id) => Resolution::Forbidden,
                Some((_, Some(_))) => Resolution::AlreadyResolved,
                Some((_, None)) => {
                    tx.execute(
                        "UPDATE support_requests SET answer = ?1, status = ?2
                         WHERE id = ?3 AND manager_id = ?4 AND answer IS NULL",
                        params![answer, RequestStatus::Resolved, request_id, manager_id],
                    )?;
                    Self::fetch_request(&tx, request_id)?
                        .map_or(Resolution::NotFound, Resolution::Resolved)
                }
            };
            tx.commit()?;
            Ok(outcome)
        })
        .await
    }

    async fn pending_for_manager(
        &self,
        manager_id: i64,
    ) -> Result<Vec<PendingRequest>, StorageError> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, question, user_id FROM support_requests
                 WHERE manager_id = ?1 AND answer IS NULL ORDER BY id",
            )?;
            let rows = stmt.query_map(params![manager_id], |row| {
                Ok(PendingRequest {
                    id: row.get(0)?,
                    question: row.get(1)?,
                    user_id: row.get(2)?,
                })
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
    }

    async fn request_stats(&self) -> Result<RequestStats, StorageError> {
        self.with_conn(|conn| {
            let stats = conn.query_row(
                "SELECT
                    COALESCE(SUM(CASE WHEN answer IS NULL AND manager_id IS NOT NULL THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN answer IS NULL AND manager_id IS NULL THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN answer IS NOT NULL THEN 1 ELSE 0 END), 0)
                 FROM support_requests",
                [],
                |row| {
                    Ok(RequestStats {
                        pending: row.get(0)?,
                        unassigned: row.get(1)?,
                        resolved: row.get(2)?,
                    })
                },
            )?;
            Ok(stats)
        })
        .await
    }

    async fn load_session(&self, user_id: i64) -> Result<Option<SessionState>, StorageError> {
        let raw: Option<String> = self
            .with_conn(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT state FROM sessions WHERE user_id = ?1",
                        params![user_id],
                        |row| row.get(0),
                    )
                    .optional()?)
            })
            .await?;
        raw.map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(StorageError::from)
    }

    async fn save_session(&self, user_id: i64, state: SessionState) -> Result<(), StorageError> {
        if state == SessionState::Idle {
            return self
                .with_conn(move |conn| {
                    conn.execute("DELETE FROM sessions WHERE user_id = ?1", params![user_id])?;
                    Ok(())
                })
                .await;
        }

        let json = serde_json::to_string(&state)?;
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO sessions (user_id, state, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id) DO UPDATE SET state = excluded.state, updated_at = excluded.updated_at",
                params![user_id, json, Utc::now()],
            )?;
            Ok(())
        })
        .await
    }

    async fn check_connection(&self) -> Result<(), String> {
        let probe = self
            .with_conn(|conn| Ok(conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?))
            .await;
        match probe {
            Ok(_) => {
                info!("Successfully connected to SQLite storage.");
                Ok(())
            }
            Err(e) => {
                let err_msg = format!("SQLite connectivity test failed: {e}");
                error!("{}", err_msg);
                Err(err_msg)
            }
        }
    }
}
