//! libSQL-backed stage store.
//!
//! The [`StageStore`] keeps the two values that outlive any single stage
//! (`lastSummary` and `lastScore`), scoped to one named session.
//!
//! **Read rules:** a missing or malformed value never surfaces as an error;
//! it reads back as the documented default (`{}` for the summary, `0` for
//! the score). Only database failures are errors.
//!
//! **Write rules:** every write is stamped with a [`Ticket`] taken when the
//! producing run started. A write loses to any newer ticket already stored
//! under the same key or under a key derived from it, and reports
//! [`WriteOutcome::Superseded`] instead of overwriting.

mod migrations;

use std::fmt;
use std::path::Path;

use chrono::Utc;
use hirepipe_shared::{HirePipeError, JobSummary, Result, SessionName};
use libsql::{Connection, Database, params};

// ---------------------------------------------------------------------------
// Keys, tickets, outcomes
// ---------------------------------------------------------------------------

/// Keys of the cross-stage values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKey {
    /// JSON of the latest [`JobSummary`].
    LastSummary,
    /// Text-encoded latest match score.
    LastScore,
}

impl StoreKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LastSummary => "lastSummary",
            Self::LastScore => "lastScore",
        }
    }

    /// Keys whose newer tickets block a write to `self`: the key itself plus
    /// every value computed from it.
    fn guard_keys(self) -> &'static [StoreKey] {
        match self {
            Self::LastSummary => &[Self::LastSummary, Self::LastScore],
            Self::LastScore => &[Self::LastScore],
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Monotonic per-session sequence number, taken when a stage run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result of a stamped write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The value is now stored.
    Written,
    /// A newer run already wrote this key (or a value derived from it).
    Superseded,
}

// ---------------------------------------------------------------------------
// StageStore
// ---------------------------------------------------------------------------

/// Session-scoped key-value store on a local libSQL database.
pub struct StageStore {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    session: SessionName,
}

impl StageStore {
    /// Open or create the database at `path` and attach to `session`.
    pub async fn open(path: &Path, session: SessionName) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| HirePipeError::io(parent, e))?;
            }
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| HirePipeError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| HirePipeError::Storage(e.to_string()))?;

        let store = Self { db, conn, session };
        store.run_migrations().await?;
        store.ensure_session().await?;

        tracing::debug!(session = %store.session, path = %path.display(), "stage store opened");
        Ok(store)
    }

    /// The session every read and write is scoped to.
    pub fn session(&self) -> &SessionName {
        &self.session
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    HirePipeError::Storage(format!(
                        "migration v{} failed: {e}",
                        migration.version
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    async fn ensure_session(&self) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO sessions (id, created_at) VALUES (?1, ?2)
                 ON CONFLICT(id) DO NOTHING",
                params![self.session.as_str(), now.as_str()],
            )
            .await
            .map_err(|e| HirePipeError::Storage(e.to_string()))?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Tickets
    // -----------------------------------------------------------------------

    /// Take the next write ticket for this session.
    ///
    /// Tickets survive reopening the database, so separate processes sharing
    /// a session keep ordering their writes.
    pub async fn issue_ticket(&self) -> Result<Ticket> {
        let mut rows = self
            .conn
            .query(
                "UPDATE sessions SET last_ticket = last_ticket + 1
                 WHERE id = ?1
                 RETURNING last_ticket",
                params![self.session.as_str()],
            )
            .await
            .map_err(|e| HirePipeError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let value = row
                    .get::<i64>(0)
                    .map_err(|e| HirePipeError::Storage(e.to_string()))?;
                Ok(Ticket(value as u64))
            }
            Ok(None) => Err(HirePipeError::Storage(format!(
                "session '{}' is not registered",
                self.session
            ))),
            Err(e) => Err(HirePipeError::Storage(e.to_string())),
        }
    }

    // -----------------------------------------------------------------------
    // Raw values
    // -----------------------------------------------------------------------

    /// Read the stored text for `key`, if any.
    pub async fn read_raw(&self, key: StoreKey) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT value FROM stage_values WHERE session_id = ?1 AND key = ?2",
                params![self.session.as_str(), key.as_str()],
            )
            .await
            .map_err(|e| HirePipeError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(
                row.get::<String>(0)
                    .map_err(|e| HirePipeError::Storage(e.to_string()))?,
            )),
            Ok(None) => Ok(None),
            Err(e) => Err(HirePipeError::Storage(e.to_string())),
        }
    }

    /// Store `value` under `key` unless a newer ticket got there first.
    pub async fn write_raw(&self, key: StoreKey, value: &str, ticket: Ticket) -> Result<WriteOutcome> {
        let guard = key
            .guard_keys()
            .iter()
            .map(|k| format!("'{}'", k.as_str()))
            .collect::<Vec<_>>()
            .join(", ");

        let sql = format!(
            "INSERT INTO stage_values (session_id, key, value, seq, updated_at)
             SELECT ?1, ?2, ?3, ?4, ?5
             WHERE NOT EXISTS (
                 SELECT 1 FROM stage_values
                 WHERE session_id = ?1 AND key IN ({guard}) AND seq >= ?4
             )
             ON CONFLICT(session_id, key) DO UPDATE SET
               value = excluded.value,
               seq = excluded.seq,
               updated_at = excluded.updated_at"
        );

        let now = Utc::now().to_rfc3339();
        let changed = self
            .conn
            .execute(
                &sql,
                params![
                    self.session.as_str(),
                    key.as_str(),
                    value,
                    ticket.value() as i64,
                    now.as_str(),
                ],
            )
            .await
            .map_err(|e| HirePipeError::Storage(e.to_string()))?;

        if changed == 0 {
            tracing::warn!(%key, %ticket, session = %self.session, "write superseded by a newer run");
            Ok(WriteOutcome::Superseded)
        } else {
            tracing::debug!(%key, %ticket, session = %self.session, "value stored");
            Ok(WriteOutcome::Written)
        }
    }

    // -----------------------------------------------------------------------
    // Typed values
    // -----------------------------------------------------------------------

    /// Latest job summary, or the empty summary when absent or malformed.
    pub async fn read_summary(&self) -> Result<JobSummary> {
        let Some(raw) = self.read_raw(StoreKey::LastSummary).await? else {
            return Ok(JobSummary::default());
        };

        match serde_json::from_str::<JobSummary>(&raw) {
            Ok(summary) => Ok(summary),
            Err(e) => {
                tracing::debug!(error = %e, "stored summary is malformed, using default");
                Ok(JobSummary::default())
            }
        }
    }

    /// Store the job summary as JSON.
    pub async fn write_summary(&self, summary: &JobSummary, ticket: Ticket) -> Result<WriteOutcome> {
        let json = serde_json::to_string(summary)
            .map_err(|e| HirePipeError::Storage(format!("failed to encode summary: {e}")))?;
        self.write_raw(StoreKey::LastSummary, &json, ticket).await
    }

    /// Latest match score, or `0` when absent or malformed.
    pub async fn read_score(&self) -> Result<f64> {
        let Some(raw) = self.read_raw(StoreKey::LastScore).await? else {
            return Ok(0.0);
        };

        match raw.trim().parse::<f64>() {
            Ok(score) if score.is_finite() => Ok(score),
            _ => {
                tracing::debug!(raw = %raw, "stored score is malformed, using default");
                Ok(0.0)
            }
        }
    }

    /// Store the match score in its text encoding (`82`, `76.4`).
    pub async fn write_score(&self, score: f64, ticket: Ticket) -> Result<WriteOutcome> {
        self.write_raw(StoreKey::LastScore, &score.to_string(), ticket)
            .await
    }
}
