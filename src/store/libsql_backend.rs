//! libSQL backend: async `Database` trait implementation.
//!
//! Supports local file and in-memory databases over a single shared
//! connection.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info, warn};

use crate::bot::model::{ChallengeCard, ChallengeKind, ChallengeRequest, Side};
use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::{Challenge, Database, NewChallenge, PendingChallenge, PendingStatus};

/// libSQL database backend.
///
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Open(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Open(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db)?;
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Open(format!("Failed to create in-memory database: {e}"))
            })?;

        let backend = Self::from_database(db)?;
        backend.run_migrations().await?;
        Ok(backend)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Open(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

const PENDING_COLUMNS: &str = "card_id, title, description, stake_amount, time_limit, link, cast_hash, status, created_at, kind, challenger, opponent, topic, side, amount, duration_hours, bonus";

const CHALLENGE_COLUMNS: &str = "id, challenger, opponent, type, topic, amount, is_yes, status, yes_pool, no_pool, duration_hours, bonus, created_at";

/// Sortable RFC 3339 timestamp.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn to_sql_int(value: u64, field: &str) -> Result<i64, DatabaseError> {
    i64::try_from(value)
        .map_err(|_| DatabaseError::Decode(format!("{field} out of range: {value}")))
}

fn from_sql_int<T: TryFrom<i64>>(value: i64, field: &str) -> Result<T, DatabaseError> {
    T::try_from(value)
        .map_err(|_| DatabaseError::Decode(format!("{field} out of range: {value}")))
}

fn opt_int(value: Option<u64>, field: &str) -> Result<libsql::Value, DatabaseError> {
    Ok(match value {
        Some(v) => libsql::Value::Integer(to_sql_int(v, field)?),
        None => libsql::Value::Null,
    })
}

fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

fn query_err(op: &str) -> impl Fn(libsql::Error) -> DatabaseError + '_ {
    move |e| DatabaseError::Query(format!("{op}: {e}"))
}

/// Decode every remaining row. Rows that fail to decode are logged and
/// skipped; a failure to read the next row aborts the listing.
async fn collect_rows<T>(
    rows: &mut libsql::Rows,
    op: &str,
    decode: impl Fn(&libsql::Row) -> Result<T, DatabaseError>,
) -> Result<Vec<T>, DatabaseError> {
    let mut items = Vec::new();
    while let Some(row) = rows.next().await.map_err(query_err(op))? {
        match decode(&row) {
            Ok(item) => items.push(item),
            Err(e) => warn!(op = op, "Skipping undecodable row: {e}"),
        }
    }
    Ok(items)
}

/// Read a nullable integer column.
fn get_opt_int(row: &libsql::Row, idx: i32) -> Result<Option<i64>, libsql::Error> {
    Ok(match row.get_value(idx)? {
        libsql::Value::Integer(n) => Some(n),
        _ => None,
    })
}

/// Read a nullable text column.
fn get_opt_text(row: &libsql::Row, idx: i32) -> Result<Option<String>, libsql::Error> {
    Ok(match row.get_value(idx)? {
        libsql::Value::Text(s) => Some(s),
        _ => None,
    })
}

/// Map a libsql Row to a PendingChallenge. Column order matches PENDING_COLUMNS.
fn row_to_pending(row: &libsql::Row) -> Result<PendingChallenge, DatabaseError> {
    let read = |e: libsql::Error| DatabaseError::Query(format!("pending row parse: {e}"));

    let card = ChallengeCard {
        id: row.get::<String>(0).map_err(read)?,
        title: row.get::<String>(1).map_err(read)?,
        description: row.get::<String>(2).map_err(read)?,
        stake_amount: from_sql_int(row.get::<i64>(3).map_err(read)?, "stake_amount")?,
        time_limit: row.get::<String>(4).map_err(read)?,
        link: row.get::<String>(5).map_err(read)?,
    };
    let cast_hash: String = row.get(6).map_err(read)?;
    let status: PendingStatus = row
        .get::<String>(7)
        .map_err(read)?
        .parse()
        .map_err(DatabaseError::Decode)?;
    let created_at = parse_datetime(&row.get::<String>(8).map_err(read)?);

    let request = ChallengeRequest {
        kind: row
            .get::<String>(9)
            .map_err(read)?
            .parse::<ChallengeKind>()
            .map_err(DatabaseError::Decode)?,
        challenger: row.get::<String>(10).map_err(read)?,
        opponent: get_opt_text(row, 11).map_err(read)?,
        topic: row.get::<String>(12).map_err(read)?,
        side: row
            .get::<String>(13)
            .map_err(read)?
            .parse::<Side>()
            .map_err(DatabaseError::Decode)?,
        amount: from_sql_int(row.get::<i64>(14).map_err(read)?, "amount")?,
        duration: from_sql_int(row.get::<i64>(15).map_err(read)?, "duration_hours")?,
        bonus: get_opt_int(row, 16)
            .map_err(read)?
            .map(|b| from_sql_int(b, "bonus"))
            .transpose()?,
    };

    Ok(PendingChallenge {
        card,
        request,
        cast_hash,
        status,
        created_at,
    })
}

/// Map a libsql Row to a Challenge. Column order matches CHALLENGE_COLUMNS.
fn row_to_challenge(row: &libsql::Row) -> Result<Challenge, DatabaseError> {
    let read = |e: libsql::Error| DatabaseError::Query(format!("challenge row parse: {e}"));

    Ok(Challenge {
        id: row.get::<i64>(0).map_err(read)?,
        challenger: row.get::<String>(1).map_err(read)?,
        opponent: row.get::<String>(2).map_err(read)?,
        kind: row
            .get::<String>(3)
            .map_err(read)?
            .parse::<ChallengeKind>()
            .map_err(DatabaseError::Decode)?,
        topic: row.get::<String>(4).map_err(read)?,
        amount: from_sql_int(row.get::<i64>(5).map_err(read)?, "amount")?,
        is_yes: row.get::<i64>(6).map_err(read)? != 0,
        status: row.get::<String>(7).map_err(read)?,
        yes_pool: from_sql_int(row.get::<i64>(8).map_err(read)?, "yes_pool")?,
        no_pool: from_sql_int(row.get::<i64>(9).map_err(read)?, "no_pool")?,
        duration_hours: from_sql_int(row.get::<i64>(10).map_err(read)?, "duration_hours")?,
        bonus: get_opt_int(row, 11)
            .map_err(read)?
            .map(|b| from_sql_int(b, "bonus"))
            .transpose()?,
        created_at: parse_datetime(&row.get::<String>(12).map_err(read)?),
    })
}

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Challenges ──────────────────────────────────────────────────

    async fn create_challenge(&self, challenge: &NewChallenge) -> Result<Challenge, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!(
                    "INSERT INTO challenges (challenger, opponent, type, topic, amount, is_yes, status, duration_hours, bonus, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'active', ?7, ?8, ?9) RETURNING {CHALLENGE_COLUMNS}"
                ),
                params![
                    challenge.challenger.as_str(),
                    challenge.opponent.as_str(),
                    challenge.kind.to_string(),
                    challenge.topic.as_str(),
                    to_sql_int(challenge.amount, "amount")?,
                    i64::from(challenge.side.is_yes()),
                    i64::from(challenge.duration_hours),
                    opt_int(challenge.bonus, "bonus")?,
                    format_datetime(&Utc::now()),
                ],
            )
            .await
            .map_err(query_err("create_challenge"))?;

        let row = rows
            .next()
            .await
            .map_err(query_err("create_challenge"))?
            .ok_or_else(|| DatabaseError::Query("create_challenge: no row returned".into()))?;
        let created = row_to_challenge(&row)?;

        debug!(challenge_id = created.id, kind = %created.kind, "Challenge inserted into DB");
        Ok(created)
    }

    async fn get_challenge(&self, id: i64) -> Result<Option<Challenge>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {CHALLENGE_COLUMNS} FROM challenges WHERE id = ?1"),
                params![id],
            )
            .await
            .map_err(query_err("get_challenge"))?;

        match rows.next().await.map_err(query_err("get_challenge"))? {
            Some(row) => Ok(Some(row_to_challenge(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_challenges(&self) -> Result<Vec<Challenge>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {CHALLENGE_COLUMNS} FROM challenges ORDER BY id ASC"),
                (),
            )
            .await
            .map_err(query_err("list_challenges"))?;

        collect_rows(&mut rows, "list_challenges", row_to_challenge).await
    }

    // ── Pending challenges ──────────────────────────────────────────

    async fn insert_pending(&self, pending: &PendingChallenge) -> Result<(), DatabaseError> {
        let card = &pending.card;
        let request = &pending.request;

        self.conn()
            .execute(
                &format!(
                    "INSERT INTO pending_challenges ({PENDING_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
                ),
                params![
                    card.id.as_str(),
                    card.title.as_str(),
                    card.description.as_str(),
                    to_sql_int(card.stake_amount, "stake_amount")?,
                    card.time_limit.as_str(),
                    card.link.as_str(),
                    pending.cast_hash.as_str(),
                    pending.status.to_string(),
                    format_datetime(&pending.created_at),
                    request.kind.to_string(),
                    request.challenger.as_str(),
                    opt_text(request.opponent.as_deref()),
                    request.topic.as_str(),
                    request.side.to_string(),
                    to_sql_int(request.amount, "amount")?,
                    i64::from(request.duration),
                    opt_int(request.bonus, "bonus")?,
                ],
            )
            .await
            .map_err(query_err("insert_pending"))?;

        debug!(card_id = %card.id, "Pending challenge inserted into DB");
        Ok(())
    }

    async fn get_pending(&self, card_id: &str) -> Result<Option<PendingChallenge>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {PENDING_COLUMNS} FROM pending_challenges WHERE card_id = ?1"),
                params![card_id],
            )
            .await
            .map_err(query_err("get_pending"))?;

        match rows.next().await.map_err(query_err("get_pending"))? {
            Some(row) => Ok(Some(row_to_pending(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_pending(&self) -> Result<Vec<PendingChallenge>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {PENDING_COLUMNS} FROM pending_challenges ORDER BY created_at ASC, rowid ASC"
                ),
                (),
            )
            .await
            .map_err(query_err("list_pending"))?;

        collect_rows(&mut rows, "list_pending", row_to_pending).await
    }

    async fn delete_pending(&self, card_id: &str) -> Result<bool, DatabaseError> {
        let count = self
            .conn()
            .execute(
                "DELETE FROM pending_challenges WHERE card_id = ?1",
                params![card_id],
            )
            .await
            .map_err(query_err("delete_pending"))?;
        Ok(count > 0)
    }
}
