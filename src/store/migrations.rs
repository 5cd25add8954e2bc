//! Schema migrations for the libSQL backend.
//!
//! Steps are numbered and applied in order. Each step runs inside its own
//! transaction together with its bookkeeping row, so a failed step leaves
//! the schema at the previous version.

use libsql::Connection;

use crate::error::DatabaseError;

struct Step {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// Append only; never edit a released step.
static STEPS: &[Step] = &[
    Step {
        version: 1,
        name: "initial_schema",
        sql: r#"
            CREATE TABLE IF NOT EXISTS challenges (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                challenger TEXT NOT NULL,
                opponent TEXT NOT NULL,
                type TEXT NOT NULL DEFAULT 'p2p',
                amount INTEGER NOT NULL,
                is_yes INTEGER NOT NULL DEFAULT 1,
                status TEXT NOT NULL DEFAULT 'active',
                yes_pool INTEGER NOT NULL DEFAULT 0,
                no_pool INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_challenges_status ON challenges(status);

            CREATE TABLE IF NOT EXISTS pending_challenges (
                card_id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                stake_amount INTEGER NOT NULL,
                time_limit TEXT NOT NULL,
                link TEXT NOT NULL,
                cast_hash TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_pending_challenges_created
                ON pending_challenges(created_at);
        "#,
    },
    Step {
        version: 2,
        name: "structured_request_fields",
        sql: r#"
            ALTER TABLE pending_challenges ADD COLUMN kind TEXT NOT NULL DEFAULT 'p2p';
            ALTER TABLE pending_challenges ADD COLUMN challenger TEXT NOT NULL DEFAULT '';
            ALTER TABLE pending_challenges ADD COLUMN opponent TEXT;
            ALTER TABLE pending_challenges ADD COLUMN topic TEXT NOT NULL DEFAULT '';
            ALTER TABLE pending_challenges ADD COLUMN side TEXT NOT NULL DEFAULT 'YES';
            ALTER TABLE pending_challenges ADD COLUMN amount INTEGER NOT NULL DEFAULT 0;
            ALTER TABLE pending_challenges ADD COLUMN duration_hours INTEGER NOT NULL DEFAULT 24;
            ALTER TABLE pending_challenges ADD COLUMN bonus INTEGER;

            ALTER TABLE challenges ADD COLUMN topic TEXT NOT NULL DEFAULT '';
            ALTER TABLE challenges ADD COLUMN duration_hours INTEGER NOT NULL DEFAULT 24;
            ALTER TABLE challenges ADD COLUMN bonus INTEGER;
        "#,
    },
];

const BOOKKEEPING: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
)";

fn step_err(step: &Step, what: &str) -> impl Fn(libsql::Error) -> DatabaseError {
    let label = format!("V{} {}: {what}", step.version, step.name);
    move |e| DatabaseError::Migration(format!("{label}: {e}"))
}

/// Bring the schema up to the newest step.
pub async fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute(BOOKKEEPING, ())
        .await
        .map_err(|e| DatabaseError::Migration(format!("schema_migrations: {e}")))?;

    let applied = schema_version(conn).await?;
    let mut upgraded = false;

    for step in STEPS.iter().filter(|s| s.version > applied) {
        tracing::info!(version = step.version, name = step.name, "Applying migration");

        let tx = conn.transaction().await.map_err(step_err(step, "begin"))?;
        tx.execute_batch(step.sql)
            .await
            .map_err(step_err(step, "apply"))?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
            libsql::params![step.version, step.name],
        )
        .await
        .map_err(step_err(step, "record"))?;
        tx.commit().await.map_err(step_err(step, "commit"))?;
        upgraded = true;
    }

    if !upgraded {
        tracing::debug!(version = applied, "Schema up to date");
    }
    Ok(())
}

/// Highest applied step, 0 for a fresh database.
pub async fn schema_version(conn: &Connection) -> Result<i64, DatabaseError> {
    let mut rows = conn
        .query("SELECT IFNULL(MAX(version), 0) FROM schema_migrations", ())
        .await
        .map_err(|e| DatabaseError::Migration(format!("reading schema version: {e}")))?;

    let Some(row) = rows
        .next()
        .await
        .map_err(|e| DatabaseError::Migration(format!("reading schema version: {e}")))?
    else {
        return Ok(0);
    };
    row.get::<i64>(0)
        .map_err(|e| DatabaseError::Migration(format!("decoding schema version: {e}")))
}
