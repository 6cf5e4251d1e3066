use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub const LATEST: i64 = 1;

pub fn current_version(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?)
}

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version = current_version(conn)?;
    if version > LATEST {
        anyhow::bail!("database schema v{} is newer than this build (v{})", version, LATEST);
    }

    if version < 1 {
        info!("Running migration v1 (users, documents)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id                  TEXT PRIMARY KEY,
                email               TEXT NOT NULL UNIQUE COLLATE NOCASE,
                username            TEXT,
                password            TEXT NOT NULL,
                role                TEXT NOT NULL DEFAULT 'user',
                is_active           INTEGER NOT NULL DEFAULT 1,
                documents_generated INTEGER NOT NULL DEFAULT 0,
                created_at          TEXT NOT NULL DEFAULT (datetime('now')),
                last_login          TEXT
            );

            CREATE TABLE documents (
                id              TEXT PRIMARY KEY,
                user_id         TEXT REFERENCES users(id) ON DELETE SET NULL,
                template        TEXT NOT NULL,
                recipient_email TEXT NOT NULL,
                order_number    TEXT NOT NULL DEFAULT '',
                full_name       TEXT NOT NULL DEFAULT '',
                created_at      TEXT NOT NULL DEFAULT (datetime('now')),
                email_sent      INTEGER NOT NULL DEFAULT 0,
                email_sent_at   TEXT,
                email_error     TEXT
            );

            CREATE INDEX idx_documents_user ON documents(user_id);
            CREATE INDEX idx_documents_created ON documents(created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < LATEST {
        info!("Database migrated from v{} to v{}", version, LATEST);
    }
    Ok(())
}
